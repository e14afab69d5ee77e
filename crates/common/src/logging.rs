//! Logging setup for the binder
//!
//! Log lines go to stdout without module targets. Tool output and listing
//! lines are emitted at `debug`, binding decisions at `info` and failed
//! ticks at `error`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `default_level` when it is set. The
/// binary passes `--log-level`, or `debug` when the configuration enables
/// it. Calling this twice is an error instead of a panic.
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| crate::Error::Other(format!("Logging already initialized: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_setup_is_an_error() {
        let _ = setup_logging("info");
        assert!(matches!(setup_logging("debug"), Err(crate::Error::Other(_))));
    }
}
