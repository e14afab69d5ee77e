//! usbipd command-line argument construction
//!
//! Every invocation of the external tool goes through [`UsbipdCommand::args`]
//! so the argument shape stays identical across the adapter, the CLI and the
//! tests:
//!
//! ```text
//! usbipd wsl list                  [--distribution <name>]
//! usbipd wsl attach --busid <id>   [--distribution <name>]
//! usbipd wsl detach --busid <id>   [--distribution <name>]
//! usbipd wsl detach --all          [--distribution <name>]
//! ```

use crate::types::BusId;
use std::fmt;

/// Default name of the external sharing tool
pub const USBIPD_PROGRAM: &str = "usbipd";

/// A single usbipd invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsbipdCommand {
    /// List devices and their attachment state
    List,
    /// Bind one device to the guest
    Attach { bus_id: BusId },
    /// Return one device to the host
    Detach { bus_id: BusId },
    /// Return every device to the host
    DetachAll,
}

impl UsbipdCommand {
    /// Build the argument vector, appending the distribution when one is set
    ///
    /// An empty distribution name counts as unset.
    ///
    /// # Example
    /// ```
    /// use protocol::{BusId, UsbipdCommand};
    ///
    /// let cmd = UsbipdCommand::Attach { bus_id: BusId::from("1-1.2") };
    /// assert_eq!(
    ///     cmd.args(Some("Ubuntu")),
    ///     ["wsl", "attach", "--busid", "1-1.2", "--distribution", "Ubuntu"]
    /// );
    /// ```
    pub fn args(&self, distribution: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = vec!["wsl".to_string()];
        match self {
            Self::List => args.push("list".to_string()),
            Self::Attach { bus_id } => {
                args.extend(["attach", "--busid", bus_id.as_str()].map(String::from));
            }
            Self::Detach { bus_id } => {
                args.extend(["detach", "--busid", bus_id.as_str()].map(String::from));
            }
            Self::DetachAll => args.extend(["detach", "--all"].map(String::from)),
        }

        if let Some(name) = distribution.filter(|name| !name.is_empty()) {
            args.push("--distribution".to_string());
            args.push(name.to_string());
        }

        args
    }

    /// Short verb used in log lines
    pub fn verb(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Attach { .. } => "attach",
            Self::Detach { .. } | Self::DetachAll => "detach",
        }
    }
}

impl fmt::Display for UsbipdCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", USBIPD_PROGRAM, self.args(None).join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_args() {
        assert_eq!(UsbipdCommand::List.args(None), ["wsl", "list"]);
        assert_eq!(
            UsbipdCommand::List.args(Some("Debian")),
            ["wsl", "list", "--distribution", "Debian"]
        );
    }

    #[test]
    fn test_attach_detach_args() {
        let bus_id = BusId::from("3-2");
        assert_eq!(
            UsbipdCommand::Attach {
                bus_id: bus_id.clone()
            }
            .args(None),
            ["wsl", "attach", "--busid", "3-2"]
        );
        assert_eq!(
            UsbipdCommand::Detach { bus_id }.args(Some("Ubuntu")),
            ["wsl", "detach", "--busid", "3-2", "--distribution", "Ubuntu"]
        );
    }

    #[test]
    fn test_detach_all_args() {
        assert_eq!(
            UsbipdCommand::DetachAll.args(None),
            ["wsl", "detach", "--all"]
        );
    }

    #[test]
    fn test_empty_distribution_is_unset() {
        assert_eq!(UsbipdCommand::DetachAll.args(Some("")), ["wsl", "detach", "--all"]);
    }

    #[test]
    fn test_display() {
        assert_eq!(UsbipdCommand::List.to_string(), "usbipd wsl list");
    }
}
