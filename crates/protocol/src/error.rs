//! Listing error types

use thiserror::Error;

/// Errors raised while interpreting `usbipd wsl list` output
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    /// A device row had no text after its hardware id, so no name can be taken
    #[error("Device row has no name after hardware id '{hw_id}': {line:?}")]
    MissingName { hw_id: String, line: String },
}

/// Type alias for listing results
pub type Result<T> = std::result::Result<T, ListingError>;
