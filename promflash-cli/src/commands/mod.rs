//! Command implementations.
//!
//! Each subcommand is implemented in its own module for clean separation.

pub(crate) mod checksum;
pub(crate) mod completions;
pub(crate) mod flash;
pub(crate) mod list_ports;

/// Marker error for usage/setup failures that should exit with code 2
/// instead of the generic runtime code 1 (important for scripted callers).
#[derive(Debug)]
pub(crate) struct UsageError(pub String);

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UsageError {}
