//! Error types for promflash.

use std::io;
use thiserror::Error;

/// Result type for promflash operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for promflash operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// No serial device could be found or opened.
    #[error("No serial device found")]
    DeviceNotFound,

    /// The programmer never acknowledged the handshake, or answered
    /// with something other than the expected acknowledgement byte.
    #[error("Programmer doesn't respond")]
    ProgrammerNotResponding,

    /// The byte count confirmed by the programmer, or observed during
    /// verification, differs from the image length.
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Image length in bytes.
        expected: usize,
        /// Count the programmer reported or the verify phase observed.
        actual: usize,
    },

    /// The erase phase completed with an unexpected status code.
    #[error("Programmer can't erase chip (status 0x{code:02X})")]
    EraseFailed {
        /// The status byte received instead of the erase-complete code.
        code: u8,
    },

    /// The run was cancelled by the embedding application (e.g. Ctrl-C).
    #[error("Interrupted")]
    Interrupted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mismatch_message_carries_counts() {
        let err = Error::SizeMismatch {
            expected: 4096,
            actual: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("4096"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_erase_failed_message_is_hex() {
        let err = Error::EraseFailed { code: 0xEE };
        assert!(err.to_string().contains("0xEE"));
    }
}
