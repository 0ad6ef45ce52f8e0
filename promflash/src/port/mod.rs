//! Port abstraction for the serial link to the programmer board.
//!
//! The transfer engine is written against the [`Port`] trait so that the
//! protocol layer stays I/O-agnostic: the native implementation talks to a
//! real serial device, while tests drive the engine with a scripted
//! in-memory peer.
//!
//! ```text
//! +----------------------+
//! |   Transfer engine    |
//! | (protocol::transfer) |
//! +----------+-----------+
//!            |
//!            v
//! +----------+-----------+
//! |      Port trait      |
//! +----------+-----------+
//!            |
//!      +-----+------+
//!      v            v
//! NativePort   test double
//! (serialport)
//! ```
//!
//! The programmer link is half-duplex and byte-oriented; the only contract
//! the engine relies on is that `receive` never blocks indefinitely, so
//! every waiting loop stays responsive to cancellation.

#[cfg(feature = "native")]
pub mod native;

use std::time::Duration;

use crate::error::Result;

/// Fixed link bit rate expected by the programmer firmware.
pub const BAUD_RATE: u32 = 115_200;

/// Serial link configuration.
///
/// The wire format is fixed at 8 data bits, no parity, one stop bit and no
/// flow control; only the device path and the internal poll timeout vary.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port name/path (e.g., "/dev/ttyUSB0", "COM3").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Upper bound a single `receive` call may wait before reporting that
    /// nothing arrived. Small by design: the engine owns all real timeouts.
    pub poll_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: BAUD_RATE,
            poll_timeout: Duration::from_millis(10),
        }
    }
}

impl SerialConfig {
    /// Create a configuration for the given device path.
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Default::default()
        }
    }
}

/// Byte-oriented transport to the programmer.
///
/// Implementations hold no protocol knowledge; all side effects are
/// confined to the physical link.
pub trait Port: Send {
    /// Write bytes to the link, returning how many were accepted.
    /// Never blocks indefinitely; callers loop to push a full buffer.
    fn send(&mut self, data: &[u8]) -> Result<usize>;

    /// Read up to `buf.len()` bytes. Returns `Ok(0)` promptly when nothing
    /// is buffered instead of blocking on the underlying device.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Drain and discard everything currently buffered on the link.
    /// Called once right after opening to remove stale noise.
    fn discard_pending(&mut self) -> Result<()> {
        let mut scratch = [0u8; 16];
        while self.receive(&mut scratch)? > 0 {}
        Ok(())
    }

    /// The device name/path this port is bound to.
    fn name(&self) -> &str;

    /// Release the underlying resource. Idempotent.
    fn close(&mut self) -> Result<()>;
}

// Re-export the native implementation
#[cfg(feature = "native")]
pub use native::NativePort;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_default() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, BAUD_RATE);
        assert_eq!(config.poll_timeout, Duration::from_millis(10));
    }

    #[test]
    fn test_serial_config_new_keeps_fixed_rate() {
        let config = SerialConfig::new("/dev/ttyACM0");
        assert_eq!(config.port_name, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 115_200);
    }
}
