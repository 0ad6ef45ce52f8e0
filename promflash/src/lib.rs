//! # promflash
//!
//! A library for programming parallel FLASH/EEPROM chips (SST39SF0x0A,
//! AT28C64B and friends) through a microcontroller-based programmer board
//! attached over a serial link.
//!
//! This crate provides:
//!
//! - The transfer protocol engine: handshake, size negotiation, erase
//!   confirmation, chunked write with per-chunk acknowledgement, and
//!   byte-for-byte read-back verification delimited by line silence
//! - A byte-oriented [`Port`] transport abstraction with a native
//!   `serialport`-backed implementation
//! - Serial device discovery with USB bridge classification
//! - Image loading and the 32-bit additive checksum the programmer
//!   firmware reports
//!
//! ## Features
//!
//! - `native` (default): real serial port support via the `serialport`
//!   crate; without it the crate is protocol-only (useful for tests and
//!   embedding)
//!
//! ## Example
//!
//! ```rust,no_run
//! use promflash::{Image, NativePort, ProgrammerSession, SerialConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let image = Image::from_file("rom.bin")?;
//!
//!     let port = NativePort::open(&SerialConfig::new("/dev/ttyUSB0"))?;
//!     let mut session = ProgrammerSession::new(port);
//!
//!     let report = session.run(&image, |event| {
//!         println!("{event:?}");
//!     })?;
//!     println!("{} mismatches", report.mismatches);
//!
//!     session.close()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod device;
pub mod error;
pub mod image;
pub mod port;
pub mod protocol;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker used by long-running library loops.
///
/// The checker should return `true` when the current operation should stop
/// (for example after receiving Ctrl-C in CLI applications). The erase wait
/// has no protocol-level timeout, so this is the only way to abandon it.
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupt_requested() -> bool {
    INTERRUPT_CHECKER.get().is_some_and(|checker| checker())
}

// Re-exports for convenience
#[cfg(feature = "native")]
pub use port::NativePort;
pub use {
    device::{DetectedPort, DeviceKind, format_port_list},
    error::{Error, Result},
    image::{Image, checksum},
    port::{BAUD_RATE, Port, SerialConfig},
    protocol::{
        CHUNK_SIZE, Event, Phase, ProgrammerSession, TransferConfig, TransferReport, control,
    },
};
#[cfg(feature = "native")]
pub use device::{auto_detect_port, detect_ports, find_port_by_pattern};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_interrupt_checker_registration_and_toggle() {
        // Single test so the process-wide flag is never left set while
        // other tests run.
        let flag = Arc::new(AtomicBool::new(false));
        let shared = Arc::clone(&flag);
        set_interrupt_checker(move || shared.load(Ordering::Relaxed));

        assert!(!is_interrupt_requested());
        flag.store(true, Ordering::Relaxed);
        assert!(is_interrupt_requested());
        flag.store(false, Ordering::Relaxed);
        assert!(!is_interrupt_requested());
    }
}
