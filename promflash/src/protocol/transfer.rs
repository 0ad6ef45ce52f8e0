//! Transfer protocol engine.
//!
//! Drives one complete programming run against a [`Port`]:
//!
//! ```text
//! Handshake -> SizeNegotiation -> EraseWait -> WriteLoop -> VerifyLoop -> Done
//! ```
//!
//! The protocol is retry-free and strictly sequential; any deviation from
//! the expected next byte aborts the run. The read-back stream during
//! verification has no end-of-stream marker — completion is inferred from
//! silence lasting longer than the configurable inactivity threshold.
//!
//! Wire exchange for an image of N bytes:
//!
//! ```text
//! host:   'a' (repeated)        N as decimal + 'b'     32-byte chunks
//! device:            'A'    echoed decimal + 'B'  'C'  1-byte ack each   N raw bytes
//! ```
//!
//! All waiting is active polling with monotonic-clock deadlines, never an
//! unbounded blocking read, so a Ctrl-C handler registered through
//! [`crate::set_interrupt_checker`] can stop the run even inside the
//! open-ended erase wait.

use crate::error::{Error, Result};
use crate::image::Image;
use crate::port::Port;
use crate::protocol::{CHUNK_SIZE, control};
use log::{debug, trace};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between handshake request retransmissions.
const HANDSHAKE_RETRY: Duration = Duration::from_millis(100);

/// Overall handshake deadline; silence past this means no programmer.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default verify inactivity threshold. The read-back stream is declared
/// finished after this much silence. Tunable: anything in the 500–1000 ms
/// range works with stock programmer firmware.
const VERIFY_IDLE_TIMEOUT: Duration = Duration::from_millis(500);

/// Delay after opening the port before talking. USB-serial adapters reset
/// Arduino-class boards on open; the bootloader needs a moment to pass
/// control to the programmer firmware.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Sleep between empty polls so waiting loops don't spin hot.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Protocol phases, in strict forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Probing for the programmer with handshake requests.
    Handshake,
    /// Announcing the image size and checking the echoed confirmation.
    SizeNegotiation,
    /// Waiting for the chip erase to finish (no deadline, hardware-paced).
    EraseWait,
    /// Streaming the image in acknowledged chunks.
    Write,
    /// Comparing the read-back stream against the image.
    Verify,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Handshake => "handshake",
            Self::SizeNegotiation => "size negotiation",
            Self::EraseWait => "erase",
            Self::Write => "write",
            Self::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Progress events emitted while a run advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A new phase has begun.
    PhaseStarted(Phase),
    /// Write progress in integer percent; emitted only when the value changes.
    WriteProgress(u8),
    /// Verify progress in integer percent; emitted only when the value changes.
    VerifyProgress(u8),
}

/// Engine timing configuration.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Delay after opening the port before the handshake starts.
    pub settle_delay: Duration,
    /// Interval between handshake request retransmissions.
    pub handshake_retry: Duration,
    /// Overall handshake deadline.
    pub handshake_timeout: Duration,
    /// Silence duration that ends the verify read-back stream.
    pub verify_idle_timeout: Duration,
    /// Sleep between empty polls.
    pub poll_interval: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            handshake_retry: HANDSHAKE_RETRY,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            verify_idle_timeout: VERIFY_IDLE_TIMEOUT,
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// Outcome of a completed run (one that reached the Done state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Bytes observed during verification; always equals the image length
    /// for a completed run.
    pub bytes_verified: usize,
    /// Bytes that differed from the image during read-back. Zero means
    /// full success; nonzero is a completed run that failed verification.
    pub mismatches: usize,
    /// 32-bit additive checksum of the read-back stream, for comparison
    /// against the image checksum.
    pub read_checksum: u32,
}

impl TransferReport {
    /// Whether the chip content matches the image byte for byte.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.mismatches == 0
    }
}

/// One programming session against a programmer board.
///
/// Owns the transport for the duration of the run. Generic over the port
/// type so the engine runs unchanged against real hardware or a simulated
/// peer in tests.
pub struct ProgrammerSession<P: Port> {
    port: P,
    config: TransferConfig,
    written: usize,
    verified: usize,
    interrupt: Box<dyn Fn() -> bool + Send>,
}

impl<P: Port> ProgrammerSession<P> {
    /// Create a session with default timing on an opened port.
    pub fn new(port: P) -> Self {
        Self::with_config(port, TransferConfig::default())
    }

    /// Create a session with custom timing.
    pub fn with_config(port: P, config: TransferConfig) -> Self {
        Self {
            port,
            config,
            written: 0,
            verified: 0,
            interrupt: Box::new(crate::is_interrupt_requested),
        }
    }

    /// Replace the cancellation probe polled by all waiting loops.
    ///
    /// Defaults to the process-wide checker registered via
    /// [`crate::set_interrupt_checker`].
    #[must_use]
    pub fn with_interrupt_check<F>(mut self, check: F) -> Self
    where
        F: Fn() -> bool + Send + 'static,
    {
        self.interrupt = Box::new(check);
        self
    }

    /// Get a reference to the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Consume the session and return the underlying port.
    pub fn into_port(self) -> P {
        self.port
    }

    /// Release the transport.
    pub fn close(&mut self) -> Result<()> {
        self.port.close()
    }

    /// Run one complete transfer: handshake, size negotiation, erase,
    /// chunked write, verification.
    ///
    /// On any fatal protocol error the transport is closed before the
    /// error is returned. A nonzero mismatch count in the report is not an
    /// error: the run completed, the chip content just doesn't match.
    pub fn run<F>(&mut self, image: &Image, mut progress: F) -> Result<TransferReport>
    where
        F: FnMut(Event),
    {
        let result = self.run_phases(image.as_bytes(), &mut progress);
        if result.is_err() {
            let _ = self.port.close();
        }
        result
    }

    fn run_phases(&mut self, data: &[u8], progress: &mut dyn FnMut(Event)) -> Result<TransferReport> {
        self.written = 0;
        self.verified = 0;

        self.settle()?;
        self.port.discard_pending()?;

        progress(Event::PhaseStarted(Phase::Handshake));
        self.handshake()?;

        progress(Event::PhaseStarted(Phase::SizeNegotiation));
        self.negotiate_size(data.len())?;

        progress(Event::PhaseStarted(Phase::EraseWait));
        self.wait_for_erase()?;

        progress(Event::PhaseStarted(Phase::Write));
        self.write_chunks(data, progress)?;

        progress(Event::PhaseStarted(Phase::Verify));
        let (mismatches, read_checksum) = self.verify(data, progress)?;

        debug!(
            "run complete: {} bytes verified, {} mismatches",
            self.verified, mismatches
        );
        Ok(TransferReport {
            bytes_verified: self.verified,
            mismatches,
            read_checksum,
        })
    }

    fn check_interrupted(&self) -> Result<()> {
        if (self.interrupt)() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Wait out the post-open settle delay, still interruptible.
    fn settle(&self) -> Result<()> {
        let deadline = Instant::now() + self.config.settle_delay;
        while Instant::now() < deadline {
            self.check_interrupted()?;
            thread::sleep(Duration::from_millis(50).min(self.config.settle_delay));
        }
        Ok(())
    }

    /// Push a full buffer through the port, which may accept it piecewise.
    fn send_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            self.check_interrupted()?;
            let n = self.port.send(data)?;
            data = &data[n..];
            if n == 0 {
                thread::sleep(self.config.poll_interval);
            }
        }
        Ok(())
    }

    /// Block until one byte arrives. No deadline; polls the interrupt
    /// checker so cancellation still gets through.
    fn wait_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        loop {
            self.check_interrupted()?;
            if self.port.receive(&mut buf)? == 1 {
                return Ok(buf[0]);
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    /// Probe for the programmer: retransmit the request byte on a fixed
    /// interval until a reply arrives or the overall deadline passes.
    /// The first byte received decides: anything but the acknowledgement
    /// value is fatal.
    fn handshake(&mut self) -> Result<()> {
        let start = Instant::now();
        let mut last_sent: Option<Instant> = None;
        let mut buf = [0u8; 1];

        loop {
            self.check_interrupted()?;

            if last_sent.is_none_or(|t| t.elapsed() >= self.config.handshake_retry) {
                self.send_all(&[control::HANDSHAKE_REQ])?;
                last_sent = Some(Instant::now());
            }

            if self.port.receive(&mut buf)? == 1 {
                if buf[0] == control::HANDSHAKE_ACK {
                    debug!("programmer acknowledged handshake");
                    return Ok(());
                }
                debug!("handshake answered with 0x{:02X}", buf[0]);
                return Err(Error::ProgrammerNotResponding);
            }

            if start.elapsed() >= self.config.handshake_timeout {
                return Err(Error::ProgrammerNotResponding);
            }

            thread::sleep(self.config.poll_interval);
        }
    }

    /// Announce the image size as decimal ASCII and require the programmer
    /// to echo the same number back.
    fn negotiate_size(&mut self, len: usize) -> Result<()> {
        self.send_all(len.to_string().as_bytes())?;
        self.send_all(&[control::SIZE_TERM])?;

        let mut echoed: usize = 0;
        loop {
            let b = self.wait_byte()?;
            match b {
                control::SIZE_CONFIRM => break,
                b'0'..=b'9' => echoed = echoed * 10 + usize::from(b - b'0'),
                other => trace!("ignoring stray byte 0x{other:02X} in size echo"),
            }
        }

        if echoed != len {
            return Err(Error::SizeMismatch {
                expected: len,
                actual: echoed,
            });
        }
        debug!("programmer confirmed size {len}");
        Ok(())
    }

    /// Wait for the erase-complete code. Erase duration depends on the
    /// chip, so there is deliberately no deadline here; the interrupt
    /// checker is the only way out.
    fn wait_for_erase(&mut self) -> Result<()> {
        let b = self.wait_byte()?;
        if b != control::ERASE_DONE {
            return Err(Error::EraseFailed { code: b });
        }
        debug!("chip erased");
        Ok(())
    }

    /// Stream the image in chunks of at most [`CHUNK_SIZE`] bytes, each
    /// acknowledged by a single byte of any value.
    #[allow(clippy::cast_possible_truncation)] // percent is always <= 100
    fn write_chunks(&mut self, data: &[u8], progress: &mut dyn FnMut(Event)) -> Result<()> {
        let total = data.len();
        let mut last_percent = None;

        while self.written < total {
            let end = (self.written + CHUNK_SIZE).min(total);
            self.send_all(&data[self.written..end])?;
            self.written = end;

            // One byte of any value acknowledges the chunk.
            let _ack = self.wait_byte()?;

            let percent = (self.written * 100 / total) as u8;
            if last_percent != Some(percent) {
                progress(Event::WriteProgress(percent));
                last_percent = Some(percent);
            }
        }
        Ok(())
    }

    /// Consume the read-back stream one byte at a time, comparing against
    /// the image. The stream ends at the image length or after
    /// `verify_idle_timeout` of silence — stopping short is fatal.
    #[allow(clippy::cast_possible_truncation)] // percent is always <= 100
    fn verify(
        &mut self,
        data: &[u8],
        progress: &mut dyn FnMut(Event),
    ) -> Result<(usize, u32)> {
        let total = data.len();
        let mut mismatches = 0usize;
        let mut checksum = 0u32;
        let mut last_percent = None;
        let mut last_rx = Instant::now();
        let mut buf = [0u8; 1];

        while self.verified < total {
            self.check_interrupted()?;

            if self.port.receive(&mut buf)? == 1 {
                if buf[0] != data[self.verified] {
                    trace!(
                        "mismatch at {}: wrote 0x{:02X}, read 0x{:02X}",
                        self.verified, data[self.verified], buf[0]
                    );
                    mismatches += 1;
                }
                checksum = checksum.wrapping_add(u32::from(buf[0]));
                self.verified += 1;
                last_rx = Instant::now();

                let percent = (self.verified * 100 / total) as u8;
                if last_percent != Some(percent) {
                    progress(Event::VerifyProgress(percent));
                    last_percent = Some(percent);
                }
                continue;
            }

            if last_rx.elapsed() >= self.config.verify_idle_timeout {
                break;
            }
            thread::sleep(self.config.poll_interval);
        }

        if self.verified != total {
            return Err(Error::SizeMismatch {
                expected: total,
                actual: self.verified,
            });
        }
        Ok((mismatches, checksum))
    }
}
