//! Wire protocol definitions and the transfer engine.

pub mod transfer;

/// Single-byte control codes exchanged with the programmer firmware.
/// Everything else on the wire is raw payload.
pub mod control {
    /// Host → device: handshake request.
    pub const HANDSHAKE_REQ: u8 = b'a';
    /// Device → host: handshake acknowledgement.
    pub const HANDSHAKE_ACK: u8 = b'A';
    /// Host → device: terminator after the decimal image size.
    pub const SIZE_TERM: u8 = b'b';
    /// Device → host: terminator after the echoed decimal size.
    pub const SIZE_CONFIRM: u8 = b'B';
    /// Device → host: erase complete.
    pub const ERASE_DONE: u8 = b'C';
}

/// Bytes sent per write chunk. Matches the receive buffer of the
/// programmer firmware; it acknowledges each chunk with one byte.
pub const CHUNK_SIZE: usize = 32;

// Re-export common types
pub use transfer::{Event, Phase, ProgrammerSession, TransferConfig, TransferReport};
