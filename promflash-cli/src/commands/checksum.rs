//! Checksum command implementation.

use anyhow::{Context, Result};
use std::path::Path;

/// Print the byte size and 32-bit additive checksum of a file, in the same
/// form the programmer firmware reports after a verify pass.
pub(crate) fn cmd_checksum(path: &Path) -> Result<()> {
    let data = std::fs::read(path)
        .with_context(|| format!("can't read file '{}'", path.display()))?;

    println!(
        "{}: {} bytes, checksum {}",
        path.display(),
        data.len(),
        promflash::checksum(&data)
    );
    Ok(())
}
