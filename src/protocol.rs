//! Shared wire constants and fixed-width field codecs for the skiff protocol
//!
//! Every control field on the wire has a fixed width: the sender always
//! writes the full field and the receiver always reads the full field,
//! decimal ASCII digits at the front, NUL padding behind them. Anything
//! else desynchronizes the stream.

use anyhow::{bail, Context, Result};

// Transfer chunk size for both directions
pub const BLOCK_SIZE: usize = 4096;

// Fixed field widths on the wire (bytes)
pub const SIZE_FIELD: usize = 1024;
pub const STATUS_FIELD: usize = 255;

// One command per receive call; longer input is truncated
pub const MAX_COMMAND_LENGTH: usize = 1024;

/// Status codes exchanged after each command.
pub mod status {
    /// Request accepted, payload (if any) follows
    pub const OK: u16 = 200;
    /// File exists but could not be read
    pub const READ_FAILED: u16 = 400;
    /// Missing, unreadable directory, or outside the served root
    pub const NOT_FOUND: u16 = 404;
}

/// Encode a status code as decimal ASCII into the full fixed-width field.
pub fn encode_status(code: u16) -> [u8; STATUS_FIELD] {
    let mut field = [0u8; STATUS_FIELD];
    let digits = code.to_string();
    field[..digits.len()].copy_from_slice(digits.as_bytes());
    field
}

/// Parse a status field, ignoring trailing NUL padding.
pub fn parse_status(field: &[u8]) -> Result<u16> {
    let digits = field_digits(field)?;
    digits
        .parse::<u16>()
        .with_context(|| format!("bad status field: {:?}", digits))
}

/// Encode a payload length as decimal ASCII into the full fixed-width field.
pub fn encode_size(len: u64) -> [u8; SIZE_FIELD] {
    let mut field = [0u8; SIZE_FIELD];
    let digits = len.to_string();
    field[..digits.len()].copy_from_slice(digits.as_bytes());
    field
}

/// Parse a size field back into the declared payload length.
pub fn parse_size(field: &[u8]) -> Result<u64> {
    let digits = field_digits(field)?;
    digits
        .parse::<u64>()
        .with_context(|| format!("bad size field: {:?}", digits))
}

// Digits run from the start of the field to the first NUL.
fn field_digits(field: &[u8]) -> Result<&str> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    if end == 0 {
        bail!("empty field");
    }
    std::str::from_utf8(&field[..end]).context("field is not ASCII")
}
