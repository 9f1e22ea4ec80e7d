//! Length-prefixed payload transfer engine
//!
//! A payload crosses the wire as one fixed-width size field followed by
//! the raw bytes. Small payloads go in a single push; anything at or
//! above one block is moved with a partial-I/O tolerant chunk loop. The
//! buffer is sized before the loop starts and never resized mid-loop.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::net::Connection;
use crate::protocol::{self, BLOCK_SIZE, SIZE_FIELD};

/// Read a whole file into a transfer buffer, leaving one block of
/// capacity slack so the send path never reallocates.
pub fn read_file_to_buffer(path: &Path) -> Result<Vec<u8>> {
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    let size = usize::try_from(meta.len()).context("file too large for memory")?;
    let mut buf = Vec::with_capacity(size + BLOCK_SIZE);
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut buf))
        .with_context(|| format!("read {}", path.display()))?;
    Ok(buf)
}

/// Send the buffer's contents as one size-prefixed payload. A send
/// failure aborts the transfer; there are no retries.
pub fn send_payload(conn: &mut Connection, buf: &mut Vec<u8>) -> Result<()> {
    let size = buf.len();
    // Capacity margin is settled here, before any I/O
    buf.reserve(BLOCK_SIZE);

    conn.send_all(&protocol::encode_size(size as u64))?;

    if size < BLOCK_SIZE {
        conn.send_all(buf)?;
        return Ok(());
    }

    let mut sent = 0usize;
    while sent < size {
        let chunk = BLOCK_SIZE.min(size - sent);
        let n = conn.send(&buf[sent..sent + chunk])?;
        if n == 0 {
            bail!("peer closed connection mid-send");
        }
        sent += n;
    }
    Ok(())
}

/// Receive one size-prefixed payload into a fresh buffer.
pub fn receive_payload(conn: &mut Connection) -> Result<Vec<u8>> {
    receive_payload_with(conn, |_, _| {})
}

/// Receive one size-prefixed payload, reporting (received, declared)
/// after every chunk. The declared size is checked against the overflow
/// guard before anything is allocated.
pub fn receive_payload_with(
    conn: &mut Connection,
    mut progress: impl FnMut(u64, u64),
) -> Result<Vec<u8>> {
    let mut field = [0u8; SIZE_FIELD];
    conn.receive_exact(&mut field)?;
    let declared = protocol::parse_size(&field)?;

    if declared < BLOCK_SIZE as u64 {
        let mut buf = vec![0u8; declared as usize];
        conn.receive_exact(&mut buf)?;
        progress(declared, declared);
        return Ok(buf);
    }

    // Reject sizes that would wrap when the slack block is added
    if declared >= u64::MAX - BLOCK_SIZE as u64 {
        bail!("declared payload size {} is out of range", declared);
    }
    let size = usize::try_from(declared).context("payload too large for memory")?;

    // One block of slack absorbs the block-sized read window near the end
    let mut buf = vec![0u8; size + BLOCK_SIZE];
    let mut received = 0usize;
    while received < size {
        let n = conn.receive(&mut buf[received..received + BLOCK_SIZE])?;
        if n == 0 {
            bail!("peer closed connection mid-receive");
        }
        // Completion is judged on the accumulated count, never on the
        // shape of the latest chunk
        received += n;
        progress(received as u64, declared);
    }
    buf.truncate(size);
    Ok(buf)
}
