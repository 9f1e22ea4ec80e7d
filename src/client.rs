//! Client-side operations: fetch a remote file, list a remote directory
//!
//! One command per connection round trip. Every operation sends QUIT
//! before hanging up so the daemon sees a clean end of session.

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use crate::net::{self, Connection};
use crate::protocol::status;
use crate::transfer;

/// Fetch a remote file into `output`. Returns the number of bytes
/// written to disk.
pub fn fetch(host: &str, port: u16, remote_path: &str, output: &Path, quiet: bool) -> Result<u64> {
    let mut conn = net::connect(host, port)?;
    conn.send_command(&format!("SEND {}", remote_path))?;

    let code = conn.receive_status()?;
    if code != status::OK {
        quit(&mut conn);
        bail!("server refused {}: status {}", remote_path, code);
    }

    let data = if quiet {
        transfer::receive_payload(&mut conn)?
    } else {
        let pb = transfer_bar();
        let data = transfer::receive_payload_with(&mut conn, |received, declared| {
            pb.set_length(declared);
            pb.set_position(received);
        })?;
        pb.finish_and_clear();
        data
    };
    quit(&mut conn);

    std::fs::write(output, &data)?;
    Ok(data.len() as u64)
}

/// List a remote directory; returns the formatted listing text.
pub fn list(host: &str, port: u16, remote_path: Option<&str>) -> Result<String> {
    let mut conn = net::connect(host, port)?;
    let command = match remote_path {
        Some(p) => format!("LIST {}", p),
        None => "LIST".to_string(),
    };
    conn.send_command(&command)?;

    let code = conn.receive_status()?;
    if code != status::OK {
        quit(&mut conn);
        bail!("server refused listing: status {}", code);
    }
    let blob = transfer::receive_payload(&mut conn)?;
    quit(&mut conn);
    Ok(String::from_utf8_lossy(&blob).into_owned())
}

// Best effort; the server also handles an abrupt close
fn quit(conn: &mut Connection) {
    let _ = conn.send_command("QUIT");
}

fn transfer_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bytes}/{total_bytes} [{bar:40}] {bytes_per_sec}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}
