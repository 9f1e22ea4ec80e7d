use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Completed,
    Refused,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TransferLogEntry {
    pub timestamp: String,
    pub session_id: String,
    pub peer: String,
    pub requested: String,
    pub status: TransferStatus,
    pub bytes_sent: u64,
    pub status_code: u16,
}

/// Append-only JSONL record of every SEND the daemon answered.
pub struct TransferLog {
    log_file_path: PathBuf,
}

impl TransferLog {
    pub fn new(root: &Path) -> Self {
        let log_file_path = root.join(".skiff_transfers.jsonl");
        TransferLog { log_file_path }
    }

    pub fn record(
        &self,
        session: &Uuid,
        peer: SocketAddr,
        requested: &str,
        status: TransferStatus,
        bytes_sent: u64,
        status_code: u16,
    ) -> Result<()> {
        let entry = TransferLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            session_id: session.to_string(),
            peer: peer.to_string(),
            requested: requested.to_string(),
            status,
            bytes_sent,
            status_code,
        };
        self.add_entry(entry)
    }

    pub fn add_entry(&self, entry: TransferLogEntry) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .context("Failed to open transfer log file")?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &entry)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_log(&self) -> Result<Vec<TransferLogEntry>> {
        if !self.log_file_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.log_file_path)
            .context("Failed to open transfer log file for reading")?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: TransferLogEntry = serde_json::from_str(&line)?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_read_back() {
        let tmp = tempfile::tempdir().unwrap();
        let log = TransferLog::new(tmp.path());
        let session = Uuid::new_v4();
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        log.record(&session, peer, "a.txt", TransferStatus::Completed, 5, 200)
            .unwrap();
        log.record(&session, peer, "../etc/passwd", TransferStatus::Refused, 0, 404)
            .unwrap();

        let entries = log.read_log().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, TransferStatus::Completed);
        assert_eq!(entries[0].bytes_sent, 5);
        assert_eq!(entries[1].status_code, 404);
    }
}
