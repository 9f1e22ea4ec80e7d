use anyhow::Result;
use chrono::Utc;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use uuid::Uuid;

pub trait Logger: Send + Sync {
    fn connected(&self, _session: &Uuid, _peer: SocketAddr) {}
    fn command(&self, _session: &Uuid, _line: &str) {}
    fn sent(&self, _session: &Uuid, _path: &Path, _bytes: u64) {}
    fn refused(&self, _session: &Uuid, _requested: &str, _code: u16) {}
    fn disconnected(&self, _session: &Uuid) {}
    fn error(&self, _context: &str, _msg: &str) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        let mut f = self.file.lock();
        let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
    }
}

impl Logger for TextLogger {
    fn connected(&self, session: &Uuid, peer: SocketAddr) {
        self.line(&format!("CONNECT session={} peer={}", session, peer));
    }
    fn command(&self, session: &Uuid, line: &str) {
        self.line(&format!("COMMAND session={} line={:?}", session, line));
    }
    fn sent(&self, session: &Uuid, path: &Path, bytes: u64) {
        self.line(&format!(
            "SENT session={} path={} bytes={}",
            session,
            path.display(),
            bytes
        ));
    }
    fn refused(&self, session: &Uuid, requested: &str, code: u16) {
        self.line(&format!(
            "REFUSED session={} requested={:?} code={}",
            session, requested, code
        ));
    }
    fn disconnected(&self, session: &Uuid) {
        self.line(&format!("DISCONNECT session={}", session));
    }
    fn error(&self, context: &str, msg: &str) {
        self.line(&format!("ERROR ctx={} msg={}", context, msg));
    }
}
