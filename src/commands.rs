//! Command parsing, the static dispatch table, and the command handlers
//!
//! A command line is split on single spaces into owned tokens; the first
//! token is the verb and handlers see it again as argv[0], so the first
//! real argument is always at index 1. Verb lookup is a case-sensitive
//! exact match against a fixed table; anything else is reported as
//! unmatched and the peer gets no reply.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::log::{TransferLog, TransferStatus};
use crate::logger::Logger;
use crate::net::Connection;
use crate::protocol::status;
use crate::transfer;

/// Per-connection state. Liveness is an explicit field here, not a
/// process-wide flag; QUIT clears it and the session loop stops.
pub struct Session {
    pub conn: Connection,
    pub root: PathBuf,
    pub connected: bool,
    pub id: Uuid,
    pub logger: Arc<dyn Logger + Send + Sync>,
    pub translog: Option<TransferLog>,
}

impl Session {
    pub fn new(
        conn: Connection,
        root: PathBuf,
        logger: Arc<dyn Logger + Send + Sync>,
        translog: Option<TransferLog>,
    ) -> Self {
        Session {
            conn,
            root,
            connected: true,
            id: Uuid::new_v4(),
            logger,
            translog,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    Handled,
    Unmatched,
}

type Handler = fn(&mut Session, &[String]) -> Result<()>;

// Closed verb set; extend here and nowhere else
const COMMANDS: &[(&str, Handler)] = &[
    ("SEND", send_file),
    ("LIST", list_dir),
    ("QUIT", client_quit),
];

/// Split a command line on a delimiter into owned tokens, dropping
/// empty runs between consecutive delimiters.
pub fn split_args(line: &str, delim: char) -> Vec<String> {
    line.split(delim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Look up the verb and run its handler. `Unmatched` sends nothing; the
/// caller decides whether the peer hears about it.
pub fn dispatch(session: &mut Session, line: &str) -> Result<DispatchResult> {
    let args = split_args(line, ' ');
    let verb = match args.first() {
        Some(v) => v,
        None => return Ok(DispatchResult::Unmatched),
    };
    for (name, handler) in COMMANDS {
        if verb == name {
            handler(session, &args)?;
            return Ok(DispatchResult::Handled);
        }
    }
    Ok(DispatchResult::Unmatched)
}

/// Resolve a requested path against the served root and verify the
/// fully resolved form stays inside it. Runs on every request; the raw
/// string is never used for access.
pub fn resolve_under_root(root: &Path, requested: &str) -> Result<PathBuf> {
    if requested.contains('\0') {
        bail!("path contains NUL byte");
    }
    let joined = root.join(requested);
    let resolved = joined
        .canonicalize()
        .with_context(|| format!("resolve {}", requested))?;
    if !resolved.starts_with(root) {
        bail!("path {:?} escapes the served root", requested);
    }
    Ok(resolved)
}

fn send_file(session: &mut Session, argv: &[String]) -> Result<()> {
    let requested = match argv.get(1) {
        Some(p) => p.as_str(),
        None => {
            // No path argument; nothing sensible to look up
            session.conn.send_status(status::NOT_FOUND)?;
            return Ok(());
        }
    };

    let path = match resolve_under_root(&session.root, requested) {
        Ok(p) => p,
        Err(_) => {
            session.logger.refused(&session.id, requested, status::NOT_FOUND);
            record_transfer(session, requested, TransferStatus::Refused, 0, status::NOT_FOUND);
            session.conn.send_status(status::NOT_FOUND)?;
            return Ok(());
        }
    };

    let mut buf = match transfer::read_file_to_buffer(&path) {
        Ok(b) => b,
        Err(_) => {
            session.logger.refused(&session.id, requested, status::READ_FAILED);
            record_transfer(session, requested, TransferStatus::Refused, 0, status::READ_FAILED);
            session.conn.send_status(status::READ_FAILED)?;
            return Ok(());
        }
    };

    session.conn.send_status(status::OK)?;
    let bytes = buf.len() as u64;
    transfer::send_payload(&mut session.conn, &mut buf)?;

    session.logger.sent(&session.id, &path, bytes);
    record_transfer(session, requested, TransferStatus::Completed, bytes, status::OK);
    Ok(())
}

fn list_dir(session: &mut Session, argv: &[String]) -> Result<()> {
    let target = match argv.get(1) {
        Some(p) => match resolve_under_root(&session.root, p) {
            Ok(t) => t,
            Err(_) => {
                session.conn.send_status(status::NOT_FOUND)?;
                return Ok(());
            }
        },
        None => session.root.clone(),
    };

    if !target.is_dir() {
        session.conn.send_status(status::NOT_FOUND)?;
        return Ok(());
    }
    let listing = match format_listing(&target) {
        Ok(s) => s,
        Err(_) => {
            session.conn.send_status(status::NOT_FOUND)?;
            return Ok(());
        }
    };

    session.conn.send_status(status::OK)?;
    let mut buf = listing.into_bytes();
    transfer::send_payload(&mut session.conn, &mut buf)
}

fn client_quit(session: &mut Session, _argv: &[String]) -> Result<()> {
    // No framed reply; the session loop sees the flag and closes
    session.connected = false;
    Ok(())
}

// One line per entry: `<permission-string> <size> <name>`
fn format_listing(dir: &Path) -> Result<String> {
    let mut out = String::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let meta = entry.metadata()?;
        out.push_str(&format!(
            "{} {} {}\n",
            permission_string(&meta),
            meta.len(),
            entry.file_name().to_string_lossy()
        ));
    }
    Ok(out)
}

#[cfg(unix)]
fn permission_string(meta: &std::fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    let mode = meta.permissions().mode();
    let mut s = String::with_capacity(10);
    s.push(if meta.is_dir() { 'd' } else { '-' });
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

#[cfg(not(unix))]
fn permission_string(meta: &std::fs::Metadata) -> String {
    let d = if meta.is_dir() { 'd' } else { '-' };
    let w = if meta.permissions().readonly() { '-' } else { 'w' };
    format!("{}r{}-r--r--", d, w)
}

fn record_transfer(
    session: &Session,
    requested: &str,
    status: TransferStatus,
    bytes: u64,
    code: u16,
) {
    if let Some(ref log) = session.translog {
        let _ = log.record(&session.id, session.conn.peer(), requested, status, bytes, code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NoopLogger;
    use std::net::{TcpListener, TcpStream};

    fn socket_pair() -> (Connection, Connection) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (
            Connection::new(server).unwrap(),
            Connection::new(client).unwrap(),
        )
    }

    fn session_with_root(root: &Path) -> (Session, Connection) {
        let (server, client) = socket_pair();
        let root = root.canonicalize().unwrap();
        let session = Session::new(server, root, Arc::new(NoopLogger), None);
        (session, client)
    }

    #[test]
    fn split_args_basic() {
        assert_eq!(split_args("SEND test.txt", ' '), vec!["SEND", "test.txt"]);
    }

    #[test]
    fn split_args_collapses_delimiter_runs() {
        assert_eq!(split_args("LIST   sub dir", ' '), vec!["LIST", "sub", "dir"]);
        assert!(split_args("", ' ').is_empty());
        assert!(split_args("   ", ' ').is_empty());
    }

    #[test]
    fn dispatch_is_case_sensitive() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut session, _client) = session_with_root(tmp.path());
        let result = dispatch(&mut session, "send test.txt").unwrap();
        assert_eq!(result, DispatchResult::Unmatched);
        assert!(session.connected);
    }

    #[test]
    fn dispatch_unknown_verb_is_unmatched() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut session, _client) = session_with_root(tmp.path());
        assert_eq!(
            dispatch(&mut session, "FETCH a.txt").unwrap(),
            DispatchResult::Unmatched
        );
    }

    #[test]
    fn quit_clears_connected_and_sends_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut session, mut client) = session_with_root(tmp.path());
        assert_eq!(dispatch(&mut session, "QUIT").unwrap(), DispatchResult::Handled);
        assert!(!session.connected);
        // Closing the server side must be the only thing the client sees
        session.conn.close();
        let mut buf = [0u8; 16];
        assert_eq!(client.receive(&mut buf).unwrap(), 0);
    }

    #[test]
    fn resolve_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        assert!(resolve_under_root(&root, "../../etc/passwd").is_err());
        assert!(resolve_under_root(&root, "/etc/passwd").is_err());
        assert!(resolve_under_root(&root, "no\0nul").is_err());
    }

    #[test]
    fn resolve_accepts_files_inside_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        std::fs::write(root.join("ok.txt"), b"fine").unwrap();
        let resolved = resolve_under_root(&root, "ok.txt").unwrap();
        assert!(resolved.starts_with(&root));
        assert!(resolve_under_root(&root, "missing.txt").is_err());
    }

    #[test]
    fn send_outside_root_yields_404() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut session, mut client) = session_with_root(tmp.path());
        let result = dispatch(&mut session, "SEND ../../etc/passwd").unwrap();
        assert_eq!(result, DispatchResult::Handled);
        assert_eq!(client.receive_status().unwrap(), status::NOT_FOUND);
    }

    #[test]
    fn send_without_argument_yields_404() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut session, mut client) = session_with_root(tmp.path());
        dispatch(&mut session, "SEND").unwrap();
        assert_eq!(client.receive_status().unwrap(), status::NOT_FOUND);
    }

    #[cfg(unix)]
    #[test]
    fn permission_string_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("f");
        std::fs::write(&file, b"x").unwrap();
        let s = permission_string(&std::fs::metadata(&file).unwrap());
        assert_eq!(s.len(), 10);
        assert!(s.starts_with('-'));
        let d = permission_string(&std::fs::metadata(tmp.path()).unwrap());
        assert!(d.starts_with('d'));
    }
}
