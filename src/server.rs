//! Accept loop and per-connection session loop
//!
//! Strictly one client at a time: the next connection is not accepted
//! until the current session ends. A connection error tears down that
//! session only; the daemon goes back to accepting.

use anyhow::{Context, Result};
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;

use crate::commands::{self, DispatchResult, Session};
use crate::log::TransferLog;
use crate::logger::Logger;
use crate::net;

/// Bind and serve forever.
pub fn serve(bind: &str, root: &Path, logger: Arc<dyn Logger + Send + Sync>) -> Result<()> {
    let listener = net::listen(bind)?;
    serve_on(listener, root, logger)
}

/// Serve on an already-bound listener. Split out so tests can bind to
/// an ephemeral port first.
pub fn serve_on(
    listener: TcpListener,
    root: &Path,
    logger: Arc<dyn Logger + Send + Sync>,
) -> Result<()> {
    let root = root
        .canonicalize()
        .with_context(|| format!("canonicalize root {}", root.display()))?;
    eprintln!(
        "skiffd listening on {} root={}",
        listener.local_addr().context("local addr")?,
        root.display()
    );

    loop {
        let conn = match net::accept(&listener) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("accept error: {}", e);
                continue;
            }
        };
        let peer = conn.peer();
        let mut session = Session::new(
            conn,
            root.clone(),
            logger.clone(),
            Some(TransferLog::new(&root)),
        );
        eprintln!("conn from {} session={}", peer, session.id);
        logger.connected(&session.id, peer);

        if let Err(e) = run_session(&mut session) {
            eprintln!(
                "connection error during handling (possible client disconnect): {}",
                e
            );
            logger.error("session", &e.to_string());
        }
        logger.disconnected(&session.id);
        eprintln!("session {} closed", session.id);
        session.conn.close();
    }
}

// One command per round trip until QUIT, disconnect, or a transport
// error ends the session.
fn run_session(session: &mut Session) -> Result<()> {
    while session.connected {
        let line = match session.conn.receive_command()? {
            Some(l) => l,
            None => break,
        };
        session.logger.command(&session.id, &line);
        match commands::dispatch(session, &line)? {
            DispatchResult::Handled => {}
            DispatchResult::Unmatched => {
                eprintln!("unmatched command from {}: {:?}", session.conn.peer(), line);
            }
        }
    }
    Ok(())
}
