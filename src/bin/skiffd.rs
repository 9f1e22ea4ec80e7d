//! skiffd — the skiff file daemon

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use skiff::cli::DaemonOpts;
use skiff::config::{DaemonConfig, DEFAULT_BIND, DEFAULT_ROOT};
use skiff::logger::{Logger, NoopLogger, TextLogger};
use skiff::server;

fn main() -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Shutting down skiffd...");
        std::process::exit(130);
    })
    .expect("Error setting Ctrl-C handler");

    let opts = DaemonOpts::parse();
    let config = match opts.config {
        Some(ref path) => DaemonConfig::load(path)?,
        None => DaemonConfig::load_default()?,
    };

    // CLI wins over config file wins over defaults
    let bind = match (opts.port, opts.bind) {
        (Some(port), _) => format!("0.0.0.0:{}", port),
        (None, Some(bind)) => bind,
        (None, None) => config.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
    };
    let root: PathBuf = opts
        .root
        .or(config.root)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));
    let log_file = opts.log_file.or(config.log_file);

    // The served root must exist before any path can resolve into it
    std::fs::create_dir_all(&root)
        .with_context(|| format!("create root directory {}", root.display()))?;
    let canonical_root = std::fs::canonicalize(&root)
        .with_context(|| format!("canonicalize root {}", root.display()))?;

    println!("Starting skiff daemon:");
    println!("  Root: {}", canonical_root.display());
    println!("  Bind: {}", bind);
    if bind.starts_with("0.0.0.0") {
        eprintln!("WARNING: binding to 0.0.0.0 exposes the daemon to all interfaces");
        eprintln!("   This protocol is unencrypted and unauthenticated.");
        eprintln!("   Only use on trusted networks (LAN).");
    }

    let logger: Arc<dyn Logger + Send + Sync> = match log_file {
        Some(ref p) => match TextLogger::new(p) {
            Ok(l) => Arc::new(l),
            Err(e) => {
                eprintln!("log file {} unusable ({}), logging disabled", p.display(), e);
                Arc::new(NoopLogger)
            }
        },
        None => Arc::new(NoopLogger),
    };

    server::serve(&bind, &canonical_root, logger)
}
