//! Shared CLI helpers and small reusable Clap fragments

use clap::Parser;
use std::path::PathBuf;

/// Daemon options for skiffd
#[derive(Clone, Debug, Parser)]
pub struct DaemonOpts {
    /// Port to listen on (shorthand for --bind 0.0.0.0:<PORT>)
    pub port: Option<u16>,

    /// Bind address (host:port)
    #[arg(long)]
    pub bind: Option<String>,

    /// Root directory to serve (created if missing)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Write timestamped log lines to file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Read defaults from a TOML config file instead of ./skiffd.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// A remote daemon endpoint, `host:port` or `skiff://host:port`.
#[derive(Debug, Clone)]
pub struct Remote {
    pub host: String,
    pub port: u16,
}

pub fn parse_remote(input: &str, default_port: u16) -> Option<Remote> {
    let trimmed = input.trim();
    let rest = trimmed
        .strip_prefix("skiff://")
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    if rest.is_empty() {
        return None;
    }
    match rest.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            Some(Remote {
                host: host.to_string(),
                port: port.parse().ok()?,
            })
        }
        _ => Some(Remote {
            host: rest.to_string(),
            port: default_port,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_remote_forms() {
        let r = parse_remote("localhost:4044", 9030).unwrap();
        assert_eq!((r.host.as_str(), r.port), ("localhost", 4044));

        let r = parse_remote("skiff://files.lan:9030/", 9030).unwrap();
        assert_eq!((r.host.as_str(), r.port), ("files.lan", 9030));

        let r = parse_remote("files.lan", 9030).unwrap();
        assert_eq!((r.host.as_str(), r.port), ("files.lan", 9030));

        assert!(parse_remote("", 9030).is_none());
        assert!(parse_remote("host:notaport", 9030).is_none());
    }
}
