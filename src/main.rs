//! skiff — fetch and list files from a running skiffd

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use skiff::cli::parse_remote;
use skiff::client;

const DEFAULT_PORT: u16 = 9030;

#[derive(Parser, Debug)]
#[command(author, version, about = "Skiff client - fetch and list files from a skiffd daemon")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a remote file
    Fetch {
        /// Daemon endpoint (host:port or skiff://host:port)
        remote: String,
        /// Path of the file on the server, relative to its root
        path: String,
        /// Local output file (defaults to the remote file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Suppress the progress bar
        #[arg(short, long)]
        quiet: bool,
    },
    /// List a remote directory
    List {
        /// Daemon endpoint (host:port or skiff://host:port)
        remote: String,
        /// Directory on the server, relative to its root
        path: Option<String>,
    },
}

fn main() -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        std::process::exit(130);
    })
    .expect("Error setting Ctrl-C handler");

    let args = Args::parse();

    match args.command {
        Command::Fetch {
            remote,
            path,
            output,
            quiet,
        } => {
            let remote = parse_remote(&remote, DEFAULT_PORT)
                .with_context(|| format!("bad remote: {:?}", remote))?;
            let output = output.unwrap_or_else(|| {
                let name = path.rsplit('/').next().unwrap_or(&path);
                PathBuf::from(name)
            });
            let bytes = client::fetch(&remote.host, remote.port, &path, &output, quiet)?;
            println!("{} ({} bytes) -> {}", path, bytes, output.display());
        }
        Command::List { remote, path } => {
            let remote = parse_remote(&remote, DEFAULT_PORT)
                .with_context(|| format!("bad remote: {:?}", remote))?;
            let listing = client::list(&remote.host, remote.port, path.as_deref())?;
            print!("{}", listing);
        }
    }
    Ok(())
}
