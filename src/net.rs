//! Blocking TCP transport and the text command / status framing
//!
//! All calls block with no timeout. `send` and `receive` are single
//! syscalls and may move fewer bytes than asked; the transfer loops in
//! `transfer` handle that. The fixed-width control fields are always
//! written and read at full width.

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use crate::protocol::{self, MAX_COMMAND_LENGTH, STATUS_FIELD};

/// One live peer endpoint. Owned by the session loop; the framing and
/// transfer code only borrows it for the duration of one operation.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr().context("peer address")?;
        tune_socket(&stream);
        Ok(Connection { stream, peer })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Single write; may take fewer bytes than offered.
    pub fn send(&mut self, buf: &[u8]) -> Result<usize> {
        self.stream.write(buf).context("send")
    }

    /// Write the whole buffer, looping on partial writes.
    pub fn send_all(&mut self, buf: &[u8]) -> Result<()> {
        self.stream.write_all(buf).context("send")
    }

    /// Single read; may fill less than the buffer. Zero means the peer
    /// closed the connection.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf).context("receive")
    }

    /// Fill the whole buffer, looping on partial reads.
    pub fn receive_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.stream.read_exact(buf).context("receive")
    }

    pub fn close(self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }

    /// Send a command line as-is. Commands are not length-framed; the
    /// peer picks the line up with one receive call.
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        self.send_all(command.as_bytes())
    }

    /// Receive one command with a single read into a fixed NUL-padded
    /// buffer. `None` means the peer disconnected. A command longer than
    /// one read is truncated to whatever the read returned.
    pub fn receive_command(&mut self) -> Result<Option<String>> {
        let mut buf = [0u8; MAX_COMMAND_LENGTH];
        let n = self.receive(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        let end = buf[..n].iter().position(|&b| b == 0).unwrap_or(n);
        let line = String::from_utf8_lossy(&buf[..end])
            .trim_end()
            .to_string();
        Ok(Some(line))
    }

    /// Send a status code at full field width.
    pub fn send_status(&mut self, code: u16) -> Result<()> {
        self.send_all(&protocol::encode_status(code))
    }

    /// Receive and parse a full-width status field.
    pub fn receive_status(&mut self) -> Result<u16> {
        let mut field = [0u8; STATUS_FIELD];
        self.receive_exact(&mut field)?;
        protocol::parse_status(&field)
    }
}

/// Connect to a remote daemon.
pub fn connect(host: &str, port: u16) -> Result<Connection> {
    let stream = TcpStream::connect((host, port))
        .with_context(|| format!("connect {}:{}", host, port))?;
    Connection::new(stream)
}

/// Bind a listener with SO_REUSEADDR so a restarted daemon does not
/// lose the port to a socket lingering in TIME_WAIT.
pub fn listen(bind: &str) -> Result<TcpListener> {
    let addr: SocketAddr = bind
        .to_socket_addrs()
        .with_context(|| format!("resolve {}", bind))?
        .next()
        .with_context(|| format!("no address for {}", bind))?;
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .context("create socket")?;
    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    socket
        .bind(&addr.into())
        .with_context(|| format!("bind {}", bind))?;
    // One client at a time; a tiny backlog is plenty
    socket.listen(1).context("listen")?;
    Ok(socket.into())
}

/// Block until the next client connects.
pub fn accept(listener: &TcpListener) -> Result<Connection> {
    let (stream, _) = listener.accept().context("accept")?;
    Connection::new(stream)
}

// Command/status round trips are latency-bound; don't let Nagle batch them
fn tune_socket(stream: &TcpStream) {
    let _ = stream.set_nodelay(true);
}
