//! Serial link session management
//!
//! [`SerialLink`] owns the live transport session. The session is replaced
//! wholesale on reconnect, never partially repaired; partial line bytes are
//! discarded with it. The link itself makes single connection attempts; the
//! reader loop supplies the infinite-retry policy and its backoff.

use crate::error::{Error, Result};
use crate::protocol::{RESET_COMMAND, SESSION_INIT};
use crate::transport::{SerialTransport, Transport};
use std::io;
use std::time::Duration;

/// Fixed delay between connection attempts
pub const RECONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// Partial lines longer than this are dropped as garbage
const MAX_LINE_BYTES: usize = 4096;

/// Produces fresh transport sessions
pub trait Connector: Send {
    /// Make one connection attempt
    fn connect(&mut self) -> Result<Box<dyn Transport>>;

    /// Human-readable connection target for logs
    fn target(&self) -> &str;
}

/// Connector dialing a physical serial port
pub struct SerialConnector {
    port: String,
    baud_rate: u32,
}

impl SerialConnector {
    pub fn new(port: &str, baud_rate: u32) -> Self {
        SerialConnector {
            port: port.to_string(),
            baud_rate,
        }
    }
}

impl Connector for SerialConnector {
    fn connect(&mut self) -> Result<Box<dyn Transport>> {
        Ok(Box::new(SerialTransport::open(&self.port, self.baud_rate)?))
    }

    fn target(&self) -> &str {
        &self.port
    }
}

/// Owner of the serial session shared by the reader and command paths
pub struct SerialLink {
    connector: Box<dyn Connector>,
    session: Option<Box<dyn Transport>>,
    line_buf: Vec<u8>,
    reset_sent: bool,
}

impl SerialLink {
    pub fn new(connector: Box<dyn Connector>) -> Self {
        SerialLink {
            connector,
            session: None,
            line_buf: Vec::new(),
            reset_sent: false,
        }
    }

    /// Whether a session is currently open
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Connection target for logs
    pub fn target(&self) -> &str {
        self.connector.target()
    }

    /// Make a single connection attempt and perform the session handshake
    ///
    /// On success the peer receives the session-init byte, and on the first
    /// successful open after process start also the reset command byte.
    pub fn connect_once(&mut self) -> Result<()> {
        let mut session = self.connector.connect()?;

        let mut handshake = vec![SESSION_INIT];
        if !self.reset_sent {
            handshake.push(RESET_COMMAND);
        }
        write_all(session.as_mut(), &handshake)?;
        session.flush()?;
        self.reset_sent = true;

        self.line_buf.clear();
        self.session = Some(session);
        log::info!("Serial session established on {}", self.connector.target());
        Ok(())
    }

    /// Poll for one complete newline-terminated line
    ///
    /// Returns `Ok(None)` when no full line has arrived yet. A read error
    /// tears the session down and propagates; the caller re-enters the
    /// connect-retry loop.
    pub fn poll_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let Some(session) = self.session.as_mut() else {
            return Err(Error::LinkClosed);
        };

        let mut chunk = [0u8; 256];
        let n = match session.read(&mut chunk) {
            Ok(n) => n,
            Err(e) => {
                self.drop_session();
                return Err(e);
            }
        };
        self.line_buf.extend_from_slice(&chunk[..n]);

        if self.line_buf.len() > MAX_LINE_BYTES && !self.line_buf.contains(&b'\n') {
            log::warn!(
                "Dropping {} bytes of unterminated serial data",
                self.line_buf.len()
            );
            self.line_buf.clear();
        }

        Ok(self.take_line())
    }

    /// Write bytes to the open session
    ///
    /// Fails with [`Error::LinkClosed`] when no session is open. A write
    /// error tears the session down; callers treat commands as perishable
    /// and do not retry.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Err(Error::LinkClosed);
        };

        let result = write_all(session.as_mut(), bytes).and_then(|_| session.flush());
        if result.is_err() {
            self.drop_session();
        }
        result
    }

    /// Close the session; idempotent, no-op when never opened
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            log::info!("Serial link closed");
        }
        self.line_buf.clear();
    }

    fn take_line(&mut self) -> Option<String> {
        let pos = self.line_buf.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.line_buf.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }

    fn drop_session(&mut self) {
        self.session = None;
        self.line_buf.clear();
    }
}

fn write_all(session: &mut dyn Transport, mut bytes: &[u8]) -> Result<()> {
    while !bytes.is_empty() {
        let n = session.write(bytes)?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "device accepted no bytes").into());
        }
        bytes = &bytes[n..];
    }
    Ok(())
}
