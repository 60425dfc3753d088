//! Mock transport for testing

use super::Transport;
use crate::error::Result;
use crate::link::Connector;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Mock transport for unit testing
///
/// Reads come from an injected buffer, writes are captured, and I/O failures
/// can be scripted to exercise the reconnect path.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                read_buffer: VecDeque::new(),
                write_buffer: Vec::new(),
                fail_reads: false,
                fail_writes: false,
            })),
        }
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.read_buffer.extend(data);
    }

    /// Make every subsequent read fail with a broken pipe
    pub fn inject_read_error(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_reads = true;
    }

    /// Make every subsequent write fail with a broken pipe
    pub fn inject_write_error(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_writes = true;
    }

    /// Get all written data
    pub fn get_written(&self) -> Vec<u8> {
        let inner = self.inner.lock().unwrap();
        inner.write_buffer.clone()
    }

    /// Clear written data
    pub fn clear_written(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.write_buffer.clear();
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "injected read failure").into());
        }

        let available = inner.read_buffer.len().min(buffer.len());
        for item in buffer.iter_mut().take(available) {
            *item = inner.read_buffer.pop_front().unwrap();
        }

        Ok(available)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "injected write failure").into());
        }

        inner.write_buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Scripted connector for reconnect tests
///
/// Each `connect` call pops the next scripted outcome: a prepared transport
/// or a connection failure. Attempt times are recorded so tests can check
/// retry spacing.
#[derive(Clone)]
pub struct MockConnector {
    script: Arc<Mutex<VecDeque<Option<MockTransport>>>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl MockConnector {
    /// Create a connector with an empty script (every attempt fails)
    pub fn new() -> Self {
        MockConnector {
            script: Arc::new(Mutex::new(VecDeque::new())),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script a failed connection attempt
    pub fn push_failure(&self) {
        self.script.lock().unwrap().push_back(None);
    }

    /// Script a successful connection yielding the given transport
    pub fn push_transport(&self, transport: MockTransport) {
        self.script.lock().unwrap().push_back(Some(transport));
    }

    /// Times of every connection attempt so far
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MockConnector {
    fn connect(&mut self) -> Result<Box<dyn Transport>> {
        self.attempts.lock().unwrap().push(Instant::now());
        match self.script.lock().unwrap().pop_front() {
            Some(Some(transport)) => Ok(Box::new(transport)),
            _ => Err(io::Error::new(io::ErrorKind::ConnectionRefused, "no device").into()),
        }
    }

    fn target(&self) -> &str {
        "mock"
    }
}
