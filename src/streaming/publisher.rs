//! Odometry publisher using TCP sockets
//!
//! A dedicated publisher thread owns the TCP listener; the reader thread
//! pushes messages to a lock-free queue and never blocks on the network.

use super::frame::write_frame;
use super::messages::{Message, OdometryRecord, TransformRecord};
use super::OdometrySink;
use crate::error::Result;
use crossbeam_queue::ArrayQueue;
use log::{debug, error, info, trace, warn};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Messages buffered before the publisher thread drains them
const QUEUE_CAPACITY: usize = 256;

/// Batch limit per drain pass, prevents accept starvation
const DRAIN_BATCH: usize = 64;

/// Broadcasts odometry frames to all connected TCP clients
pub struct TcpPublisher {
    queue: Arc<ArrayQueue<Message>>,
    local_addr: SocketAddr,
    publisher_thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl TcpPublisher {
    /// Bind the listener and spawn the publisher thread
    pub fn bind(bind_address: &str) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let queue = Arc::new(ArrayQueue::new(QUEUE_CAPACITY));
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_queue = Arc::clone(&queue);
        let thread_shutdown = Arc::clone(&shutdown);
        let publisher_thread = thread::Builder::new()
            .name("tcp-publisher".to_string())
            .spawn(move || {
                publisher_loop(listener, thread_queue, thread_shutdown);
            })?;

        info!("Odometry publisher listening on {}", local_addr);

        Ok(TcpPublisher {
            queue,
            local_addr,
            publisher_thread: Some(publisher_thread),
            shutdown,
        })
    }

    /// Actual bound address (useful when binding port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Request publisher shutdown
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

impl OdometrySink for TcpPublisher {
    fn publish(&self, odometry: OdometryRecord, transform: TransformRecord) -> Result<()> {
        // Push failures mean no client is draining fast enough; odometry is
        // a live stream, so stale frames are dropped rather than queued.
        if self.queue.push(Message::Odometry(odometry)).is_err() {
            trace!("Publisher queue full, dropped odometry frame");
        }
        if self.queue.push(Message::Transform(transform)).is_err() {
            trace!("Publisher queue full, dropped transform frame");
        }
        Ok(())
    }
}

impl Drop for TcpPublisher {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.publisher_thread.take() {
            let _ = thread.join();
        }
    }
}

/// Publisher thread main loop: accept clients, drain the queue, broadcast
fn publisher_loop(
    listener: TcpListener,
    queue: Arc<ArrayQueue<Message>>,
    shutdown: Arc<AtomicBool>,
) {
    let mut clients: Vec<TcpStream> = Vec::new();
    let mut published = 0u64;

    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!("Failed to set blocking mode for client {}: {}", addr, e);
                } else {
                    info!("Odometry client connected: {}", addr);
                    clients.push(stream);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => {
                error!("Error accepting odometry client: {}", e);
            }
        }

        let mut batch = 0;
        while let Some(message) = queue.pop() {
            broadcast(&mut clients, &message);
            published += 1;

            batch += 1;
            if batch >= DRAIN_BATCH {
                break;
            }
        }

        if queue.is_empty() {
            thread::sleep(Duration::from_millis(10));
        }
    }

    debug!("Publisher thread exiting ({} messages published)", published);
}

/// Send one message to every client, pruning the disconnected
fn broadcast(clients: &mut Vec<TcpStream>, message: &Message) {
    clients.retain_mut(|client| match write_frame(client, message) {
        Ok(_) => true,
        Err(e) => {
            if let Ok(addr) = client.peer_addr() {
                debug!("Odometry client {} disconnected: {}", addr, e);
            }
            false
        }
    });
}
