//! Inbound velocity command server
//!
//! Accepts TCP clients and reads length-prefixed JSON [`VelocityCommand`]
//! frames. Decoded commands go into a bounded channel toward the forwarder;
//! a full channel drops the command, because a stale command delivered late
//! is worse than a dropped one.

use super::frame::read_frame;
use crate::error::{Error, Result};
use crate::protocol::VelocityCommand;
use crossbeam_channel::{Sender, TrySendError};
use log::{debug, error, info, warn};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// TCP server feeding the command forwarder
pub struct CommandServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl CommandServer {
    /// Bind the command listener
    pub fn bind(bind_address: &str) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        info!("Command server listening on {}", local_addr);

        Ok(CommandServer {
            listener,
            local_addr,
        })
    }

    /// Actual bound address (useful when binding port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawn the accept loop
    ///
    /// Connection handler threads are detached; they exit when their client
    /// disconnects or sends garbled framing.
    pub fn spawn(
        self,
        commands: Sender<VelocityCommand>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("cmd-server".to_string())
            .spawn(move || {
                accept_loop(self.listener, commands, shutdown);
            })?;
        Ok(handle)
    }
}

fn accept_loop(listener: TcpListener, commands: Sender<VelocityCommand>, shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                info!("Command client connected: {}", addr);
                if let Err(e) = stream.set_nonblocking(false) {
                    error!("Failed to set blocking mode for {}: {}", addr, e);
                    continue;
                }

                let client_commands = commands.clone();
                let spawned = thread::Builder::new()
                    .name("cmd-client".to_string())
                    .spawn(move || {
                        client_loop(stream, addr, client_commands);
                    });
                if let Err(e) = spawned {
                    error!("Failed to spawn command client thread: {}", e);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                error!("Command accept error: {}", e);
            }
        }
    }

    debug!("Command server thread exiting");
}

/// Per-connection read loop
fn client_loop(mut stream: TcpStream, addr: SocketAddr, commands: Sender<VelocityCommand>) {
    loop {
        match read_frame::<_, VelocityCommand>(&mut stream) {
            Ok(command) => match commands.try_send(command) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("Command channel full, dropping command from {}", addr);
                }
                Err(TrySendError::Disconnected(_)) => {
                    debug!("Command channel closed, dropping client {}", addr);
                    break;
                }
            },
            // Bad payload inside a well-framed message: drop it, keep the
            // connection
            Err(Error::Json(e)) => {
                warn!("Undecodable command from {}: {}", addr, e);
            }
            // Garbled framing or a closed socket: drop the connection
            Err(e) => {
                debug!("Command client {} disconnected: {}", addr, e);
                break;
            }
        }
    }
}
