//! Command forwarding toward the base controller
//!
//! Commands are perishable: a write is attempted only while the link reports
//! itself open, and any failure is logged and dropped, never retried or
//! queued.

use crate::error::Result;
use crate::link::SerialLink;
use crate::protocol::VelocityCommand;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Consumes velocity commands from the channel and writes them to the link
pub struct CommandForwarder {
    link: Arc<Mutex<SerialLink>>,
    commands: Receiver<VelocityCommand>,
    shutdown: Arc<AtomicBool>,
}

impl CommandForwarder {
    pub fn new(
        link: Arc<Mutex<SerialLink>>,
        commands: Receiver<VelocityCommand>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        CommandForwarder {
            link,
            commands,
            shutdown,
        }
    }

    /// Spawn the forwarder thread
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("cmd-forwarder".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    fn run(self) {
        debug!("Command forwarder thread started");

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.commands.recv_timeout(Duration::from_millis(100)) {
                Ok(command) => forward_command(&self.link, &command),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        debug!("Command forwarder thread exiting");
    }
}

/// Serialize one command and write it to the link
///
/// The open-check keeps this path from blocking behind a reconnect: while
/// the reader is re-dialing, the link reports closed and the command is
/// dropped immediately.
pub fn forward_command(link: &Mutex<SerialLink>, command: &VelocityCommand) {
    let payload = match command.to_wire() {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to encode velocity command: {}", e);
            return;
        }
    };

    let mut link = link.lock();
    if !link.is_open() {
        warn!("Serial link closed, dropping velocity command");
        return;
    }

    match link.write_all(&payload) {
        Ok(()) => debug!("Velocity command forwarded ({} bytes)", payload.len()),
        Err(e) => warn!("Failed to forward velocity command: {}", e),
    }
}
