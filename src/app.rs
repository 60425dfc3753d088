//! Application orchestration for the SetuIO bridge
//!
//! Wires the serial link, odometry pipeline, streaming, and command path
//! together; manages thread lifecycle and graceful shutdown.

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::forwarder::CommandForwarder;
use crate::link::{SerialConnector, SerialLink};
use crate::odometry::OdometryPipeline;
use crate::reader;
use crate::streaming::{CommandServer, TcpPublisher};
use log::{debug, error, info};
use parking_lot::Mutex;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Command backlog toward the forwarder; beyond this commands are dropped
const COMMAND_QUEUE_DEPTH: usize = 32;

/// Main application structure that manages all components
pub struct App {
    config: AppConfig,
    link: Arc<Mutex<SerialLink>>,
    publisher: Arc<TcpPublisher>,
    shutdown: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl App {
    /// Create a new App instance
    ///
    /// Validates configuration and binds the network listeners. The serial
    /// link itself is opened lazily by the reader thread, which retries
    /// forever.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        info!("Initializing SetuIO bridge");

        let publisher = Arc::new(TcpPublisher::bind(&config.streaming.odom_pub_address)?);

        let connector = SerialConnector::new(&config.serial.port, config.serial.baud_rate);
        let link = Arc::new(Mutex::new(SerialLink::new(Box::new(connector))));

        Ok(App {
            config,
            link,
            publisher,
            shutdown: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
        })
    }

    /// Start all threads and run until a shutdown signal arrives
    pub fn run(&mut self) -> Result<()> {
        info!("Starting application threads");

        self.start_reader_thread()?;
        self.start_command_path()?;
        self.setup_signal_handler()?;

        info!("Serial device: {}", self.config.serial.port);
        info!(
            "Publishing odometry on: {}",
            self.config.streaming.odom_pub_address
        );
        info!(
            "Receiving commands on: {}",
            self.config.streaming.cmd_address
        );
        info!("Press Ctrl+C to stop");

        let mut last_stats = Instant::now();
        while !self.shutdown.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(100));

            if last_stats.elapsed().as_secs() >= 10 {
                self.log_statistics();
                last_stats = Instant::now();
            }
        }

        info!("Shutdown signal received, stopping threads...");
        self.stop_all_threads();
        Ok(())
    }

    /// Spawn the serial reader thread
    fn start_reader_thread(&mut self) -> Result<()> {
        let pipeline = OdometryPipeline::new(self.config.robot.geometry());
        let link = Arc::clone(&self.link);
        let sink = Arc::clone(&self.publisher) as Arc<dyn crate::streaming::OdometrySink>;
        let shutdown = Arc::clone(&self.shutdown);

        let handle = thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || {
                reader::run(link, pipeline, sink, shutdown);
            })?;
        self.threads.push(handle);

        info!("Serial reader started");
        Ok(())
    }

    /// Spawn the command server and forwarder threads
    fn start_command_path(&mut self) -> Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(COMMAND_QUEUE_DEPTH);

        let forwarder = CommandForwarder::new(
            Arc::clone(&self.link),
            rx,
            Arc::clone(&self.shutdown),
        );
        self.threads.push(forwarder.spawn()?);

        let server = CommandServer::bind(&self.config.streaming.cmd_address)?;
        self.threads
            .push(server.spawn(tx, Arc::clone(&self.shutdown))?);

        info!("Command path started");
        Ok(())
    }

    /// Register SIGINT/SIGTERM to flip the shutdown flag
    fn setup_signal_handler(&self) -> Result<()> {
        let shutdown = Arc::clone(&self.shutdown);
        let mut signals = Signals::new([SIGINT, SIGTERM])
            .map_err(|e| Error::Other(format!("Failed to register signal handlers: {}", e)))?;

        thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    info!("Received signal {:?}, initiating shutdown...", sig);
                    shutdown.store(true, Ordering::Relaxed);
                }
            })?;
        Ok(())
    }

    /// Log periodic liveness statistics
    fn log_statistics(&self) {
        let pose_source = if self.link.lock().is_open() {
            "serial link up"
        } else {
            "serial link reconnecting"
        };
        info!("Bridge running ({})", pose_source);
    }

    /// Stop threads and release the serial handle
    ///
    /// The serial handle is closed exactly once, after the reader and
    /// forwarder have quiesced; closing a never-opened link is a no-op.
    fn stop_all_threads(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        for handle in self.threads.drain(..) {
            if let Err(e) = handle.join() {
                error!("Thread panicked during shutdown: {:?}", e);
            }
        }

        self.publisher.stop();
        self.link.lock().close();

        info!("All threads stopped");
    }
}

impl Drop for App {
    fn drop(&mut self) {
        debug!("App cleaning up...");
        self.shutdown.store(true, Ordering::Relaxed);
        self.stop_all_threads();
    }
}
