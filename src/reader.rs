//! Serial reader loop
//!
//! Pulls lines from the link, decodes them, runs the odometry pipeline, and
//! publishes the result. Connection failures re-enter the connect-retry
//! loop: retries continue forever with a fixed backoff, because the embedded
//! link is assumed always eventually reachable. Reconnecting blocks
//! publishing (no stale data substitutes for a lost sensor) but the backoff
//! sleep happens outside the link lock, so the command path keeps its
//! open-check responsive.

use crate::link::{SerialLink, RECONNECT_BACKOFF};
use crate::odometry::OdometryPipeline;
use crate::protocol::{decode_line, LineEvent};
use crate::streaming::messages::{OdometryRecord, TransformRecord};
use crate::streaming::OdometrySink;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Idle delay between polls when no full line has arrived
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Reader loop body; runs until the shutdown flag is set
///
/// No samples are buffered across reconnects: a connection loss produces a
/// pose-integration gap equal to the reconnect latency, accepted without
/// compensation.
pub fn run(
    link: Arc<Mutex<SerialLink>>,
    mut pipeline: OdometryPipeline,
    sink: Arc<dyn OdometrySink>,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        if !link.lock().is_open() {
            let result = link.lock().connect_once();
            if let Err(e) = result {
                warn!("Connection attempt failed: {}", e);
                thread::sleep(RECONNECT_BACKOFF);
                continue;
            }
        }

        let polled = link.lock().poll_line();
        match polled {
            Ok(Some(line)) => handle_line(&line, &mut pipeline, sink.as_ref()),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                // Session already torn down; reconnect on the next pass
                warn!("Serial connection lost: {}", e);
            }
        }
    }

    info!("Reader thread exiting");
}

/// Decode one line and run the odometry cycle
fn handle_line(line: &str, pipeline: &mut OdometryPipeline, sink: &dyn OdometrySink) {
    match decode_line(line) {
        Ok(LineEvent::EncoderReport(ticks)) => match pipeline.process(ticks) {
            Ok(update) => {
                debug!(
                    "Odometry update: x={:.3} y={:.3} th={:.3}",
                    update.pose.x, update.pose.y, update.pose.theta
                );
                let odometry = OdometryRecord::from_update(&update);
                let transform = TransformRecord::from_update(&update);
                if let Err(e) = sink.publish(odometry, transform) {
                    warn!("Failed to publish odometry: {}", e);
                }
            }
            Err(e) => debug!("Odometry cycle skipped: {}", e),
        },
        Ok(LineEvent::Ignored) => {
            if !line.trim().is_empty() {
                info!("Ignored non-encoder line: {}", line);
            }
        }
        Err(e) => warn!("Undecodable serial line {:?}: {}", line, e),
    }
}
