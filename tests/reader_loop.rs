//! End-to-end reader loop scenarios over the mock transport

use crossbeam_channel::{unbounded, Receiver};
use parking_lot::Mutex;
use setu_io::link::SerialLink;
use setu_io::odometry::{OdometryPipeline, RobotGeometry};
use setu_io::reader;
use setu_io::streaming::messages::{OdometryRecord, TransformRecord};
use setu_io::streaming::OdometrySink;
use setu_io::transport::{MockConnector, MockTransport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

type Update = (OdometryRecord, TransformRecord);

fn geometry() -> RobotGeometry {
    RobotGeometry {
        wheel_radius: 0.05,
        lx: 0.2355,
        ly: 0.15,
    }
}

fn spawn_reader(connector: MockConnector) -> (Arc<AtomicBool>, Receiver<Update>, JoinHandle<()>) {
    let link = Arc::new(Mutex::new(SerialLink::new(Box::new(connector))));
    let pipeline = OdometryPipeline::new(geometry());
    let (tx, rx) = unbounded();
    let sink: Arc<dyn OdometrySink> = Arc::new(tx);
    let shutdown = Arc::new(AtomicBool::new(false));

    let thread_shutdown = Arc::clone(&shutdown);
    let handle = std::thread::spawn(move || {
        reader::run(link, pipeline, sink, thread_shutdown);
    });

    (shutdown, rx, handle)
}

#[test]
fn test_encoder_line_produces_odometry() {
    let transport = MockTransport::new();
    transport.inject_read(b"{\"encoders\": [10, 10, 10, 10]}\n");

    let connector = MockConnector::new();
    connector.push_transport(transport.clone());

    let (shutdown, rx, handle) = spawn_reader(connector);
    let (odom, tf) = rx.recv_timeout(Duration::from_secs(2)).unwrap();

    // Equal ticks cancel to pure rotation under the alternating wheel signs
    assert_eq!(odom.position.x, 0.0);
    assert_eq!(odom.position.y, 0.0);
    assert!(odom.angular.z < 0.0);
    assert_eq!(odom.timestamp, tf.timestamp);
    assert_eq!(odom.position, tf.translation);

    // Session handshake: init byte plus first-start reset byte
    let written = transport.get_written();
    assert_eq!(written, vec![0x05, b'R']);

    shutdown.store(true, Ordering::Relaxed);
    handle.join().unwrap();
}

#[test]
fn test_bad_lines_skip_without_crash() {
    let transport = MockTransport::new();
    transport.inject_read(b"{\"foo\": 1}\n");
    transport.inject_read(b"not json at all\n");
    transport.inject_read(b"{\"encoders\": [1, \"x\", 3, 4]}\n");
    transport.inject_read(b"{\"encoders\": [0, 0, 0, 0]}\n");

    let connector = MockConnector::new();
    connector.push_transport(transport);

    let (shutdown, rx, handle) = spawn_reader(connector);

    // Only the final, valid line produces an update
    let (odom, _) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(odom.position.x, 0.0);
    assert_eq!(odom.position.y, 0.0);
    assert_eq!(odom.angular.z, 0.0);

    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    shutdown.store(true, Ordering::Relaxed);
    handle.join().unwrap();
}

#[test]
fn test_reconnect_after_read_error() {
    let line = b"{\"encoders\": [5, 5, 5, 5]}\n";

    let first = MockTransport::new();
    first.inject_read(line);
    let second = MockTransport::new();
    second.inject_read(line);

    let connector = MockConnector::new();
    connector.push_failure();
    connector.push_failure();
    connector.push_transport(first.clone());
    connector.push_transport(second.clone());

    let (shutdown, rx, handle) = spawn_reader(connector.clone());

    // Publishing starts once the third attempt succeeds
    rx.recv_timeout(Duration::from_secs(3)).unwrap();

    // Kill the session; the loop must reopen and resume publishing
    first.inject_read_error();
    rx.recv_timeout(Duration::from_secs(3)).unwrap();

    shutdown.store(true, Ordering::Relaxed);
    handle.join().unwrap();

    let attempts = connector.attempts();
    assert!(attempts.len() >= 4, "expected 4+ attempts, got {}", attempts.len());

    // Failed attempts are spaced by the fixed backoff
    let spacing_1 = attempts[1].duration_since(attempts[0]);
    let spacing_2 = attempts[2].duration_since(attempts[1]);
    assert!(spacing_1 >= Duration::from_millis(500), "spacing {:?}", spacing_1);
    assert!(spacing_2 >= Duration::from_millis(500), "spacing {:?}", spacing_2);

    // Reset byte went out on the first open only
    assert_eq!(first.get_written(), vec![0x05, b'R']);
    assert_eq!(second.get_written(), vec![0x05]);
}
