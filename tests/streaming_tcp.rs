//! TCP streaming integration: command inbound, odometry outbound

use setu_io::odometry::{BodyVelocity, OdometryUpdate, Pose2D, Quaternion};
use setu_io::protocol::VelocityCommand;
use setu_io::streaming::frame::{read_frame, write_frame};
use setu_io::streaming::messages::{Message, OdometryRecord, TransformRecord};
use setu_io::streaming::{CommandServer, OdometrySink, TcpPublisher};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_command_frames_reach_the_channel() {
    let server = CommandServer::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr();

    let (tx, rx) = crossbeam_channel::bounded(8);
    let shutdown = Arc::new(AtomicBool::new(false));
    let handle = server.spawn(tx, Arc::clone(&shutdown)).unwrap();

    let command = VelocityCommand {
        linear_x: 0.3,
        linear_y: -0.1,
        linear_z: 0.0,
        angular_x: 0.0,
        angular_y: 0.0,
        angular_z: 0.75,
    };

    let mut client = TcpStream::connect(addr).unwrap();
    write_frame(&mut client, &command).unwrap();

    let received = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(received, command);

    shutdown.store(true, Ordering::Relaxed);
    handle.join().unwrap();
}

#[test]
fn test_publisher_broadcasts_odometry_frames() {
    let publisher = TcpPublisher::bind("127.0.0.1:0").unwrap();

    let mut client = TcpStream::connect(publisher.local_addr()).unwrap();
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();

    // Let the accept loop register the client before publishing
    thread::sleep(Duration::from_millis(300));

    let update = OdometryUpdate {
        timestamp_us: 42,
        pose: Pose2D {
            x: 0.5,
            y: 0.0,
            theta: 0.0,
        },
        orientation: Quaternion::IDENTITY,
        body: BodyVelocity {
            vx: 0.5,
            vy: 0.0,
            vth: 0.0,
        },
    };
    publisher
        .publish(
            OdometryRecord::from_update(&update),
            TransformRecord::from_update(&update),
        )
        .unwrap();

    let first: Message = read_frame(&mut client).unwrap();
    let second: Message = read_frame(&mut client).unwrap();

    match first {
        Message::Odometry(record) => {
            assert_eq!(record.timestamp, 42);
            assert_eq!(record.position.x, 0.5);
        }
        other => panic!("expected odometry frame first, got {:?}", other),
    }
    match second {
        Message::Transform(record) => {
            assert_eq!(record.timestamp, 42);
            assert_eq!(record.translation.x, 0.5);
            assert_eq!(record.parent_frame, "odom");
            assert_eq!(record.child_frame, "base_footprint");
        }
        other => panic!("expected transform frame second, got {:?}", other),
    }
}
