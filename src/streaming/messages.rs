//! Message types for TCP streaming
//!
//! Outbound messages carry the integrated pose and twist plus the matching
//! odom → base_footprint transform; inbound messages are velocity commands.

use crate::odometry::{OdometryUpdate, Quaternion};
use serde::{Deserialize, Serialize};

/// Parent frame of the published transform
pub const ODOM_FRAME_ID: &str = "odom";

/// Child frame of the published transform
pub const BASE_FRAME_ID: &str = "base_footprint";

/// Top-level message published to TCP clients
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Message {
    /// Pose + twist estimate, one per decoded encoder sample
    Odometry(OdometryRecord),
    /// Frame transform derived from the same pose
    Transform(TransformRecord),
}

/// 3D vector component
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3 { x, y, z }
    }
}

/// Pose and twist estimate in the odometry frame
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OdometryRecord {
    /// Capture time in microseconds since epoch
    pub timestamp: u64,
    /// Reference frame of the pose
    pub frame_id: String,
    /// Frame the twist is expressed in
    pub child_frame_id: String,
    /// Position (x, y, 0)
    pub position: Vector3,
    /// Heading as a unit quaternion
    pub orientation: Quaternion,
    /// Linear velocity (vx, vy, 0)
    pub linear: Vector3,
    /// Angular velocity (0, 0, vth)
    pub angular: Vector3,
}

/// odom → base_footprint transform, timestamped with the source odometry
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransformRecord {
    /// Capture time in microseconds since epoch, same as the odometry record
    pub timestamp: u64,
    pub parent_frame: String,
    pub child_frame: String,
    pub translation: Vector3,
    pub rotation: Quaternion,
}

impl OdometryRecord {
    /// Build the outbound record for one odometry update
    pub fn from_update(update: &OdometryUpdate) -> Self {
        OdometryRecord {
            timestamp: update.timestamp_us,
            frame_id: ODOM_FRAME_ID.to_string(),
            child_frame_id: BASE_FRAME_ID.to_string(),
            position: Vector3::new(update.pose.x, update.pose.y, 0.0),
            orientation: update.orientation,
            linear: Vector3::new(update.body.vx, update.body.vy, 0.0),
            angular: Vector3::new(0.0, 0.0, update.body.vth),
        }
    }
}

impl TransformRecord {
    /// Build the transform matching an odometry update
    pub fn from_update(update: &OdometryUpdate) -> Self {
        TransformRecord {
            timestamp: update.timestamp_us,
            parent_frame: ODOM_FRAME_ID.to_string(),
            child_frame: BASE_FRAME_ID.to_string(),
            translation: Vector3::new(update.pose.x, update.pose.y, 0.0),
            rotation: update.orientation,
        }
    }
}
