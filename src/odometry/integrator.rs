//! Pose integration and orientation conversion

use super::kinematics::BodyVelocity;
use serde::{Deserialize, Serialize};

/// 2D pose in the odometry frame
///
/// θ accumulates without wrapping; downstream consumers get a quaternion and
/// do not care, and wrapping would break the continuity of the integration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

/// Unit quaternion (x, y, z, w)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Build a quaternion from ZYX Euler angles
    ///
    /// Non-finite input yields the identity quaternion instead of failing
    /// the odometry cycle.
    pub fn from_euler(roll: f64, pitch: f64, yaw: f64) -> Self {
        if !roll.is_finite() || !pitch.is_finite() || !yaw.is_finite() {
            log::error!(
                "Non-finite euler angles ({}, {}, {}), using identity quaternion",
                roll,
                pitch,
                yaw
            );
            return Self::IDENTITY;
        }

        let (sr, cr) = (roll / 2.0).sin_cos();
        let (sp, cp) = (pitch / 2.0).sin_cos();
        let (sy, cy) = (yaw / 2.0).sin_cos();

        Quaternion {
            x: sr * cp * cy - cr * sp * sy,
            y: cr * sp * cy + sr * cp * sy,
            z: cr * cp * sy - sr * sp * cy,
            w: cr * cp * cy + sr * sp * sy,
        }
    }

    /// Quaternion for a planar heading (roll = pitch = 0)
    pub fn from_yaw(yaw: f64) -> Self {
        Self::from_euler(0.0, 0.0, yaw)
    }
}

/// Integrates body-frame velocity into an accumulated world-frame pose
///
/// The pose is owned exclusively by the reader thread and is never reset
/// after process start.
#[derive(Debug, Default)]
pub struct PoseIntegrator {
    pose: Pose2D,
}

impl PoseIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the pose by one cycle of body velocity over `dt` seconds
    ///
    /// First-order Euler step using the heading *before* the update. Known
    /// to accumulate error at high vth·dt; kept deliberately simple because
    /// changing the scheme changes trajectory output for existing fixtures.
    pub fn step(&mut self, body: &BodyVelocity, dt: f64) -> Pose2D {
        let (sin_th, cos_th) = self.pose.theta.sin_cos();

        let delta_x = (body.vx * cos_th - body.vy * sin_th) * dt;
        let delta_y = (body.vx * sin_th + body.vy * cos_th) * dt;
        let delta_th = body.vth * dt;

        self.pose.x += delta_x;
        self.pose.y += delta_y;
        self.pose.theta += delta_th;

        self.pose
    }

    /// Current accumulated pose
    pub fn pose(&self) -> Pose2D {
        self.pose
    }
}
