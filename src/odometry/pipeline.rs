//! Per-sample odometry orchestration

use super::integrator::{Pose2D, PoseIntegrator, Quaternion};
use super::kinematics::{BodyVelocity, RobotGeometry, WheelVelocities};
use crate::error::Result;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Result of one successful odometry cycle
#[derive(Debug, Clone, Copy)]
pub struct OdometryUpdate {
    /// Capture time in microseconds since epoch
    pub timestamp_us: u64,
    /// Accumulated pose after this cycle
    pub pose: Pose2D,
    /// Orientation as a unit quaternion
    pub orientation: Quaternion,
    /// Body velocity computed for this cycle
    pub body: BodyVelocity,
}

/// Runs one full estimation cycle per decoded encoder sample
///
/// Owns the pose and the previous-sample instant; touched only by the reader
/// thread, so no locking is involved. Elapsed time comes from the monotonic
/// clock, never wall-clock.
pub struct OdometryPipeline {
    geometry: RobotGeometry,
    integrator: PoseIntegrator,
    last_sample: Instant,
}

impl OdometryPipeline {
    /// Create a pipeline; the first report integrates over the time since
    /// this call
    pub fn new(geometry: RobotGeometry) -> Self {
        Self::with_start(geometry, Instant::now())
    }

    /// Create a pipeline with an explicit start instant (test hook)
    pub fn with_start(geometry: RobotGeometry, start: Instant) -> Self {
        OdometryPipeline {
            geometry,
            integrator: PoseIntegrator::new(),
            last_sample: start,
        }
    }

    /// Process an encoder sample that arrived now
    pub fn process(&mut self, ticks: [f64; 4]) -> Result<OdometryUpdate> {
        self.process_at(ticks, Instant::now())
    }

    /// Process an encoder sample with an explicit arrival instant
    ///
    /// The previous-sample instant advances even when the cycle is rejected,
    /// so a duplicate sample costs one skipped cycle rather than poisoning
    /// the next interval.
    pub fn process_at(&mut self, ticks: [f64; 4], now: Instant) -> Result<OdometryUpdate> {
        let dt = now.duration_since(self.last_sample).as_secs_f64();
        self.last_sample = now;

        let wheels = WheelVelocities::estimate(ticks, dt, &self.geometry)?;
        let body = BodyVelocity::from_wheels(&wheels, &self.geometry);
        let pose = self.integrator.step(&body, dt);

        Ok(OdometryUpdate {
            timestamp_us: now_timestamp_us(),
            pose,
            orientation: Quaternion::from_yaw(pose.theta),
            body,
        })
    }

    /// Current accumulated pose
    pub fn pose(&self) -> Pose2D {
        self.integrator.pose()
    }
}

/// Wall-clock capture timestamp in microseconds since epoch
fn now_timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::time::Duration;

    fn test_geometry() -> RobotGeometry {
        RobotGeometry {
            wheel_radius: 0.05,
            lx: 0.2355,
            ly: 0.15,
        }
    }

    #[test]
    fn test_equal_ticks_rotate_in_place() {
        let start = Instant::now();
        let mut pipeline = OdometryPipeline::with_start(test_geometry(), start);

        // Equal positive ticks alternate sign after the wheel convention,
        // which cancels vx and vy and leaves pure rotation.
        let update = pipeline
            .process_at([10.0, 10.0, 10.0, 10.0], start + Duration::from_secs(1))
            .unwrap();

        assert_eq!(update.body.vx, 0.0);
        assert_eq!(update.body.vy, 0.0);
        let expected_vth = -std::f64::consts::PI / (0.2355 + 0.15);
        assert!((update.body.vth - expected_vth).abs() < 1e-9);
        assert_eq!(update.pose.x, 0.0);
        assert_eq!(update.pose.y, 0.0);
        assert!((update.pose.theta - expected_vth).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_sample_skips_cycle() {
        let start = Instant::now();
        let mut pipeline = OdometryPipeline::with_start(test_geometry(), start);
        let at = start + Duration::from_secs(1);

        pipeline.process_at([1.0, 1.0, 1.0, 1.0], at).unwrap();
        let err = pipeline.process_at([1.0, 1.0, 1.0, 1.0], at).unwrap_err();
        assert!(matches!(err, Error::InvalidInterval(dt) if dt == 0.0));

        // Pose unchanged by the rejected cycle
        let pose_after = pipeline.pose();
        let update = pipeline
            .process_at([0.0; 4], at + Duration::from_secs(1))
            .unwrap();
        assert_eq!(update.pose, pose_after);
    }

    #[test]
    fn test_orientation_tracks_heading() {
        let start = Instant::now();
        let mut pipeline = OdometryPipeline::with_start(test_geometry(), start);

        let update = pipeline
            .process_at([10.0, 10.0, 10.0, 10.0], start + Duration::from_secs(1))
            .unwrap();

        let expected = Quaternion::from_yaw(update.pose.theta);
        assert_eq!(update.orientation, expected);
    }
}
