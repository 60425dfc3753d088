//! Odometry estimation pipeline
//!
//! Converts raw encoder tick reports into wheel velocities, body-frame
//! velocity via mecanum inverse kinematics, and an integrated 2D pose.

mod integrator;
mod kinematics;
mod pipeline;

pub use integrator::{Pose2D, PoseIntegrator, Quaternion};
pub use kinematics::{BodyVelocity, RobotGeometry, WheelVelocities, VELOCITY_DEADBAND};
pub use pipeline::{OdometryPipeline, OdometryUpdate};
