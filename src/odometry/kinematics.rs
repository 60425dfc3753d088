//! Wheel velocity estimation and mecanum inverse kinematics

use crate::error::{Error, Result};
use std::f64::consts::PI;

/// Per-wheel sign convention, wheel order front-left, front-right,
/// rear-left, rear-right. Wheels 2 and 4 are wired with reversed polarity;
/// this is a hardware-layout constant, not configurable.
const WHEEL_SIGNS: [f64; 4] = [1.0, -1.0, 1.0, -1.0];

/// Body velocity components below this magnitude are clamped to zero to
/// suppress integration drift from sensor noise.
pub const VELOCITY_DEADBAND: f64 = 0.015;

/// Immutable robot geometry
#[derive(Debug, Clone, Copy)]
pub struct RobotGeometry {
    /// Wheel radius in meters
    pub wheel_radius: f64,
    /// Half-track along the X axis in meters
    pub lx: f64,
    /// Half-track along the Y axis in meters
    pub ly: f64,
}

/// Linear velocity of each wheel in m/s
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelVelocities(pub [f64; 4]);

impl WheelVelocities {
    pub const ZERO: WheelVelocities = WheelVelocities([0.0; 4]);

    /// Estimate wheel velocities from raw tick counts and elapsed time
    ///
    /// ```text
    /// v[i] = sign[i] * tick[i] * (1/dt) * 2π * wheel_radius
    /// ```
    ///
    /// A non-positive `dt` (duplicate or out-of-order sample) would divide by
    /// zero or spike the velocity, so the cycle is rejected instead. A
    /// non-finite tick value resets all four velocities to zero; the cycle
    /// result is all-or-nothing, never partially computed.
    pub fn estimate(ticks: [f64; 4], dt: f64, geometry: &RobotGeometry) -> Result<Self> {
        if dt <= 0.0 {
            return Err(Error::InvalidInterval(dt));
        }

        if ticks.iter().any(|t| !t.is_finite()) {
            log::error!("Non-finite encoder ticks {:?}, zeroing wheel velocities", ticks);
            return Ok(Self::ZERO);
        }

        let scale = (1.0 / dt) * 2.0 * PI * geometry.wheel_radius;
        let mut v = [0.0; 4];
        for i in 0..4 {
            v[i] = WHEEL_SIGNS[i] * ticks[i] * scale;
        }

        Ok(WheelVelocities(v))
    }
}

/// Body-frame velocity of the robot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyVelocity {
    /// Forward velocity in m/s
    pub vx: f64,
    /// Lateral velocity in m/s
    pub vy: f64,
    /// Angular velocity in rad/s
    pub vth: f64,
}

impl BodyVelocity {
    /// Mecanum inverse kinematics: wheel velocities to body velocity
    ///
    /// Wheel order front-left, front-right, rear-left, rear-right. The sign
    /// pattern encodes the roller orientation of the installed wheels and
    /// must not be "corrected" without hardware confirmation.
    pub fn from_wheels(wheels: &WheelVelocities, geometry: &RobotGeometry) -> Self {
        let [v1, v2, v3, v4] = wheels.0;

        let vx = (v1 + v2 + v3 + v4) / 4.0;
        let vy = (-v1 + v2 + v3 - v4) / 4.0;
        let vth = (-v1 + v2 - v3 + v4) / (4.0 * (geometry.lx + geometry.ly));

        BodyVelocity {
            vx: deadband(vx),
            vy: deadband(vy),
            vth: deadband(vth),
        }
    }
}

/// Clamp sub-threshold components to exactly zero
fn deadband(value: f64) -> f64 {
    if value.abs() < VELOCITY_DEADBAND {
        0.0
    } else {
        value
    }
}
