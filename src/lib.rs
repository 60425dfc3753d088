//! SetuIO - Serial-to-middleware odometry bridge
//!
//! Bridges a mecanum-drive base controller (raw wheel-encoder ticks over a
//! serial link) to robotics middleware (velocity commands in, pose/twist
//! estimates out).
//!
//! ## Pipeline
//!
//! serial line → encoder decode → wheel velocities → mecanum inverse
//! kinematics → pose integration → odometry + transform publish

pub mod app;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod link;
pub mod odometry;
pub mod protocol;
pub mod reader;
pub mod streaming;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
