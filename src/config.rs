//! Configuration for the SetuIO bridge
//!
//! Loads configuration from a TOML file with the minimal parameters needed to
//! bridge the serial base controller to network consumers.

use crate::error::{Error, Result};
use crate::odometry::RobotGeometry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub robot: RobotConfig,
    pub streaming: StreamingConfig,
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    /// Base controller serial port (e.g. "/dev/ttyUSB1")
    pub port: String,
    /// Baud rate (must match the base firmware)
    pub baud_rate: u32,
}

/// Robot geometry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotConfig {
    /// Wheel radius in meters
    pub wheel_radius: f64,
    /// Half-track along the X axis in meters
    pub lx: f64,
    /// Half-track along the Y axis in meters
    pub ly: f64,
}

/// TCP streaming configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// TCP bind address for outbound odometry and transform frames
    pub odom_pub_address: String,
    /// TCP bind address for inbound velocity commands
    pub cmd_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl RobotConfig {
    /// Robot geometry derived from this configuration
    pub fn geometry(&self) -> RobotGeometry {
        RobotGeometry {
            wheel_radius: self.wheel_radius,
            lx: self.lx,
            ly: self.ly,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate startup invariants
    ///
    /// Geometry must be strictly positive; a zero half-track would make the
    /// angular kinematics divide by zero.
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(Error::InvalidConfig("serial.port is empty".to_string()));
        }
        if self.serial.baud_rate == 0 {
            return Err(Error::InvalidConfig("serial.baud_rate is zero".to_string()));
        }
        if self.robot.wheel_radius <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "robot.wheel_radius must be positive, got {}",
                self.robot.wheel_radius
            )));
        }
        if self.robot.lx <= 0.0 || self.robot.ly <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "robot half-tracks must be positive, got lx={} ly={}",
                self.robot.lx, self.robot.ly
            )));
        }
        Ok(())
    }

    /// Default configuration for the mecanum base
    pub fn mecanum_defaults() -> Self {
        Self {
            serial: SerialConfig {
                port: "/dev/ttyUSB1".to_string(),
                baud_rate: 9600,
            },
            robot: RobotConfig {
                wheel_radius: 0.05,
                lx: 0.2355,
                ly: 0.15,
            },
            streaming: StreamingConfig {
                odom_pub_address: "0.0.0.0:5555".to_string(),
                cmd_address: "0.0.0.0:5556".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::mecanum_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::mecanum_defaults();
        assert_eq!(config.serial.port, "/dev/ttyUSB1");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.robot.wheel_radius, 0.05);
        assert_eq!(config.streaming.odom_pub_address, "0.0.0.0:5555");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::mecanum_defaults();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[serial]"));
        assert!(toml_string.contains("[robot]"));
        assert!(toml_string.contains("[streaming]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("wheel_radius = 0.05"));
        assert!(toml_string.contains("port = \"/dev/ttyUSB1\""));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[serial]
port = "/dev/ttyACM0"
baud_rate = 115200

[robot]
wheel_radius = 0.04
lx = 0.2
ly = 0.12

[streaming]
odom_pub_address = "127.0.0.1:5555"
cmd_address = "127.0.0.1:5556"

[logging]
level = "debug"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.robot.wheel_radius, 0.04);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_geometry() {
        let mut config = AppConfig::mecanum_defaults();
        config.robot.wheel_radius = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::mecanum_defaults();
        config.robot.lx = -0.1;
        assert!(config.validate().is_err());
    }
}
