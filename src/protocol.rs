//! Serial wire protocol for the base controller
//!
//! The base firmware speaks newline-terminated UTF-8 JSON. An encoder report
//! carries an `encoders` array with one signed tick count per wheel:
//!
//! ```text
//! {"encoders": [12, -3, 11, -2]}\n
//! ```
//!
//! Any other well-formed line is ignored (the firmware may emit message types
//! this layer does not know about). Host-to-device traffic is a JSON velocity
//! command plus two single-byte controls: a session-init byte written on every
//! successful open, and a reset byte written once at process start.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Session handshake byte, written to the peer on every successful open
pub const SESSION_INIT: u8 = 0x05;

/// Reset command byte, written once on the first open after process start
pub const RESET_COMMAND: u8 = b'R';

/// Number of wheels reported per encoder line
pub const WHEEL_COUNT: usize = 4;

/// Decoded outcome of one serial line
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    /// Encoder report with one tick count per wheel, wheel order
    /// front-left, front-right, rear-left, rear-right
    EncoderReport([f64; WHEEL_COUNT]),

    /// Well-formed line without an encoder report (other message type)
    Ignored,
}

/// Decode one serial line into a [`LineEvent`]
///
/// Malformed JSON, a non-array `encoders` field, a wrong element count, or a
/// non-numeric element all fail decoding; the caller skips the cycle.
pub fn decode_line(line: &str) -> Result<LineEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(LineEvent::Ignored);
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)?;
    let Some(encoders) = value.get("encoders") else {
        return Ok(LineEvent::Ignored);
    };

    let items = encoders
        .as_array()
        .ok_or_else(|| Error::InvalidPayload("encoders field is not an array".to_string()))?;
    if items.len() != WHEEL_COUNT {
        return Err(Error::InvalidPayload(format!(
            "expected {} encoder values, got {}",
            WHEEL_COUNT,
            items.len()
        )));
    }

    let mut ticks = [0.0; WHEEL_COUNT];
    for (i, item) in items.iter().enumerate() {
        ticks[i] = item.as_f64().ok_or_else(|| {
            Error::InvalidPayload(format!("encoder value {} is not numeric: {}", i, item))
        })?;
    }

    Ok(LineEvent::EncoderReport(ticks))
}

/// Velocity command forwarded to the base controller
///
/// Field names and order match the firmware's JSON parser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    pub linear_x: f64,
    pub linear_y: f64,
    pub linear_z: f64,
    pub angular_x: f64,
    pub angular_y: f64,
    pub angular_z: f64,
}

impl VelocityCommand {
    /// Serialize to the serial wire payload
    ///
    /// The firmware parser expects a bare JSON object with no trailing
    /// newline.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from a wire payload (used by the command server and the
    /// device side of the round trip)
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_encoder_report() {
        let event = decode_line("{\"encoders\": [10, -3, 11.5, 0]}\n").unwrap();
        assert_eq!(event, LineEvent::EncoderReport([10.0, -3.0, 11.5, 0.0]));
    }

    #[test]
    fn test_decode_other_message_ignored() {
        assert_eq!(decode_line("{\"foo\": 1}").unwrap(), LineEvent::Ignored);
        assert_eq!(decode_line("").unwrap(), LineEvent::Ignored);
        assert_eq!(decode_line("   ").unwrap(), LineEvent::Ignored);
    }

    #[test]
    fn test_decode_malformed_json() {
        assert!(decode_line("{\"encoders\": [10, 20").is_err());
        assert!(decode_line("not json at all").is_err());
    }

    #[test]
    fn test_decode_wrong_count() {
        assert!(decode_line("{\"encoders\": [1, 2, 3]}").is_err());
        assert!(decode_line("{\"encoders\": [1, 2, 3, 4, 5]}").is_err());
        assert!(decode_line("{\"encoders\": 7}").is_err());
    }

    #[test]
    fn test_decode_non_numeric_value() {
        assert!(decode_line("{\"encoders\": [1, \"two\", 3, 4]}").is_err());
        assert!(decode_line("{\"encoders\": [1, null, 3, 4]}").is_err());
    }

    #[test]
    fn test_command_wire_round_trip() {
        let cmd = VelocityCommand {
            linear_x: 0.25,
            linear_y: -0.1,
            linear_z: 0.0,
            angular_x: 0.0,
            angular_y: 0.0,
            angular_z: 1.5,
        };

        let wire = cmd.to_wire().unwrap();
        let decoded = VelocityCommand::from_wire(&wire).unwrap();
        assert_eq!(cmd, decoded);
    }

    #[test]
    fn test_command_wire_field_names() {
        let cmd = VelocityCommand {
            linear_x: 1.0,
            linear_y: 0.0,
            linear_z: 0.0,
            angular_x: 0.0,
            angular_y: 0.0,
            angular_z: 0.0,
        };

        let wire = String::from_utf8(cmd.to_wire().unwrap()).unwrap();
        assert!(wire.contains("\"linear_x\":1.0"));
        assert!(wire.contains("\"angular_z\":0.0"));
        assert!(!wire.ends_with('\n'));
    }
}
