//! Frame Codec
//!
//! Encodes commands for the wire and decodes cleaned adapter responses.
//!
//! With headers on and spaces off, a Mode 01 reply is a run of hex digits
//! laid out at fixed offsets:
//!
//! ```text
//! 7E8 03 41 0D 32
//! ECU LEN MODE PID DATA...
//! ```

use crate::command::{Command, COMMAND_TERMINATOR};
use crate::error::ObdError;
use crate::pid::Pid;
use crate::protocol::describe_protocol_number;
use serde::{Deserialize, Serialize};

/// Address of the engine ECU answering functional requests
pub const ECU_RESPONSE_ID: &str = "7E8";
/// Positive response to a Mode 01 request
pub const MODE_CURRENT_DATA_RESPONSE: &str = "41";

const LEN_OFFSET: usize = 3;
const MODE_OFFSET: usize = 5;
const PID_OFFSET: usize = 7;
const DATA_OFFSET: usize = 9;

/// A value decoded from one complete response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodedSample {
    /// Vehicle speed (km/h)
    Speed(u8),
    /// Engine RPM
    Rpm(u16),
    /// Fuel pressure (kPa)
    FuelPressure(u16),
    /// Protocol description from `ATDPN`
    ProtocolId(String),
    /// Adapter identification from `ATI`
    AdapterVersion(String),
}

/// Encode a command for the wire (token + carriage return)
pub fn encode(command: Command) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(command.as_str().len() + 1);
    bytes.extend_from_slice(command.as_str().as_bytes());
    bytes.push(COMMAND_TERMINATOR);
    bytes
}

/// Strip the internal spaces of a cleaned response
pub fn compact(cleaned: &str) -> String {
    cleaned.chars().filter(|c| *c != ' ').collect()
}

/// Decode a speed response (PID 0D), km/h
pub fn decode_speed(cleaned: &str) -> Result<u8, ObdError> {
    let data = data_bytes(cleaned, Pid::Speed)?;
    Ok(data[0])
}

/// Decode an RPM response (PID 0C): `(A*256 + B) / 4`
pub fn decode_rpm(cleaned: &str) -> Result<u16, ObdError> {
    let data = data_bytes(cleaned, Pid::Rpm)?;
    let raw = u32::from(data[0]) * 256 + u32::from(data[1]);
    Ok((raw / 4) as u16)
}

/// Decode a fuel pressure response (PID 0A): `A * 3` kPa
pub fn decode_fuel_pressure(cleaned: &str) -> Result<u16, ObdError> {
    let data = data_bytes(cleaned, Pid::FuelPressure)?;
    Ok(u16::from(data[0]) * 3)
}

/// Decode a response to one of the polled PIDs
pub fn decode_pid(pid: Pid, cleaned: &str) -> Result<DecodedSample, ObdError> {
    match pid {
        Pid::Speed => decode_speed(cleaned).map(DecodedSample::Speed),
        Pid::Rpm => decode_rpm(cleaned).map(DecodedSample::Rpm),
        Pid::FuelPressure => decode_fuel_pressure(cleaned).map(DecodedSample::FuelPressure),
    }
}

/// Decode the answer to `ATDPN`; the cleaned text is the protocol number
pub fn decode_protocol(cleaned: &str) -> DecodedSample {
    DecodedSample::ProtocolId(describe_protocol_number(cleaned))
}

/// Decode the answer to `ATI`; free text, kept as is
pub fn decode_adapter_version(cleaned: &str) -> DecodedSample {
    DecodedSample::AdapterVersion(cleaned.to_string())
}

/// Validate the fixed header fields and extract the data bytes
fn data_bytes(cleaned: &str, pid: Pid) -> Result<Vec<u8>, ObdError> {
    let frame = compact(cleaned);
    let mismatch = || ObdError::DecodeMismatch {
        pid,
        response: cleaned.to_string(),
    };

    if frame.len() < pid.min_response_len() || !frame.starts_with(ECU_RESPONSE_ID) {
        return Err(mismatch());
    }

    let length = format!("{:02X}", pid.frame_length());
    let pid_hex = format!("{:02X}", pid.as_hex());
    if field(&frame, LEN_OFFSET) != Some(length.as_str())
        || field(&frame, MODE_OFFSET) != Some(MODE_CURRENT_DATA_RESPONSE)
        || field(&frame, PID_OFFSET) != Some(pid_hex.as_str())
    {
        return Err(mismatch());
    }

    (0..pid.response_bytes())
        .map(|i| hex_byte(&frame, DATA_OFFSET + 2 * i).ok_or_else(mismatch))
        .collect()
}

/// Two-character header field at `offset`
fn field(frame: &str, offset: usize) -> Option<&str> {
    frame.get(offset..offset + 2)
}

/// Hex byte at `offset`. A frame cut short after the first digit yields
/// that single digit.
fn hex_byte(frame: &str, offset: usize) -> Option<u8> {
    let end = (offset + 2).min(frame.len());
    let digits = frame.get(offset..end)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}
