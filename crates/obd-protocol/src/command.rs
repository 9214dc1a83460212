//! Adapter commands and the fixed setup / poll sequences

use crate::pid::Pid;
use std::fmt;

/// Carriage return terminating every command on the wire
pub const COMMAND_TERMINATOR: u8 = b'\r';

/// An AT or PID command token, sent verbatim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command(&'static str);

impl Command {
    /// Reset all
    pub const RESET: Command = Command("ATZ");
    /// Echo off
    pub const ECHO_OFF: Command = Command("ATE0");
    /// Linefeeds off
    pub const LINEFEEDS_OFF: Command = Command("ATL0");
    /// Headers on, so responses carry the ECU address
    pub const HEADERS_ON: Command = Command("ATH1");
    /// Spaces off
    pub const SPACES_OFF: Command = Command("ATS0");
    /// Select ISO 15765-4 CAN (11 bit, 500 kbaud)
    pub const PROTOCOL_CAN: Command = Command("ATSP6");
    /// Describe protocol by number
    pub const DESCRIBE_PROTOCOL_NUMBER: Command = Command("ATDPN");
    /// Adapter identification
    pub const IDENTIFY: Command = Command("ATI");
    /// Supported PIDs 01-20, wakes up the bus
    pub const SUPPORTED_PIDS: Command = Command("0100");
    /// Vehicle speed
    pub const SPEED: Command = Command("01 0D");
    /// Engine RPM
    pub const RPM: Command = Command("01 0C");
    /// Fuel pressure
    pub const FUEL_PRESSURE: Command = Command("01 0A");

    /// The command token as sent, without terminator
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// PID requested by this command, if it is one of the polled PIDs
    pub fn pid(&self) -> Option<Pid> {
        match *self {
            Command::SPEED => Some(Pid::Speed),
            Command::RPM => Some(Pid::Rpm),
            Command::FUEL_PRESSURE => Some(Pid::FuelPressure),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Adapter configuration, run once per session in this order
pub const SETUP_SEQUENCE: [Command; 9] = [
    Command::RESET,
    Command::ECHO_OFF,
    Command::LINEFEEDS_OFF,
    Command::HEADERS_ON,
    Command::SPACES_OFF,
    Command::PROTOCOL_CAN,
    Command::DESCRIBE_PROTOCOL_NUMBER,
    Command::IDENTIFY,
    Command::SUPPORTED_PIDS,
];

/// PID requests cycled with wraparound once initialized
pub const POLL_SEQUENCE: [Command; 3] = [Command::SPEED, Command::RPM, Command::FUEL_PRESSURE];
