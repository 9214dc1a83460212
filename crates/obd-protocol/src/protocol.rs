//! OBD-II Protocol Definitions

use serde::{Deserialize, Serialize};

/// Protocols reported by `ATDPN` that the session knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObdProtocol {
    /// Automatic protocol detection
    Auto,
    /// ISO 9141-2 (10.4 kbaud, 5 baud init)
    Iso9141_2,
    /// ISO 14230-4 KWP (slow init, 10.4 kbaud)
    Iso14230_4Kwp,
    /// ISO 15765-4 CAN (11 bit ID, 500 kbaud)
    Iso15765_4Can,
}

impl ObdProtocol {
    /// Parse the (trimmed) answer to `ATDPN`
    pub fn from_number(num: &str) -> Option<Self> {
        match num.trim() {
            "A" => Some(ObdProtocol::Auto),
            "3" => Some(ObdProtocol::Iso9141_2),
            "4" => Some(ObdProtocol::Iso14230_4Kwp),
            "6" => Some(ObdProtocol::Iso15765_4Can),
            _ => None,
        }
    }

    /// Human readable protocol name
    pub fn label(&self) -> &'static str {
        match self {
            ObdProtocol::Auto => "AUTO",
            ObdProtocol::Iso9141_2 => "ISO 9141-2",
            ObdProtocol::Iso14230_4Kwp => "ISO 14230-4 (KWP)",
            ObdProtocol::Iso15765_4Can => "ISO 15765-4 (CAN)",
        }
    }

    /// Get the ELM327 AT command selecting this protocol
    pub fn to_elm_command(&self) -> &'static str {
        match self {
            ObdProtocol::Auto => "ATSP0",
            ObdProtocol::Iso9141_2 => "ATSP3",
            ObdProtocol::Iso14230_4Kwp => "ATSP4",
            ObdProtocol::Iso15765_4Can => "ATSP6",
        }
    }
}

impl Default for ObdProtocol {
    fn default() -> Self {
        ObdProtocol::Iso15765_4Can
    }
}

/// Map an `ATDPN` answer to the protocol string published by the session.
///
/// Unknown numbers are reported generically as `Protocol <num>`.
pub fn describe_protocol_number(num: &str) -> String {
    let num = num.trim();
    match ObdProtocol::from_number(num) {
        Some(protocol) => protocol.label().to_string(),
        None => format!("Protocol {}", num),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    #[test]
    fn test_known_protocol_numbers() {
        assert_eq!(describe_protocol_number("6"), "ISO 15765-4 (CAN)");
        assert_eq!(describe_protocol_number("3"), "ISO 9141-2");
        assert_eq!(describe_protocol_number("4"), "ISO 14230-4 (KWP)");
        assert_eq!(describe_protocol_number("A"), "AUTO");
    }

    #[test]
    fn test_unknown_protocol_number() {
        assert_eq!(describe_protocol_number(" 7 "), "Protocol 7");
        assert_eq!(describe_protocol_number("A6"), "Protocol A6");
    }

    #[test]
    fn test_setup_selects_can() {
        assert_eq!(
            ObdProtocol::default().to_elm_command(),
            Command::PROTOCOL_CAN.as_str()
        );
    }
}
