//! OBD-II Protocol Implementation
//!
//! Client side of an ELM327 adapter session: the setup handshake, the
//! round-robin PID poll, response framing on the `>` prompt and fixed-offset
//! hex decoding of CAN (ISO 15765-4) frames.
//!
//! The session is transport agnostic. [`serial::open`] wires it to a real
//! adapter, [`sim::SimulatedElm327`] to a scripted one.

mod assembler;
mod codec;
mod command;
mod error;
mod pid;
mod protocol;
pub mod serial;
mod session;
pub mod sim;
mod transport;

pub use assembler::{clean_response, Response, ResponseAssembler, PROMPT};
pub use codec::{
    compact, decode_adapter_version, decode_fuel_pressure, decode_pid, decode_protocol,
    decode_rpm, decode_speed, encode, DecodedSample, ECU_RESPONSE_ID, MODE_CURRENT_DATA_RESPONSE,
};
pub use command::{Command, COMMAND_TERMINATOR, POLL_SEQUENCE, SETUP_SEQUENCE};
pub use error::ObdError;
pub use pid::Pid;
pub use protocol::{describe_protocol_number, ObdProtocol};
pub use session::{AdapterSession, AdapterTelemetry, SessionEvent, SessionState};
pub use transport::{ChannelTransport, Transport};

