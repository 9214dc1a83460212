//! Adapter Session
//!
//! State machine driving an ELM327 adapter: the fixed setup handshake, then
//! back-to-back round-robin PID polling. At most one command is in flight;
//! the reply to it (terminated by the `>` prompt) is the only thing that
//! triggers the next send.

use crate::assembler::ResponseAssembler;
use crate::codec::{self, DecodedSample};
use crate::command::{Command, POLL_SEQUENCE, SETUP_SEQUENCE};
use crate::error::ObdError;
use crate::pid::Pid;
use crate::transport::Transport;
use metrics::counter;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const STATUS_IDLE: &str = "idle";
const STATUS_CONFIGURING: &str = "configuring adapter";
const STATUS_STOPPED: &str = "session stopped";
const STATUS_TRANSPORT_UNAVAILABLE: &str = "transport unavailable";
const PROTOCOL_UNKNOWN: &str = "protocol unknown";

/// Session lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the transport to become ready
    Idle,
    /// Running `SETUP_SEQUENCE[index]`
    RunningSetup(usize),
    /// Polling `POLL_SEQUENCE[index]`
    Polling(usize),
    /// Transport lost; only `stop` leaves this state
    Faulted(String),
}

/// Values published to observers of the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterTelemetry {
    /// Vehicle speed (km/h), 0 when unknown
    pub speed: u8,
    /// Engine RPM, 0 when unknown
    pub rpm: u16,
    /// Fuel pressure (kPa), 0 when unknown
    pub fuel_pressure: u16,
    /// Answer to `ATI`
    pub adapter_version: String,
    /// Protocol reported by `ATDPN`
    pub protocol: String,
    /// Setup sequence completed
    pub is_initialized: bool,
    /// Human readable session status
    pub status: String,
    /// Last command written to the transport
    pub last_command: Option<String>,
    /// Last complete response as received
    pub raw_response: String,
    /// Last complete response after cleaning
    pub cleaned_response: String,
}

impl AdapterTelemetry {
    fn new(status: &str) -> Self {
        Self {
            speed: 0,
            rpm: 0,
            fuel_pressure: 0,
            adapter_version: String::new(),
            protocol: PROTOCOL_UNKNOWN.to_string(),
            is_initialized: false,
            status: status.to_string(),
            last_command: None,
            raw_response: String::new(),
            cleaned_response: String::new(),
        }
    }

    fn reset(&mut self, status: &str) {
        self.speed = 0;
        self.rpm = 0;
        self.fuel_pressure = 0;
        self.is_initialized = false;
        self.status = status.to_string();
        self.last_command = None;
        self.raw_response.clear();
        self.cleaned_response.clear();
    }
}

/// Outcome of one completed exchange
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A setup command was acknowledged
    SetupStep {
        command: Command,
        sample: Option<DecodedSample>,
    },
    /// The last setup command was acknowledged; polling has begun
    Initialized {
        protocol: String,
        adapter_version: String,
    },
    /// A polled PID was decoded
    Sample(DecodedSample),
    /// A polled PID reply did not match its frame layout
    DecodeFailed { command: Command, error: ObdError },
    /// A reply to a command outside the poll sequence arrived while polling
    Unrouted { command: Command, response: String },
}

/// ELM327 session over a [`Transport`]
pub struct AdapterSession<T: Transport> {
    transport: T,
    state: SessionState,
    assembler: ResponseAssembler,
    in_flight: Option<Command>,
    telemetry: watch::Sender<AdapterTelemetry>,
}

impl<T: Transport> AdapterSession<T> {
    /// Create an idle session writing to `transport`
    pub fn new(transport: T) -> Self {
        let (telemetry, _) = watch::channel(AdapterTelemetry::new(STATUS_IDLE));
        Self {
            transport,
            state: SessionState::Idle,
            assembler: ResponseAssembler::new(),
            in_flight: None,
            telemetry,
        }
    }

    /// Current state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Observe published values
    pub fn subscribe(&self) -> watch::Receiver<AdapterTelemetry> {
        self.telemetry.subscribe()
    }

    /// Snapshot of the published values
    pub fn telemetry(&self) -> AdapterTelemetry {
        self.telemetry.borrow().clone()
    }

    /// Whether the setup sequence has completed
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, SessionState::Polling(_))
    }

    /// Command awaiting its reply, if any
    pub fn in_flight(&self) -> Option<Command> {
        self.in_flight
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Transport is ready: begin the setup sequence.
    pub fn start(&mut self) -> Result<(), ObdError> {
        if self.state != SessionState::Idle {
            warn!("Start requested in state {:?}", self.state);
            return Err(ObdError::AlreadyStarted);
        }

        info!("Transport ready, configuring adapter");
        self.set_status(STATUS_CONFIGURING);
        self.enter(SessionState::RunningSetup(0));
        Ok(())
    }

    /// Return to `Idle` from any state.
    ///
    /// Abandons the in-flight command and any partial response, zeroes the
    /// published scalars. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.state != SessionState::Idle {
            info!("Stopping adapter session (was {:?})", self.state);
        }
        self.state = SessionState::Idle;
        self.in_flight = None;
        self.assembler.reset();
        self.telemetry.send_modify(|t| t.reset(STATUS_STOPPED));
    }

    /// Move to `Faulted`; chunks are ignored until `stop`.
    pub fn fault(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        error!("Adapter session faulted: {}", reason);
        self.in_flight = None;
        self.assembler.reset();
        self.telemetry.send_modify(|t| {
            t.is_initialized = false;
            t.status = format!("faulted: {}", reason);
        });
        self.state = SessionState::Faulted(reason);
    }

    /// Write a command, unless one is still awaiting its reply.
    pub fn send(&mut self, command: Command) -> Result<(), ObdError> {
        if matches!(self.state, SessionState::Idle | SessionState::Faulted(_)) {
            return Err(ObdError::NotStarted);
        }
        if let Some(pending) = self.in_flight {
            return Err(ObdError::CommandInFlight(pending.to_string()));
        }

        self.transport.send(&codec::encode(command))?;
        self.in_flight = Some(command);
        self.telemetry
            .send_modify(|t| t.last_command = Some(command.to_string()));
        counter!("obd_commands_sent_total").increment(1);
        debug!("Sent {}", command);
        Ok(())
    }

    /// Feed one inbound transport chunk.
    ///
    /// Returns the outcome once a complete response has been processed.
    pub fn on_chunk(&mut self, chunk: &[u8]) -> Option<SessionEvent> {
        if matches!(self.state, SessionState::Idle | SessionState::Faulted(_)) {
            debug!("Ignoring {} byte chunk in state {:?}", chunk.len(), self.state);
            return None;
        }

        let response = self.assembler.feed(chunk)?;
        counter!("obd_responses_total").increment(1);
        self.telemetry.send_modify(|t| {
            t.raw_response = response.raw.clone();
            t.cleaned_response = response.cleaned.clone();
        });

        let command = match self.in_flight.take() {
            Some(command) => command,
            None => {
                warn!("Unsolicited response: {:?}", response.cleaned);
                return None;
            }
        };

        match self.state {
            SessionState::RunningSetup(index) => {
                Some(self.complete_setup_step(index, command, &response.cleaned))
            }
            SessionState::Polling(index) => {
                Some(self.complete_poll(index, command, &response.cleaned))
            }
            SessionState::Idle | SessionState::Faulted(_) => None,
        }
    }

    fn complete_setup_step(&mut self, index: usize, command: Command, cleaned: &str) -> SessionEvent {
        debug!("{} -> {:?}", command, cleaned);

        let sample = match command {
            Command::IDENTIFY => Some(codec::decode_adapter_version(cleaned)),
            Command::DESCRIBE_PROTOCOL_NUMBER => Some(codec::decode_protocol(cleaned)),
            _ => None,
        };
        match &sample {
            Some(DecodedSample::AdapterVersion(version)) => {
                info!("Adapter version: {}", version);
                self.telemetry
                    .send_modify(|t| t.adapter_version = version.clone());
            }
            Some(DecodedSample::ProtocolId(protocol)) => {
                info!("Adapter protocol: {}", protocol);
                self.telemetry.send_modify(|t| t.protocol = protocol.clone());
            }
            _ => {}
        }

        if index + 1 < SETUP_SEQUENCE.len() {
            self.enter(SessionState::RunningSetup(index + 1));
            return SessionEvent::SetupStep { command, sample };
        }

        let (protocol, adapter_version) = {
            let t = self.telemetry.borrow();
            (t.protocol.clone(), t.adapter_version.clone())
        };
        info!("Adapter initialized [{}], starting PID polling", protocol);
        self.telemetry.send_modify(|t| {
            t.is_initialized = true;
            t.status = format!("ready [{}]", t.protocol);
        });
        self.enter(SessionState::Polling(0));

        SessionEvent::Initialized {
            protocol,
            adapter_version,
        }
    }

    fn complete_poll(&mut self, index: usize, command: Command, cleaned: &str) -> SessionEvent {
        let event = match command.pid() {
            Some(pid) => match codec::decode_pid(pid, cleaned) {
                Ok(sample) => {
                    debug!("{} -> {:?}", command, sample);
                    self.publish(&sample);
                    SessionEvent::Sample(sample)
                }
                Err(error) => {
                    warn!("Invalid {:?} response: {:?}", pid, cleaned);
                    counter!("obd_decode_failures_total", "pid" => format!("{:02X}", pid.as_hex()))
                        .increment(1);
                    self.reset_scalar(pid);
                    SessionEvent::DecodeFailed { command, error }
                }
            },
            None => {
                warn!("Unexpected response for command {}: {:?}", command, cleaned);
                SessionEvent::Unrouted {
                    command,
                    response: cleaned.to_string(),
                }
            }
        };

        self.enter(SessionState::Polling((index + 1) % POLL_SEQUENCE.len()));
        event
    }

    /// Transition and run the entry action (send the state's command)
    fn enter(&mut self, state: SessionState) {
        let command = match state {
            SessionState::RunningSetup(index) => SETUP_SEQUENCE[index],
            SessionState::Polling(index) => POLL_SEQUENCE[index],
            SessionState::Idle | SessionState::Faulted(_) => {
                self.state = state;
                return;
            }
        };
        self.state = state;

        match self.send(command) {
            Ok(()) => {}
            Err(ObdError::TransportUnavailable) => {
                warn!("Transport unavailable, dropping {}", command);
                self.set_status(STATUS_TRANSPORT_UNAVAILABLE);
            }
            Err(ObdError::TransportClosed(reason)) => self.fault(reason),
            Err(e) => warn!("Failed to send {}: {}", command, e),
        }
    }

    fn publish(&mut self, sample: &DecodedSample) {
        self.telemetry.send_modify(|t| match *sample {
            DecodedSample::Speed(speed) => t.speed = speed,
            DecodedSample::Rpm(rpm) => t.rpm = rpm,
            DecodedSample::FuelPressure(pressure) => t.fuel_pressure = pressure,
            DecodedSample::ProtocolId(_) | DecodedSample::AdapterVersion(_) => {}
        });
    }

    fn reset_scalar(&mut self, pid: Pid) {
        self.telemetry.send_modify(|t| match pid {
            Pid::Speed => t.speed = 0,
            Pid::Rpm => t.rpm = 0,
            Pid::FuelPressure => t.fuel_pressure = 0,
        });
    }

    fn set_status(&mut self, status: &str) {
        self.telemetry.send_modify(|t| t.status = status.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records writes; optionally refuses them
    #[derive(Default)]
    struct Recorder {
        sent: Vec<String>,
        unavailable: bool,
        closed: bool,
    }

    impl Transport for Recorder {
        fn send(&mut self, bytes: &[u8]) -> Result<(), ObdError> {
            if self.closed {
                return Err(ObdError::TransportClosed("link lost".to_string()));
            }
            if self.unavailable {
                return Err(ObdError::TransportUnavailable);
            }
            self.sent.push(String::from_utf8_lossy(bytes).to_string());
            Ok(())
        }
    }

    fn initialized_session() -> AdapterSession<Recorder> {
        let mut session = AdapterSession::new(Recorder::default());
        session.start().unwrap();
        for reply in ["ELM327 v1.5\r\r>", "OK>", "OK>", "OK>", "OK>", "OK>", "6\r\r>", "ELM327 v1.5\r\r>"] {
            session.on_chunk(reply.as_bytes());
        }
        session.on_chunk(b"7E8064100BE3FA813\r\r>");
        session
    }

    #[test]
    fn test_start_sends_first_setup_command() {
        let mut session = AdapterSession::new(Recorder::default());
        session.start().unwrap();
        assert_eq!(session.state(), &SessionState::RunningSetup(0));
        assert_eq!(session.transport().sent, vec!["ATZ\r"]);
        assert_eq!(session.in_flight(), Some(Command::RESET));
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut session = AdapterSession::new(Recorder::default());
        session.start().unwrap();
        assert_eq!(session.start(), Err(ObdError::AlreadyStarted));
        assert_eq!(session.transport().sent.len(), 1);
    }

    #[test]
    fn test_second_send_while_in_flight_rejected() {
        let mut session = AdapterSession::new(Recorder::default());
        session.start().unwrap();
        let err = session.send(Command::IDENTIFY).unwrap_err();
        assert_eq!(err, ObdError::CommandInFlight("ATZ".to_string()));
        assert_eq!(session.transport().sent, vec!["ATZ\r"]);
    }

    #[test]
    fn test_send_requires_started_session() {
        let mut session = AdapterSession::new(Recorder::default());
        assert_eq!(session.send(Command::SPEED), Err(ObdError::NotStarted));
    }

    #[test]
    fn test_setup_completes_and_polling_begins() {
        let session = initialized_session();
        assert!(session.is_initialized());
        assert_eq!(session.state(), &SessionState::Polling(0));

        let sent = &session.transport().sent;
        let expected: Vec<String> = SETUP_SEQUENCE
            .iter()
            .chain(std::iter::once(&Command::SPEED))
            .map(|c| format!("{}\r", c))
            .collect();
        assert_eq!(sent, &expected);

        let telemetry = session.telemetry();
        assert!(telemetry.is_initialized);
        assert_eq!(telemetry.adapter_version, "ELM327 v1.5");
        assert_eq!(telemetry.protocol, "ISO 15765-4 (CAN)");
        assert_eq!(telemetry.status, "ready [ISO 15765-4 (CAN)]");
    }

    #[test]
    fn test_poll_cycles_with_wraparound() {
        let mut session = initialized_session();

        let event = session.on_chunk(b"7E803410D32\r\r>");
        assert_eq!(event, Some(SessionEvent::Sample(DecodedSample::Speed(50))));
        assert_eq!(session.state(), &SessionState::Polling(1));

        session.on_chunk(b"7E804410C1AF8\r\r>");
        assert_eq!(session.telemetry().rpm, 1726);
        assert_eq!(session.state(), &SessionState::Polling(2));

        session.on_chunk(b"7E803410A64\r\r>");
        assert_eq!(session.telemetry().fuel_pressure, 300);
        assert_eq!(session.state(), &SessionState::Polling(0));
        assert_eq!(session.transport().sent.last().unwrap(), "01 0D\r");
    }

    #[test]
    fn test_decode_failure_resets_scalar_and_keeps_polling() {
        let mut session = initialized_session();
        session.on_chunk(b"7E803410D32>");
        assert_eq!(session.telemetry().speed, 50);

        // skip RPM and fuel pressure
        session.on_chunk(b"7E804410C1AF8>");
        session.on_chunk(b"7E803410A64>");

        let event = session.on_chunk(b"NO DATA\r\r>");
        assert!(matches!(
            event,
            Some(SessionEvent::DecodeFailed { command: Command::SPEED, .. })
        ));
        assert_eq!(session.telemetry().speed, 0);
        assert_eq!(session.state(), &SessionState::Polling(1));
        assert_eq!(session.in_flight(), Some(Command::RPM));
    }

    #[test]
    fn test_unknown_protocol_number() {
        let mut session = AdapterSession::new(Recorder::default());
        session.start().unwrap();
        for reply in ["OK>", "OK>", "OK>", "OK>", "OK>", "OK>"] {
            session.on_chunk(reply.as_bytes());
        }
        let event = session.on_chunk(b"9>");
        assert_eq!(
            event,
            Some(SessionEvent::SetupStep {
                command: Command::DESCRIBE_PROTOCOL_NUMBER,
                sample: Some(DecodedSample::ProtocolId("Protocol 9".to_string())),
            })
        );
    }

    #[test]
    fn test_unsolicited_response_ignored() {
        let mut session = AdapterSession::new(Recorder::default());
        session.start().unwrap();
        // ATE0 cannot be written, so nothing is awaiting a reply
        session.transport_mut().unavailable = true;
        assert!(session.on_chunk(b"ELM327 v1.5\r\r>").is_some());
        assert_eq!(session.in_flight(), None);

        assert_eq!(session.on_chunk(b"OK>"), None);
        assert_eq!(session.state(), &SessionState::RunningSetup(1));
        assert_eq!(session.telemetry().cleaned_response, "OK");
        assert_eq!(session.transport().sent, vec!["ATZ\r"]);
    }

    #[test]
    fn test_noise_byte_before_prompt_still_advances_setup() {
        let mut session = AdapterSession::new(Recorder::default());
        session.start().unwrap();
        assert!(session.on_chunk(b"ELM327 v1.5\r\r\xff>").is_some());
        assert_eq!(session.state(), &SessionState::RunningSetup(1));
        assert_eq!(session.in_flight(), Some(Command::ECHO_OFF));
        assert_eq!(session.telemetry().cleaned_response, "ELM327 v1.5");
    }

    #[test]
    fn test_stop_is_idempotent_and_resets() {
        let mut session = initialized_session();
        session.on_chunk(b"7E803410D32>");
        session.on_chunk(b"7E804410C1A");

        session.stop();
        session.stop();

        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.in_flight(), None);
        let telemetry = session.telemetry();
        assert_eq!((telemetry.speed, telemetry.rpm, telemetry.fuel_pressure), (0, 0, 0));
        assert!(!telemetry.is_initialized);
        assert_eq!(telemetry.status, "session stopped");

        // partial reply was discarded: a fresh start runs setup from the top
        session.start().unwrap();
        assert_eq!(session.state(), &SessionState::RunningSetup(0));
        assert_eq!(session.transport().sent.last().unwrap(), "ATZ\r");
    }

    #[test]
    fn test_chunks_ignored_when_idle() {
        let mut session = AdapterSession::new(Recorder::default());
        assert_eq!(session.on_chunk(b"OK>"), None);
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_transport_unavailable_keeps_state() {
        let mut session = AdapterSession::new(Recorder {
            unavailable: true,
            ..Default::default()
        });
        session.start().unwrap();
        assert_eq!(session.state(), &SessionState::RunningSetup(0));
        assert_eq!(session.in_flight(), None);
        assert_eq!(session.telemetry().status, "transport unavailable");
    }

    #[test]
    fn test_transport_closed_faults() {
        let mut session = initialized_session();
        session.transport_mut().closed = true;
        session.on_chunk(b"7E803410D32>");
        assert_eq!(
            session.state(),
            &SessionState::Faulted("link lost".to_string())
        );
        assert_eq!(session.on_chunk(b"7E804410C1AF8>"), None);

        session.stop();
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_subscribers_see_updates() {
        let mut session = initialized_session();
        let rx = session.subscribe();
        session.on_chunk(b"7E803410D48>");
        assert_eq!(rx.borrow().speed, 72);
        assert_eq!(rx.borrow().cleaned_response, "7E803410D48");
    }
}
