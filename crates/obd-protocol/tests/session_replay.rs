//! Replays an adapter byte stream with awkward chunk boundaries through a
//! session wired to a `ChannelTransport`.

use obd_protocol::{
    AdapterSession, ChannelTransport, DecodedSample, SessionEvent, SessionState, SETUP_SEQUENCE,
};

const SETUP_REPLIES: [&str; 9] = [
    "ATZ\r\r\rELM327 v1.5\r\r>",
    "ATE0\rOK\r\r>",
    "OK\r\r>",
    "OK\r\r>",
    "OK\r\r>",
    "OK\r\r>",
    "6\r\r>",
    "ELM327 v1.5\r\r>",
    "7E8 06 41 00 BE 3F A8 13 \r\r>",
];

fn split_every(reply: &str, size: usize) -> Vec<Vec<u8>> {
    reply.as_bytes().chunks(size).map(<[u8]>::to_vec).collect()
}

#[test]
fn setup_then_poll_over_split_chunks() {
    let (transport, mut wire) = ChannelTransport::new();
    let mut session = AdapterSession::new(transport);
    session.start().unwrap();

    let mut events = Vec::new();
    for (i, reply) in SETUP_REPLIES.iter().enumerate() {
        for chunk in split_every(reply, 3 + i % 4) {
            events.extend(session.on_chunk(&chunk));
        }
    }

    assert_eq!(events.len(), SETUP_SEQUENCE.len());
    assert!(matches!(events.last(), Some(SessionEvent::Initialized { .. })));
    assert_eq!(session.state(), &SessionState::Polling(0));

    let written: Vec<Vec<u8>> = std::iter::from_fn(|| wire.try_recv().ok()).collect();
    assert_eq!(written.len(), SETUP_SEQUENCE.len() + 1);
    assert_eq!(written[0], b"ATZ\r".to_vec());
    assert_eq!(written.last().unwrap(), &b"01 0D\r".to_vec());

    let polls = [
        ("7E8 03 41 0D 3C \r\r>", DecodedSample::Speed(60)),
        ("7E8 04 41 0C 0F A0 \r\r>", DecodedSample::Rpm(1000)),
        ("7E8 03 41 0A 2D \r\r>", DecodedSample::FuelPressure(135)),
    ];
    for (reply, expected) in polls {
        let mut outcome = None;
        for chunk in split_every(reply, 5) {
            if let Some(event) = session.on_chunk(&chunk) {
                outcome = Some(event);
            }
        }
        assert_eq!(outcome, Some(SessionEvent::Sample(expected)));
    }

    let telemetry = session.telemetry();
    assert_eq!((telemetry.speed, telemetry.rpm, telemetry.fuel_pressure), (60, 1000, 135));
    assert_eq!(telemetry.last_command.as_deref(), Some("01 0D"));
}

#[test]
fn closed_writer_faults_session() {
    let (transport, wire) = ChannelTransport::new();
    let mut session = AdapterSession::new(transport);
    session.start().unwrap();
    drop(wire);

    session.on_chunk(b"ELM327 v1.5\r\r>");
    assert!(matches!(session.state(), SessionState::Faulted(_)));
    assert!(session.telemetry().status.starts_with("faulted: "));
}
