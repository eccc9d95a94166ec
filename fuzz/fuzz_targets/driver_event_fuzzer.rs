//! Fuzz target for ChatDriver event processing
//!
//! Prevent registry desync under hostile input (HIGH priority)
//!
//! # Strategy
//!
//! - A few sessions sending command lines, raw bytes and fragments
//! - Connections accepted, closed and re-accepted in any order
//! - A small line limit so oversized input is exercised
//!
//! # Invariants
//!
//! - The driver never panics
//! - A session is inside a room iff the room lists it as a member
//! - Nicknames map one-to-one onto named sessions
//! - No room exists without members
//! - Broadcasts never include the session that caused them, and never
//!   include sessions that are not live

#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use sala_core::{ChatDriver, DriverConfig, ServerAction, ServerEvent, SessionId};

const SESSIONS: u8 = 4;

#[derive(Debug, Arbitrary)]
enum Step {
    Accept(u8),
    Close(u8),
    Line(u8, LineChoice),
    Raw(u8, Vec<u8>),
}

#[derive(Debug, Arbitrary)]
enum LineChoice {
    Nick(u8),
    Join(u8),
    Leave,
    Priv(u8, String),
    Bye,
    Text(String),
}

impl LineChoice {
    fn render(&self) -> String {
        match self {
            Self::Nick(n) => format!("/nick n{}\n", n % 3),
            Self::Join(r) => format!("/join r{}\n", r % 2),
            Self::Leave => "/leave\n".to_owned(),
            Self::Priv(n, text) => format!("/priv n{} {text}\n", n % 3),
            Self::Bye => "/bye\n".to_owned(),
            Self::Text(text) => format!("{text}\n"),
        }
    }
}

fn check(driver: &ChatDriver) {
    for session in driver.sessions() {
        match session.room() {
            Some(room) => assert!(driver.rooms().is_member(room, session.id())),
            None => assert!(!driver.rooms().iter().any(|(_, m)| m.contains(&session.id()))),
        }
        if let Some(nickname) = session.nickname() {
            assert_eq!(driver.nicknames().lookup(nickname), Some(session.id()));
        }
    }
    for (room, members) in driver.rooms().iter() {
        assert!(!members.is_empty(), "empty room {room}");
    }
    let named = driver.sessions().filter(|s| s.nickname().is_some()).count();
    assert_eq!(driver.nicknames().len(), named);
}

fuzz_target!(|steps: Vec<Step>| {
    let config = DriverConfig { max_line_length: 64, ..DriverConfig::default() };
    let mut driver = ChatDriver::new(config);

    for step in steps {
        let (origin, event) = match step {
            Step::Accept(s) => {
                let session_id = SessionId::from(s % SESSIONS);
                (None, ServerEvent::ConnectionAccepted { session_id })
            },
            Step::Close(s) => {
                let session_id = SessionId::from(s % SESSIONS);
                (None, ServerEvent::ConnectionClosed { session_id, reason: "fuzz".into() })
            },
            Step::Line(s, line) => {
                let session_id = SessionId::from(s % SESSIONS);
                let data = Bytes::from(line.render());
                (Some(session_id), ServerEvent::BytesReceived { session_id, data })
            },
            Step::Raw(s, bytes) => {
                let session_id = SessionId::from(s % SESSIONS);
                let data = Bytes::from(bytes);
                (Some(session_id), ServerEvent::BytesReceived { session_id, data })
            },
        };

        let Ok(actions) = driver.process_event(event) else {
            continue;
        };

        for action in &actions {
            if let ServerAction::BroadcastToRoom { recipients, .. } = action {
                for id in recipients {
                    assert!(driver.session(*id).is_some(), "broadcast to dead session {id}");
                    assert_ne!(origin, Some(*id), "broadcast echoed to its sender");
                }
            }
        }
        check(&driver);
    }
});
