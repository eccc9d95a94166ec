//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! driver delivers exactly the lines the reference model predicts, to the
//! same clients, in the same order.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelServer    RealWorld       Compare
//!      (reference)   (ChatDriver)   Deliveries
//! ```
//!
//! After every step the standard invariants are checked against a snapshot
//! of the driver.

use std::collections::HashMap;

use arbitrary::{Arbitrary, Unstructured};
use bytes::Bytes;
use proptest::prelude::*;
use sala_core::{ChatDriver, DriverConfig, ServerAction, ServerEvent, SessionId};
use sala_harness::{
    ClientId, Deliveries, InvariantRegistry, ModelServer, NickChoice, Operation, RoomChoice,
    SystemSnapshot, TextChoice,
};

/// Real driver wrapper that mirrors [`ModelServer`]'s interface.
struct RealWorld {
    driver: ChatDriver,
    /// Live connection of each client
    sessions: HashMap<ClientId, SessionId>,
    next_session_id: SessionId,
}

impl RealWorld {
    fn new() -> Self {
        Self {
            driver: ChatDriver::new(DriverConfig::default()),
            sessions: HashMap::new(),
            next_session_id: 1,
        }
    }

    fn client_of(&self, session_id: SessionId) -> Option<ClientId> {
        self.sessions.iter().find(|(_, s)| **s == session_id).map(|(c, _)| *c)
    }

    fn apply(&mut self, op: &Operation) -> Deliveries {
        let client_id = op.client_id();
        let session = self.sessions.get(&client_id).copied();

        let event = match (op, session) {
            (Operation::Connect { .. }, None) => {
                let session_id = self.next_session_id;
                self.next_session_id += 1;
                self.sessions.insert(client_id, session_id);
                ServerEvent::ConnectionAccepted { session_id }
            },
            (Operation::Connect { .. }, Some(_)) | (_, None) => return Deliveries::new(),
            (Operation::Disconnect { .. }, Some(session_id)) => {
                ServerEvent::ConnectionClosed { session_id, reason: "peer closed".into() }
            },
            (_, Some(session_id)) => {
                let line = op.line().unwrap_or_default();
                ServerEvent::BytesReceived { session_id, data: Bytes::from(format!("{line}\n")) }
            },
        };

        let actions = self.driver.process_event(event).expect("driver rejected event");
        self.deliveries(actions)
    }

    fn deliveries(&mut self, actions: Vec<ServerAction>) -> Deliveries {
        let mut out = Deliveries::new();
        let mut closed = Vec::new();

        for action in actions {
            let (recipients, line) = match action {
                ServerAction::SendToSession { session_id, reply } => {
                    (vec![session_id], reply.to_string())
                },
                ServerAction::BroadcastToRoom { recipients, reply, .. } => {
                    (recipients, reply.to_string())
                },
                ServerAction::CloseConnection { session_id, .. } => {
                    closed.push(session_id);
                    continue;
                },
                ServerAction::Log { .. } => continue,
            };

            for session_id in recipients {
                let client = self.client_of(session_id).expect("delivery to unknown session");
                out.entry(client).or_default().push(line.clone());
            }
        }

        self.sessions.retain(|_, s| !closed.contains(s));
        out
    }
}

fn clamp_client_id(op: Operation, num_clients: usize) -> Operation {
    let id = op.client_id() % num_clients as u8;
    op.with_client_id(id)
}

fn nick_strategy() -> impl Strategy<Value = NickChoice> {
    prop_oneof![Just(NickChoice::Ana), Just(NickChoice::Rui), Just(NickChoice::Eva)]
}

fn room_strategy() -> impl Strategy<Value = RoomChoice> {
    prop_oneof![Just(RoomChoice::Lobby), Just(RoomChoice::Attic)]
}

fn text_strategy() -> impl Strategy<Value = TextChoice> {
    prop_oneof![
        Just(TextChoice::Plain),
        Just(TextChoice::Spaced),
        Just(TextChoice::Escaped),
        Just(TextChoice::DoubleEscaped),
        Just(TextChoice::UnknownCommand),
    ]
}

/// Strategy for generating operations with valid client IDs.
fn operation_strategy(num_clients: usize) -> impl Strategy<Value = Operation> {
    let client_id = 0..num_clients as u8;

    prop_oneof![
        // Weight towards operations that change shared state
        3 => client_id.clone().prop_map(|client_id| Operation::Connect { client_id }),
        1 => client_id.clone().prop_map(|client_id| Operation::Disconnect { client_id }),
        3 => (client_id.clone(), nick_strategy())
            .prop_map(|(client_id, name)| Operation::Nick { client_id, name }),
        1 => client_id.clone().prop_map(|client_id| Operation::NickWithoutName { client_id }),
        3 => (client_id.clone(), room_strategy())
            .prop_map(|(client_id, room)| Operation::Join { client_id, room }),
        1 => client_id.clone().prop_map(|client_id| Operation::Leave { client_id }),
        4 => (client_id.clone(), text_strategy())
            .prop_map(|(client_id, text)| Operation::Say { client_id, text }),
        2 => (client_id.clone(), nick_strategy(), text_strategy())
            .prop_map(|(client_id, target, text)| Operation::Private { client_id, target, text }),
        1 => client_id.prop_map(|client_id| Operation::Bye { client_id }),
    ]
}

fn run_and_compare(ops: &[Operation], num_clients: usize) -> Result<(), TestCaseError> {
    let mut model = ModelServer::new(num_clients);
    let mut real = RealWorld::new();
    let invariants = InvariantRegistry::standard();

    for (i, op) in ops.iter().enumerate() {
        let op = clamp_client_id(op.clone(), num_clients);

        let expected = model.apply(&op);
        let actual = real.apply(&op);
        prop_assert_eq!(&expected, &actual, "Divergence at operation {}: {:?}", i, op);

        let snapshot = SystemSnapshot::from_driver(&real.driver);
        if let Err(violations) = invariants.check_all(&snapshot) {
            return Err(TestCaseError::fail(format!(
                "Invariant violations after operation {i} ({op:?}): {violations:?}"
            )));
        }

        prop_assert_eq!(
            model.clients().iter().filter(|c| c.connected).count(),
            real.driver.session_count(),
            "Live session count divergence"
        );
    }
    Ok(())
}

proptest! {
    /// Every client receives the same lines from model and driver.
    #[test]
    fn prop_model_matches_real(
        num_clients in 2..5usize,
        ops in prop::collection::vec(operation_strategy(4), 0..80)
    ) {
        run_and_compare(&ops, num_clients)?;
    }

    /// Same comparison over operations decoded from raw bytes, as a fuzzer
    /// would produce them.
    #[test]
    fn prop_model_matches_real_unstructured(
        num_clients in 1..5usize,
        raw in prop::collection::vec(any::<u8>(), 0..512)
    ) {
        let mut u = Unstructured::new(&raw);
        let ops: Vec<Operation> = Vec::arbitrary(&mut u).unwrap_or_default();
        run_and_compare(&ops, num_clients)?;
    }

    /// Room membership in the model and the driver agree at the end.
    #[test]
    fn prop_room_membership_matches(
        ops in prop::collection::vec(operation_strategy(3), 0..60)
    ) {
        let mut model = ModelServer::new(3);
        let mut real = RealWorld::new();
        for op in &ops {
            model.apply(op);
            real.apply(op);
        }

        for room in [RoomChoice::Lobby, RoomChoice::Attic] {
            let expected: Vec<ClientId> = model.room_members(room.as_str()).into_iter().collect();
            let mut actual: Vec<ClientId> = real
                .driver
                .rooms()
                .members(room.as_str())
                .filter_map(|s| real.client_of(s))
                .collect();
            actual.sort_unstable();
            prop_assert_eq!(expected, actual, "Membership divergence in {}", room.as_str());
        }
    }
}

#[test]
fn scripted_session_matches_model() {
    let ops = [
        Operation::Connect { client_id: 0 },
        Operation::Connect { client_id: 1 },
        Operation::Nick { client_id: 0, name: NickChoice::Ana },
        Operation::Nick { client_id: 1, name: NickChoice::Ana },
        Operation::Nick { client_id: 1, name: NickChoice::Rui },
        Operation::Join { client_id: 0, room: RoomChoice::Lobby },
        Operation::Join { client_id: 1, room: RoomChoice::Lobby },
        Operation::Say { client_id: 0, text: TextChoice::Escaped },
        Operation::Private { client_id: 1, target: NickChoice::Ana, text: TextChoice::Spaced },
        Operation::Join { client_id: 0, room: RoomChoice::Lobby },
        Operation::Bye { client_id: 1 },
        Operation::Say { client_id: 1, text: TextChoice::Plain },
    ];

    let mut model = ModelServer::new(2);
    let mut real = RealWorld::new();
    for op in &ops {
        assert_eq!(model.apply(op), real.apply(op), "{op:?}");
    }
    assert_eq!(real.driver.session_count(), 1);
    assert_eq!(real.driver.rooms().members("lobby").count(), 1);
}
