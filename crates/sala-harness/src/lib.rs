//! Deterministic test harness for the Sala chat server.
//!
//! # Invariant Testing
//!
//! The `invariants` module captures properties that must hold between any
//! two events, checked against a [`SystemSnapshot`] taken from a live
//! [`ChatDriver`](sala_core::ChatDriver). Use
//! [`InvariantRegistry::standard()`] for the full set.
//!
//! # Model-Based Testing
//!
//! The `model` module is a naive reference server. Random
//! [`Operation`] sequences are applied to both the model and the real
//! driver; the lines each client receives must match.
//!
//! # Network Simulation
//!
//! The `sim` module runs the production [`Server`](sala_server::Server)
//! event loop over turmoil's simulated TCP, with a line-oriented
//! [`SimClient`] to drive it.

pub mod invariants;
pub mod model;
pub mod sim;

pub use invariants::{
    Invariant, InvariantRegistry, InvariantResult, MembershipConsistency, NicknameUniqueness,
    NoEmptyRooms, SessionSnapshot, SystemSnapshot, Violation,
};
pub use model::{
    ClientId, Deliveries, ModelClient, ModelServer, NickChoice, Operation, RoomChoice, TextChoice,
};
pub use sim::{SimClient, SimListener, serve};
