//! Reference model for model-based testing.
//!
//! [`ModelServer`] restates the chat protocol in the most direct way
//! possible: a vector of clients, each with an optional nickname and room.
//! Rooms are not stored; they are whatever set of clients currently names
//! them. Uniqueness is checked by scanning. Nothing is indexed, unlike the
//! registries in [`sala_core`].

mod operation;
mod server;

pub use operation::{ClientId, NickChoice, Operation, RoomChoice, TextChoice};
pub use server::{Deliveries, ModelClient, ModelServer};
