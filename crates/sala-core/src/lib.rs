//! Sala server core.
//!
//! All chat semantics live here, free of I/O. The runtime feeds
//! [`ServerEvent`]s into a [`ChatDriver`] and executes the [`ServerAction`]s
//! it returns. The same driver runs under the production tokio runtime, the
//! turmoil simulation, and plain unit tests.
//!
//! # Architecture
//!
//! ```text
//!  runtime ──ServerEvent──> ChatDriver ──ServerAction──> runtime
//!                             │
//!              ┌──────────────┼───────────────┐
//!              ▼              ▼               ▼
//!          Session      SessionRegistry   RoomRegistry
//!     (state + framer)   (nick → id)    (room → members)
//! ```
//!
//! The driver is owned by a single task. Every mutation of the registries
//! happens inside [`ChatDriver::process_event`], so the invariants below hold
//! between any two events without locking:
//!
//! - A session is `Inside` a room iff it is in that room's member set
//! - No two sessions hold the same nickname
//! - No room has zero members

pub mod delivery;
pub mod driver;
pub mod error;
pub mod registry;
pub mod room;
pub mod session;

pub use delivery::Outbox;
pub use driver::{ChatDriver, DriverConfig, LogLevel, ServerAction, ServerEvent};
pub use error::{CommandError, DriverError};
pub use registry::SessionRegistry;
pub use room::{Departure, RoomRegistry};
pub use session::{Lifecycle, Session, SessionState};

/// Identifier the runtime assigns to each accepted connection.
pub type SessionId = u64;
