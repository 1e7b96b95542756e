//! Event mechanics: the `Event` contract, envelopes, and pub/sub.
//!
//! Nothing here knows about tools or holds; the lending crate supplies the
//! concrete event types.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
