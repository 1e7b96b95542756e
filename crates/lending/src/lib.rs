//! Tool crib lending ledger.
//!
//! Tracks who holds which tool. The central rule: an asset has at most one
//! open hold at a time, and holds past their due-back time are reported as
//! overdue.
//!
//! - [`asset`]: the catalog of lendable items
//! - [`ledger`]: the checkout/return state machine
//! - [`query`]: read-only reporting views
//! - [`snapshot`]: persisting and rebuilding the ledger

pub mod asset;
pub mod error;
pub mod events;
pub mod hold;
pub mod ledger;
pub mod query;
pub mod snapshot;

pub use asset::{Asset, AssetNumber, AssetRegistry, Condition};
pub use error::{LedgerError, LedgerResult};
pub use events::{AssetRegistered, LendingEvent, ToolCheckedOut, ToolReturned};
pub use hold::{AssetState, Hold, is_overdue};
pub use ledger::{LedgerEngine, LendingEnvelope};
pub use query::{CribSummary, HoldView, ListView};
pub use snapshot::LedgerSnapshot;

pub use toolcrib_core::{Clock, HoldId, HolderId, ManualClock, SystemClock};
