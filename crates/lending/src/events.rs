//! Events emitted by the ledger after each committed change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use toolcrib_core::{HoldId, HolderId};
use toolcrib_events::Event;

use crate::asset::{AssetNumber, Condition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRegistered {
    pub asset: AssetNumber,
    pub name: String,
    pub condition: Condition,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCheckedOut {
    pub hold_id: HoldId,
    pub asset: AssetNumber,
    pub holder: HolderId,
    pub due_back: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolReturned {
    pub hold_id: HoldId,
    pub asset: AssetNumber,
    pub holder: HolderId,
    pub condition: Condition,
    pub issue_note: Option<String>,
    /// Whether the tool came back after its due-back time.
    pub late: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LendingEvent {
    AssetRegistered(AssetRegistered),
    ToolCheckedOut(ToolCheckedOut),
    ToolReturned(ToolReturned),
}

impl LendingEvent {
    pub fn asset(&self) -> &AssetNumber {
        match self {
            LendingEvent::AssetRegistered(e) => &e.asset,
            LendingEvent::ToolCheckedOut(e) => &e.asset,
            LendingEvent::ToolReturned(e) => &e.asset,
        }
    }
}

impl Event for LendingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LendingEvent::AssetRegistered(_) => "tool.asset.registered",
            LendingEvent::ToolCheckedOut(_) => "tool.hold.checked_out",
            LendingEvent::ToolReturned(_) => "tool.hold.returned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LendingEvent::AssetRegistered(e) => e.occurred_at,
            LendingEvent::ToolCheckedOut(e) => e.occurred_at,
            LendingEvent::ToolReturned(e) => e.occurred_at,
        }
    }
}
