//! Holds: one checkout-to-return episode each.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use toolcrib_core::{Entity, HoldId, HolderId};

use crate::asset::{AssetNumber, Condition};

/// Whether an asset is on the shelf or with someone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    Available,
    CheckedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub id: HoldId,
    pub asset: AssetNumber,
    pub holder: HolderId,
    pub checked_out_at: DateTime<Utc>,
    pub due_back: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub returned_condition: Option<Condition>,
    pub issue_note: Option<String>,
}

impl Hold {
    pub(crate) fn open(
        asset: AssetNumber,
        holder: HolderId,
        checked_out_at: DateTime<Utc>,
        due_back: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HoldId::new(),
            asset,
            holder,
            checked_out_at,
            due_back,
            returned_at: None,
            returned_condition: None,
            issue_note: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    /// Close the hold. Blank notes are stored as absent.
    pub(crate) fn close(
        &mut self,
        returned_at: DateTime<Utc>,
        condition: Condition,
        issue_note: Option<String>,
    ) {
        self.returned_at = Some(returned_at);
        self.returned_condition = Some(condition);
        self.issue_note = issue_note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());
    }
}

impl Entity for Hold {
    type Id = HoldId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// An open hold whose due-back time has passed.
///
/// Pure: reporting only, never changes state.
pub fn is_overdue(hold: &Hold, now: DateTime<Utc>) -> bool {
    hold.returned_at.is_none() && hold.due_back < now
}
