//! Ledger engine: the checkout/return state machine.
//!
//! Per asset: `Available` ⇄ `CheckedOut`. Each cycle appends one hold to the
//! history; holds are never removed.
//!
//! All mutations run under one write lock on the ledger state, so the
//! availability check and the state change of a checkout (or return) form a
//! single atomic step. Lock order is always ledger, then registry.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use toolcrib_core::{Clock, HoldId, HolderId, SystemClock};
use toolcrib_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};

use crate::asset::{Asset, AssetNumber, AssetRegistry, Condition};
use crate::error::{LedgerError, LedgerResult};
use crate::events::{AssetRegistered, LendingEvent, ToolCheckedOut, ToolReturned};
use crate::hold::{AssetState, Hold, is_overdue};

/// Envelope type published for every committed ledger change.
pub type LendingEnvelope = EventEnvelope<LendingEvent>;

const STREAM_TYPE: &str = "tool_asset";

/// Open-hold index plus the append-only hold history.
#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    /// Asset number -> index of its open hold in `holds`.
    pub(crate) open: HashMap<AssetNumber, usize>,
    /// Every hold ever created, in creation order.
    pub(crate) holds: Vec<Hold>,
    next_sequence: u64,
}

impl LedgerState {
    pub(crate) fn from_holds(holds: Vec<Hold>) -> Self {
        let open = holds
            .iter()
            .enumerate()
            .filter(|(_, hold)| hold.is_open())
            .map(|(idx, hold)| (hold.asset.clone(), idx))
            .collect();
        Self {
            open,
            holds,
            next_sequence: 0,
        }
    }

    pub(crate) fn open_hold(&self, asset: &AssetNumber) -> Option<&Hold> {
        self.open.get(asset).map(|&idx| &self.holds[idx])
    }
}

/// The lending ledger.
///
/// Owns the asset registry and the hold history. Time comes from the supplied
/// [`Clock`]; committed changes are published to subscribers in commit order.
#[derive(Debug)]
pub struct LedgerEngine<C = SystemClock> {
    registry: AssetRegistry,
    state: RwLock<LedgerState>,
    clock: C,
    bus: InMemoryEventBus<LendingEnvelope>,
}

impl LedgerEngine<SystemClock> {
    /// Ledger on wall-clock time.
    pub fn with_system_clock() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> LedgerEngine<C> {
    pub fn new(clock: C) -> Self {
        Self::from_parts(AssetRegistry::new(), LedgerState::default(), clock)
    }

    pub(crate) fn from_parts(registry: AssetRegistry, state: LedgerState, clock: C) -> Self {
        Self {
            registry,
            state: RwLock::new(state),
            clock,
            bus: InMemoryEventBus::new(),
        }
    }

    /// Read access to the catalog.
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Receive every change committed after this call.
    pub fn subscribe(&self) -> Subscription<LendingEnvelope> {
        self.bus.subscribe()
    }

    /// Add an asset to the catalog and announce it.
    pub fn register_asset(
        &self,
        number: AssetNumber,
        name: impl Into<String>,
        condition: Condition,
    ) -> LedgerResult<Asset> {
        let mut state = self.write_state();
        let asset = self.registry.register(number, name, condition)?;

        tracing::info!(asset = %asset.number, name = %asset.name, condition = %asset.condition, "asset registered");
        self.publish(
            &mut state,
            LendingEvent::AssetRegistered(AssetRegistered {
                asset: asset.number.clone(),
                name: asset.name.clone(),
                condition: asset.condition,
                occurred_at: self.clock.now(),
            }),
        );
        Ok(asset)
    }

    /// Hand `asset` to `holder` until `due_back`.
    ///
    /// Fails with `UnknownAsset`, then `AssetAlreadyCheckedOut`, then
    /// `InvalidDueDate`, in that order of precedence. There is no waitlist:
    /// a held asset is refused outright and the caller retries later.
    pub fn checkout(
        &self,
        asset: &AssetNumber,
        holder: HolderId,
        due_back: DateTime<Utc>,
    ) -> LedgerResult<HoldId> {
        let mut state = self.write_state();
        let now = self.clock.now();

        self.registry.lookup(asset)?;

        if let Some(current) = state.open_hold(asset) {
            tracing::debug!(
                asset = %asset,
                requested_by = %holder,
                held_by = %current.holder,
                "checkout refused: asset already checked out"
            );
            return Err(LedgerError::AssetAlreadyCheckedOut {
                asset: asset.clone(),
                holder: current.holder.clone(),
                checked_out_at: current.checked_out_at,
            });
        }

        if due_back < now {
            return Err(LedgerError::InvalidDueDate { due_back, now });
        }

        let hold = Hold::open(asset.clone(), holder, now, due_back);
        let hold_id = hold.id;
        let event = LendingEvent::ToolCheckedOut(ToolCheckedOut {
            hold_id,
            asset: asset.clone(),
            holder: hold.holder.clone(),
            due_back,
            occurred_at: now,
        });

        let idx = state.holds.len();
        state.holds.push(hold);
        state.open.insert(asset.clone(), idx);

        tracing::info!(asset = %asset, hold_id = %hold_id, due_back = %due_back, "tool checked out");
        self.publish(&mut state, event);
        Ok(hold_id)
    }

    /// Close the open hold on `asset`, recording the condition it came back in.
    ///
    /// The asset's catalog condition is updated to match. A second return of
    /// the same asset fails with `AssetNotCheckedOut`.
    pub fn return_asset(
        &self,
        asset: &AssetNumber,
        condition: Condition,
        issue_note: Option<String>,
    ) -> LedgerResult<()> {
        let mut state = self.write_state();
        let now = self.clock.now();

        let Some(idx) = state.open.get(asset).copied() else {
            if !self.registry.contains(asset) {
                return Err(LedgerError::UnknownAsset(asset.clone()));
            }
            tracing::debug!(asset = %asset, "return refused: asset not checked out");
            return Err(LedgerError::AssetNotCheckedOut(asset.clone()));
        };

        // Registry first: if it refuses, the hold is still untouched.
        self.registry.set_condition(asset, condition)?;

        let hold = &mut state.holds[idx];
        let late = is_overdue(hold, now);
        hold.close(now, condition, issue_note);
        let event = LendingEvent::ToolReturned(ToolReturned {
            hold_id: hold.id,
            asset: asset.clone(),
            holder: hold.holder.clone(),
            condition,
            issue_note: hold.issue_note.clone(),
            late,
            occurred_at: now,
        });
        state.open.remove(asset);

        if condition.needs_service() {
            tracing::warn!(asset = %asset, "tool returned needing repair");
        }
        tracing::info!(asset = %asset, condition = %condition, late, "tool returned");
        self.publish(&mut state, event);
        Ok(())
    }

    /// Overdue check against the ledger's clock.
    pub fn is_overdue(&self, hold: &Hold) -> bool {
        is_overdue(hold, self.clock.now())
    }

    pub fn state_of(&self, asset: &AssetNumber) -> LedgerResult<AssetState> {
        let state = self.read_state();
        self.registry.lookup(asset)?;
        Ok(if state.open.contains_key(asset) {
            AssetState::CheckedOut
        } else {
            AssetState::Available
        })
    }

    pub fn open_hold(&self, asset: &AssetNumber) -> Option<Hold> {
        self.read_state().open_hold(asset).cloned()
    }

    /// All holds for one asset, oldest first.
    pub fn history(&self, asset: &AssetNumber) -> Vec<Hold> {
        self.read_state()
            .holds
            .iter()
            .filter(|hold| &hold.asset == asset)
            .cloned()
            .collect()
    }

    /// The full hold history, in creation order.
    pub fn holds(&self) -> Vec<Hold> {
        self.read_state().holds.clone()
    }

    // State is only written after validation passes, so a guard recovered
    // from a poisoned lock still holds a consistent ledger.
    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &mut LedgerState, event: LendingEvent) {
        state.next_sequence += 1;
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            event.asset().to_string(),
            STREAM_TYPE,
            state.next_sequence,
            event,
        );
        if let Err(err) = self.bus.publish(envelope) {
            tracing::warn!(?err, "failed to publish lending event");
        }
    }
}
