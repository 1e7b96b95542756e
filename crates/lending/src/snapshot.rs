//! Persisting and rebuilding the ledger.
//!
//! A snapshot is the asset table plus the append-only hold history. Which
//! assets are checked out is not stored: it is rebuilt by scanning for holds
//! without a return timestamp.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use toolcrib_core::{Clock, first_duplicate_id};

use crate::asset::{Asset, AssetNumber, AssetRegistry};
use crate::error::{LedgerError, LedgerResult};
use crate::hold::Hold;
use crate::ledger::{LedgerEngine, LedgerState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub assets: Vec<Asset>,
    pub holds: Vec<Hold>,
}

impl LedgerSnapshot {
    pub fn to_json(&self) -> LedgerResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::corrupt(e.to_string()))
    }

    pub fn from_json(raw: &str) -> LedgerResult<Self> {
        serde_json::from_str(raw).map_err(|e| LedgerError::corrupt(e.to_string()))
    }

    /// Check every invariant the live ledger maintains.
    pub fn validate(&self) -> LedgerResult<()> {
        if let Some(dup) = first_duplicate_id(&self.assets) {
            return Err(LedgerError::corrupt(format!("duplicate asset {dup}")));
        }
        if let Some(dup) = first_duplicate_id(&self.holds) {
            return Err(LedgerError::corrupt(format!("duplicate hold {dup}")));
        }

        let known: HashSet<&AssetNumber> = self.assets.iter().map(|a| &a.number).collect();
        let mut per_asset: HashMap<&AssetNumber, Vec<&Hold>> = HashMap::new();

        for hold in &self.holds {
            if !known.contains(&hold.asset) {
                return Err(LedgerError::corrupt(format!(
                    "hold {} references unknown asset {}",
                    hold.id, hold.asset
                )));
            }
            if hold.due_back < hold.checked_out_at {
                return Err(LedgerError::corrupt(format!(
                    "hold {} is due back before it was checked out",
                    hold.id
                )));
            }
            match (hold.returned_at, hold.returned_condition) {
                (Some(returned_at), Some(_)) if returned_at < hold.checked_out_at => {
                    return Err(LedgerError::corrupt(format!(
                        "hold {} was returned before it was checked out",
                        hold.id
                    )));
                }
                (Some(_), Some(_)) | (None, None) => {}
                _ => {
                    return Err(LedgerError::corrupt(format!(
                        "hold {} is only partially closed",
                        hold.id
                    )));
                }
            }
            per_asset.entry(&hold.asset).or_default().push(hold);
        }

        for (asset, mut holds) in per_asset {
            holds.sort_by(|a, b| a.checked_out_at.cmp(&b.checked_out_at).then(a.id.cmp(&b.id)));
            for pair in holds.windows(2) {
                let (earlier, later) = (pair[0], pair[1]);
                match earlier.returned_at {
                    Some(returned_at) if returned_at <= later.checked_out_at => {}
                    Some(_) => {
                        return Err(LedgerError::corrupt(format!(
                            "holds {} and {} on asset {asset} overlap",
                            earlier.id, later.id
                        )));
                    }
                    None if later.is_open() => {
                        return Err(LedgerError::corrupt(format!(
                            "asset {asset} has more than one open hold"
                        )));
                    }
                    None => {
                        return Err(LedgerError::corrupt(format!(
                            "hold {} on asset {asset} starts while hold {} is still open",
                            later.id, earlier.id
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

impl<C: Clock> LedgerEngine<C> {
    /// Capture the whole ledger at one instant.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.read_state();
        let assets = self.registry().list();
        LedgerSnapshot {
            assets,
            holds: state.holds.clone(),
        }
    }

    /// Rebuild a ledger from a snapshot, refusing overlapping holds on one
    /// asset or references to missing assets.
    pub fn restore(snapshot: LedgerSnapshot, clock: C) -> LedgerResult<Self> {
        snapshot.validate()?;

        let LedgerSnapshot { assets, mut holds } = snapshot;
        holds.sort_by(|a, b| a.checked_out_at.cmp(&b.checked_out_at).then(a.id.cmp(&b.id)));

        let state = LedgerState::from_holds(holds);
        tracing::info!(
            assets = assets.len(),
            holds = state.holds.len(),
            open = state.open.len(),
            "ledger restored"
        );
        Ok(Self::from_parts(AssetRegistry::from_assets(assets), state, clock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use toolcrib_core::{HoldId, HolderId, ManualClock};

    use crate::asset::Condition;
    use crate::hold::AssetState;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 22, 8, 30, 0).unwrap()
    }

    fn number(raw: &str) -> AssetNumber {
        AssetNumber::parse(raw).unwrap()
    }

    fn holder(raw: &str) -> HolderId {
        HolderId::parse(raw).unwrap()
    }

    fn populated() -> LedgerEngine<Arc<ManualClock>> {
        let clock = Arc::new(ManualClock::new(start()));
        let engine = LedgerEngine::new(Arc::clone(&clock));
        engine
            .register_asset(number("DK-047"), "Drill Kit Professional", Condition::Good)
            .unwrap();
        engine
            .register_asset(number("CS-234"), "Circular Saw", Condition::Good)
            .unwrap();

        engine
            .checkout(&number("CS-234"), holder("tom"), start() + Duration::hours(2))
            .unwrap();
        clock.advance(Duration::hours(1));
        engine
            .return_asset(&number("CS-234"), Condition::NeedsRepair, Some("Blade guard sticking".into()))
            .unwrap();
        engine
            .checkout(&number("DK-047"), holder("mike"), start() + Duration::days(1))
            .unwrap();
        engine
    }

    fn open_hold(asset: &str, at: DateTime<Utc>) -> Hold {
        Hold {
            id: HoldId::new(),
            asset: number(asset),
            holder: holder("mike"),
            checked_out_at: at,
            due_back: at + Duration::days(1),
            returned_at: None,
            returned_condition: None,
            issue_note: None,
        }
    }

    fn asset(num: &str) -> Asset {
        Asset {
            number: number(num),
            name: num.to_string(),
            condition: Condition::Good,
        }
    }

    #[test]
    fn json_round_trip_rebuilds_checked_out_state() {
        let engine = populated();
        let json = engine.snapshot().to_json().unwrap();

        let clock = Arc::new(ManualClock::new(start() + Duration::hours(2)));
        let restored = LedgerEngine::restore(LedgerSnapshot::from_json(&json).unwrap(), clock).unwrap();

        assert_eq!(restored.state_of(&number("DK-047")).unwrap(), AssetState::CheckedOut);
        assert_eq!(restored.state_of(&number("CS-234")).unwrap(), AssetState::Available);
        assert_eq!(
            restored.registry().lookup(&number("CS-234")).unwrap().condition,
            Condition::NeedsRepair
        );
        assert_eq!(restored.holds(), engine.holds());

        let err = restored
            .checkout(&number("DK-047"), holder("sarah"), start() + Duration::days(2))
            .unwrap_err();
        assert!(matches!(err, LedgerError::AssetAlreadyCheckedOut { .. }));
    }

    #[test]
    fn two_open_holds_on_one_asset_are_rejected() {
        let snapshot = LedgerSnapshot {
            assets: vec![asset("DK-047")],
            holds: vec![
                open_hold("DK-047", start()),
                open_hold("DK-047", start() + Duration::hours(1)),
            ],
        };
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, LedgerError::CorruptSnapshot(msg) if msg.contains("more than one open hold")));
    }

    #[test]
    fn open_hold_inside_a_closed_one_is_rejected() {
        let mut mike = open_hold("DK-047", Utc.with_ymd_and_hms(2024, 1, 22, 8, 0, 0).unwrap());
        mike.returned_at = Some(mike.checked_out_at + Duration::hours(10));
        mike.returned_condition = Some(Condition::Good);
        let mut sarah = open_hold("DK-047", mike.checked_out_at + Duration::hours(2));
        sarah.holder = holder("sarah");

        let snapshot = LedgerSnapshot {
            assets: vec![asset("DK-047")],
            holds: vec![mike, sarah],
        };
        let err = LedgerEngine::restore(snapshot, ManualClock::new(start())).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptSnapshot(msg) if msg.contains("overlap")));
    }

    #[test]
    fn closed_hold_after_a_still_open_one_is_rejected() {
        let earlier = open_hold("DK-047", start());
        let mut later = open_hold("DK-047", start() + Duration::hours(1));
        later.returned_at = Some(start() + Duration::hours(2));
        later.returned_condition = Some(Condition::Fair);

        let snapshot = LedgerSnapshot {
            assets: vec![asset("DK-047")],
            holds: vec![later, earlier],
        };
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, LedgerError::CorruptSnapshot(msg) if msg.contains("still open")));
    }

    #[test]
    fn back_to_back_holds_are_accepted() {
        let mut first = open_hold("DK-047", start());
        first.returned_at = Some(start() + Duration::hours(1));
        first.returned_condition = Some(Condition::Good);
        let second = open_hold("DK-047", start() + Duration::hours(1));

        let snapshot = LedgerSnapshot {
            assets: vec![asset("DK-047")],
            holds: vec![first, second],
        };
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn hold_for_unknown_asset_is_rejected() {
        let snapshot = LedgerSnapshot {
            assets: vec![asset("DK-047")],
            holds: vec![open_hold("VT-123", start())],
        };
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn duplicate_assets_are_rejected() {
        let snapshot = LedgerSnapshot {
            assets: vec![asset("DK-047"), asset("DK-047")],
            holds: vec![],
        };
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, LedgerError::CorruptSnapshot(msg) if msg.contains("duplicate asset")));
    }

    #[test]
    fn partially_closed_hold_is_rejected() {
        let mut hold = open_hold("DK-047", start());
        hold.returned_at = Some(start() + Duration::hours(1));
        let snapshot = LedgerSnapshot {
            assets: vec![asset("DK-047")],
            holds: vec![hold],
        };
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn due_back_before_checkout_is_rejected() {
        let mut hold = open_hold("DK-047", start());
        hold.due_back = start() - Duration::hours(1);
        let snapshot = LedgerSnapshot {
            assets: vec![asset("DK-047")],
            holds: vec![hold],
        };
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn restore_orders_history_by_checkout_time() {
        let later = open_hold("DK-047", start() + Duration::days(1));
        let mut earlier = open_hold("DK-047", start());
        earlier.returned_at = Some(start() + Duration::hours(1));
        earlier.returned_condition = Some(Condition::Good);

        let snapshot = LedgerSnapshot {
            assets: vec![asset("DK-047")],
            holds: vec![later.clone(), earlier.clone()],
        };
        let clock = ManualClock::new(start() + Duration::days(1));
        let engine = LedgerEngine::restore(snapshot, clock).unwrap();

        assert_eq!(engine.holds(), vec![earlier, later.clone()]);
        assert_eq!(engine.open_hold(&number("DK-047")), Some(later));
    }

    #[test]
    fn garbage_json_is_reported_as_corrupt() {
        let err = LedgerSnapshot::from_json("{not json").unwrap_err();
        assert_eq!(err.code(), "corrupt_snapshot");
    }
}
