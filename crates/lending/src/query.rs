//! Read-only reporting over the ledger.
//!
//! Every query takes the ledger and registry read locks together, so a result
//! reflects a single instant: no hold is missing its asset and no asset shows
//! a condition from after the hold was listed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use toolcrib_core::{Clock, HoldId, HolderId};

use crate::asset::{Asset, AssetNumber, Condition};
use crate::hold::{Hold, is_overdue};
use crate::ledger::{LedgerEngine, LedgerState};

/// One hold joined with its asset, as plain semantic fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldView {
    pub hold_id: HoldId,
    pub asset: AssetNumber,
    pub name: String,
    /// Current condition for open holds; recorded condition for closed ones.
    pub condition: Condition,
    pub holder: HolderId,
    pub checked_out_at: DateTime<Utc>,
    pub due_back: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub issue_note: Option<String>,
    pub overdue: bool,
}

impl HoldView {
    fn new(hold: &Hold, asset: &Asset, now: DateTime<Utc>) -> Self {
        Self {
            hold_id: hold.id,
            asset: hold.asset.clone(),
            name: asset.name.clone(),
            condition: hold.returned_condition.unwrap_or(asset.condition),
            holder: hold.holder.clone(),
            checked_out_at: hold.checked_out_at,
            due_back: hold.due_back,
            returned_at: hold.returned_at,
            issue_note: hold.issue_note.clone(),
            overdue: is_overdue(hold, now),
        }
    }

    /// Case-insensitive substring match on asset name or number.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        needle.is_empty()
            || self.name.to_lowercase().contains(&needle)
            || self.asset.as_str().to_lowercase().contains(&needle)
    }
}

/// Which list a search runs against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "view")]
pub enum ListView {
    CheckedOut,
    Overdue,
    RecentlyReturned { limit: usize },
}

/// Headline counts for a dashboard tile.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CribSummary {
    pub total_assets: usize,
    pub available: usize,
    pub checked_out: usize,
    pub overdue: usize,
}

impl<C: Clock> LedgerEngine<C> {
    /// Open holds, oldest checkout first.
    pub fn list_checked_out(&self) -> Vec<HoldView> {
        self.view(ListView::CheckedOut)
    }

    /// Open holds past their due-back time, oldest checkout first.
    pub fn list_overdue(&self) -> Vec<HoldView> {
        self.view(ListView::Overdue)
    }

    /// Closed holds, most recent return first, at most `limit` of them.
    pub fn list_recently_returned(&self, limit: usize) -> Vec<HoldView> {
        self.view(ListView::RecentlyReturned { limit })
    }

    /// Filter one of the lists by asset name or number.
    ///
    /// For `RecentlyReturned` the limit applies after filtering.
    pub fn search(&self, query: &str, view: ListView) -> Vec<HoldView> {
        self.collect(view, |v| v.matches(query))
    }

    pub fn summary(&self) -> CribSummary {
        let state = self.read_state();
        let assets = self.registry().read();
        let now = self.now();

        let checked_out = state.open.len();
        let overdue = state
            .open
            .values()
            .filter(|&&idx| is_overdue(&state.holds[idx], now))
            .count();

        CribSummary {
            total_assets: assets.len(),
            available: assets.len().saturating_sub(checked_out),
            checked_out,
            overdue,
        }
    }

    fn view(&self, view: ListView) -> Vec<HoldView> {
        self.collect(view, |_| true)
    }

    fn collect(&self, view: ListView, keep: impl Fn(&HoldView) -> bool) -> Vec<HoldView> {
        let state = self.read_state();
        let assets = self.registry().read();
        let now = self.now();

        match view {
            ListView::CheckedOut => open_views(&state, &assets, now, |_| true, &keep),
            ListView::Overdue => open_views(&state, &assets, now, |v| v.overdue, &keep),
            ListView::RecentlyReturned { limit } => {
                let mut views: Vec<HoldView> = state
                    .holds
                    .iter()
                    .filter(|hold| !hold.is_open())
                    .filter_map(|hold| join(hold, &assets, now))
                    .filter(|v| keep(v))
                    .collect();
                views.sort_by(|a, b| b.returned_at.cmp(&a.returned_at));
                views.truncate(limit);
                views
            }
        }
    }
}

fn open_views(
    state: &LedgerState,
    assets: &HashMap<AssetNumber, Asset>,
    now: DateTime<Utc>,
    include: impl Fn(&HoldView) -> bool,
    keep: &impl Fn(&HoldView) -> bool,
) -> Vec<HoldView> {
    let mut views: Vec<HoldView> = state
        .open
        .values()
        .filter_map(|&idx| join(&state.holds[idx], assets, now))
        .filter(|v| include(v) && keep(v))
        .collect();
    views.sort_by(|a, b| {
        a.checked_out_at
            .cmp(&b.checked_out_at)
            .then_with(|| a.asset.cmp(&b.asset))
    });
    views
}

fn join(hold: &Hold, assets: &HashMap<AssetNumber, Asset>, now: DateTime<Utc>) -> Option<HoldView> {
    assets
        .get(&hold.asset)
        .map(|asset| HoldView::new(hold, asset, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};
    use toolcrib_core::ManualClock;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 21, 14, 0, 0).unwrap()
    }

    fn number(raw: &str) -> AssetNumber {
        AssetNumber::parse(raw).unwrap()
    }

    fn holder(raw: &str) -> HolderId {
        HolderId::parse(raw).unwrap()
    }

    /// Three tools out (HD-089 oldest), two returned.
    fn crib() -> (LedgerEngine<Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let engine = LedgerEngine::new(Arc::clone(&clock));
        for (num, name, condition) in [
            ("DK-047", "Drill Kit Professional", Condition::Good),
            ("VT-123", "Voltage Tester", Condition::Excellent),
            ("HD-089", "Hammer Drill", Condition::Fair),
            ("AG-156", "Angle Grinder", Condition::Good),
            ("CS-234", "Circular Saw", Condition::Good),
        ] {
            engine.register_asset(number(num), name, condition).unwrap();
        }

        let out = |num: &str, who: &str, due_in: Duration| {
            engine
                .checkout(&number(num), holder(who), clock.now() + due_in)
                .unwrap();
        };

        out("AG-156", "lisa", Duration::hours(1));
        out("CS-234", "tom", Duration::hours(1));
        out("HD-089", "david", Duration::days(2));
        clock.advance(Duration::minutes(30));
        engine
            .return_asset(&number("CS-234"), Condition::NeedsRepair, Some("Blade guard sticking".into()))
            .unwrap();
        clock.advance(Duration::minutes(45));
        engine.return_asset(&number("AG-156"), Condition::Good, None).unwrap();
        clock.advance(Duration::hours(18));
        out("DK-047", "mike", Duration::days(1));
        clock.advance(Duration::minutes(45));
        out("VT-123", "sarah", Duration::hours(8));

        (engine, clock)
    }

    fn numbers(views: &[HoldView]) -> Vec<&str> {
        views.iter().map(|v| v.asset.as_str()).collect()
    }

    #[test]
    fn checked_out_is_oldest_first() {
        let (engine, _clock) = crib();
        let views = engine.list_checked_out();
        assert_eq!(numbers(&views), vec!["HD-089", "DK-047", "VT-123"]);
        assert!(views.iter().all(|v| v.returned_at.is_none()));
    }

    #[test]
    fn overdue_is_the_subset_past_due() {
        let (engine, clock) = crib();
        assert!(engine.list_overdue().is_empty());

        clock.advance(Duration::hours(9));
        assert_eq!(numbers(&engine.list_overdue()), vec!["VT-123"]);

        clock.advance(Duration::days(2));
        assert_eq!(numbers(&engine.list_overdue()), vec!["HD-089", "DK-047", "VT-123"]);
    }

    #[test]
    fn recently_returned_is_latest_first_and_truncated() {
        let (engine, _clock) = crib();

        let views = engine.list_recently_returned(10);
        assert_eq!(numbers(&views), vec!["AG-156", "CS-234"]);
        assert_eq!(views[1].condition, Condition::NeedsRepair);
        assert_eq!(views[1].issue_note.as_deref(), Some("Blade guard sticking"));
        assert_eq!(views[1].holder, holder("tom"));

        assert_eq!(numbers(&engine.list_recently_returned(1)), vec!["AG-156"]);
        assert!(engine.list_recently_returned(0).is_empty());
    }

    #[test]
    fn search_matches_name_or_number_case_insensitively() {
        let (engine, _clock) = crib();

        let by_name = engine.search("drill", ListView::CheckedOut);
        assert_eq!(numbers(&by_name), vec!["HD-089", "DK-047"]);

        let by_number = engine.search("vt-1", ListView::CheckedOut);
        assert_eq!(numbers(&by_number), vec!["VT-123"]);

        let returned = engine.search("SAW", ListView::RecentlyReturned { limit: 5 });
        assert_eq!(numbers(&returned), vec!["CS-234"]);

        assert!(engine.search("wrench", ListView::CheckedOut).is_empty());
        assert_eq!(engine.search("  ", ListView::CheckedOut).len(), 3);
    }

    #[test]
    fn search_limit_applies_after_filtering() {
        let (engine, _clock) = crib();
        let views = engine.search("circular", ListView::RecentlyReturned { limit: 1 });
        assert_eq!(numbers(&views), vec!["CS-234"]);
    }

    #[test]
    fn open_view_shows_current_condition() {
        let (engine, _clock) = crib();
        let hd = engine
            .list_checked_out()
            .into_iter()
            .find(|v| v.asset.as_str() == "HD-089")
            .unwrap();
        assert_eq!(hd.condition, Condition::Fair);
        assert_eq!(hd.name, "Hammer Drill");
    }

    #[test]
    fn summary_counts() {
        let (engine, clock) = crib();
        assert_eq!(
            engine.summary(),
            CribSummary {
                total_assets: 5,
                available: 2,
                checked_out: 3,
                overdue: 0,
            }
        );

        clock.advance(Duration::hours(9));
        assert_eq!(engine.summary().overdue, 1);
    }
}
