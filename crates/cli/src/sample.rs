//! Sample crib and the guided demo run.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use toolcrib_events::Event;
use toolcrib_lending::{
    AssetNumber, Clock, Condition, CribSummary, HoldView, HolderId, LedgerEngine, LedgerError,
    LendingEnvelope, LendingEvent, ManualClock,
};

/// Tools on the crib page: number, name, condition when first shelved.
const TOOLS: [(&str, &str, Condition); 5] = [
    ("DK-047", "Drill Kit Professional", Condition::Good),
    ("VT-123", "Voltage Tester", Condition::Excellent),
    ("HD-089", "Hammer Drill", Condition::Fair),
    ("AG-156", "Angle Grinder", Condition::Good),
    ("CS-234", "Circular Saw", Condition::Good),
];

enum Step {
    Out {
        at: DateTime<Utc>,
        tool: &'static str,
        holder: &'static str,
        due: DateTime<Utc>,
    },
    Back {
        at: DateTime<Utc>,
        tool: &'static str,
        condition: Condition,
        note: Option<&'static str>,
    },
}

fn at(day: u32, hour: u32, minute: u32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0)
        .single()
        .with_context(|| format!("no such sample time: 2024-01-{day:02} {hour:02}:{minute:02}"))
}

/// When the seeded history starts.
pub fn seed_start() -> Result<DateTime<Utc>> {
    at(21, 7, 0)
}

// VT-123 was listed as due at midnight before its 09:15 checkout; it is due
// at the end of that shift instead.
fn timeline() -> Result<Vec<Step>> {
    Ok(vec![
        Step::Out { at: at(21, 7, 45)?, tool: "AG-156", holder: "lisa.wilson", due: at(21, 17, 0)? },
        Step::Out { at: at(21, 10, 0)?, tool: "CS-234", holder: "tom.brown", due: at(21, 17, 0)? },
        Step::Out { at: at(21, 14, 20)?, tool: "HD-089", holder: "david.chen", due: at(23, 0, 0)? },
        Step::Back {
            at: at(21, 15, 45)?,
            tool: "CS-234",
            condition: Condition::NeedsRepair,
            note: Some("Blade guard sticking"),
        },
        Step::Back { at: at(21, 16, 30)?, tool: "AG-156", condition: Condition::Good, note: None },
        Step::Out { at: at(22, 8, 30)?, tool: "DK-047", holder: "mike", due: at(23, 0, 0)? },
        Step::Out { at: at(22, 9, 15)?, tool: "VT-123", holder: "sarah", due: at(22, 17, 0)? },
    ])
}

/// Register the sample tools and replay their checkout history.
///
/// `clock` must be the clock `engine` reads; it is left at the last event.
pub fn seed<C: Clock>(engine: &LedgerEngine<C>, clock: &ManualClock) -> Result<()> {
    clock.set(seed_start()?);
    for (number, name, condition) in TOOLS {
        engine.register_asset(AssetNumber::parse(number)?, name, condition)?;
    }

    for step in timeline()? {
        match step {
            Step::Out { at, tool, holder, due } => {
                clock.set(at);
                engine
                    .checkout(&AssetNumber::parse(tool)?, HolderId::parse(holder)?, due)
                    .with_context(|| format!("seeding checkout of {tool}"))?;
            }
            Step::Back { at, tool, condition, note } => {
                clock.set(at);
                engine
                    .return_asset(&AssetNumber::parse(tool)?, condition, note.map(str::to_string))
                    .with_context(|| format!("seeding return of {tool}"))?;
            }
        }
    }
    Ok(())
}

/// What the demo observed at each stage.
#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub seeded: CribSummary,
    pub checked_out: Vec<HoldView>,
    pub refused_checkout: String,
    pub overdue_before_return: Vec<HoldView>,
    pub overdue_after_return: Vec<HoldView>,
    pub recently_returned: Vec<HoldView>,
    pub activity: Vec<String>,
}

/// Seed the sample crib on a manual clock, then walk the drill-kit story:
/// a second checkout is refused, the kit goes overdue, and comes back dull.
pub fn run_demo() -> Result<DemoReport> {
    let clock = Arc::new(ManualClock::new(seed_start()?));
    let crib = LedgerEngine::new(Arc::clone(&clock));
    let feed = crib.subscribe();

    seed(&crib, &clock)?;
    let seeded = crib.summary();
    let checked_out = crib.list_checked_out();

    let dk = AssetNumber::parse("DK-047")?;
    let refused_checkout = match crib.checkout(&dk, HolderId::parse("sarah")?, at(24, 0, 0)?) {
        Err(err @ LedgerError::AssetAlreadyCheckedOut { .. }) => err.to_string(),
        Err(other) => return Err(other).context("unexpected checkout failure"),
        Ok(_) => bail!("DK-047 was lent twice"),
    };

    clock.set(at(23, 12, 0)?);
    let overdue_before_return = crib.list_overdue();

    crib.return_asset(&dk, Condition::Fair, Some("blade dull".to_string()))?;
    let overdue_after_return = crib.list_overdue();
    let recently_returned = crib.list_recently_returned(1);

    let activity = feed
        .drain()
        .iter()
        .map(|envelope| activity_line(&crib, envelope))
        .collect();

    Ok(DemoReport {
        seeded,
        checked_out,
        refused_checkout,
        overdue_before_return,
        overdue_after_return,
        recently_returned,
        activity,
    })
}

/// One line of the dashboard activity feed.
pub fn activity_line<C: Clock>(crib: &LedgerEngine<C>, envelope: &LendingEnvelope) -> String {
    let event = envelope.payload();
    let name = crib
        .registry()
        .lookup(event.asset())
        .map(|asset| asset.name)
        .unwrap_or_else(|_| event.asset().to_string());
    let when = event.occurred_at().to_rfc3339();

    match event {
        LendingEvent::AssetRegistered(_) => format!("{when} {name} #{} added to the crib", event.asset()),
        LendingEvent::ToolCheckedOut(e) => {
            format!("{when} {name} #{} checked out by {}", e.asset, e.holder)
        }
        LendingEvent::ToolReturned(e) if e.late => {
            format!("{when} {name} #{} returned late by {} ({})", e.asset, e.holder, e.condition)
        }
        LendingEvent::ToolReturned(e) => {
            format!("{when} {name} #{} returned by {} ({})", e.asset, e.holder, e.condition)
        }
    }
}
