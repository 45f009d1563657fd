use crate::models::{ActualItem, ItemSource, PlanItem, Record};
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;
use uuid::Uuid;

/// Result of carrying a previous day's plan into the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryOutcome {
    Carried(usize),
    NothingToCarry,
}

/// Appends the previous day's plan items to `current.plan`, each with a
/// fresh id and `done: false`. The previous record is never modified.
pub fn carry_forward(current: &mut Record, previous: Option<&Record>) -> CarryOutcome {
    let Some(previous) = previous else {
        return CarryOutcome::NothingToCarry;
    };
    if previous.plan.is_empty() {
        return CarryOutcome::NothingToCarry;
    }

    for item in &previous.plan {
        current.plan.push(PlanItem {
            id: Uuid::new_v4().to_string(),
            text: item.text.clone(),
            done: false,
        });
    }
    CarryOutcome::Carried(previous.plan.len())
}

/// Promotes each plan item without a matching outcome into `actual` as
/// `{same id, same text, done: true, source: plan}`. Items already present
/// in `actual` are untouched, so the operation is idempotent. Returns the
/// number of items promoted.
pub fn promote_plan(record: &mut Record) -> usize {
    let existing: HashSet<String> = record.actual.iter().map(|item| item.id.clone()).collect();
    let mut promoted = 0usize;
    for item in &record.plan {
        if existing.contains(&item.id) {
            continue;
        }
        record.actual.push(ActualItem {
            id: item.id.clone(),
            text: item.text.clone(),
            done: true,
            source: ItemSource::Plan,
        });
        promoted += 1;
    }
    promoted
}

/// Previous calendar day of an ISO `YYYY-MM-DD` date string. `None` when the
/// input does not parse as a date.
pub fn previous_date(date: &str) -> Option<String> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some((parsed - Duration::days(1)).format("%Y-%m-%d").to_string())
}
