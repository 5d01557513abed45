//! Season calendar: events, their payouts, and the completed/remaining split.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::payouts::{EventKind, PayoutTable};

/// One scheduled points-awarding event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Overrides the default table for the event kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payouts: Option<PayoutTable>,
}

impl Event {
    #[must_use]
    pub fn primary(label: &str) -> Self {
        Self::new(EventKind::Primary, label)
    }

    #[must_use]
    pub fn short(label: &str) -> Self {
        Self::new(EventKind::Short, label)
    }

    #[must_use]
    pub fn new(kind: EventKind, label: &str) -> Self {
        Self {
            kind,
            label: label.trim().to_string(),
            date: None,
            payouts: None,
        }
    }

    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn with_payouts(mut self, payouts: PayoutTable) -> Self {
        self.payouts = Some(payouts);
        self
    }

    /// Effective payout table (override or the kind's default).
    #[must_use]
    pub fn payouts(&self) -> &PayoutTable {
        self.payouts
            .as_ref()
            .unwrap_or_else(|| self.kind.default_payouts())
    }

    #[must_use]
    pub fn best_case(&self) -> u32 {
        self.payouts().best_case()
    }

    #[must_use]
    pub const fn is_primary(&self) -> bool {
        matches!(self.kind, EventKind::Primary)
    }

    /// Human label such as `race Monaco` or `sprint #3` when unlabeled.
    #[must_use]
    pub fn describe(&self, ordinal: usize) -> String {
        if self.label.is_empty() {
            format!("{} #{ordinal}", self.kind.noun())
        } else {
            format!("{} {}", self.kind.noun(), self.label)
        }
    }
}

/// Counts of remaining events per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub primary: usize,
    pub short: usize,
}

impl EventCounts {
    #[must_use]
    pub fn of(events: &[Event]) -> Self {
        events.iter().fold(Self::default(), |mut counts, event| {
            match event.kind {
                EventKind::Primary => counts.primary += 1,
                EventKind::Short => counts.short += 1,
            }
            counts
        })
    }

    #[must_use]
    pub const fn total(self) -> usize {
        self.primary + self.short
    }
}

/// Sum of the winner's points over every event, saturating at `u32::MAX`.
#[must_use]
pub fn best_case_total(events: &[Event]) -> u32 {
    events
        .iter()
        .map(Event::best_case)
        .fold(0, u32::saturating_add)
}

/// Chronological season calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    events: Vec<Event>,
}

/// Calendar partitioned around a reference date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSplit {
    pub completed: Vec<Event>,
    pub remaining: Vec<Event>,
}

impl Schedule {
    /// Build a calendar; dated events are sorted, undated ones keep their order at the end.
    #[must_use]
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|event| (event.date.is_none(), event.date));
        Self { events }
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events on or before `as_of` are completed; later or undated events remain.
    #[must_use]
    pub fn split_at(&self, as_of: NaiveDate) -> ScheduleSplit {
        let (completed, remaining) = self
            .events
            .iter()
            .cloned()
            .partition(|event| event.date.is_some_and(|date| date <= as_of));
        ScheduleSplit {
            completed,
            remaining,
        }
    }

    #[must_use]
    pub fn remaining_counts(&self, as_of: NaiveDate) -> EventCounts {
        EventCounts::of(&self.split_at(as_of).remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> Schedule {
        Schedule::new(vec![
            Event::primary("Singapore").with_date(date(2025, 10, 5)),
            Event::short("United States").with_date(date(2025, 10, 18)),
            Event::primary("Azerbaijan").with_date(date(2025, 9, 21)),
            Event::primary("United States").with_date(date(2025, 10, 19)),
            Event::primary("TBD"),
        ])
    }

    #[test]
    fn split_respects_reference_date() {
        let split = calendar().split_at(date(2025, 9, 29));
        assert_eq!(split.completed.len(), 1);
        assert_eq!(split.completed[0].label, "Azerbaijan");
        let labels: Vec<_> = split.remaining.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Singapore", "United States", "United States", "TBD"]);
    }

    #[test]
    fn event_on_reference_date_counts_as_completed() {
        let counts = calendar().remaining_counts(date(2025, 10, 18));
        assert_eq!(counts, EventCounts { primary: 2, short: 0 });
    }

    #[test]
    fn best_case_sums_default_tables() {
        let events = vec![Event::primary("A"), Event::short("A"), Event::primary("B")];
        assert_eq!(best_case_total(&events), 58);
        assert_eq!(EventCounts::of(&events).total(), 3);
        assert_eq!(Event::short("").describe(2), "sprint #2");
    }

    #[test]
    fn best_case_total_saturates() {
        let table = PayoutTable::new(vec![3_000_000_000]).unwrap();
        let events = vec![
            Event::primary("Jeddah").with_payouts(table.clone()),
            Event::primary("Lusail").with_payouts(table),
        ];
        assert_eq!(best_case_total(&events), u32::MAX);
    }
}
