//! Severity tiers translating a rival's points deficit into a worded requirement.
use serde::{Deserialize, Serialize};

use crate::numbers::{ceil_div_u32, round_f64_to_usize, saturating_u32, usize_to_f64};
use crate::payouts::PayoutTable;

/// Qualitative difficulty of a requirement, easiest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Easy,
    Moderate,
    Hard,
    VeryHard,
    Elimination,
}

const SEVERITY_ORDER: [Severity; 5] = [
    Severity::Easy,
    Severity::Moderate,
    Severity::Hard,
    Severity::VeryHard,
    Severity::Elimination,
];

impl Severity {
    /// Score from 1 (easy) to 5 (elimination).
    #[must_use]
    pub const fn score(self) -> u32 {
        match self {
            Self::Easy => 1,
            Self::Moderate => 2,
            Self::Hard => 3,
            Self::VeryHard => 4,
            Self::Elimination => 5,
        }
    }

    /// Nearest tier to an averaged score; halves round up.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        let idx = round_f64_to_usize(score).clamp(1, SEVERITY_ORDER.len()) - 1;
        SEVERITY_ORDER[idx]
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Moderate => "moderate",
            Self::Hard => "hard",
            Self::VeryHard => "very hard",
            Self::Elimination => "elimination",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a tier words its requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierRule {
    /// Finish below `rank` in at least K events.
    FinishBelow {
        rank: usize,
        phrase: &'static str,
    },
    /// Average finish worse than P{p}, dropping D points.
    AverageFinish,
}

/// One row of the threshold ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierRow {
    /// Minimum average points to drop per remaining event.
    pub min_avg_drop: u32,
    pub severity: Severity,
    pub rule: TierRule,
}

/// Threshold ladder, highest average drop first.
pub const TIER_TABLE: [TierRow; 5] = [
    TierRow {
        min_avg_drop: 20,
        severity: Severity::VeryHard,
        rule: TierRule::FinishBelow {
            rank: 10,
            phrase: "finish outside the top 10",
        },
    },
    TierRow {
        min_avg_drop: 15,
        severity: Severity::Hard,
        rule: TierRule::FinishBelow {
            rank: 3,
            phrase: "no podiums",
        },
    },
    TierRow {
        min_avg_drop: 10,
        severity: Severity::Moderate,
        rule: TierRule::FinishBelow {
            rank: 1,
            phrase: "no wins, P2 or worse",
        },
    },
    TierRow {
        min_avg_drop: 5,
        severity: Severity::Moderate,
        rule: TierRule::AverageFinish,
    },
    TierRow {
        min_avg_drop: 0,
        severity: Severity::Easy,
        rule: TierRule::AverageFinish,
    },
];

pub const ELIMINATION_REQUIREMENT: &str = "must score zero points in every remaining race and sprint";

/// Average points a rival must drop per remaining event.
#[must_use]
pub fn average_drop(must_drop: u32, remaining_events: usize) -> f64 {
    if remaining_events == 0 {
        return f64::from(must_drop);
    }
    f64::from(must_drop) / usize_to_f64(remaining_events)
}

/// First row whose threshold the average drop reaches.
#[must_use]
pub fn select_tier(avg_drop: f64) -> &'static TierRow {
    TIER_TABLE
        .iter()
        .find(|row| avg_drop >= f64::from(row.min_avg_drop))
        .unwrap_or(&TIER_TABLE[TIER_TABLE.len() - 1])
}

/// Worded requirement for a selected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierRequirement {
    pub text: String,
    /// Events the rival must underperform in, for count-based rules.
    pub events: Option<u32>,
}

/// Word the requirement for `row` given the rival's deficit.
#[must_use]
pub fn describe(
    row: &TierRow,
    must_drop: u32,
    remaining_events: usize,
    reference: &PayoutTable,
) -> TierRequirement {
    match row.rule {
        TierRule::FinishBelow { rank, phrase } => {
            let per_event = reference.drop_from_win_to(rank + 1);
            let upper = saturating_u32(remaining_events).max(1);
            let count = ceil_div_u32(must_drop, per_event).clamp(1, upper);
            let noun = if count == 1 { "race" } else { "races" };
            TierRequirement {
                text: format!("{phrase} in at least {count} {noun}"),
                events: Some(count),
            }
        }
        TierRule::AverageFinish => {
            let avg_drop = average_drop(must_drop, remaining_events);
            let floor = f64::from(reference.best_case()) - avg_drop;
            let position = reference
                .as_slice()
                .iter()
                .filter(|&&points| f64::from(points) > floor)
                .count()
                .max(1);
            TierRequirement {
                text: format!(
                    "average finish worse than P{position}, dropping {must_drop} points vs. maximum"
                ),
                events: None,
            }
        }
    }
}
