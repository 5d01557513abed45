//! Per-rival requirement derivation for one candidate target total.
use serde::{Deserialize, Serialize};

use super::tiers::{ELIMINATION_REQUIREMENT, Severity, average_drop, describe, select_tier};
use crate::payouts::PayoutTable;
use crate::standings::{Competitor, CompetitorId};

/// What one rival must fail to do for the target's candidate total to stand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RivalRequirement {
    pub competitor: CompetitorId,
    pub name: String,
    pub current_points: u32,
    pub max_points: u32,
    /// Points the rival must fall short of their maximum by.
    pub must_drop: u32,
    pub severity: Severity,
    pub requirement: String,
    /// Races the rival must underperform in, for count-based requirements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RivalOutcome {
    /// The rival cannot reach the candidate total.
    Clear,
    Constrained(RivalRequirement),
    /// Even a pointless run leaves the rival ahead.
    Unsatisfiable { must_drop: u32, max_gain: u32 },
}

/// Remaining-season context shared by every rival of one solve.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SeasonBudget<'a> {
    pub max_gain: u32,
    pub remaining_events: usize,
    pub remaining_primary: u32,
    pub reference: &'a PayoutTable,
}

/// Target side of one candidate.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TargetOutcome {
    pub total: u32,
    /// Primary wins after the candidate, including completed events.
    pub wins: u32,
}

pub(crate) fn derive_requirement(
    rival: &Competitor,
    rival_wins: u32,
    target: TargetOutcome,
    budget: &SeasonBudget<'_>,
) -> RivalOutcome {
    let max_points = rival.points.saturating_add(budget.max_gain);
    let potential_wins = rival_wins.saturating_add(budget.remaining_primary);
    let margin = i64::from(potential_wins >= target.wins);
    let deficit = i64::from(max_points) - (i64::from(target.total) - margin);
    if deficit <= 0 {
        return RivalOutcome::Clear;
    }
    let must_drop = u32::try_from(deficit).unwrap_or(u32::MAX);
    if must_drop > budget.max_gain {
        return RivalOutcome::Unsatisfiable {
            must_drop,
            max_gain: budget.max_gain,
        };
    }

    let (severity, requirement, events) = if must_drop == budget.max_gain {
        (Severity::Elimination, ELIMINATION_REQUIREMENT.to_string(), None)
    } else {
        let row = select_tier(average_drop(must_drop, budget.remaining_events));
        let worded = describe(row, must_drop, budget.remaining_events, budget.reference);
        (row.severity, worded.text, worded.events)
    };

    RivalOutcome::Constrained(RivalRequirement {
        competitor: rival.id,
        name: rival.name.clone(),
        current_points: rival.points,
        max_points,
        must_drop,
        severity,
        requirement,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(reference: &PayoutTable) -> SeasonBudget<'_> {
        SeasonBudget {
            max_gain: 50,
            remaining_events: 2,
            remaining_primary: 2,
            reference,
        }
    }

    #[test]
    fn tie_margin_applies_when_rival_can_match_wins() {
        let table = PayoutTable::primary();
        let rival = Competitor::new(2, "Leader", 310);
        let outcome = derive_requirement(
            &rival,
            0,
            TargetOutcome {
                total: 350,
                wins: 2,
            },
            &budget(&table),
        );
        let RivalOutcome::Constrained(requirement) = outcome else {
            panic!("expected a constrained rival");
        };
        assert_eq!(requirement.must_drop, 11);
        assert_eq!(requirement.max_points, 360);
        assert_eq!(requirement.severity, Severity::Moderate);
    }

    #[test]
    fn margin_skipped_when_target_has_more_wins() {
        let table = PayoutTable::primary();
        let rival = Competitor::new(2, "Leader", 310);
        let outcome = derive_requirement(
            &rival,
            0,
            TargetOutcome {
                total: 350,
                wins: 3,
            },
            &budget(&table),
        );
        let RivalOutcome::Constrained(requirement) = outcome else {
            panic!("expected a constrained rival");
        };
        assert_eq!(requirement.must_drop, 10);
    }

    #[test]
    fn distant_rival_is_clear_and_hopeless_rival_unsatisfiable() {
        let table = PayoutTable::primary();
        let target = TargetOutcome {
            total: 350,
            wins: 2,
        };
        let behind = Competitor::new(3, "Behind", 250);
        assert_eq!(
            derive_requirement(&behind, 0, target, &budget(&table)),
            RivalOutcome::Clear
        );
        let runaway = Competitor::new(4, "Runaway", 400);
        assert_eq!(
            derive_requirement(&runaway, 0, target, &budget(&table)),
            RivalOutcome::Unsatisfiable {
                must_drop: 101,
                max_gain: 50
            }
        );
    }

    #[test]
    fn full_drop_is_elimination() {
        let table = PayoutTable::primary();
        let rival = Competitor::new(5, "Close", 349);
        let outcome = derive_requirement(
            &rival,
            0,
            TargetOutcome {
                total: 350,
                wins: 2,
            },
            &budget(&table),
        );
        let RivalOutcome::Constrained(requirement) = outcome else {
            panic!("expected a constrained rival");
        };
        assert_eq!(requirement.severity, Severity::Elimination);
        assert_eq!(requirement.requirement, ELIMINATION_REQUIREMENT);
    }
}
