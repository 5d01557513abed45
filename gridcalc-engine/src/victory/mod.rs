//! Path-to-victory analysis: elimination check and heuristic scenario search.
mod rival;
mod tiers;

pub use rival::RivalRequirement;
pub use tiers::{
    ELIMINATION_REQUIREMENT, Severity, TIER_TABLE, TierRequirement, TierRow, TierRule,
    average_drop, describe, select_tier,
};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::constants::{CANDIDATE_WIN_SPREAD, CONTENDER_BUFFER, SECOND_PLACE_RANK};
use crate::error::EngineError;
use crate::numbers::{saturating_u32, usize_to_f64};
use crate::payouts::EventKind;
use crate::schedule::{Event, EventCounts, best_case_total};
use crate::standings::{CompetitorId, Field, WinCounts};
use rival::{RivalOutcome, SeasonBudget, TargetOutcome, derive_requirement};

/// Tunables for the scenario search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Rivals whose maximum falls short of the leader by more than this are ignored.
    #[serde(default = "SolverConfig::default_contender_buffer")]
    pub contender_buffer: u32,
    /// Candidate win counts tried below "wins every race".
    #[serde(default = "SolverConfig::default_candidate_spread")]
    pub candidate_spread: usize,
    /// Finish assumed for the target in races it does not win.
    #[serde(default = "SolverConfig::default_fallback_rank")]
    pub fallback_rank: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            contender_buffer: Self::default_contender_buffer(),
            candidate_spread: Self::default_candidate_spread(),
            fallback_rank: Self::default_fallback_rank(),
        }
    }
}

impl SolverConfig {
    #[must_use]
    pub const fn default_contender_buffer() -> u32 {
        CONTENDER_BUFFER
    }

    #[must_use]
    pub const fn default_candidate_spread() -> usize {
        CANDIDATE_WIN_SPREAD
    }

    #[must_use]
    pub const fn default_fallback_rank() -> usize {
        SECOND_PLACE_RANK
    }

    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// # Errors
    ///
    /// Returns `EngineError` when the fallback rank is not a real position.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.fallback_rank < 2 {
            return Err(EngineError::RangeViolation {
                field: "fallback_rank",
                min: 2.0,
                max: f64::INFINITY,
                value: usize_to_f64(self.fallback_rank),
            });
        }
        Ok(())
    }
}

/// One candidate outcome for the target and what its rivals must concede.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VictoryScenario {
    /// Remaining primary events the target wins.
    pub target_wins: u32,
    pub target_total: u32,
    pub difficulty: Severity,
    /// Mean severity score of the listed rivals (1 when none).
    pub difficulty_score: f64,
    pub rivals: Vec<RivalRequirement>,
}

/// Result of a path-to-victory query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VictoryReport {
    pub competitor: CompetitorId,
    pub name: String,
    pub is_possible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Easiest viable scenario.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<VictoryScenario>,
    /// Every viable candidate, easiest first.
    #[serde(default)]
    pub alternatives: Vec<VictoryScenario>,
    pub max_possible_points: u32,
    pub leader_points: u32,
}

/// Candidate win counts: `P` down to `P - spread`, plus `ceil(P/2)` and `P - 1`, descending.
#[must_use]
pub fn candidate_wins(primary: u32, spread: usize) -> Vec<u32> {
    let spread = saturating_u32(spread);
    let mut candidates: Vec<u32> = (0..=spread)
        .map(|step| primary.saturating_sub(step))
        .collect();
    candidates.push(primary.div_ceil(2));
    candidates.push(primary.saturating_sub(1));
    candidates.sort_unstable_by(|a, b| b.cmp(a));
    candidates.dedup();
    candidates
}

/// Target total when winning the first `wins` remaining primary events.
fn candidate_total(current: u32, remaining: &[Event], wins: u32, fallback_rank: usize) -> u32 {
    let mut won = 0;
    remaining.iter().fold(current, |total, event| {
        let gain = match event.kind {
            EventKind::Short => event.best_case(),
            EventKind::Primary if won < wins => {
                won += 1;
                event.best_case()
            }
            EventKind::Primary => event.payouts().points_for_rank(fallback_rank),
        };
        total.saturating_add(gain)
    })
}

/// Path to the title for `target` with the default solver settings.
///
/// # Errors
///
/// Returns [`EngineError::UnknownCompetitor`] when `target` is not in the field.
pub fn path_to_victory(
    target: CompetitorId,
    field: &Field,
    remaining: &[Event],
    rival_wins: &WinCounts,
) -> Result<VictoryReport, EngineError> {
    path_to_victory_with(target, field, remaining, rival_wins, &SolverConfig::default())
}

/// Path to the title for `target`.
///
/// # Errors
///
/// Returns `EngineError` for an unknown target, an invalid config or payout table.
pub fn path_to_victory_with(
    target: CompetitorId,
    field: &Field,
    remaining: &[Event],
    rival_wins: &WinCounts,
    config: &SolverConfig,
) -> Result<VictoryReport, EngineError> {
    config.validate()?;
    for event in remaining {
        event.payouts().validate()?;
    }
    let target_idx = field.index_of(target)?;
    let competitor = field.competitor(target_idx);
    let leader_points = field.leader().points;
    let max_gain = best_case_total(remaining);
    let max_possible_points = competitor.points.saturating_add(max_gain);

    let mut report = VictoryReport {
        competitor: target,
        name: competitor.name.clone(),
        is_possible: false,
        reason: None,
        scenario: None,
        alternatives: Vec::new(),
        max_possible_points,
        leader_points,
    };

    if max_possible_points < leader_points {
        report.reason = Some(format!(
            "{} can reach at most {max_possible_points} points, {} short of the leader's {leader_points}",
            competitor.name,
            leader_points - max_possible_points
        ));
        return Ok(report);
    }

    let contenders: Vec<usize> = field
        .ranking()
        .iter()
        .copied()
        .filter(|&idx| idx != target_idx)
        .filter(|&idx| {
            field
                .competitor(idx)
                .points
                .saturating_add(max_gain)
                .saturating_add(config.contender_buffer)
                >= leader_points
        })
        .collect();

    let counts = EventCounts::of(remaining);
    let reference = remaining
        .iter()
        .find(|event| event.is_primary())
        .or_else(|| remaining.first())
        .map_or_else(|| EventKind::Primary.default_payouts(), Event::payouts);
    let budget = SeasonBudget {
        max_gain,
        remaining_events: counts.total(),
        remaining_primary: saturating_u32(counts.primary),
        reference,
    };
    let wins_of = |id: CompetitorId| rival_wins.get(&id).copied().unwrap_or(0);
    let target_current_wins = wins_of(target);

    let candidates = candidate_wins(budget.remaining_primary, config.candidate_spread);
    let mut viable = Vec::new();
    for &wins in &candidates {
        let outcome = TargetOutcome {
            total: candidate_total(competitor.points, remaining, wins, config.fallback_rank),
            wins: target_current_wins.saturating_add(wins),
        };
        let mut rivals = Vec::new();
        let mut satisfiable = true;
        for &idx in &contenders {
            let rival = field.competitor(idx);
            match derive_requirement(rival, wins_of(rival.id), outcome, &budget) {
                RivalOutcome::Clear => {}
                RivalOutcome::Constrained(requirement) => rivals.push(requirement),
                RivalOutcome::Unsatisfiable {
                    must_drop,
                    max_gain,
                } => {
                    trace!(
                        "{wins} wins ({} pts): {} needs to drop {must_drop} of {max_gain}",
                        outcome.total, rival.name
                    );
                    satisfiable = false;
                    break;
                }
            }
        }
        if !satisfiable {
            continue;
        }
        let difficulty_score = if rivals.is_empty() {
            f64::from(Severity::Easy.score())
        } else {
            let total: u32 = rivals.iter().map(|r| r.severity.score()).sum();
            f64::from(total) / usize_to_f64(rivals.len())
        };
        trace!(
            "{wins} wins ({} pts): {} rivals listed, score {difficulty_score:.2}",
            outcome.total,
            rivals.len()
        );
        viable.push(VictoryScenario {
            target_wins: wins,
            target_total: outcome.total,
            difficulty: Severity::from_score(difficulty_score),
            difficulty_score,
            rivals,
        });
    }

    debug!(
        "path to victory for {}: {} candidates, {} viable, {} contenders",
        competitor.name,
        candidates.len(),
        viable.len(),
        contenders.len()
    );

    viable.sort_by(|a, b| {
        a.difficulty_score
            .total_cmp(&b.difficulty_score)
            .then_with(|| a.target_wins.cmp(&b.target_wins))
    });
    if viable.is_empty() {
        report.reason = Some(format!(
            "{} needs rivals to fail beyond what the remaining points allow",
            competitor.name
        ));
        return Ok(report);
    }

    report.is_possible = true;
    report.scenario = viable.first().cloned();
    report.alternatives = viable;
    Ok(report)
}
