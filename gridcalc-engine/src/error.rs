//! Validation errors raised at the boundary of the championship core.
use thiserror::Error;

use crate::standings::CompetitorId;

/// Errors raised when inputs or configuration violate the core's invariants.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("competitor field is empty")]
    EmptyField,
    #[error("competitor {0} appears more than once in the field")]
    DuplicateCompetitor(CompetitorId),
    #[error("competitor {0} is not part of the field")]
    UnknownCompetitor(CompetitorId),
    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.3})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("payout table must not be empty")]
    EmptyPayoutTable,
    #[error("payout table increases at rank {rank} ({previous} -> {next})")]
    IncreasingPayouts { rank: usize, previous: u32, next: u32 },
    #[error("{mode} sampling requires form weights")]
    MissingFormWeights { mode: &'static str },
    #[error("scenario targets event {index} but only {remaining} events remain")]
    EventOutOfRange { index: usize, remaining: usize },
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// Errors raised when a scenario constraint contradicts an existing one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("competitor {0} is not part of the field")]
    UnknownCompetitor(CompetitorId),
    #[error("position {position} is outside 1..={field_size}")]
    PositionOutOfRange { position: u32, field_size: usize },
    #[error("position {position} is already locked to {holder}")]
    PositionTaken {
        position: u32,
        holder: CompetitorId,
    },
    #[error("{competitor} is already locked to position {position}")]
    CompetitorLocked {
        competitor: CompetitorId,
        position: u32,
    },
    #[error("{0} cannot finish ahead of itself")]
    SelfOrder(CompetitorId),
    #[error("{behind} is already required to finish ahead of {ahead}")]
    ReversedOrder {
        ahead: CompetitorId,
        behind: CompetitorId,
    },
    #[error("{competitor} is locked to P{position} and cannot satisfy the order with {other}")]
    LockedOrder {
        competitor: CompetitorId,
        position: u32,
        other: CompetitorId,
    },
}

/// Errors raised while decoding a season snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot JSON could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("completed event {event} lists {competitor} more than once")]
    DuplicateResult {
        event: String,
        competitor: CompetitorId,
    },
    #[error("completed event {event} places {competitor} at position {position}, outside 1..={field_size}")]
    PositionOutOfRange {
        event: String,
        competitor: CompetitorId,
        position: u32,
        field_size: usize,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}
