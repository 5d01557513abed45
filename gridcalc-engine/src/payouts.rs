//! Points payout tables for primary and short events.
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::constants::{PRIMARY_PAYOUTS, SHORT_PAYOUTS};
use crate::error::EngineError;

/// Kind of a points-awarding event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Full-distance event awarding the full points table.
    Primary,
    /// Short sprint-style event with a reduced table.
    Short,
}

impl EventKind {
    /// Default payout table for this kind of event.
    #[must_use]
    pub fn default_payouts(self) -> &'static PayoutTable {
        static PRIMARY: OnceLock<PayoutTable> = OnceLock::new();
        static SHORT: OnceLock<PayoutTable> = OnceLock::new();
        match self {
            Self::Primary => PRIMARY.get_or_init(PayoutTable::primary),
            Self::Short => SHORT.get_or_init(PayoutTable::short),
        }
    }

    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Primary => "race",
            Self::Short => "sprint",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Ordered points per finishing rank; index 0 pays the winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayoutTable(Vec<u32>);

impl PayoutTable {
    /// Build a validated table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty or pays a lower rank more than a higher one.
    pub fn new(points: Vec<u32>) -> Result<Self, EngineError> {
        let table = Self(points);
        table.validate()?;
        Ok(table)
    }

    /// Standard full-distance table (25-18-15-12-10-8-6-4-2-1).
    #[must_use]
    pub fn primary() -> Self {
        Self(PRIMARY_PAYOUTS.to_vec())
    }

    /// Standard short-event table (8 down to 1).
    #[must_use]
    pub fn short() -> Self {
        Self(SHORT_PAYOUTS.to_vec())
    }

    /// Check the table is non-empty and non-increasing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyPayoutTable`] or [`EngineError::IncreasingPayouts`].
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.0.is_empty() {
            return Err(EngineError::EmptyPayoutTable);
        }
        for (idx, pair) in self.0.windows(2).enumerate() {
            if pair[1] > pair[0] {
                return Err(EngineError::IncreasingPayouts {
                    rank: idx + 2,
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(())
    }

    /// Points for a 0-based finishing index; ranks past the table pay nothing.
    #[must_use]
    pub fn points_at(&self, index: usize) -> u32 {
        self.0.get(index).copied().unwrap_or(0)
    }

    /// Points for a 1-based finishing rank.
    #[must_use]
    pub fn points_for_rank(&self, rank: usize) -> u32 {
        rank.checked_sub(1).map_or(0, |idx| self.points_at(idx))
    }

    /// Points for winning the event.
    #[must_use]
    pub fn best_case(&self) -> u32 {
        self.points_at(0)
    }

    /// Number of ranks that score points.
    #[must_use]
    pub fn scoring_ranks(&self) -> usize {
        self.0.iter().take_while(|points| **points > 0).count()
    }

    /// Points lost by finishing at `rank` instead of winning.
    #[must_use]
    pub fn drop_from_win_to(&self, rank: usize) -> u32 {
        self.best_case().saturating_sub(self.points_for_rank(rank))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}
