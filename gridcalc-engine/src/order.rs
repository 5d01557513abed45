//! Constrained finishing-order generation with bounded rejection sampling.
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::sampling::Sampler;
use crate::scenario::ResolvedConstraint;
use crate::standings::Field;

/// One generated finishing order (field indices, winner first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedOrder {
    pub order: Vec<usize>,
    /// `false` when the retry budget ran out and `order` ignores the constraints.
    pub constraints_honored: bool,
    pub attempts: u32,
}

/// Binds a field and sampler with a retry budget.
#[derive(Debug, Clone)]
pub struct OrderGenerator<'a> {
    field: &'a Field,
    sampler: Sampler,
    retry_budget: u32,
}

impl<'a> OrderGenerator<'a> {
    /// # Errors
    ///
    /// Returns [`EngineError::ZeroCount`] when `retry_budget` is 0.
    pub fn new(field: &'a Field, sampler: Sampler, retry_budget: u32) -> Result<Self, EngineError> {
        if retry_budget == 0 {
            return Err(EngineError::ZeroCount {
                field: "retry_budget",
            });
        }
        Ok(Self {
            field,
            sampler,
            retry_budget,
        })
    }

    #[must_use]
    pub const fn field(&self) -> &'a Field {
        self.field
    }

    #[must_use]
    pub const fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    /// Sample until every constraint holds or the budget is spent.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        constraints: &[ResolvedConstraint],
        rng: &mut R,
    ) -> GeneratedOrder {
        let mut positions = vec![0; self.field.len()];
        for attempt in 1..=self.retry_budget {
            let mut order = self.sampler.sample(self.field, rng);
            if constraints.is_empty() {
                return GeneratedOrder {
                    order,
                    constraints_honored: true,
                    attempts: attempt,
                };
            }
            apply_locks(&mut order, constraints, &mut positions);
            if satisfies(&positions, constraints) {
                return GeneratedOrder {
                    order,
                    constraints_honored: true,
                    attempts: attempt,
                };
            }
        }

        warn!(
            "no order satisfied {} constraints within {} attempts; using an unconstrained order",
            constraints.len(),
            self.retry_budget
        );
        GeneratedOrder {
            order: self.sampler.sample(self.field, rng),
            constraints_honored: false,
            attempts: self.retry_budget,
        }
    }
}

fn index_positions(order: &[usize], positions: &mut [usize]) {
    for (rank, &idx) in order.iter().enumerate() {
        positions[idx] = rank;
    }
}

/// Swap each locked competitor into its rank, leaving `positions` current.
fn apply_locks(order: &mut [usize], constraints: &[ResolvedConstraint], positions: &mut [usize]) {
    index_positions(order, positions);
    for constraint in constraints {
        if let ResolvedConstraint::Absolute { competitor, rank } = *constraint {
            let current = positions[competitor];
            if current != rank {
                let displaced = order[rank];
                order.swap(current, rank);
                positions[competitor] = rank;
                positions[displaced] = current;
            }
        }
    }
}

fn satisfies(positions: &[usize], constraints: &[ResolvedConstraint]) -> bool {
    constraints.iter().all(|constraint| match *constraint {
        ResolvedConstraint::Absolute { competitor, rank } => positions[competitor] == rank,
        ResolvedConstraint::Relative { ahead, behind } => positions[ahead] < positions[behind],
    })
}
