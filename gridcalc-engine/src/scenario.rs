//! User-declared constraints on the finishing order of remaining events.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

use crate::error::{EngineError, ScenarioError};
use crate::standings::{CompetitorId, Field};

/// A restriction on one event's finishing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// `competitor` finishes exactly at 1-based `position`.
    AbsolutePosition {
        competitor: CompetitorId,
        position: u32,
    },
    /// `ahead` finishes strictly ahead of `behind`.
    RelativeOrder {
        ahead: CompetitorId,
        behind: CompetitorId,
    },
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AbsolutePosition {
                competitor,
                position,
            } => write!(f, "{competitor} finishes P{position}"),
            Self::RelativeOrder { ahead, behind } => write!(f, "{ahead} finishes ahead of {behind}"),
        }
    }
}

/// Inline storage for the handful of constraints a single event carries.
pub type ConstraintList = SmallVec<[Constraint; 4]>;

/// Constraint resolved to field indices and a 0-based rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedConstraint {
    Absolute { competitor: usize, rank: usize },
    Relative { ahead: usize, behind: usize },
}

/// Constraints attached to one remaining event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventScenario {
    constraints: ConstraintList,
}

impl EventScenario {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Add a constraint after checking it against the field and existing constraints.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] describing the first contradiction found.
    pub fn add(&mut self, constraint: Constraint, field: &Field) -> Result<(), ScenarioError> {
        self.check(constraint, field)?;
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
        Ok(())
    }

    fn lock_of(&self, competitor: CompetitorId) -> Option<u32> {
        self.constraints.iter().find_map(|existing| match *existing {
            Constraint::AbsolutePosition {
                competitor: locked,
                position,
            } if locked == competitor => Some(position),
            _ => None,
        })
    }

    fn check(&self, constraint: Constraint, field: &Field) -> Result<(), ScenarioError> {
        let field_size = field.len();
        let last = u32::try_from(field_size).unwrap_or(u32::MAX);
        let known = |id: CompetitorId| {
            field
                .position_of(id)
                .map(|_| ())
                .ok_or(ScenarioError::UnknownCompetitor(id))
        };

        match constraint {
            Constraint::AbsolutePosition {
                competitor,
                position,
            } => {
                known(competitor)?;
                if position == 0 || position > last {
                    return Err(ScenarioError::PositionOutOfRange {
                        position,
                        field_size,
                    });
                }
                for existing in &self.constraints {
                    match *existing {
                        Constraint::AbsolutePosition {
                            competitor: holder,
                            position: taken,
                        } => {
                            if holder == competitor && taken != position {
                                return Err(ScenarioError::CompetitorLocked {
                                    competitor,
                                    position: taken,
                                });
                            }
                            if taken == position && holder != competitor {
                                return Err(ScenarioError::PositionTaken { position, holder });
                            }
                        }
                        Constraint::RelativeOrder { ahead, behind } => {
                            if ahead == competitor
                                && (position == last
                                    || self.lock_of(behind).is_some_and(|p| p <= position))
                            {
                                return Err(ScenarioError::LockedOrder {
                                    competitor,
                                    position,
                                    other: behind,
                                });
                            }
                            if behind == competitor
                                && (position == 1
                                    || self.lock_of(ahead).is_some_and(|p| p >= position))
                            {
                                return Err(ScenarioError::LockedOrder {
                                    competitor,
                                    position,
                                    other: ahead,
                                });
                            }
                        }
                    }
                }
            }
            Constraint::RelativeOrder { ahead, behind } => {
                known(ahead)?;
                known(behind)?;
                if ahead == behind {
                    return Err(ScenarioError::SelfOrder(ahead));
                }
                let reversed = Constraint::RelativeOrder {
                    ahead: behind,
                    behind: ahead,
                };
                if self.constraints.contains(&reversed) {
                    return Err(ScenarioError::ReversedOrder { ahead, behind });
                }
                let ahead_lock = self.lock_of(ahead);
                let behind_lock = self.lock_of(behind);
                if let Some(position) = ahead_lock
                    && (position == last || behind_lock.is_some_and(|p| p <= position))
                {
                    return Err(ScenarioError::LockedOrder {
                        competitor: ahead,
                        position,
                        other: behind,
                    });
                }
                if let Some(position) = behind_lock
                    && position == 1
                {
                    return Err(ScenarioError::LockedOrder {
                        competitor: behind,
                        position,
                        other: ahead,
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve ids to field indices; absolute locks keep their declared order.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown competitors or positions outside the field.
    pub fn resolve(&self, field: &Field) -> Result<Vec<ResolvedConstraint>, EngineError> {
        self.constraints
            .iter()
            .map(|constraint| match *constraint {
                Constraint::AbsolutePosition {
                    competitor,
                    position,
                } => {
                    let rank = usize::try_from(position)
                        .ok()
                        .and_then(|p| p.checked_sub(1))
                        .filter(|rank| *rank < field.len())
                        .ok_or(ScenarioError::PositionOutOfRange {
                            position,
                            field_size: field.len(),
                        })?;
                    Ok(ResolvedConstraint::Absolute {
                        competitor: field.index_of(competitor)?,
                        rank,
                    })
                }
                Constraint::RelativeOrder { ahead, behind } => Ok(ResolvedConstraint::Relative {
                    ahead: field.index_of(ahead)?,
                    behind: field.index_of(behind)?,
                }),
            })
            .collect()
    }
}

impl FromIterator<Constraint> for EventScenario {
    /// Collects without conflict checks; the generator tolerates contradictions.
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}

/// Constraints for a whole season keyed by 0-based remaining-event index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioSet {
    events: BTreeMap<usize, EventScenario>,
}

impl ScenarioSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a scenario set from JSON (`{"0": [{"type": "relative_order", ...}]}`).
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn event(&self, index: usize) -> Option<&EventScenario> {
        self.events.get(&index)
    }

    /// Add a checked constraint to the event at `index`.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] when the constraint contradicts the event's set.
    pub fn add(
        &mut self,
        index: usize,
        constraint: Constraint,
        field: &Field,
    ) -> Result<(), ScenarioError> {
        self.events.entry(index).or_default().add(constraint, field)
    }

    /// Replace the constraints of one event wholesale.
    pub fn set_event(&mut self, index: usize, scenario: EventScenario) {
        if scenario.is_empty() {
            self.events.remove(&index);
        } else {
            self.events.insert(index, scenario);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &EventScenario)> {
        self.events.iter().map(|(idx, scenario)| (*idx, scenario))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.values().all(EventScenario::is_empty)
    }

    /// Resolve every event's constraints against the field.
    ///
    /// # Errors
    ///
    /// Returns an error when a scenario targets an event past `remaining`, or
    /// references unknown competitors or positions.
    pub fn resolve(
        &self,
        field: &Field,
        remaining: usize,
    ) -> Result<Vec<Vec<ResolvedConstraint>>, EngineError> {
        let mut resolved = vec![Vec::new(); remaining];
        for (index, scenario) in &self.events {
            let slot = resolved
                .get_mut(*index)
                .ok_or(EngineError::EventOutOfRange {
                    index: *index,
                    remaining,
                })?;
            *slot = scenario.resolve(field)?;
        }
        Ok(resolved)
    }
}
