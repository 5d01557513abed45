//! Serialisable season snapshot handed over by a standings provider.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SnapshotError;
use crate::projection::{PointsProjection, project_points};
use crate::scenario::ScenarioSet;
use crate::schedule::{Event, EventCounts, Schedule};
use crate::simulation::{SimulationConfig, SimulationInput, SimulationReport, simulate};
use crate::standings::{CompetitorId, CompletedEvent, Entrant, Field, Standings};
use crate::victory::{SolverConfig, VictoryReport, path_to_victory_with};

/// Cumulative points after each completed weekend, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeasonTrajectory {
    /// Label of the primary event closing each weekend.
    pub labels: Vec<String>,
    pub points: BTreeMap<CompetitorId, Vec<u32>>,
}

/// Entrants, completed results and the remaining calendar of one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SeasonSnapshot {
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub entrants: Vec<Entrant>,
    #[serde(default)]
    pub completed: Vec<CompletedEvent>,
    #[serde(default)]
    pub remaining: Vec<Event>,
}

impl SeasonSnapshot {
    /// Load a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a snapshot.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Standings aggregated from the completed events.
    ///
    /// # Errors
    ///
    /// Returns an error if a completed event lists a competitor twice.
    pub fn standings(&self) -> Result<Standings, SnapshotError> {
        Standings::aggregate(&self.entrants, &self.completed)
    }

    /// Standings after the first `weekends` completed weekends.
    ///
    /// # Errors
    ///
    /// Returns an error if a completed event lists a competitor twice.
    pub fn standings_after(&self, weekends: usize) -> Result<Standings, SnapshotError> {
        Standings::after_weekends(&self.entrants, &self.completed, weekends)
    }

    /// Points after every completed weekend. A trailing short event whose
    /// primary has not run yet adds a final step, so the last entry always
    /// equals the current standings.
    ///
    /// # Errors
    ///
    /// Returns an error if a completed event is malformed.
    pub fn trajectory(&self) -> Result<SeasonTrajectory, SnapshotError> {
        let current = self.standings()?;
        let mut steps: Vec<(String, Standings)> = Vec::new();
        let primaries = self.completed.iter().filter(|event| event.event.is_primary());
        for (weekend, event) in primaries.enumerate() {
            steps.push((event.event.label.clone(), self.standings_after(weekend + 1)?));
        }
        let settled = steps
            .last()
            .is_some_and(|(_, standings)| standings.competitors == current.competitors);
        if !settled && let Some(last) = self.completed.last() {
            steps.push((last.event.label.clone(), current.clone()));
        }

        let points = current
            .competitors
            .iter()
            .map(|competitor| {
                let series = steps
                    .iter()
                    .map(|(_, standings)| {
                        standings
                            .competitors
                            .iter()
                            .find(|entry| entry.id == competitor.id)
                            .map_or(0, |entry| entry.points)
                    })
                    .collect();
                (competitor.id, series)
            })
            .collect();
        Ok(SeasonTrajectory {
            labels: steps.into_iter().map(|(label, _)| label).collect(),
            points,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the standings are empty or inconsistent.
    pub fn field(&self) -> Result<Field, SnapshotError> {
        Ok(self.standings()?.field()?)
    }

    #[must_use]
    pub fn remaining_counts(&self) -> EventCounts {
        EventCounts::of(&self.remaining)
    }

    /// Snapshot as it stood on `as_of`: completed events dated later move back
    /// to the remaining calendar and lose their results.
    #[must_use]
    pub fn rewind(&self, as_of: NaiveDate) -> Self {
        let (completed, reopened): (Vec<CompletedEvent>, Vec<CompletedEvent>) = self
            .completed
            .iter()
            .cloned()
            .partition(|event| event.event.date.is_none_or(|date| date <= as_of));
        let calendar = Schedule::new(
            reopened
                .into_iter()
                .map(|event| event.event)
                .chain(self.remaining.iter().cloned())
                .collect(),
        );
        Self {
            season: self.season.clone(),
            entrants: self.entrants.clone(),
            completed,
            remaining: calendar.events().to_vec(),
        }
    }

    /// Simulation input over the remaining calendar, carrying points history.
    ///
    /// # Errors
    ///
    /// Returns an error if the standings cannot be aggregated into a field.
    pub fn simulation_input(&self) -> Result<SimulationInput, SnapshotError> {
        let standings = self.standings()?;
        let field = standings.field()?;
        Ok(SimulationInput::new(field, self.remaining.clone()).with_history(standings.history))
    }

    /// Title odds over the remaining calendar under `scenarios`.
    ///
    /// # Errors
    ///
    /// Returns an error if the standings or the simulation inputs are invalid.
    pub fn title_odds(
        &self,
        scenarios: ScenarioSet,
        config: &SimulationConfig,
    ) -> Result<SimulationReport, SnapshotError> {
        let input = self.simulation_input()?.with_scenarios(scenarios);
        Ok(simulate(&input, config)?)
    }

    /// Completed-weekend points followed by `runs` simulated trajectories.
    ///
    /// # Errors
    ///
    /// Returns an error if the standings or the simulation inputs are invalid.
    pub fn project(
        &self,
        scenarios: ScenarioSet,
        config: &SimulationConfig,
        runs: u32,
    ) -> Result<PointsProjection, SnapshotError> {
        let input = self.simulation_input()?.with_scenarios(scenarios);
        let projection = project_points(&input, config, runs)?;
        Ok(projection.with_history(&self.trajectory()?))
    }

    /// What must happen for `target` to still take the title.
    ///
    /// # Errors
    ///
    /// Returns an error if the standings are invalid or `target` is unknown.
    pub fn path_to_victory(
        &self,
        target: CompetitorId,
        config: &SolverConfig,
    ) -> Result<VictoryReport, SnapshotError> {
        let standings = self.standings()?;
        let field = standings.field()?;
        Ok(path_to_victory_with(
            target,
            &field,
            &self.remaining,
            &standings.wins,
            config,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standings::CompetitorId;

    const SNAPSHOT: &str = r#"{
        "season": "Test Cup",
        "entrants": [
            {"id": 1, "name": "Alpha"},
            {"id": 2, "name": "Bravo"}
        ],
        "completed": [
            {"kind": "primary", "label": "Opener", "date": "2025-03-02",
             "results": [{"competitor": 2, "position": 1}, {"competitor": 1, "position": 2}]},
            {"kind": "short", "label": "Middle", "date": "2025-03-15",
             "results": [{"competitor": 1, "position": 1}, {"competitor": 2, "position": 2}]},
            {"kind": "primary", "label": "Middle", "date": "2025-03-16",
             "results": [{"competitor": 1, "position": 1}, {"competitor": 2, "position": 2, "points": 11}]}
        ],
        "remaining": [
            {"kind": "primary", "label": "Finale", "date": "2025-04-06"}
        ]
    }"#;

    #[test]
    fn snapshot_parses_and_aggregates() {
        let snapshot = SeasonSnapshot::from_json(SNAPSHOT).unwrap();
        let standings = snapshot.standings().unwrap();
        assert_eq!(standings.competitors[0].id, CompetitorId(1));
        assert_eq!(standings.competitors[0].points, 18 + 8 + 25);
        assert_eq!(standings.competitors[1].points, 25 + 7 + 11);
        assert_eq!(snapshot.remaining_counts().primary, 1);
        let input = snapshot.simulation_input().unwrap();
        assert_eq!(input.history.unwrap()[&CompetitorId(2)], vec![25, 7, 11]);
    }

    #[test]
    fn rewind_reopens_later_events() {
        let snapshot = SeasonSnapshot::from_json(SNAPSHOT).unwrap();
        let rewound = snapshot.rewind(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(rewound.completed.len(), 1);
        let labels: Vec<_> = rewound
            .remaining
            .iter()
            .map(|event| format!("{} {}", event.kind, event.label))
            .collect();
        assert_eq!(labels, vec!["short Middle", "primary Middle", "primary Finale"]);
        let standings = rewound.standings().unwrap();
        assert_eq!(standings.competitors[0].id, CompetitorId(2));
    }

    #[test]
    fn trajectory_ends_at_current_points() {
        let snapshot = SeasonSnapshot::from_json(SNAPSHOT).unwrap();
        let trajectory = snapshot.trajectory().unwrap();
        assert_eq!(trajectory.labels, vec!["Opener", "Middle"]);
        assert_eq!(trajectory.points[&CompetitorId(1)], vec![18, 18 + 8 + 25]);
        assert_eq!(trajectory.points[&CompetitorId(2)], vec![25, 25 + 7 + 11]);
        for competitor in snapshot.standings().unwrap().competitors {
            assert_eq!(trajectory.points[&competitor.id].last(), Some(&competitor.points));
        }
    }

    #[test]
    fn trajectory_closes_on_a_pending_weekend() {
        // The sprint has run but its race has not.
        let snapshot = SeasonSnapshot::from_json(SNAPSHOT)
            .unwrap()
            .rewind(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        let trajectory = snapshot.trajectory().unwrap();
        assert_eq!(trajectory.labels, vec!["Opener", "Middle"]);
        assert_eq!(trajectory.points[&CompetitorId(1)], vec![18, 18 + 8]);
        assert_eq!(trajectory.points[&CompetitorId(2)], vec![25, 25 + 7]);

        let empty = SeasonSnapshot::from_json(SNAPSHOT)
            .unwrap()
            .rewind(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(empty.trajectory().unwrap().labels.len(), 0);
    }

    #[test]
    fn malformed_position_fails_fast() {
        let json = SNAPSHOT.replace(
            r#"{"competitor": 1, "position": 2}"#,
            r#"{"competitor": 1, "position": 4000000000}"#,
        );
        let snapshot = SeasonSnapshot::from_json(&json).unwrap();
        assert!(matches!(
            snapshot.standings(),
            Err(SnapshotError::PositionOutOfRange { position: 4_000_000_000, .. })
        ));
    }

    #[test]
    fn projection_carries_completed_weekends() {
        let snapshot = SeasonSnapshot::from_json(SNAPSHOT).unwrap();
        let projection = snapshot
            .project(ScenarioSet::new(), &SimulationConfig::default(), 20)
            .unwrap();
        assert_eq!(projection.history_steps, vec!["Opener", "Middle"]);
        for entry in &projection.competitors {
            assert_eq!(entry.history.len(), 2);
            assert_eq!(entry.history.last().copied(), Some(entry.steps[0].min));
        }
    }

    #[test]
    fn malformed_snapshot_is_a_parse_error() {
        assert!(matches!(
            SeasonSnapshot::from_json("{\"entrants\": 3}"),
            Err(SnapshotError::Parse(_))
        ));
        let empty = SeasonSnapshot::default();
        assert!(matches!(empty.field(), Err(SnapshotError::Engine(_))));
    }
}
