//! Gridcalc Championship Engine
//!
//! Platform-agnostic core for points-championship analysis: constrained
//! finishing-order generation, Monte Carlo title odds, points projections and
//! the path-to-victory solver. No I/O happens here; standings arrive through a
//! [`StandingsProvider`].

pub mod constants;
pub mod data;
pub mod error;
pub mod form;
pub mod numbers;
pub mod order;
pub mod payouts;
pub mod projection;
pub mod rng;
pub mod sampling;
pub mod scenario;
pub mod schedule;
pub mod simulation;
pub mod standings;
pub mod victory;

// Re-export commonly used types
pub use data::{SeasonSnapshot, SeasonTrajectory};
pub use error::{EngineError, ScenarioError, SnapshotError};
pub use form::{FormParams, FormPreset, FormWeights, compute_form_weights};
pub use order::{GeneratedOrder, OrderGenerator};
pub use payouts::{EventKind, PayoutTable};
pub use projection::{CompetitorProjection, PointsBand, PointsProjection, project_points};
pub use rng::{CountingRng, derive_stream_seed, stream_rng, worker_rng};
pub use sampling::{Sampler, SamplingMode};
pub use scenario::{Constraint, ConstraintList, EventScenario, ResolvedConstraint, ScenarioSet};
pub use schedule::{Event, EventCounts, Schedule, ScheduleSplit, best_case_total};
pub use simulation::{
    SimulationConfig, SimulationDiagnostics, SimulationInput, SimulationReport, WinProbability,
    simulate,
};
pub use standings::{
    Competitor, CompetitorId, CompletedEvent, Countback, Entrant, EventResult, Field,
    PointsHistory, Standings, WinCounts, championship_cmp,
};
pub use victory::{
    RivalRequirement, Severity, SolverConfig, TIER_TABLE, TierRow, TierRule, VictoryReport,
    VictoryScenario, path_to_victory, path_to_victory_with,
};

/// Trait for abstracting where season data comes from
/// Platform-specific implementations should provide this
pub trait StandingsProvider {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the current season snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be fetched or decoded.
    fn load_snapshot(&self) -> Result<SeasonSnapshot, Self::Error>;
}

/// Binds a standings provider to the core operations.
pub struct ChampionshipEngine<P>
where
    P: StandingsProvider,
{
    provider: P,
}

impl<P> ChampionshipEngine<P>
where
    P: StandingsProvider,
{
    /// Create an engine over the provided standings source
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Load the snapshot from the provider.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub fn snapshot(&self) -> Result<SeasonSnapshot, P::Error> {
        self.provider.load_snapshot()
    }

    /// Title odds over the remaining calendar under `scenarios`.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the inputs are invalid.
    pub fn simulate(
        &self,
        scenarios: ScenarioSet,
        config: &SimulationConfig,
    ) -> Result<SimulationReport, anyhow::Error>
    where
        P::Error: Into<anyhow::Error>,
    {
        let snapshot = self.provider.load_snapshot().map_err(Into::into)?;
        Ok(snapshot.title_odds(scenarios, config)?)
    }

    /// Completed-weekend points and trajectory bands over `runs` simulated seasons.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the inputs are invalid.
    pub fn project(
        &self,
        scenarios: ScenarioSet,
        config: &SimulationConfig,
        runs: u32,
    ) -> Result<PointsProjection, anyhow::Error>
    where
        P::Error: Into<anyhow::Error>,
    {
        let snapshot = self.provider.load_snapshot().map_err(Into::into)?;
        Ok(snapshot.project(scenarios, config, runs)?)
    }

    /// What must happen for `target` to still take the title.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or `target` is unknown.
    pub fn path_to_victory(
        &self,
        target: CompetitorId,
        config: &SolverConfig,
    ) -> Result<VictoryReport, anyhow::Error>
    where
        P::Error: Into<anyhow::Error>,
    {
        let snapshot = self.provider.load_snapshot().map_err(Into::into)?;
        Ok(snapshot.path_to_victory(target, config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::convert::Infallible;

    #[derive(Default)]
    struct FixtureProvider {
        loads: Cell<usize>,
    }

    impl StandingsProvider for FixtureProvider {
        type Error = Infallible;

        fn load_snapshot(&self) -> Result<SeasonSnapshot, Self::Error> {
            self.loads.set(self.loads.get() + 1);
            let entrant = |id, name: &str| Entrant {
                id: CompetitorId(id),
                name: name.to_string(),
            };
            let finish = |id, position| EventResult {
                competitor: CompetitorId(id),
                position,
                points: None,
            };
            Ok(SeasonSnapshot {
                season: "Fixture".to_string(),
                entrants: vec![entrant(1, "Alpha"), entrant(2, "Bravo"), entrant(3, "Charlie")],
                completed: vec![CompletedEvent {
                    event: Event::primary("Opener"),
                    results: vec![finish(1, 1), finish(2, 2), finish(3, 3)],
                }],
                remaining: vec![Event::primary("Second"), Event::short("Finale"), Event::primary("Finale")],
            })
        }
    }

    #[test]
    fn engine_runs_simulation_from_provider() {
        let engine = ChampionshipEngine::new(FixtureProvider::default());
        let config = SimulationConfig {
            iterations: 200,
            ..SimulationConfig::default()
        };
        let report = engine.simulate(ScenarioSet::new(), &config).unwrap();
        let total: u64 = report.probabilities.iter().map(|p| p.wins).sum();
        assert_eq!(total, 200);
        assert_eq!(report.probabilities.len(), 3);
    }

    #[test]
    fn engine_weighted_mode_uses_snapshot_history() {
        let engine = ChampionshipEngine::new(FixtureProvider::default());
        let config = SimulationConfig {
            iterations: 50,
            mode: SamplingMode::MomentumWeighted,
            unpredictability: 0.0,
            ..SimulationConfig::default()
        };
        let report = engine.simulate(ScenarioSet::new(), &config).unwrap();
        assert_eq!(report.probability_of(CompetitorId(1)), Some(100.0));
    }

    #[test]
    fn engine_solves_and_projects() {
        let engine = ChampionshipEngine::new(FixtureProvider::default());
        let report = engine
            .path_to_victory(CompetitorId(3), &SolverConfig::default())
            .unwrap();
        assert!(report.is_possible);
        assert_eq!(report.max_possible_points, 15 + 25 + 8 + 25);

        let projection = engine
            .project(ScenarioSet::new(), &SimulationConfig::default(), 20)
            .unwrap();
        assert_eq!(projection.steps.len(), 4);
        assert!(engine.path_to_victory(CompetitorId(9), &SolverConfig::default()).is_err());
    }

    #[test]
    fn loaded_snapshot_serves_every_analysis() {
        let engine = ChampionshipEngine::new(FixtureProvider::default());
        let snapshot = engine.snapshot().unwrap();
        let config = SimulationConfig {
            iterations: 100,
            ..SimulationConfig::default()
        };
        let odds = snapshot.title_odds(ScenarioSet::new(), &config).unwrap();
        let victory = snapshot
            .path_to_victory(CompetitorId(2), &SolverConfig::default())
            .unwrap();
        let projection = snapshot.project(ScenarioSet::new(), &config, 20).unwrap();
        assert_eq!(engine.provider.loads.get(), 1);

        assert_eq!(odds, engine.simulate(ScenarioSet::new(), &config).unwrap());
        assert_eq!(victory.max_possible_points, 18 + 25 + 8 + 25);
        assert_eq!(projection.history_steps, vec!["Opener"]);
        assert_eq!(projection.competitors[0].history, vec![25]);
    }
}
