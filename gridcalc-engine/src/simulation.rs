//! Monte Carlo season simulation and win-probability tallies.
use log::debug;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FAVORED_COUNT, DEFAULT_ITERATIONS, DEFAULT_RETRY_BUDGET, DEFAULT_SEED,
    DEFAULT_UNPREDICTABILITY, DEFAULT_WORKERS,
};
use crate::error::EngineError;
use crate::form::{FormParams, compute_form_weights};
use crate::numbers::percent_of;
use crate::order::OrderGenerator;
use crate::rng::worker_rng;
use crate::sampling::{Sampler, SamplingMode};
use crate::scenario::{ResolvedConstraint, ScenarioSet};
use crate::schedule::Event;
use crate::standings::{CompetitorId, Countback, Field, PointsHistory};

/// Tunables for one simulation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "SimulationConfig::default_iterations")]
    pub iterations: u32,
    #[serde(default)]
    pub mode: SamplingMode,
    #[serde(default = "SimulationConfig::default_unpredictability")]
    pub unpredictability: f64,
    #[serde(default = "SimulationConfig::default_seed")]
    pub seed: u64,
    #[serde(default = "SimulationConfig::default_workers")]
    pub workers: usize,
    #[serde(default = "SimulationConfig::default_retry_budget")]
    pub retry_budget: u32,
    #[serde(default = "SimulationConfig::default_favored_count")]
    pub favored_count: usize,
    /// Overrides the weighted mode's form preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<FormParams>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: Self::default_iterations(),
            mode: SamplingMode::default(),
            unpredictability: Self::default_unpredictability(),
            seed: Self::default_seed(),
            workers: Self::default_workers(),
            retry_budget: Self::default_retry_budget(),
            favored_count: Self::default_favored_count(),
            form: None,
        }
    }
}

impl SimulationConfig {
    #[must_use]
    pub const fn default_iterations() -> u32 {
        DEFAULT_ITERATIONS
    }

    #[must_use]
    pub const fn default_unpredictability() -> f64 {
        DEFAULT_UNPREDICTABILITY
    }

    #[must_use]
    pub const fn default_seed() -> u64 {
        DEFAULT_SEED
    }

    #[must_use]
    pub const fn default_workers() -> usize {
        DEFAULT_WORKERS
    }

    #[must_use]
    pub const fn default_retry_budget() -> u32 {
        DEFAULT_RETRY_BUDGET
    }

    #[must_use]
    pub const fn default_favored_count() -> usize {
        DEFAULT_FAVORED_COUNT
    }

    /// Load a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` when a count is zero or a ratio leaves its range.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.iterations == 0 {
            return Err(EngineError::ZeroCount {
                field: "iterations",
            });
        }
        if self.workers == 0 {
            return Err(EngineError::ZeroCount { field: "workers" });
        }
        if self.retry_budget == 0 {
            return Err(EngineError::ZeroCount {
                field: "retry_budget",
            });
        }
        if !(0.0..=1.0).contains(&self.unpredictability) {
            return Err(EngineError::RangeViolation {
                field: "unpredictability",
                min: 0.0,
                max: 1.0,
                value: self.unpredictability,
            });
        }
        if let Some(form) = &self.form {
            form.validate()?;
        }
        Ok(())
    }

    /// Form parameters for the configured mode, if it is weighted.
    #[must_use]
    pub fn form_params(&self) -> Option<FormParams> {
        self.mode
            .form_preset()
            .map(|preset| self.form.unwrap_or_else(|| preset.params()))
    }
}

/// Immutable inputs of one simulation or projection call.
#[derive(Debug, Clone)]
pub struct SimulationInput {
    pub field: Field,
    /// Remaining events in chronological order.
    pub remaining: Vec<Event>,
    pub scenarios: ScenarioSet,
    /// Per-event points history; required by the weighted modes.
    pub history: Option<PointsHistory>,
}

impl SimulationInput {
    #[must_use]
    pub fn new(field: Field, remaining: Vec<Event>) -> Self {
        Self {
            field,
            remaining,
            scenarios: ScenarioSet::default(),
            history: None,
        }
    }

    #[must_use]
    pub fn with_scenarios(mut self, scenarios: ScenarioSet) -> Self {
        self.scenarios = scenarios;
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: PointsHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Check payout tables and scenarios against the field and schedule.
    ///
    /// # Errors
    ///
    /// Returns the first invalid payout table or out-of-range scenario.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.resolve_constraints().map(|_| ())
    }

    fn resolve_constraints(&self) -> Result<Vec<Vec<ResolvedConstraint>>, EngineError> {
        for event in &self.remaining {
            event.payouts().validate()?;
        }
        self.scenarios.resolve(&self.field, self.remaining.len())
    }
}

/// One competitor's share of simulated championships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinProbability {
    pub competitor: CompetitorId,
    pub name: String,
    pub wins: u64,
    pub win_probability_percent: f64,
}

/// Run-level counters for a simulation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationDiagnostics {
    pub iterations: u32,
    pub workers: usize,
    pub mode: SamplingMode,
    /// Orders generated without honouring their constraints.
    pub fallback_orders: u64,
    pub rng_draws: u64,
}

/// Win probabilities sorted by percentage, plus diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub probabilities: Vec<WinProbability>,
    pub diagnostics: SimulationDiagnostics,
}

impl SimulationReport {
    #[must_use]
    pub fn probability_of(&self, competitor: CompetitorId) -> Option<f64> {
        self.probabilities
            .iter()
            .find(|entry| entry.competitor == competitor)
            .map(|entry| entry.win_probability_percent)
    }
}

/// Outcome of one simulated season.
#[derive(Debug, Clone)]
pub(crate) struct SeasonRun {
    pub champion: usize,
    pub fallbacks: u64,
}

/// Validated generator and constraints shared by every run of a call.
#[derive(Debug)]
pub(crate) struct SeasonPlan<'a> {
    input: &'a SimulationInput,
    generator: OrderGenerator<'a>,
    constraints: Vec<Vec<ResolvedConstraint>>,
    standing_ranks: Vec<usize>,
}

impl<'a> SeasonPlan<'a> {
    pub(crate) fn prepare(
        input: &'a SimulationInput,
        config: &SimulationConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let constraints = input.resolve_constraints()?;
        let weights = match (config.form_params(), &input.history) {
            (Some(params), Some(history)) => {
                Some(compute_form_weights(&input.field, history, &params)?)
            }
            _ => None,
        };
        let sampler = Sampler::build(
            config.mode,
            &input.field,
            weights.as_ref(),
            config.unpredictability,
            config.favored_count,
        )?;
        Ok(Self {
            input,
            generator: OrderGenerator::new(&input.field, sampler, config.retry_budget)?,
            constraints,
            standing_ranks: input.field.standing_ranks(),
        })
    }

    pub(crate) fn field(&self) -> &'a Field {
        &self.input.field
    }

    pub(crate) fn events(&self) -> &'a [Event] {
        &self.input.remaining
    }

    /// Play every remaining event once, calling `observe` with the totals after each.
    pub(crate) fn run<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        mut observe: impl FnMut(usize, &[u32]),
    ) -> SeasonRun {
        let field = self.field();
        let mut totals: Vec<u32> = field.competitors().iter().map(|c| c.points).collect();
        let mut countbacks: Vec<Countback> = field
            .competitors()
            .iter()
            .map(|c| c.countback.clone())
            .collect();
        let mut fallbacks = 0;

        for (idx, event) in self.events().iter().enumerate() {
            let constraints = self.constraints.get(idx).map_or(&[][..], Vec::as_slice);
            let generated = self.generator.generate(constraints, rng);
            if !generated.constraints_honored {
                fallbacks += 1;
            }
            let payouts = event.payouts();
            for (rank, &competitor) in generated.order.iter().enumerate() {
                totals[competitor] = totals[competitor].saturating_add(payouts.points_at(rank));
                if event.is_primary() {
                    countbacks[competitor].record(rank + 1);
                }
            }
            observe(idx, &totals);
        }

        let champion = self.champion(&totals, &countbacks);
        SeasonRun {
            champion,
            fallbacks,
        }
    }

    /// Highest total, then countback, then the earlier championship position.
    fn champion(&self, totals: &[u32], countbacks: &[Countback]) -> usize {
        (0..totals.len())
            .max_by(|&a, &b| {
                totals[a]
                    .cmp(&totals[b])
                    .then_with(|| countbacks[a].compare(&countbacks[b]))
                    .then_with(|| self.standing_ranks[b].cmp(&self.standing_ranks[a]))
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
struct Tally {
    wins: Vec<u64>,
    fallbacks: u64,
    draws: u64,
}

impl Tally {
    fn merge(mut self, other: Self) -> Self {
        if self.wins.len() < other.wins.len() {
            self.wins.resize(other.wins.len(), 0);
        }
        for (slot, wins) in self.wins.iter_mut().zip(other.wins) {
            *slot += wins;
        }
        self.fallbacks += other.fallbacks;
        self.draws += other.draws;
        self
    }
}

fn run_worker(plan: &SeasonPlan<'_>, seed: u64, worker: usize, iterations: u32) -> Tally {
    let mut rng = worker_rng(seed, worker);
    let mut tally = Tally {
        wins: vec![0; plan.field().len()],
        ..Tally::default()
    };
    for _ in 0..iterations {
        let run = plan.run(&mut rng, |_, _| {});
        tally.wins[run.champion] += 1;
        tally.fallbacks += run.fallbacks;
    }
    tally.draws = rng.draws();
    tally
}

/// Split `iterations` as evenly as possible across `workers`.
fn worker_shares(iterations: u32, workers: usize) -> Vec<u32> {
    let workers_u32 = u32::try_from(workers).unwrap_or(u32::MAX);
    let base = iterations / workers_u32;
    let extra = iterations % workers_u32;
    (0..workers_u32)
        .map(|worker| base + u32::from(worker < extra))
        .collect()
}

/// Estimate each competitor's championship probability.
///
/// # Errors
///
/// Returns `EngineError` when the configuration or inputs are invalid.
pub fn simulate(
    input: &SimulationInput,
    config: &SimulationConfig,
) -> Result<SimulationReport, EngineError> {
    let plan = SeasonPlan::prepare(input, config)?;
    debug!(
        "simulating {} seasons over {} remaining events ({} mode, {} workers)",
        config.iterations,
        input.remaining.len(),
        config.mode,
        config.workers
    );

    let tally = if config.workers == 1 {
        run_worker(&plan, config.seed, 0, config.iterations)
    } else {
        worker_shares(config.iterations, config.workers)
            .into_par_iter()
            .enumerate()
            .map(|(worker, share)| run_worker(&plan, config.seed, worker, share))
            .reduce(Tally::default, Tally::merge)
    };

    if tally.fallbacks > 0 {
        debug!(
            "{} orders fell back to unconstrained sampling",
            tally.fallbacks
        );
    }

    let field = &input.field;
    let total = u64::from(config.iterations);
    let mut probabilities: Vec<WinProbability> = field
        .ranking()
        .iter()
        .map(|&idx| {
            let competitor = field.competitor(idx);
            let wins = tally.wins.get(idx).copied().unwrap_or(0);
            WinProbability {
                competitor: competitor.id,
                name: competitor.name.clone(),
                wins,
                win_probability_percent: percent_of(wins, total),
            }
        })
        .collect();
    probabilities.sort_by(|a, b| {
        b.win_probability_percent
            .total_cmp(&a.win_probability_percent)
    });

    Ok(SimulationReport {
        probabilities,
        diagnostics: SimulationDiagnostics {
            iterations: config.iterations,
            workers: config.workers,
            mode: config.mode,
            fallback_orders: tally.fallbacks,
            rng_draws: tally.draws,
        },
    })
}
