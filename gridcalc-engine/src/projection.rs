//! Cumulative points trajectories across simulated seasons.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::PROJECTION_STREAM_TAG;
use crate::data::SeasonTrajectory;
use crate::error::EngineError;
use crate::numbers::{round_f64_to_usize, u64_to_f64, usize_to_f64};
use crate::rng::stream_rng;
use crate::simulation::{SeasonPlan, SimulationConfig, SimulationInput};
use crate::standings::CompetitorId;

/// Distribution of one competitor's points after one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointsBand {
    pub min: u32,
    pub lower_quartile: f64,
    pub median: f64,
    pub upper_quartile: f64,
    pub max: u32,
    pub mean: f64,
}

impl PointsBand {
    /// Summarise `samples`, sorting them in place.
    fn from_samples(samples: &mut [u32]) -> Self {
        samples.sort_unstable();
        let total: u64 = samples.iter().map(|&p| u64::from(p)).sum();
        Self {
            min: samples.first().copied().unwrap_or(0),
            lower_quartile: quantile(samples, 0.25),
            median: quantile(samples, 0.5),
            upper_quartile: quantile(samples, 0.75),
            max: samples.last().copied().unwrap_or(0),
            mean: if samples.is_empty() {
                0.0
            } else {
                u64_to_f64(total) / usize_to_f64(samples.len())
            },
        }
    }
}

/// Linear interpolation between closest ranks of sorted samples.
fn quantile(sorted: &[u32], q: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return 0.0;
    };
    let pos = usize_to_f64(last) * q;
    let lower = pos.floor();
    let weight = pos - lower;
    let lo_idx = round_f64_to_usize(lower).min(last);
    let hi_idx = (lo_idx + 1).min(last);
    let lo = f64::from(sorted[lo_idx]);
    let hi = f64::from(sorted[hi_idx]);
    (hi - lo).mul_add(weight, lo)
}

/// Per-step bands for one competitor; step 0 holds current points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorProjection {
    pub competitor: CompetitorId,
    pub name: String,
    /// Actual points after each completed weekend.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<u32>,
    pub steps: Vec<PointsBand>,
}

/// Trajectory bands for the whole field in championship order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsProjection {
    pub runs: u32,
    /// Labels of the completed weekends behind each `history` entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history_steps: Vec<String>,
    /// Step labels, starting with the current standings.
    pub steps: Vec<String>,
    pub competitors: Vec<CompetitorProjection>,
}

impl PointsProjection {
    #[must_use]
    pub fn competitor(&self, id: CompetitorId) -> Option<&CompetitorProjection> {
        self.competitors.iter().find(|entry| entry.competitor == id)
    }

    /// Prefix every competitor's bands with their completed-weekend points.
    #[must_use]
    pub fn with_history(mut self, trajectory: &SeasonTrajectory) -> Self {
        let weekends = trajectory.labels.len();
        self.history_steps.clone_from(&trajectory.labels);
        for entry in &mut self.competitors {
            entry.history = trajectory
                .points
                .get(&entry.competitor)
                .cloned()
                .unwrap_or_else(|| vec![0; weekends]);
        }
        self
    }
}

/// Per-competitor, per-event sample buffers, each sized for `runs` samples.
fn sample_buffers(competitors: usize, events: usize, runs: usize) -> Vec<Vec<Vec<u32>>> {
    (0..competitors)
        .map(|_| (0..events).map(|_| Vec::with_capacity(runs)).collect())
        .collect()
}

/// Simulate `runs` seasons and band each competitor's points after every event.
///
/// # Errors
///
/// Returns `EngineError` when `runs` is zero or the inputs fail validation.
pub fn project_points(
    input: &SimulationInput,
    config: &SimulationConfig,
    runs: u32,
) -> Result<PointsProjection, EngineError> {
    if runs == 0 {
        return Err(EngineError::ZeroCount { field: "runs" });
    }
    let plan = SeasonPlan::prepare(input, config)?;
    let field = &input.field;
    let events = input.remaining.len();
    debug!("projecting {runs} seasons over {events} remaining events");

    let capacity = usize::try_from(runs).unwrap_or_default();
    // samples[competitor][step - 1][run]
    let mut samples = sample_buffers(field.len(), events, capacity);
    let mut rng = stream_rng(config.seed, PROJECTION_STREAM_TAG);
    for _ in 0..runs {
        plan.run(&mut rng, |step, totals| {
            for (competitor, &points) in totals.iter().enumerate() {
                samples[competitor][step].push(points);
            }
        });
    }

    let mut steps = Vec::with_capacity(events + 1);
    steps.push("Current".to_string());
    steps.extend(
        input
            .remaining
            .iter()
            .enumerate()
            .map(|(idx, event)| event.describe(idx + 1)),
    );

    let competitors = field
        .ranking()
        .iter()
        .map(|&idx| {
            let competitor = field.competitor(idx);
            let current = competitor.points;
            let mut bands = Vec::with_capacity(events + 1);
            bands.push(PointsBand {
                min: current,
                lower_quartile: f64::from(current),
                median: f64::from(current),
                upper_quartile: f64::from(current),
                max: current,
                mean: f64::from(current),
            });
            bands.extend(
                samples[idx]
                    .iter_mut()
                    .map(|step| PointsBand::from_samples(step)),
            );
            CompetitorProjection {
                competitor: competitor.id,
                name: competitor.name.clone(),
                history: Vec::new(),
                steps: bands,
            }
        })
        .collect();

    Ok(PointsProjection {
        runs,
        history_steps: Vec::new(),
        steps,
        competitors,
    })
}
