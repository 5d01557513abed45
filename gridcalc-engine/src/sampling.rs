//! Base finishing-order sampling strategies.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::constants::{
    FAVORED_FRONT_PROBABILITY, FAVORED_OFF_DAY_PROBABILITY, FORM_NOISE_EXPONENT,
    MOMENTUM_NOISE_EXPONENT,
};
use crate::error::EngineError;
use crate::form::{FormPreset, FormWeights};
use crate::standings::Field;

/// User-facing sampling mode selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    #[default]
    Uniform,
    Favored,
    FormWeighted,
    MomentumWeighted,
}

impl SamplingMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Favored => "favored",
            Self::FormWeighted => "form_weighted",
            Self::MomentumWeighted => "momentum_weighted",
        }
    }

    /// Form preset used to derive weights for weighted modes.
    #[must_use]
    pub const fn form_preset(self) -> Option<FormPreset> {
        match self {
            Self::FormWeighted => Some(FormPreset::RecentForm),
            Self::MomentumWeighted => Some(FormPreset::Momentum),
            Self::Uniform | Self::Favored => None,
        }
    }
}

impl std::fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy producing one unconstrained finishing order of field indices.
#[derive(Debug, Clone, PartialEq)]
pub enum Sampler {
    Uniform,
    Favored {
        favored: Vec<usize>,
    },
    FormWeighted {
        weights: Vec<f64>,
        unpredictability: f64,
    },
    MomentumWeighted {
        weights: Vec<f64>,
        unpredictability: f64,
    },
}

impl Sampler {
    /// Build the sampler for `mode` over `field`.
    ///
    /// # Errors
    ///
    /// Returns an error when a weighted mode has no weights, or unpredictability is outside [0, 1].
    pub fn build(
        mode: SamplingMode,
        field: &Field,
        weights: Option<&FormWeights>,
        unpredictability: f64,
        favored_count: usize,
    ) -> Result<Self, EngineError> {
        if !(0.0..=1.0).contains(&unpredictability) {
            return Err(EngineError::RangeViolation {
                field: "unpredictability",
                min: 0.0,
                max: 1.0,
                value: unpredictability,
            });
        }
        let weights_for_field = || {
            weights
                .map(|weights| weights.for_field(field))
                .ok_or(EngineError::MissingFormWeights {
                    mode: mode.as_str(),
                })
        };
        Ok(match mode {
            SamplingMode::Uniform => Self::Uniform,
            SamplingMode::Favored => Self::Favored {
                favored: field.favored(favored_count),
            },
            SamplingMode::FormWeighted => Self::FormWeighted {
                weights: weights_for_field()?,
                unpredictability,
            },
            SamplingMode::MomentumWeighted => Self::MomentumWeighted {
                weights: weights_for_field()?,
                unpredictability,
            },
        })
    }

    /// Draw one finishing order as field indices, winner first.
    pub fn sample<R: Rng + ?Sized>(&self, field: &Field, rng: &mut R) -> Vec<usize> {
        match self {
            Self::Uniform => shuffled(field.len(), rng),
            Self::Favored { favored } => favored_order(field.len(), favored, rng),
            Self::FormWeighted {
                weights,
                unpredictability,
            } => weighted_order(
                field,
                weights,
                unpredictability.powf(FORM_NOISE_EXPONENT),
                rng,
            ),
            Self::MomentumWeighted {
                weights,
                unpredictability,
            } => weighted_order(
                field,
                weights,
                unpredictability.powf(MOMENTUM_NOISE_EXPONENT),
                rng,
            ),
        }
    }
}

fn shuffled<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}

fn favored_order<R: Rng + ?Sized>(len: usize, favored: &[usize], rng: &mut R) -> Vec<usize> {
    let base = shuffled(len, rng);
    let roll = rng.r#gen::<f64>();
    let front = roll < FAVORED_FRONT_PROBABILITY;
    let off_day = !front && roll < FAVORED_FRONT_PROBABILITY + FAVORED_OFF_DAY_PROBABILITY;
    if !front && !off_day {
        return base;
    }

    let (mut top, rest): (Vec<usize>, Vec<usize>) =
        base.into_iter().partition(|idx| favored.contains(idx));
    top.shuffle(rng);
    if front {
        top.extend(rest);
        top
    } else {
        let mut order = rest;
        order.extend(top);
        order
    }
}

fn weighted_order<R: Rng + ?Sized>(
    field: &Field,
    weights: &[f64],
    noise_share: f64,
    rng: &mut R,
) -> Vec<usize> {
    let scores: Vec<f64> = weights
        .iter()
        .map(|weight| {
            if noise_share > 0.0 {
                let noise = rng.r#gen::<f64>();
                (1.0 - noise_share).mul_add(*weight, noise_share * noise)
            } else {
                *weight
            }
        })
        .collect();
    let mut order: Vec<usize> = (0..field.len()).collect();
    order.sort_by(|&a, &b| {
        let by_score = scores
            .get(b)
            .zip(scores.get(a))
            .map_or(Ordering::Equal, |(sb, sa)| sb.total_cmp(sa));
        by_score.then_with(|| field.competitor(a).id.cmp(&field.competitor(b).id))
    });
    order
}
