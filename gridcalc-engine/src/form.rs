//! Form weights derived from recent per-event points.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{
    FORM_WEIGHT_FLOOR, MOMENTUM_BLEND, MOMENTUM_DECAY, MOMENTUM_WINDOW, RECENT_FORM_BLEND,
    RECENT_FORM_DECAY, RECENT_FORM_WINDOW,
};
use crate::error::EngineError;
use crate::numbers::u64_to_f64;
use crate::standings::{CompetitorId, Field, PointsHistory};

/// Decay, blend and window for form estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormParams {
    #[serde(default = "default_decay")]
    pub decay: f64,
    #[serde(default = "default_blend")]
    pub champ_blend: f64,
    #[serde(default = "default_window")]
    pub window: usize,
}

const fn default_decay() -> f64 {
    RECENT_FORM_DECAY
}

const fn default_blend() -> f64 {
    RECENT_FORM_BLEND
}

const fn default_window() -> usize {
    RECENT_FORM_WINDOW
}

impl Default for FormParams {
    fn default() -> Self {
        FormPreset::RecentForm.params()
    }
}

impl FormParams {
    /// Load parameters from JSON, filling missing fields with recent-form defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// # Errors
    ///
    /// Returns an error when decay is outside (0, 1), blend outside [0, 1], or window is 0.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(EngineError::RangeViolation {
                field: "decay",
                min: 0.0,
                max: 1.0,
                value: self.decay,
            });
        }
        if !(0.0..=1.0).contains(&self.champ_blend) {
            return Err(EngineError::RangeViolation {
                field: "champ_blend",
                min: 0.0,
                max: 1.0,
                value: self.champ_blend,
            });
        }
        if self.window == 0 {
            return Err(EngineError::ZeroCount { field: "window" });
        }
        Ok(())
    }
}

/// Named parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormPreset {
    /// Short memory, light championship blend.
    RecentForm,
    /// Longer memory weighted evenly with the championship.
    Momentum,
}

impl FormPreset {
    #[must_use]
    pub const fn params(self) -> FormParams {
        match self {
            Self::RecentForm => FormParams {
                decay: RECENT_FORM_DECAY,
                champ_blend: RECENT_FORM_BLEND,
                window: RECENT_FORM_WINDOW,
            },
            Self::Momentum => FormParams {
                decay: MOMENTUM_DECAY,
                champ_blend: MOMENTUM_BLEND,
                window: MOMENTUM_WINDOW,
            },
        }
    }
}

/// Per-competitor weight in `[FORM_WEIGHT_FLOOR, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormWeights(BTreeMap<CompetitorId, f64>);

impl FormWeights {
    /// Weight for `id`; unknown competitors get the floor.
    #[must_use]
    pub fn get(&self, id: CompetitorId) -> f64 {
        self.0.get(&id).copied().unwrap_or(FORM_WEIGHT_FLOOR)
    }

    /// Weights aligned with the field's indices.
    #[must_use]
    pub fn for_field(&self, field: &Field) -> Vec<f64> {
        field
            .competitors()
            .iter()
            .map(|competitor| self.get(competitor.id))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CompetitorId, f64)> + '_ {
        self.0.iter().map(|(id, weight)| (*id, *weight))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(CompetitorId, f64)> for FormWeights {
    fn from_iter<I: IntoIterator<Item = (CompetitorId, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn decayed_score(entries: &[u32], params: &FormParams) -> f64 {
    let mut factor = 1.0;
    let mut score = 0.0;
    for points in entries.iter().rev().take(params.window) {
        score += f64::from(*points) * factor;
        factor *= params.decay;
    }
    score
}

/// Blend decayed recent scoring with current championship points.
///
/// Every competitor in the field or in `history` receives a weight; those
/// without history score 0 recent form, those missing from the field 0
/// current points.
///
/// # Errors
///
/// Returns an error if `params` fails validation.
pub fn compute_form_weights(
    field: &Field,
    history: &PointsHistory,
    params: &FormParams,
) -> Result<FormWeights, EngineError> {
    params.validate()?;

    let mut raw: BTreeMap<CompetitorId, (f64, u32)> = field
        .competitors()
        .iter()
        .map(|competitor| (competitor.id, (0.0, competitor.points)))
        .collect();
    for (id, entries) in history {
        raw.entry(*id).or_insert((0.0, 0)).0 = decayed_score(entries, params);
    }

    let max_recent = raw.values().map(|(score, _)| *score).fold(0.0, f64::max);
    let max_points = raw.values().map(|(_, points)| *points).max().unwrap_or(0);

    let weights = raw
        .into_iter()
        .map(|(id, (score, points))| {
            let recent = if max_recent > 0.0 { score / max_recent } else { 0.0 };
            let champ = if max_points > 0 {
                u64_to_f64(u64::from(points)) / u64_to_f64(u64::from(max_points))
            } else {
                0.0
            };
            let blended = recent.mul_add(1.0 - params.champ_blend, champ * params.champ_blend);
            (id, blended.max(FORM_WEIGHT_FLOOR))
        })
        .collect();
    Ok(FormWeights(weights))
}
