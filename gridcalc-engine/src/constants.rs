//! Centralized tuning constants for gridcalc championship logic.
//!
//! These values define the sampling biases and solver thresholds used by the
//! core.

// Payout tables -----------------------------------------------------------
pub(crate) const PRIMARY_PAYOUTS: [u32; 10] = [25, 18, 15, 12, 10, 8, 6, 4, 2, 1];
pub(crate) const SHORT_PAYOUTS: [u32; 8] = [8, 7, 6, 5, 4, 3, 2, 1];

// Order generation --------------------------------------------------------
pub(crate) const DEFAULT_RETRY_BUDGET: u32 = 1000;
pub(crate) const DEFAULT_FAVORED_COUNT: usize = 5;
pub(crate) const FAVORED_FRONT_PROBABILITY: f64 = 0.5;
pub(crate) const FAVORED_OFF_DAY_PROBABILITY: f64 = 0.1;
pub(crate) const FORM_NOISE_EXPONENT: f64 = 1.0;
pub(crate) const MOMENTUM_NOISE_EXPONENT: f64 = 1.25;

// Simulation defaults -----------------------------------------------------
pub(crate) const DEFAULT_ITERATIONS: u32 = 1000;
pub(crate) const DEFAULT_UNPREDICTABILITY: f64 = 0.5;
pub(crate) const DEFAULT_SEED: u64 = 0x00C0_FFEE;
pub(crate) const DEFAULT_WORKERS: usize = 1;
pub(crate) const PROJECTION_STREAM_TAG: &[u8] = b"projection";

// Form weights ------------------------------------------------------------
pub(crate) const FORM_WEIGHT_FLOOR: f64 = 1e-3;
pub(crate) const RECENT_FORM_DECAY: f64 = 0.7;
pub(crate) const RECENT_FORM_BLEND: f64 = 0.2;
pub(crate) const RECENT_FORM_WINDOW: usize = 5;
pub(crate) const MOMENTUM_DECAY: f64 = 0.85;
pub(crate) const MOMENTUM_BLEND: f64 = 0.5;
pub(crate) const MOMENTUM_WINDOW: usize = 8;

// Path-to-victory solver --------------------------------------------------
pub(crate) const CONTENDER_BUFFER: u32 = 10;
pub(crate) const CANDIDATE_WIN_SPREAD: usize = 4;
pub(crate) const SECOND_PLACE_RANK: usize = 2;
