//! Anti-spoof scoring over the session's metric history.
//!
//! The score is the real anti-spoof control: challenge predicates verify
//! that the presenter follows instructions, but only the aggregate signal
//! history distinguishes a live face from a replayed or printed one. The
//! composite is a weighted sum of independently bounded sub-scores; the
//! weights are configuration, not constants, because historical deployments
//! disagreed on them.
//!
//! Scoring is a pure function of its inputs — calling it twice on the same
//! history yields the identical score.

use serde::Serialize;

use crate::metrics::Metrics;

/// Credit granted when inter-frame movement is nonzero but falls outside
/// the plausible band. Distinguishes "moving wrong" from "not moving at
/// all" (a static photo), which earns zero.
pub const OUT_OF_BAND_PARTIAL_CREDIT: f32 = 0.4;

/// Relative weights of the sub-scores. Must sum to 1.0; validated by
/// [`crate::config::EngineConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub movement: f32,
    pub depth: f32,
    pub micro_variance: f32,
    pub challenge: f32,
}

impl ScoreWeights {
    pub fn sum(&self) -> f32 {
        self.movement + self.depth + self.micro_variance + self.challenge
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            movement: 0.30,
            depth: 0.25,
            micro_variance: 0.20,
            challenge: 0.25,
        }
    }
}

/// Scorer tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreConfig {
    pub weights: ScoreWeights,
    /// Plausible band for mean inter-frame movement (normalized units).
    /// Below it the presentation is static; above it, erratic.
    pub movement_band_min: f32,
    pub movement_band_max: f32,
    /// Minimum mean depth variance for full depth credit.
    pub min_session_depth_variance: f32,
    /// Minimum eye-openness variance across the window. Real faces exhibit
    /// natural micro-fluctuation; a dead-flat signal scores zero here.
    pub min_eye_variance: f32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            movement_band_min: 5e-4,
            movement_band_max: 5e-2,
            min_session_depth_variance: 2e-4,
            min_eye_variance: 1e-5,
        }
    }
}

/// Composite score plus its sub-scores, each bounded to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpoofScore {
    pub total: f32,
    pub movement: f32,
    pub depth: f32,
    pub micro_variance: f32,
    pub challenge_bonus: f32,
}

/// Score a session from its metric history and challenge completions.
///
/// `completed` / `assigned` count challenge outcomes; history is the bounded
/// rolling window the session accumulated. An empty history scores zero on
/// every signal sub-score.
pub fn score_session(
    history: &[Metrics],
    completed: usize,
    assigned: usize,
    cfg: &ScoreConfig,
) -> SpoofScore {
    let movement = movement_score(history, cfg);
    let depth = depth_score(history, cfg);
    let micro_variance = micro_variance_score(history, cfg);
    let challenge_bonus = if assigned == 0 {
        0.0
    } else {
        (completed as f32 / assigned as f32).clamp(0.0, 1.0)
    };

    let w = &cfg.weights;
    let total = (w.movement * movement
        + w.depth * depth
        + w.micro_variance * micro_variance
        + w.challenge * challenge_bonus)
        .clamp(0.0, 1.0);

    tracing::debug!(
        frames = history.len(),
        movement,
        depth,
        micro_variance,
        challenge_bonus,
        total,
        "session scored"
    );

    SpoofScore {
        total,
        movement,
        depth,
        micro_variance,
        challenge_bonus,
    }
}

fn movement_score(history: &[Metrics], cfg: &ScoreConfig) -> f32 {
    let Some(mean) = mean(history.iter().map(|m| m.frame_movement)) else {
        return 0.0;
    };
    if mean == 0.0 {
        // Exactly zero across the window: static presentation
        0.0
    } else if (cfg.movement_band_min..=cfg.movement_band_max).contains(&mean) {
        1.0
    } else {
        OUT_OF_BAND_PARTIAL_CREDIT
    }
}

fn depth_score(history: &[Metrics], cfg: &ScoreConfig) -> f32 {
    let Some(mean) = mean(history.iter().map(|m| m.depth_variance)) else {
        return 0.0;
    };
    if mean >= cfg.min_session_depth_variance {
        1.0
    } else if mean > 0.0 {
        // Nonzero but low: half credit scaled by how close it came
        0.5 * (mean / cfg.min_session_depth_variance).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn micro_variance_score(history: &[Metrics], cfg: &ScoreConfig) -> f32 {
    let openness: Vec<f32> = history.iter().map(|m| m.mean_eye_openness()).collect();
    let Some(var) = population_variance(&openness) else {
        return 0.0;
    };
    (var / cfg.min_eye_variance).clamp(0.0, 1.0)
}

// Accumulation runs in f64: summing hundreds of f32 samples loses enough
// precision that a dead-flat signal can come out with a tiny nonzero
// variance, which must score exactly zero.
fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let mut sum = 0.0f64;
    let mut n = 0usize;
    for v in values {
        sum += f64::from(v);
        n += 1;
    }
    (n > 0).then(|| (sum / n as f64) as f32)
}

fn population_variance(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    Some(var as f32)
}
