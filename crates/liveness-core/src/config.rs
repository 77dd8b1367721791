//! Engine configuration surface.
//!
//! Every behavioral threshold lives here so that deployment differences are
//! configuration, not forked code paths. Defaults carry the tuned values;
//! `LIVENESS_*` environment variables override them.

use thiserror::Error;

use crate::score::ScoreConfig;

/// Required consecutive passing frames per challenge kind. A blink is an
/// event (short hold); smiles and turns are sustained poses.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct HoldFrames {
    pub blink: u32,
    pub smile: u32,
    pub turn: u32,
}

impl Default for HoldFrames {
    fn default() -> Self {
        Self {
            blink: 2,
            smile: 5,
            turn: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EngineConfig {
    pub hold_frames: HoldFrames,
    /// Validated frames averaged into the baseline (K).
    pub calibration_sample_count: usize,
    /// Minimum composite anti-spoof score to accept the session.
    pub min_acceptance_score: f32,
    /// Per-challenge budget; calibration shares the same budget.
    pub challenge_timeout_ms: u64,
    /// Blink close threshold: openness must drop below baseline × this.
    pub blink_drop_fraction: f32,
    /// Smile threshold: mouth ratio must exceed baseline × (1 + this).
    pub smile_margin_fraction: f32,
    /// Head-turn threshold relative to the resting yaw.
    pub turn_yaw_threshold_degrees: f32,
    /// Capacity of the metric history ring buffer.
    pub history_window_size: usize,
    pub score: ScoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hold_frames: HoldFrames::default(),
            calibration_sample_count: 8,
            min_acceptance_score: 0.6,
            challenge_timeout_ms: 10_000,
            blink_drop_fraction: 0.7,
            smile_margin_fraction: 0.25,
            turn_yaw_threshold_degrees: 15.0,
            history_window_size: 150,
            score: ScoreConfig::default(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("calibration_sample_count must be at least 1")]
    ZeroCalibrationSamples,
    #[error("history_window_size must be at least 1")]
    ZeroHistoryWindow,
    #[error("{name} must lie in (0, 1), got {value}")]
    FractionOutOfRange { name: &'static str, value: f32 },
    #[error("min_acceptance_score must lie in [0, 1], got {0}")]
    AcceptanceOutOfRange(f32),
    #[error("turn_yaw_threshold_degrees must be positive, got {0}")]
    NonPositiveYawThreshold(f32),
    #[error("movement band is empty: min {min} >= max {max}")]
    EmptyMovementBand { min: f32, max: f32 },
    #[error("score weights must sum to 1.0, got {0}")]
    WeightsNotNormalized(f32),
}

impl EngineConfig {
    /// Load configuration from `LIVENESS_*` environment variables with
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            hold_frames: HoldFrames {
                blink: env_u32("LIVENESS_HOLD_FRAMES_BLINK", d.hold_frames.blink),
                smile: env_u32("LIVENESS_HOLD_FRAMES_SMILE", d.hold_frames.smile),
                turn: env_u32("LIVENESS_HOLD_FRAMES_TURN", d.hold_frames.turn),
            },
            calibration_sample_count: env_usize(
                "LIVENESS_CALIBRATION_SAMPLES",
                d.calibration_sample_count,
            ),
            min_acceptance_score: env_f32("LIVENESS_MIN_ACCEPTANCE_SCORE", d.min_acceptance_score),
            challenge_timeout_ms: env_u64("LIVENESS_CHALLENGE_TIMEOUT_MS", d.challenge_timeout_ms),
            blink_drop_fraction: env_f32("LIVENESS_BLINK_DROP_FRACTION", d.blink_drop_fraction),
            smile_margin_fraction: env_f32(
                "LIVENESS_SMILE_MARGIN_FRACTION",
                d.smile_margin_fraction,
            ),
            turn_yaw_threshold_degrees: env_f32(
                "LIVENESS_TURN_YAW_THRESHOLD_DEG",
                d.turn_yaw_threshold_degrees,
            ),
            history_window_size: env_usize("LIVENESS_HISTORY_WINDOW", d.history_window_size),
            score: d.score,
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.calibration_sample_count == 0 {
            return Err(ConfigError::ZeroCalibrationSamples);
        }
        if self.history_window_size == 0 {
            return Err(ConfigError::ZeroHistoryWindow);
        }
        for (name, value) in [
            ("blink_drop_fraction", self.blink_drop_fraction),
            ("smile_margin_fraction", self.smile_margin_fraction),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }
        if !(0.0..=1.0).contains(&self.min_acceptance_score) {
            return Err(ConfigError::AcceptanceOutOfRange(self.min_acceptance_score));
        }
        if self.turn_yaw_threshold_degrees <= 0.0 {
            return Err(ConfigError::NonPositiveYawThreshold(
                self.turn_yaw_threshold_degrees,
            ));
        }
        if self.score.movement_band_min >= self.score.movement_band_max {
            return Err(ConfigError::EmptyMovementBand {
                min: self.score.movement_band_min,
                max: self.score.movement_band_max,
            });
        }
        let weight_sum = self.score.weights.sum();
        if (weight_sum - 1.0).abs() > 1e-4 {
            return Err(ConfigError::WeightsNotNormalized(weight_sum));
        }
        Ok(())
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_zero_calibration_samples() {
        let cfg = EngineConfig {
            calibration_sample_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroCalibrationSamples)
        ));
    }

    #[test]
    fn test_rejects_out_of_range_fraction() {
        let cfg = EngineConfig {
            blink_drop_fraction: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::FractionOutOfRange {
                name: "blink_drop_fraction",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_unnormalized_weights() {
        let mut cfg = EngineConfig::default();
        cfg.score.weights.movement = 0.9;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::WeightsNotNormalized(_))
        ));
    }

    #[test]
    fn test_rejects_empty_movement_band() {
        let mut cfg = EngineConfig::default();
        cfg.score.movement_band_min = cfg.score.movement_band_max;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::EmptyMovementBand { .. })
        ));
    }
}
