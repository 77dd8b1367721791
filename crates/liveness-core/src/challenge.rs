//! Challenge variants and per-challenge pass predicates.
//!
//! Each challenge is a tagged variant carrying its own threshold parameters
//! and a uniform `evaluate(metrics, baseline)` predicate; the sequencer
//! dispatches them uniformly instead of branching on challenge names. All
//! thresholds are relative to the session baseline.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::baseline::Baseline;
use crate::config::EngineConfig;
use crate::metrics::Metrics;

/// Reopen threshold for the blink detector, as a fraction of baseline
/// openness. Higher than the close threshold so a blink must be a genuine
/// close-then-open cycle, not a sustained squint hovering at one level.
pub const BLINK_REOPEN_FRACTION: f32 = 0.85;

/// Stable challenge identifier, serialized into the completion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Blink,
    Smile,
    TurnLeft,
    TurnRight,
}

impl ChallengeKind {
    /// The full challenge set a session's plan is drawn from.
    pub const ALL: [ChallengeKind; 4] = [
        ChallengeKind::Blink,
        ChallengeKind::Smile,
        ChallengeKind::TurnLeft,
        ChallengeKind::TurnRight,
    ];
}

/// Two-phase blink progress. Both eyes must close below the drop threshold,
/// then reopen above the (higher) reopen threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkPhase {
    Waiting,
    Closed,
    Reopened,
}

/// One challenge with its threshold parameters and any in-flight progress.
#[derive(Debug, Clone)]
pub enum Challenge {
    Blink {
        drop_fraction: f32,
        hold_frames: u32,
        phase: BlinkPhase,
    },
    Smile {
        margin_fraction: f32,
        hold_frames: u32,
    },
    TurnLeft {
        yaw_threshold_deg: f32,
        hold_frames: u32,
    },
    TurnRight {
        yaw_threshold_deg: f32,
        hold_frames: u32,
    },
}

impl Challenge {
    pub fn from_kind(kind: ChallengeKind, config: &EngineConfig) -> Self {
        match kind {
            ChallengeKind::Blink => Challenge::Blink {
                drop_fraction: config.blink_drop_fraction,
                hold_frames: config.hold_frames.blink,
                phase: BlinkPhase::Waiting,
            },
            ChallengeKind::Smile => Challenge::Smile {
                margin_fraction: config.smile_margin_fraction,
                hold_frames: config.hold_frames.smile,
            },
            ChallengeKind::TurnLeft => Challenge::TurnLeft {
                yaw_threshold_deg: config.turn_yaw_threshold_degrees,
                hold_frames: config.hold_frames.turn,
            },
            ChallengeKind::TurnRight => Challenge::TurnRight {
                yaw_threshold_deg: config.turn_yaw_threshold_degrees,
                hold_frames: config.hold_frames.turn,
            },
        }
    }

    pub fn kind(&self) -> ChallengeKind {
        match self {
            Challenge::Blink { .. } => ChallengeKind::Blink,
            Challenge::Smile { .. } => ChallengeKind::Smile,
            Challenge::TurnLeft { .. } => ChallengeKind::TurnLeft,
            Challenge::TurnRight { .. } => ChallengeKind::TurnRight,
        }
    }

    /// Human-readable prompt for the interface layer.
    pub fn prompt(&self) -> &'static str {
        match self {
            Challenge::Blink { .. } => "Blink both eyes",
            Challenge::Smile { .. } => "Smile",
            Challenge::TurnLeft { .. } => "Turn your head to your left",
            Challenge::TurnRight { .. } => "Turn your head to your right",
        }
    }

    pub fn required_hold_frames(&self) -> u32 {
        match self {
            Challenge::Blink { hold_frames, .. }
            | Challenge::Smile { hold_frames, .. }
            | Challenge::TurnLeft { hold_frames, .. }
            | Challenge::TurnRight { hold_frames, .. } => *hold_frames,
        }
    }

    /// Evaluate the pass predicate for one validated frame.
    ///
    /// Turn yaw is measured relative to the resting yaw, and positive yaw
    /// means the subject turning toward their own left (the metric
    /// extractor's sign convention).
    pub fn evaluate(&mut self, m: &Metrics, baseline: &Baseline) -> bool {
        match self {
            Challenge::Blink {
                drop_fraction,
                phase,
                ..
            } => {
                let close_below = baseline.resting_eye_openness * *drop_fraction;
                let reopen_above = baseline.resting_eye_openness * BLINK_REOPEN_FRACTION;
                let most_open = m.left_eye_openness.max(m.right_eye_openness);
                let least_open = m.left_eye_openness.min(m.right_eye_openness);

                match *phase {
                    BlinkPhase::Waiting => {
                        // Both eyes below the close threshold
                        if most_open < close_below {
                            *phase = BlinkPhase::Closed;
                        }
                    }
                    BlinkPhase::Closed => {
                        // Both eyes back above the reopen threshold
                        if least_open > reopen_above {
                            *phase = BlinkPhase::Reopened;
                        }
                    }
                    BlinkPhase::Reopened => {}
                }
                // The predicate passes only once the full cycle is latched;
                // the closing edge alone never counts
                *phase == BlinkPhase::Reopened
            }
            Challenge::Smile {
                margin_fraction, ..
            } => m.mouth_ratio > baseline.resting_mouth_ratio * (1.0 + *margin_fraction),
            Challenge::TurnLeft {
                yaw_threshold_deg, ..
            } => m.head_yaw_deg - baseline.resting_yaw_deg >= *yaw_threshold_deg,
            Challenge::TurnRight {
                yaw_threshold_deg, ..
            } => m.head_yaw_deg - baseline.resting_yaw_deg <= -*yaw_threshold_deg,
        }
    }

    /// Clear in-flight progress (blink phase). Called when face validity is
    /// lost mid-challenge; threshold parameters are untouched.
    pub fn reset_progress(&mut self) {
        if let Challenge::Blink { phase, .. } = self {
            *phase = BlinkPhase::Waiting;
        }
    }
}

/// Draw the session's challenge plan: a uniformly random permutation of the
/// full challenge set, fixed once at session start.
///
/// Pure in the sense that the sequence is fully determined by `rng` — tests
/// pass a seeded `StdRng` to script the order.
pub fn challenge_plan<R: Rng>(config: &EngineConfig, rng: &mut R) -> Vec<Challenge> {
    let mut kinds = ChallengeKind::ALL.to_vec();
    kinds.shuffle(rng);
    kinds
        .into_iter()
        .map(|kind| Challenge::from_kind(kind, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn baseline() -> Baseline {
        Baseline {
            resting_eye_openness: 0.30,
            resting_mouth_ratio: 0.05,
            resting_yaw_deg: 0.0,
        }
    }

    fn metrics(eye: f32, mouth: f32, yaw: f32) -> Metrics {
        Metrics {
            left_eye_openness: eye,
            right_eye_openness: eye,
            mouth_ratio: mouth,
            head_yaw_deg: yaw,
            head_pitch_deg: 0.0,
            face_size_ratio: 0.4,
            frame_movement: 0.001,
            depth_variance: 0.001,
        }
    }

    fn blink(drop_fraction: f32) -> Challenge {
        Challenge::Blink {
            drop_fraction,
            hold_frames: 2,
            phase: BlinkPhase::Waiting,
        }
    }

    #[test]
    fn test_blink_requires_close_then_open() {
        // Baseline 0.30, drop 0.7: close below 0.21, reopen above 0.255
        let mut c = blink(0.7);
        let b = baseline();

        // Open at baseline: nothing yet
        assert!(!c.evaluate(&metrics(0.30, 0.05, 0.0), &b));
        // Closing edge alone must not pass
        assert!(!c.evaluate(&metrics(0.10, 0.05, 0.0), &b));
        // Still closed
        assert!(!c.evaluate(&metrics(0.12, 0.05, 0.0), &b));
        // Reopened above 0.255: the cycle completes
        assert!(c.evaluate(&metrics(0.29, 0.05, 0.0), &b));
        // And stays latched for the hold count
        assert!(c.evaluate(&metrics(0.30, 0.05, 0.0), &b));
    }

    #[test]
    fn test_blink_threshold_arithmetic() {
        // Boundary checks on both thresholds: 0.209 closes, 0.254 has not
        // reopened far enough
        let mut c = blink(0.7);
        let b = baseline();

        assert!(!c.evaluate(&metrics(0.211, 0.05, 0.0), &b)); // above close
        assert!(!c.evaluate(&metrics(0.209, 0.05, 0.0), &b)); // closes
        assert!(!c.evaluate(&metrics(0.254, 0.05, 0.0), &b)); // below reopen
        assert!(c.evaluate(&metrics(0.256, 0.05, 0.0), &b)); // reopens
    }

    #[test]
    fn test_sustained_squint_never_completes() {
        let mut c = blink(0.7);
        let b = baseline();
        // Hovering between the two thresholds forever
        for _ in 0..100 {
            assert!(!c.evaluate(&metrics(0.23, 0.05, 0.0), &b));
        }
    }

    #[test]
    fn test_blink_reset_clears_phase() {
        let mut c = blink(0.7);
        let b = baseline();
        c.evaluate(&metrics(0.10, 0.05, 0.0), &b); // closed
        c.reset_progress();
        // After reset, reopening alone is not a blink
        assert!(!c.evaluate(&metrics(0.30, 0.05, 0.0), &b));
    }

    #[test]
    fn test_smile_margin() {
        let mut c = Challenge::Smile {
            margin_fraction: 0.25,
            hold_frames: 5,
        };
        let b = baseline();
        // Threshold: 0.05 × 1.25 = 0.0625
        assert!(!c.evaluate(&metrics(0.30, 0.060, 0.0), &b));
        assert!(c.evaluate(&metrics(0.30, 0.070, 0.0), &b));
    }

    #[test]
    fn test_turn_directions_are_signed() {
        let b = baseline();
        let mut left = Challenge::TurnLeft {
            yaw_threshold_deg: 15.0,
            hold_frames: 6,
        };
        let mut right = Challenge::TurnRight {
            yaw_threshold_deg: 15.0,
            hold_frames: 6,
        };

        assert!(left.evaluate(&metrics(0.30, 0.05, 20.0), &b));
        assert!(!left.evaluate(&metrics(0.30, 0.05, -20.0), &b));
        assert!(right.evaluate(&metrics(0.30, 0.05, -20.0), &b));
        assert!(!right.evaluate(&metrics(0.30, 0.05, 20.0), &b));
        assert!(!left.evaluate(&metrics(0.30, 0.05, 10.0), &b));
    }

    #[test]
    fn test_turn_is_relative_to_resting_yaw() {
        // Camera mounted off-axis: resting yaw 10°, so 20° absolute is only
        // a 10° turn and must not pass a 15° threshold
        let b = Baseline {
            resting_yaw_deg: 10.0,
            ..baseline()
        };
        let mut left = Challenge::TurnLeft {
            yaw_threshold_deg: 15.0,
            hold_frames: 6,
        };
        assert!(!left.evaluate(&metrics(0.30, 0.05, 20.0), &b));
        assert!(left.evaluate(&metrics(0.30, 0.05, 26.0), &b));
    }

    #[test]
    fn test_plan_is_permutation_of_full_set() {
        let config = EngineConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let plan = challenge_plan(&config, &mut rng);
        assert_eq!(plan.len(), ChallengeKind::ALL.len());
        for kind in ChallengeKind::ALL {
            assert_eq!(plan.iter().filter(|c| c.kind() == kind).count(), 1);
        }
    }

    #[test]
    fn test_plan_is_seed_deterministic() {
        let config = EngineConfig::default();
        let a: Vec<_> = challenge_plan(&config, &mut StdRng::seed_from_u64(42))
            .iter()
            .map(|c| c.kind())
            .collect();
        let b: Vec<_> = challenge_plan(&config, &mut StdRng::seed_from_u64(42))
            .iter()
            .map(|c| c.kind())
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_plan_varies_across_seeds() {
        let config = EngineConfig::default();
        let orders: std::collections::HashSet<Vec<ChallengeKind>> = (0..32)
            .map(|seed| {
                challenge_plan(&config, &mut StdRng::seed_from_u64(seed))
                    .iter()
                    .map(|c| c.kind())
                    .collect()
            })
            .collect();
        assert!(orders.len() > 1);
    }
}
