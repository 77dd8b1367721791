//! Per-session baseline calibration.
//!
//! All challenge thresholds are expressed relative to a resting snapshot of
//! the presenter's face, so the engine adapts to individual facial geometry
//! and camera angle instead of hard-coding absolute values.

use crate::metrics::Metrics;

/// Resting metric snapshot, averaged over exactly K validated frames.
/// Set at most once per session; re-running a failed session must build a
/// fresh calibrator.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Baseline {
    pub resting_eye_openness: f32,
    pub resting_mouth_ratio: f32,
    pub resting_yaw_deg: f32,
}

/// Online mean accumulator over exactly `target` samples.
#[derive(Debug, Clone)]
pub struct BaselineCalibrator {
    target: usize,
    count: usize,
    sum_eye: f32,
    sum_mouth: f32,
    sum_yaw: f32,
}

impl BaselineCalibrator {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            count: 0,
            sum_eye: 0.0,
            sum_mouth: 0.0,
            sum_yaw: 0.0,
        }
    }

    /// Accumulate one validated sample. Returns the finalized baseline once
    /// the target count is reached.
    pub fn push(&mut self, m: &Metrics) -> Option<Baseline> {
        self.count += 1;
        self.sum_eye += m.mean_eye_openness();
        self.sum_mouth += m.mouth_ratio;
        self.sum_yaw += m.head_yaw_deg;

        if self.count < self.target {
            return None;
        }
        let n = self.count as f32;
        Some(Baseline {
            resting_eye_openness: self.sum_eye / n,
            resting_mouth_ratio: self.sum_mouth / n,
            resting_yaw_deg: self.sum_yaw / n,
        })
    }

    /// Discard partial progress. Called when face validity is lost before
    /// the target count — no partial baseline is ever used.
    pub fn reset(&mut self) {
        self.count = 0;
        self.sum_eye = 0.0;
        self.sum_mouth = 0.0;
        self.sum_yaw = 0.0;
    }

    pub fn collected(&self) -> usize {
        self.count
    }

    pub fn target(&self) -> usize {
        self.target
    }
}
