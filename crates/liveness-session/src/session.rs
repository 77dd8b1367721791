//! The session aggregate and challenge sequencer.
//!
//! A `Session` owns all mutable verification state and is driven by exactly
//! one caller at a time, one frame at a time, in arrival order. Per-frame
//! faults (no face, bad geometry, malformed landmarks) are absorbed into
//! session state and never propagate across the frame-processing boundary;
//! only terminal outcomes are reported outward.

use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use liveness_core::baseline::BaselineCalibrator;
use liveness_core::challenge::{challenge_plan, Challenge};
use liveness_core::{
    geometry, metrics, score_session, Baseline, ChallengeKind, ConfigError, EngineConfig,
    FrameInput, LandmarkFrame, SpoofScore,
};

use crate::history::MetricsHistory;
use crate::report::{CompletionReport, SnapshotImage};

/// Why a session reached `Failed`. Distinct reasons so the caller can
/// message the user differently ("looked too static" vs "took too long").
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    #[error("calibration did not complete in time")]
    CalibrationIncomplete,
    #[error("challenge not completed in time")]
    ChallengeTimeout,
    #[error("anti-spoof score below acceptance threshold")]
    ScoreBelowThreshold,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Camera/model not yet delivering a usable face.
    Loading,
    /// Face present and validated; waiting for the caller to start.
    Ready,
    /// Accumulating the baseline over K validated frames.
    Calibrating,
    /// Walking the challenge plan.
    Challenging,
    Completed,
    Failed(FailureReason),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed(_))
    }
}

/// One frame's worth of input: the landmark result plus an optional encoded
/// still image the engine may keep as the audit snapshot.
#[derive(Debug, Clone)]
pub struct FramePacket {
    pub input: FrameInput,
    pub snapshot: Option<SnapshotImage>,
}

impl FramePacket {
    pub fn face(landmarks: LandmarkFrame) -> Self {
        Self {
            input: FrameInput::face(landmarks),
            snapshot: None,
        }
    }

    pub fn no_face() -> Self {
        Self {
            input: FrameInput::NoFace,
            snapshot: None,
        }
    }
}

/// Read-only view of session state for the interface layer. The interface
/// subscribes to these; it never writes into engine state.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state: SessionState,
    /// Prompt for the current challenge, when one is active.
    pub prompt: Option<&'static str>,
    /// `(held, required)` frames for the current challenge.
    pub hold_progress: Option<(u32, u32)>,
    /// `(collected, required)` calibration samples.
    pub calibration_progress: Option<(usize, usize)>,
    pub completed: Vec<ChallengeKind>,
    /// Malformed-landmark frames absorbed so far (diagnostics).
    pub extractor_faults: u64,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("session thread exited")]
    ChannelClosed,
    #[error("session has not reached a terminal state")]
    NotFinished,
}

/// The aggregate root. Owned by exactly one processor at a time; all other
/// components are pure functions it calls per frame.
pub struct Session {
    config: EngineConfig,
    verification_id: Uuid,
    state: SessionState,
    challenges: Vec<Challenge>,
    current: usize,
    hold_counter: u32,
    calibrator: BaselineCalibrator,
    baseline: Option<Baseline>,
    history: MetricsHistory,
    completed: Vec<ChallengeKind>,
    prev_frame: Option<LandmarkFrame>,
    last_image: Option<SnapshotImage>,
    selfie: Option<SnapshotImage>,
    final_score: Option<SpoofScore>,
    extractor_faults: u64,
    phase_started: Option<Instant>,
}

impl Session {
    /// Create a session with a challenge plan drawn from the thread RNG.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let mut rng = rand::thread_rng();
        Self::with_rng(config, &mut rng)
    }

    /// Create a session with a caller-supplied RNG. Tests pass a seeded
    /// `StdRng` to script the challenge order.
    pub fn with_rng<R: rand::Rng>(config: EngineConfig, rng: &mut R) -> Result<Self, ConfigError> {
        config.validate()?;
        let challenges = challenge_plan(&config, rng);
        let verification_id = Uuid::new_v4();
        tracing::info!(
            id = %verification_id,
            plan = ?challenges.iter().map(|c| c.kind()).collect::<Vec<_>>(),
            "session created"
        );
        Ok(Self {
            calibrator: BaselineCalibrator::new(config.calibration_sample_count),
            history: MetricsHistory::new(config.history_window_size),
            config,
            verification_id,
            state: SessionState::Loading,
            challenges,
            current: 0,
            hold_counter: 0,
            baseline: None,
            completed: Vec::new(),
            prev_frame: None,
            last_image: None,
            selfie: None,
            final_score: None,
            extractor_faults: 0,
            phase_started: None,
        })
    }

    pub fn verification_id(&self) -> Uuid {
        self.verification_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Caller-triggered transition from `Ready` to `Calibrating` (typically
    /// on explicit user action). Returns whether the transition happened.
    pub fn begin_calibration(&mut self) -> bool {
        self.begin_calibration_at(Instant::now())
    }

    fn begin_calibration_at(&mut self, now: Instant) -> bool {
        if self.state != SessionState::Ready {
            tracing::debug!(state = ?self.state, "begin_calibration ignored");
            return false;
        }
        self.state = SessionState::Calibrating;
        self.phase_started = Some(now);
        tracing::info!(id = %self.verification_id, "calibration started");
        true
    }

    /// Process one frame fully before the next is accepted. Never fails:
    /// per-frame faults become state, not errors.
    pub fn process_frame(&mut self, packet: FramePacket) -> StateSnapshot {
        self.process_frame_at(packet, Instant::now())
    }

    fn process_frame_at(&mut self, packet: FramePacket, now: Instant) -> StateSnapshot {
        if self.state.is_terminal() {
            return self.snapshot();
        }

        if let Some(image) = packet.snapshot {
            self.last_image = Some(image);
        }

        // Extract and validate. A malformed frame is absorbed as no-face
        // and counted; movement is relative to the previous frame that
        // produced metrics, valid geometry or not.
        let valid_metrics = match packet.input {
            FrameInput::NoFace => None,
            FrameInput::Face {
                landmarks,
                blendshapes,
            } => match metrics::extract(&landmarks, self.prev_frame.as_ref(), blendshapes.as_ref())
            {
                Ok(m) => {
                    let geometry_ok = match geometry::validate(&landmarks) {
                        Ok(()) => true,
                        Err(reason) => {
                            tracing::debug!(%reason, "frame geometry rejected");
                            false
                        }
                    };
                    self.prev_frame = Some(landmarks);
                    geometry_ok.then_some(m)
                }
                Err(fault) => {
                    self.extractor_faults += 1;
                    tracing::warn!(%fault, faults = self.extractor_faults, "malformed landmark frame");
                    None
                }
            },
        };

        if let Some(m) = &valid_metrics {
            self.history.push(*m);
        }

        match self.state {
            SessionState::Loading => {
                if valid_metrics.is_some() {
                    self.state = SessionState::Ready;
                    tracing::info!(id = %self.verification_id, "face acquired, session ready");
                }
            }
            SessionState::Ready => {}
            SessionState::Calibrating => self.step_calibration(valid_metrics, now),
            SessionState::Challenging => self.step_challenge(valid_metrics, now),
            SessionState::Completed | SessionState::Failed(_) => {}
        }

        self.snapshot()
    }

    fn step_calibration(&mut self, valid_metrics: Option<liveness_core::Metrics>, now: Instant) {
        if self.phase_expired(now) {
            self.fail(FailureReason::CalibrationIncomplete);
            return;
        }
        match valid_metrics {
            Some(m) => {
                if let Some(baseline) = self.calibrator.push(&m) {
                    tracing::info!(
                        id = %self.verification_id,
                        eye = baseline.resting_eye_openness,
                        mouth = baseline.resting_mouth_ratio,
                        yaw = baseline.resting_yaw_deg,
                        "baseline established"
                    );
                    self.baseline = Some(baseline);
                    self.state = SessionState::Challenging;
                    self.phase_started = Some(now);
                }
            }
            None => {
                // No partial baseline is ever used
                if self.calibrator.collected() > 0 {
                    tracing::debug!("face lost during calibration, restarting");
                }
                self.calibrator.reset();
            }
        }
    }

    fn step_challenge(&mut self, valid_metrics: Option<liveness_core::Metrics>, now: Instant) {
        if self.phase_expired(now) {
            self.fail(FailureReason::ChallengeTimeout);
            return;
        }
        // Baseline is always set on entry to Challenging
        let Some(baseline) = self.baseline else {
            return;
        };

        let Some(m) = valid_metrics else {
            // Face validity lost: current challenge restarts, baseline kept
            self.hold_counter = 0;
            self.challenges[self.current].reset_progress();
            return;
        };

        let challenge = &mut self.challenges[self.current];
        if challenge.evaluate(&m, &baseline) {
            self.hold_counter += 1;
            if self.hold_counter >= challenge.required_hold_frames() {
                let kind = challenge.kind();
                self.completed.push(kind);
                tracing::info!(
                    id = %self.verification_id,
                    challenge = ?kind,
                    remaining = self.challenges.len() - self.current - 1,
                    "challenge completed"
                );
                self.hold_counter = 0;
                self.current += 1;
                self.phase_started = Some(now);
                if self.current == self.challenges.len() {
                    self.finalize();
                }
            }
        } else {
            // Hysteresis: a single noisy frame decays progress instead of
            // discarding it
            self.hold_counter = self.hold_counter.saturating_sub(1);
        }
    }

    /// All challenges complete: run the scorer once and settle the outcome.
    fn finalize(&mut self) {
        let score = score_session(
            self.history.contiguous(),
            self.completed.len(),
            self.challenges.len(),
            &self.config.score,
        );
        self.final_score = Some(score);

        if score.total >= self.config.min_acceptance_score {
            self.selfie = self.last_image.take();
            self.state = SessionState::Completed;
            tracing::info!(
                id = %self.verification_id,
                score = score.total,
                "session completed"
            );
        } else {
            tracing::warn!(
                id = %self.verification_id,
                score = score.total,
                threshold = self.config.min_acceptance_score,
                "score below acceptance threshold"
            );
            self.state = SessionState::Failed(FailureReason::ScoreBelowThreshold);
        }
    }

    /// External timeout from the caller. Safe in any state; a no-op once
    /// terminal.
    pub fn fail_timeout(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        let reason = match self.state {
            SessionState::Challenging => FailureReason::ChallengeTimeout,
            _ => FailureReason::CalibrationIncomplete,
        };
        self.fail(reason);
    }

    fn fail(&mut self, reason: FailureReason) {
        tracing::warn!(id = %self.verification_id, %reason, "session failed");
        self.state = SessionState::Failed(reason);
    }

    fn phase_expired(&self, now: Instant) -> bool {
        let budget = Duration::from_millis(self.config.challenge_timeout_ms);
        self.phase_started
            .is_some_and(|started| now.duration_since(started) > budget)
    }

    /// Read-only state view for the interface layer.
    pub fn snapshot(&self) -> StateSnapshot {
        let active = (self.state == SessionState::Challenging)
            .then(|| &self.challenges[self.current]);
        StateSnapshot {
            state: self.state,
            prompt: active.map(|c| c.prompt()),
            hold_progress: active.map(|c| (self.hold_counter, c.required_hold_frames())),
            calibration_progress: (self.state == SessionState::Calibrating)
                .then(|| (self.calibrator.collected(), self.calibrator.target())),
            completed: self.completed.clone(),
            extractor_faults: self.extractor_faults,
        }
    }

    /// Final payload for the submission collaborator. `None` until the
    /// session reaches a terminal state.
    pub fn report(&mut self) -> Option<CompletionReport> {
        if !self.state.is_terminal() {
            return None;
        }
        let sub_scores = match self.final_score {
            Some(s) => s,
            // Terminal before the scorer ran (timeout): score what we have
            None => {
                let s = score_session(
                    self.history.contiguous(),
                    self.completed.len(),
                    self.challenges.len(),
                    &self.config.score,
                );
                self.final_score = Some(s);
                s
            }
        };
        Some(CompletionReport {
            verification_id: self.verification_id,
            passed: self.state == SessionState::Completed,
            score: sub_scores.total,
            sub_scores,
            completed_challenges: self.completed.clone(),
            failure: match self.state {
                SessionState::Failed(reason) => Some(reason),
                _ => None,
            },
            snapshot: self.selfie.clone(),
            completed_at: Utc::now(),
        })
    }
}
