//! Core liveness-engine math: landmark metrics, geometry gating, baseline
//! calibration, challenge predicates, and anti-spoof scoring.
//!
//! Everything in this crate is pure and synchronous — no I/O, no async, no
//! hidden state. The stateful session aggregate that drives these pieces
//! per frame lives in the `liveness-session` crate.

pub mod baseline;
pub mod challenge;
pub mod config;
pub mod geometry;
pub mod landmarks;
pub mod metrics;
pub mod score;
pub mod synthetic;

pub use baseline::{Baseline, BaselineCalibrator};
pub use challenge::{challenge_plan, Challenge, ChallengeKind};
pub use config::{ConfigError, EngineConfig, HoldFrames};
pub use geometry::GeometryRejection;
pub use landmarks::{
    Blendshapes, FrameInput, LandmarkError, LandmarkFrame, Point3, LANDMARK_POINT_COUNT,
    LANDMARK_SCHEME_VERSION,
};
pub use metrics::Metrics;
pub use score::{score_session, ScoreConfig, ScoreWeights, SpoofScore};
