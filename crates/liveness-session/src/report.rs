//! Completion payload crossing the component boundary.
//!
//! Only derived numbers and a single audit snapshot leave the engine — the
//! raw frame history never does.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use liveness_core::{ChallengeKind, SpoofScore};

use crate::session::FailureReason;

/// One still image captured at or near challenge completion, kept for the
/// audit record. Encoded bytes as delivered by the capture collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Final session outcome, produced once when the session reaches a terminal
/// state and handed to the submission collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    /// Stable identifier for this verification attempt.
    pub verification_id: Uuid,
    pub passed: bool,
    /// Composite anti-spoof score in [0, 1].
    pub score: f32,
    pub sub_scores: SpoofScore,
    /// Challenge ids in completion order.
    pub completed_challenges: Vec<ChallengeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotImage>,
    pub completed_at: DateTime<Utc>,
}
