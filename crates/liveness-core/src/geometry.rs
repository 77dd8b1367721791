//! Per-frame face geometry gate.
//!
//! Rejects frames whose landmark geometry is physically implausible for a
//! live face presented to the camera: objects that are not faces, faces too
//! far away or filling the lens, and flat images (photographs, screen
//! replays). Rejection is transient; the session treats it like a no-face
//! frame.

use thiserror::Error;

use crate::landmarks::{LandmarkFrame, NOSE_TIP, RIGHT_EYE};
use crate::metrics;

// ── Bounds ───────────────────────────────────────────────────────────────────
// Each bound is independently tunable. Values assume frame-normalized
// coordinates.

/// Below this face-to-frame width ratio the face is too far away for stable
/// landmark geometry (eye distances approach sensor noise).
pub const MIN_FACE_WIDTH_RATIO: f32 = 0.15;
/// Above this the face fills the lens; landmark models clip and distort.
pub const MAX_FACE_WIDTH_RATIO: f32 = 0.85;

/// Plausible facial oval: height/width of the landmark bounding box. A
/// sideways photo or a non-face object lands outside this band.
pub const MIN_FACE_ASPECT: f32 = 0.9;
pub const MAX_FACE_ASPECT: f32 = 2.0;

/// Eye-corner span as a fraction of face width. Human anatomy keeps this
/// near 0.2–0.3; far outside it the "face" is not facially proportioned.
pub const MIN_EYE_FACE_RATIO: f32 = 0.12;
pub const MAX_EYE_FACE_RATIO: f32 = 0.45;

/// Maximum nose-tip offset from the bounding-box center, as a fraction of
/// face width. Catches photos of faces held at an angle to the camera.
/// Deliberately looser than the head-turn challenge threshold so turning
/// frames stay valid.
pub const MAX_NOSE_OFFSET_RATIO: f32 = 0.35;

/// Minimum per-frame depth variance. A printed photo or a screen replay is
/// planar, so the detector's z signal collapses to near zero.
pub const MIN_DEPTH_VARIANCE: f32 = 1e-4;

/// Reason a frame's geometry was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GeometryRejection {
    #[error("face too small: width ratio {0:.3}")]
    FaceTooSmall(f32),
    #[error("face too large: width ratio {0:.3}")]
    FaceTooLarge(f32),
    #[error("implausible face aspect: {0:.3}")]
    ImplausibleAspect(f32),
    #[error("implausible eye span: {0:.3} of face width")]
    ImplausibleEyeSpan(f32),
    #[error("nose offset {0:.3} of face width exceeds maximum")]
    NoseOffCenter(f32),
    #[error("flat depth: variance {0:.6}")]
    FlatDepth(f32),
}

/// Validate one frame's geometry. `Ok(())` means the frame may feed
/// calibration and challenge evaluation.
///
/// Assumes the frame already passed [`LandmarkFrame::check`].
pub fn validate(frame: &LandmarkFrame) -> Result<(), GeometryRejection> {
    let width = metrics::face_width(frame);
    if width < MIN_FACE_WIDTH_RATIO {
        return Err(GeometryRejection::FaceTooSmall(width));
    }
    if width > MAX_FACE_WIDTH_RATIO {
        return Err(GeometryRejection::FaceTooLarge(width));
    }

    let height = metrics::face_height(frame);
    let aspect = height / width;
    if !(MIN_FACE_ASPECT..=MAX_FACE_ASPECT).contains(&aspect) {
        return Err(GeometryRejection::ImplausibleAspect(aspect));
    }

    let eye_span = frame
        .point(RIGHT_EYE[0])
        .distance_2d(frame.point(RIGHT_EYE[3]))
        / width;
    if !(MIN_EYE_FACE_RATIO..=MAX_EYE_FACE_RATIO).contains(&eye_span) {
        return Err(GeometryRejection::ImplausibleEyeSpan(eye_span));
    }

    let center_x = bbox_center_x(frame);
    let nose_offset = (frame.point(NOSE_TIP).x - center_x).abs() / width;
    if nose_offset > MAX_NOSE_OFFSET_RATIO {
        return Err(GeometryRejection::NoseOffCenter(nose_offset));
    }

    let depth = metrics::depth_variance(frame);
    if depth < MIN_DEPTH_VARIANCE {
        return Err(GeometryRejection::FlatDepth(depth));
    }

    Ok(())
}

fn bbox_center_x(frame: &LandmarkFrame) -> f32 {
    let mut min_x = f32::MAX;
    let mut max_x = f32::MIN;
    for p in frame.points() {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
    }
    (min_x + max_x) / 2.0
}
