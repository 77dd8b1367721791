//! Per-frame semantic measurements derived from raw landmarks.
//!
//! Extraction is a pure function of `(current frame, previous frame)`. No
//! state lives here; the session owns the previous-frame reference and the
//! metric history.

use crate::landmarks::{
    Blendshapes, LandmarkError, LandmarkFrame, CHEEK_LEFT, CHEEK_RIGHT, CHIN, FOREHEAD, LEFT_EYE,
    MOUTH_CORNER_LEFT, MOUTH_CORNER_RIGHT, MOUTH_LOWER, MOUTH_UPPER, MOVEMENT_ANCHORS, NOSE_TIP,
    RIGHT_EYE,
};

/// Fallback eye-openness when the horizontal eye-corner distance is zero
/// (degenerate landmarks). Treated as "open" so a broken frame can never
/// register as a blink.
pub const EAR_DEGENERATE_FALLBACK: f32 = 1.0;

/// Normalized yaw/pitch offsets map onto ±this many degrees at full scale.
const HEAD_ANGLE_FULL_SCALE_DEG: f32 = 90.0;

/// Blendshape names consulted, when present, in place of geometric eye
/// openness. Blendshape and geometric openness live on different numeric
/// scales; that is fine because every challenge threshold is relative to a
/// baseline computed from the same source.
const BLINK_SHAPE_LEFT: &str = "eyeBlinkLeft";
const BLINK_SHAPE_RIGHT: &str = "eyeBlinkRight";

/// Measurements computed from exactly one landmark frame. Immutable once
/// computed; the session only ever appends these to history.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Metrics {
    pub left_eye_openness: f32,
    pub right_eye_openness: f32,
    pub mouth_ratio: f32,
    pub head_yaw_deg: f32,
    pub head_pitch_deg: f32,
    pub face_size_ratio: f32,
    pub frame_movement: f32,
    pub depth_variance: f32,
}

impl Metrics {
    pub fn mean_eye_openness(&self) -> f32 {
        (self.left_eye_openness + self.right_eye_openness) / 2.0
    }
}

/// Extract all metrics for one frame.
///
/// `previous` feeds the inter-frame movement metric; `None` (first frame of
/// a session) yields movement 0.0. `blendshapes`, when they carry blink
/// scores, substitute for the geometric eye-openness ratios.
///
/// Fails only on malformed input (wrong point count, non-finite
/// coordinates); callers treat that as a no-face frame.
pub fn extract(
    current: &LandmarkFrame,
    previous: Option<&LandmarkFrame>,
    blendshapes: Option<&Blendshapes>,
) -> Result<Metrics, LandmarkError> {
    current.check()?;

    let (left_eye_openness, right_eye_openness) = match blendshapes.and_then(blink_shapes) {
        Some((left_blink, right_blink)) => (
            (1.0 - left_blink).clamp(0.0, 1.0),
            (1.0 - right_blink).clamp(0.0, 1.0),
        ),
        None => (
            eye_openness(current, &LEFT_EYE),
            eye_openness(current, &RIGHT_EYE),
        ),
    };

    Ok(Metrics {
        left_eye_openness,
        right_eye_openness,
        mouth_ratio: mouth_ratio(current),
        head_yaw_deg: head_yaw_deg(current),
        head_pitch_deg: head_pitch_deg(current),
        face_size_ratio: face_width(current),
        frame_movement: previous.map_or(0.0, |prev| frame_movement(current, prev)),
        depth_variance: depth_variance(current),
    })
}

fn blink_shapes(bs: &Blendshapes) -> Option<(f32, f32)> {
    Some((bs.get(BLINK_SHAPE_LEFT)?, bs.get(BLINK_SHAPE_RIGHT)?))
}

/// Eye aspect ratio: (sum of the two vertical lid distances) divided by
/// (2 × the horizontal corner distance). Roughly 0.25–0.35 for an open eye,
/// near zero when closed.
pub fn eye_openness(frame: &LandmarkFrame, eye: &[usize; 6]) -> f32 {
    let horizontal = frame.point(eye[0]).distance_2d(frame.point(eye[3]));
    if horizontal <= f32::EPSILON {
        return EAR_DEGENERATE_FALLBACK;
    }
    let vertical_a = frame.point(eye[1]).distance_2d(frame.point(eye[5]));
    let vertical_b = frame.point(eye[2]).distance_2d(frame.point(eye[4]));
    (vertical_a + vertical_b) / (2.0 * horizontal)
}

/// Vertical inner-lip opening over mouth-corner width. Near zero with the
/// mouth closed, rising with both smiles and open-mouth expressions.
pub fn mouth_ratio(frame: &LandmarkFrame) -> f32 {
    let width = frame
        .point(MOUTH_CORNER_RIGHT)
        .distance_2d(frame.point(MOUTH_CORNER_LEFT));
    if width <= f32::EPSILON {
        return 0.0;
    }
    let opening = frame.point(MOUTH_UPPER).distance_2d(frame.point(MOUTH_LOWER));
    opening / width
}

/// Signed head yaw in degrees.
///
/// Sign convention: positive yaw means the nose tip is displaced toward the
/// subject's LEFT cheek landmark, i.e. the subject is turning toward their
/// own left. Because the sign is defined against labeled landmarks rather
/// than image sides, mirroring the frame does not flip it as long as the
/// landmark model keeps its labeling.
pub fn head_yaw_deg(frame: &LandmarkFrame) -> f32 {
    let right = frame.point(CHEEK_RIGHT);
    let left = frame.point(CHEEK_LEFT);
    let width = (left.x - right.x).abs();
    if width <= f32::EPSILON {
        return 0.0;
    }
    let mid_x = (left.x + right.x) / 2.0;
    let offset = (frame.point(NOSE_TIP).x - mid_x) / width;
    // left.x > right.x in an unmirrored frame, so a positive offset points
    // at the subject's left cheek
    let toward_left = offset * (left.x - right.x).signum();
    (toward_left.clamp(-1.0, 1.0)) * HEAD_ANGLE_FULL_SCALE_DEG
}

/// Signed head pitch in degrees; positive = nose below the forehead/chin
/// midpoint (head pitched down).
pub fn head_pitch_deg(frame: &LandmarkFrame) -> f32 {
    let forehead = frame.point(FOREHEAD);
    let chin = frame.point(CHIN);
    let height = (chin.y - forehead.y).abs();
    if height <= f32::EPSILON {
        return 0.0;
    }
    let mid_y = (forehead.y + chin.y) / 2.0;
    let offset = (frame.point(NOSE_TIP).y - mid_y) / height;
    (offset.clamp(-1.0, 1.0)) * HEAD_ANGLE_FULL_SCALE_DEG
}

/// Landmark bounding-box width. Coordinates are already frame-normalized,
/// so this is directly the face-to-frame width ratio.
pub fn face_width(frame: &LandmarkFrame) -> f32 {
    let mut min_x = f32::MAX;
    let mut max_x = f32::MIN;
    for p in frame.points() {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
    }
    (max_x - min_x).max(0.0)
}

/// Landmark bounding-box height.
pub fn face_height(frame: &LandmarkFrame) -> f32 {
    let mut min_y = f32::MAX;
    let mut max_y = f32::MIN;
    for p in frame.points() {
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    (max_y - min_y).max(0.0)
}

/// Mean 2-D displacement of the stable anchor points versus the previous
/// frame. A static photo produces near-zero values (sensor noise only).
pub fn frame_movement(current: &LandmarkFrame, previous: &LandmarkFrame) -> f32 {
    let total: f32 = MOVEMENT_ANCHORS
        .iter()
        .map(|&i| current.point(i).distance_2d(previous.point(i)))
        .sum();
    total / MOVEMENT_ANCHORS.len() as f32
}

/// Population variance of the z coordinate across all points. A flat image
/// (photo, screen replay) yields a near-zero value.
pub fn depth_variance(frame: &LandmarkFrame) -> f32 {
    let n = frame.points().len() as f32;
    if n == 0.0 {
        return 0.0;
    }
    let mean = frame.points().iter().map(|p| p.z).sum::<f32>() / n;
    frame
        .points()
        .iter()
        .map(|p| {
            let d = p.z - mean;
            d * d
        })
        .sum::<f32>()
        / n
}
