//! Synthetic landmark frames for tests and offline threshold tuning.
//!
//! Generates full 468-point frames with controllable eye openness, mouth
//! opening, and nose offset so the engine can be driven without a camera or
//! a landmark model. The geometry mimics a centered frontal face occupying
//! roughly 40% of the frame width.

use crate::landmarks::{
    LandmarkFrame, Point3, CHEEK_LEFT, CHEEK_RIGHT, CHIN, FOREHEAD, LANDMARK_POINT_COUNT, LEFT_EYE,
    MOUTH_CORNER_LEFT, MOUTH_CORNER_RIGHT, MOUTH_LOWER, MOUTH_UPPER, NOSE_TIP, RIGHT_EYE,
};

/// Build a synthetic frontal face.
///
/// * `ear` — target eye aspect ratio for both eyes (0.30 ≈ open, 0.10 ≈ closed).
/// * `mouth` — mouth opening as a fraction of mouth width.
/// * `nose_offset` — nose-tip x offset in face-widths; positive turns the
///   head toward the subject's left (positive yaw).
pub fn synthetic_face(ear: f32, mouth: f32, nose_offset: f32) -> LandmarkFrame {
    let mut points = vec![Point3::new(0.5, 0.5, 0.0); LANDMARK_POINT_COUNT];

    // Small deterministic depth spread so the frame is not "flat"
    for (i, p) in points.iter_mut().enumerate() {
        p.z = if i % 2 == 0 { 0.03 } else { -0.03 };
    }

    // Face extent: width 0.4 (0.3..0.7), height 0.52 (0.24..0.76)
    points[CHEEK_RIGHT] = Point3::new(0.3, 0.5, 0.03);
    points[CHEEK_LEFT] = Point3::new(0.7, 0.5, 0.03);
    points[FOREHEAD] = Point3::new(0.5, 0.24, -0.03);
    points[CHIN] = Point3::new(0.5, 0.76, -0.03);
    points[NOSE_TIP] = Point3::new(0.5 + nose_offset * 0.4, 0.52, 0.08);

    // Eyes: corner distance 0.09, lids spread to produce the target EAR
    let lid = ear * 0.09;
    for (eye, cx) in [(&RIGHT_EYE, 0.39f32), (&LEFT_EYE, 0.61f32)] {
        points[eye[0]] = Point3::new(cx - 0.045, 0.40, 0.0);
        points[eye[3]] = Point3::new(cx + 0.045, 0.40, 0.0);
        points[eye[1]] = Point3::new(cx - 0.02, 0.40 - lid / 2.0, 0.0);
        points[eye[5]] = Point3::new(cx - 0.02, 0.40 + lid / 2.0, 0.0);
        points[eye[2]] = Point3::new(cx + 0.02, 0.40 - lid / 2.0, 0.0);
        points[eye[4]] = Point3::new(cx + 0.02, 0.40 + lid / 2.0, 0.0);
    }

    // Mouth: corner distance 0.16
    points[MOUTH_CORNER_RIGHT] = Point3::new(0.42, 0.65, 0.0);
    points[MOUTH_CORNER_LEFT] = Point3::new(0.58, 0.65, 0.0);
    points[MOUTH_UPPER] = Point3::new(0.5, 0.65 - mouth * 0.16 / 2.0, 0.0);
    points[MOUTH_LOWER] = Point3::new(0.5, 0.65 + mouth * 0.16 / 2.0, 0.0);

    LandmarkFrame::new(points)
}

/// Translate every point by `(dx, dy)`. Useful for scripting inter-frame
/// movement without changing any facial proportions.
pub fn shifted(frame: &LandmarkFrame, dx: f32, dy: f32) -> LandmarkFrame {
    let points = frame
        .points()
        .iter()
        .map(|p| Point3::new(p.x + dx, p.y + dy, p.z))
        .collect();
    LandmarkFrame::new(points)
}

/// Rescale the depth spread so the frame's z-variance becomes `target`.
/// A near-zero target simulates a flat photo presented to the camera.
pub fn with_depth_variance(frame: &LandmarkFrame, target: f32) -> LandmarkFrame {
    let current = crate::metrics::depth_variance(frame);
    let scale = if current > 0.0 {
        (target / current).sqrt()
    } else {
        0.0
    };
    let points = frame
        .points()
        .iter()
        .map(|p| Point3::new(p.x, p.y, p.z * scale))
        .collect();
    LandmarkFrame::new(points)
}
