//! Landmark frame model and the fixed point-index scheme.
//!
//! The engine never infers face topology. Every semantic measurement is
//! defined against the named index constants in this module, which follow
//! the MediaPipe FaceMesh 468-point convention. Coordinates are normalized
//! to `[0, 1]` by frame width/height; `z` is the detector's relative depth
//! signal for the same point.
//!
//! A frame may be absent (no face in view). Absence is a first-class value
//! ([`FrameInput::NoFace`]), not an error.

use std::collections::HashMap;

use thiserror::Error;

/// Version tag for the point-index scheme. A collaborator producing frames
/// under a different scheme must not feed this engine.
pub const LANDMARK_SCHEME_VERSION: &str = "mediapipe-facemesh-v1";

/// Expected number of points per frame.
pub const LANDMARK_POINT_COUNT: usize = 468;

// ── Index constants (MediaPipe FaceMesh) ─────────────────────────────────────

pub const NOSE_TIP: usize = 1;
pub const FOREHEAD: usize = 10;
pub const CHIN: usize = 152;

/// Subject's right cheek edge (image-left in an unmirrored frame).
pub const CHEEK_RIGHT: usize = 234;
/// Subject's left cheek edge.
pub const CHEEK_LEFT: usize = 454;

/// Subject's right eye in EAR order:
/// `[outer corner, upper lid a, upper lid b, inner corner, lower lid b, lower lid a]`.
pub const RIGHT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
/// Subject's left eye, same ordering.
pub const LEFT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// Inner upper / inner lower lip midpoints.
pub const MOUTH_UPPER: usize = 13;
pub const MOUTH_LOWER: usize = 14;
pub const MOUTH_CORNER_RIGHT: usize = 61;
pub const MOUTH_CORNER_LEFT: usize = 291;

/// Stable anchor set used for the inter-frame movement metric. These points
/// sit on rigid facial structure and move with the head, not with expressions.
pub const MOVEMENT_ANCHORS: [usize; 5] = [NOSE_TIP, CHEEK_RIGHT, CHEEK_LEFT, FOREHEAD, CHIN];

// ── Types ────────────────────────────────────────────────────────────────────

/// A single labeled facial point in normalized frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in the image plane (z ignored).
    pub fn distance_2d(self, other: Point3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("wrong landmark count: {0} (expected {LANDMARK_POINT_COUNT})")]
    WrongPointCount(usize),
    #[error("non-finite coordinate at landmark index {0}")]
    NonFiniteCoordinate(usize),
}

/// An ordered, fixed-size collection of points for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: Vec<Point3>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Point3>) -> Self {
        Self { points }
    }

    /// Reject malformed frames before any metric math runs: wrong point
    /// count or NaN/Inf coordinates. Callers absorb this as a no-face frame
    /// rather than letting it cross the per-frame processing boundary.
    pub fn check(&self) -> Result<(), LandmarkError> {
        if self.points.len() != LANDMARK_POINT_COUNT {
            return Err(LandmarkError::WrongPointCount(self.points.len()));
        }
        for (i, p) in self.points.iter().enumerate() {
            if !p.x.is_finite() || !p.y.is_finite() || !p.z.is_finite() {
                return Err(LandmarkError::NonFiniteCoordinate(i));
            }
        }
        Ok(())
    }

    /// Point at a scheme index. Valid for any index constant in this module
    /// once [`check`](Self::check) has passed.
    pub fn point(&self, index: usize) -> Point3 {
        self.points[index]
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }
}

/// Optional named confidence scores delivered alongside a frame by
/// collaborators that support them (e.g. `eyeBlinkLeft`). Used as a
/// supplement to geometric detection, never a requirement.
#[derive(Debug, Clone, Default)]
pub struct Blendshapes {
    scores: HashMap<String, f32>,
}

impl Blendshapes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, score: f32) {
        self.scores.insert(name.into(), score);
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.scores.get(name).copied()
    }
}

/// Per-frame input from the camera/model collaborator.
#[derive(Debug, Clone)]
pub enum FrameInput {
    /// No face detected this frame.
    NoFace,
    /// One face's landmarks, with optional blendshape scores.
    Face {
        landmarks: LandmarkFrame,
        blendshapes: Option<Blendshapes>,
    },
}

impl FrameInput {
    pub fn face(landmarks: LandmarkFrame) -> Self {
        Self::Face {
            landmarks,
            blendshapes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_frame() -> LandmarkFrame {
        LandmarkFrame::new(vec![Point3::new(0.5, 0.5, 0.0); LANDMARK_POINT_COUNT])
    }

    #[test]
    fn test_check_accepts_full_frame() {
        assert!(flat_frame().check().is_ok());
    }

    #[test]
    fn test_check_rejects_wrong_count() {
        let frame = LandmarkFrame::new(vec![Point3::default(); 5]);
        let err = frame.check().unwrap_err();
        assert!(matches!(err, LandmarkError::WrongPointCount(5)));
    }

    #[test]
    fn test_check_rejects_nan() {
        let mut points = vec![Point3::new(0.5, 0.5, 0.0); LANDMARK_POINT_COUNT];
        points[42].y = f32::NAN;
        let err = LandmarkFrame::new(points).check().unwrap_err();
        assert!(matches!(err, LandmarkError::NonFiniteCoordinate(42)));
    }

    #[test]
    fn test_check_rejects_infinity() {
        let mut points = vec![Point3::new(0.5, 0.5, 0.0); LANDMARK_POINT_COUNT];
        points[0].z = f32::INFINITY;
        let err = LandmarkFrame::new(points).check().unwrap_err();
        assert!(matches!(err, LandmarkError::NonFiniteCoordinate(0)));
    }

    #[test]
    fn test_distance_2d() {
        let a = Point3::new(0.0, 0.0, 0.7);
        let b = Point3::new(0.3, 0.4, -0.7);
        assert!((a.distance_2d(b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_blendshape_lookup() {
        let mut bs = Blendshapes::new();
        bs.insert("eyeBlinkLeft", 0.9);
        assert_eq!(bs.get("eyeBlinkLeft"), Some(0.9));
        assert_eq!(bs.get("eyeBlinkRight"), None);
    }
}
