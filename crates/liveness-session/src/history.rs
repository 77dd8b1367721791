//! Bounded metric history.
//!
//! The only resource in the engine with a bounded-size invariant: once the
//! window is full, the oldest entry is evicted. The scorer reads it as a
//! contiguous slice; nothing ever mutates an entry in place.

use std::collections::VecDeque;

use liveness_core::Metrics;

#[derive(Debug)]
pub struct MetricsHistory {
    buf: VecDeque<Metrics>,
    capacity: usize,
}

impl MetricsHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one metrics value, evicting the oldest entry when full.
    pub fn push(&mut self, m: Metrics) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(m);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The window as one slice, oldest first.
    pub fn contiguous(&mut self) -> &[Metrics] {
        self.buf.make_contiguous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(movement: f32) -> Metrics {
        Metrics {
            left_eye_openness: 0.3,
            right_eye_openness: 0.3,
            mouth_ratio: 0.05,
            head_yaw_deg: 0.0,
            head_pitch_deg: 0.0,
            face_size_ratio: 0.4,
            frame_movement: movement,
            depth_variance: 0.001,
        }
    }

    #[test]
    fn test_bounded_eviction_oldest_first() {
        let mut h = MetricsHistory::new(3);
        for i in 0..5 {
            h.push(metrics(i as f32));
        }
        assert_eq!(h.len(), 3);
        let window: Vec<f32> = h.contiguous().iter().map(|m| m.frame_movement).collect();
        assert_eq!(window, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_under_capacity_keeps_everything() {
        let mut h = MetricsHistory::new(10);
        h.push(metrics(1.0));
        h.push(metrics(2.0));
        assert_eq!(h.len(), 2);
        assert_eq!(h.contiguous()[0].frame_movement, 1.0);
    }
}
