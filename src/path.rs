//! Flattened slider paths with arc-length parameterized sampling.

use cgmath::{InnerSpace, Vector2};

use crate::error::BeatmapError;

/// A slider path as a polyline in playfield coordinates, with cumulative
/// arc lengths so progress maps to a position in O(log n).
#[derive(Clone, Debug, PartialEq)]
pub struct SliderPath {
    points: Vec<Vector2<f32>>,
    cumulative: Vec<f64>,
    length: f64,
}

impl SliderPath {
    /// Build a path from at least two points with positive total length.
    pub fn new(points: Vec<Vector2<f32>>, slider_time: f64) -> Result<Self, BeatmapError> {
        if points.len() < 2 {
            return Err(BeatmapError::UnsampleablePath {
                time: slider_time,
                reason: "fewer than two path points",
            });
        }
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(BeatmapError::UnsampleablePath {
                time: slider_time,
                reason: "non-finite path point",
            });
        }

        let mut cumulative = Vec::with_capacity(points.len());
        cumulative.push(0.0);
        let mut length = 0.0_f64;
        for pair in points.windows(2) {
            length += f64::from((pair[1] - pair[0]).magnitude());
            cumulative.push(length);
        }

        if length <= 0.0 {
            return Err(BeatmapError::UnsampleablePath {
                time: slider_time,
                reason: "zero-length path",
            });
        }

        Ok(SliderPath {
            points,
            cumulative,
            length,
        })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn start(&self) -> Vector2<f32> {
        self.points[0]
    }

    pub fn end(&self) -> Vector2<f32> {
        self.points[self.points.len() - 1]
    }

    /// Position at `progress` in [0, 1] along the path, by arc length.
    /// Out-of-range inputs clamp to the endpoints.
    pub fn position_at(&self, progress: f64) -> Vector2<f32> {
        let target = (progress.clamp(0.0, 1.0)) * self.length;
        // First segment whose far end reaches the target distance.
        let seg = self
            .cumulative
            .partition_point(|&d| d < target)
            .clamp(1, self.points.len() - 1);
        let seg_start = self.cumulative[seg - 1];
        let seg_len = self.cumulative[seg] - seg_start;
        if seg_len <= 0.0 {
            return self.points[seg];
        }
        let t = ((target - seg_start) / seg_len) as f32;
        let a = self.points[seg - 1];
        let b = self.points[seg];
        a + (b - a) * t
    }

    /// Apply an offset to every point, preserving arc lengths.
    pub fn translate(&mut self, offset: Vector2<f32>) {
        for p in &mut self.points {
            *p += offset;
        }
    }

    /// Mirror every point vertically across the given axis.
    pub fn flip_y(&mut self, axis: f32) {
        for p in &mut self.points {
            p.y = axis - p.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> SliderPath {
        SliderPath::new(
            vec![Vector2::new(100.0, 100.0), Vector2::new(300.0, 100.0)],
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn straight_line_samples_proportionally() {
        let p = line();
        assert_eq!(p.length(), 200.0);
        assert_eq!(p.position_at(0.0), Vector2::new(100.0, 100.0));
        assert_eq!(p.position_at(0.5), Vector2::new(200.0, 100.0));
        assert_eq!(p.position_at(1.0), Vector2::new(300.0, 100.0));
    }

    #[test]
    fn progress_clamps_outside_unit_range() {
        let p = line();
        assert_eq!(p.position_at(-0.5), Vector2::new(100.0, 100.0));
        assert_eq!(p.position_at(1.5), Vector2::new(300.0, 100.0));
    }

    #[test]
    fn bent_path_respects_arc_length() {
        let p = SliderPath::new(
            vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(100.0, 0.0),
                Vector2::new(100.0, 100.0),
            ],
            0.0,
        )
        .unwrap();
        assert_eq!(p.length(), 200.0);
        // Three quarters of the way lands halfway up the second leg.
        assert_eq!(p.position_at(0.75), Vector2::new(100.0, 50.0));
    }

    #[test]
    fn degenerate_paths_are_rejected() {
        let err = SliderPath::new(vec![Vector2::new(0.0, 0.0)], 123.0).unwrap_err();
        assert!(matches!(err, BeatmapError::UnsampleablePath { time, .. } if time == 123.0));

        let err = SliderPath::new(
            vec![Vector2::new(5.0, 5.0), Vector2::new(5.0, 5.0)],
            9.0,
        )
        .unwrap_err();
        assert!(matches!(err, BeatmapError::UnsampleablePath { .. }));
    }
}
