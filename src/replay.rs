//! Replay input frames.
//!
//! The wire format delivers delta-encoded frames; the decoder here turns
//! them into absolute-time frames and strips the legacy preamble the
//! recorder writes ahead of real input.

use cgmath::Vector2;
use serde::{Deserialize, Serialize};

pub const BUTTON_LEFT: u8 = 1 << 0;
pub const BUTTON_RIGHT: u8 = 1 << 1;

/// Number of held-button slots tracked per frame.
pub const BUTTON_COUNT: usize = 2;

// The recorder emits three metadata frames (zero, minus-one and a large
// negative delta) before the first real input frame.
const PREAMBLE_FRAMES: usize = 3;

/// A frame as it appears on the wire: a time delta against the previous
/// frame, cursor coordinates, and the held-button mask.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub delta_ms: i32,
    pub x: f32,
    pub y: f32,
    pub buttons: u8,
}

/// A decoded frame with an absolute timestamp.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReplayFrame {
    pub time: f64,
    pub position: Vector2<f32>,
    pub buttons: u8,
}

impl ReplayFrame {
    pub const fn new(time: f64, position: Vector2<f32>, buttons: u8) -> Self {
        ReplayFrame {
            time,
            position,
            buttons,
        }
    }

    #[inline(always)]
    pub const fn held(&self, button: usize) -> bool {
        self.buttons >> button & 1 == 1
    }

    #[inline(always)]
    pub const fn left_held(&self) -> bool {
        self.buttons & BUTTON_LEFT != 0
    }

    #[inline(always)]
    pub const fn right_held(&self) -> bool {
        self.buttons & BUTTON_RIGHT != 0
    }
}

/// Accumulate wire deltas into absolute times and drop the preamble.
/// The first emitted frame establishes the simulation's initial time.
pub fn decode_frames(raw: &[RawFrame]) -> Vec<ReplayFrame> {
    let mut time: i64 = 0;
    let mut out = Vec::with_capacity(raw.len().saturating_sub(PREAMBLE_FRAMES));
    for (i, frame) in raw.iter().enumerate() {
        time += i64::from(frame.delta_ms);
        if i < PREAMBLE_FRAMES {
            continue;
        }
        out.push(ReplayFrame {
            time: time as f64,
            position: Vector2::new(frame.x, frame.y),
            buttons: frame.buttons,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_preamble_is_discarded() {
        let raw = [
            RawFrame { delta_ms: 0, x: 256.0, y: -500.0, buttons: 0 },
            RawFrame { delta_ms: -1, x: 256.0, y: -500.0, buttons: 0 },
            RawFrame { delta_ms: -1171, x: 257.0417, y: 124.7764, buttons: 1 },
            RawFrame { delta_ms: 13, x: 256.8854, y: 124.8789, buttons: 1 },
        ];
        let frames = decode_frames(&raw);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].time, -1159.0);
        assert_eq!(frames[0].position, Vector2::new(256.8854, 124.8789));
        assert!(frames[0].left_held());
        assert!(!frames[0].right_held());
    }

    #[test]
    fn deltas_accumulate_across_the_tail() {
        let raw = [
            RawFrame { delta_ms: 0, x: 256.0, y: -500.0, buttons: 0 },
            RawFrame { delta_ms: -1, x: 256.0, y: -500.0, buttons: 0 },
            RawFrame { delta_ms: 1, x: 0.0, y: 0.0, buttons: 0 },
            RawFrame { delta_ms: 100, x: 1.0, y: 2.0, buttons: 0 },
            RawFrame { delta_ms: 16, x: 3.0, y: 4.0, buttons: 2 },
        ];
        let frames = decode_frames(&raw);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].time, 100.0);
        assert_eq!(frames[1].time, 116.0);
        assert!(frames[1].right_held());
    }

    #[test]
    fn button_mask_bits() {
        let f = ReplayFrame::new(0.0, Vector2::new(0.0, 0.0), BUTTON_LEFT | BUTTON_RIGHT);
        assert!(f.held(0));
        assert!(f.held(1));
        let f = ReplayFrame::new(0.0, Vector2::new(0.0, 0.0), 0);
        assert!(!f.held(0));
        assert!(!f.held(1));
    }
}
