//! Parsed authored data, as delivered by the out-of-scope file parser.
//!
//! A blueprint is player-independent: positions are raw playfield
//! coordinates, slider paths are flattened polylines, and no mod has
//! been applied yet. The builder turns this plus a mod set into the
//! immutable [`crate::beatmap::Beatmap`].

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub overall_difficulty: f32,
    pub circle_size: f32,
    pub approach_rate: f32,
    /// Authored stacking leniency in [0, 1].
    pub stack_leniency: f32,
    /// Hit objects in authored time order.
    pub objects: Vec<BlueprintObject>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlueprintObject {
    /// Hit time of a circle or slider head, start time of a spinner.
    pub time: f64,
    pub x: f32,
    pub y: f32,
    pub kind: BlueprintKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BlueprintKind {
    Circle,
    Slider {
        /// Flattened path polyline starting at the object position.
        path: Vec<(f32, f32)>,
        /// Traversals of the path (1 = no repeats).
        span_count: u32,
        /// Duration of one traversal, in milliseconds.
        span_duration: f64,
        /// Nominal milliseconds between slider ticks.
        tick_interval: f64,
    },
    Spinner {
        end_time: f64,
    },
}

impl BlueprintObject {
    pub fn circle(time: f64, x: f32, y: f32) -> Self {
        BlueprintObject {
            time,
            x,
            y,
            kind: BlueprintKind::Circle,
        }
    }

    pub fn spinner(time: f64, end_time: f64, x: f32, y: f32) -> Self {
        BlueprintObject {
            time,
            x,
            y,
            kind: BlueprintKind::Spinner { end_time },
        }
    }
}
