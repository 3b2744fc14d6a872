//! Judgement window tables derived from the overall-difficulty scalar.

use serde::{Deserialize, Serialize};

use crate::math::difficulty_range;
use crate::state::Verdict;

/// Which rule dialect the window formula follows.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitWindowStyle {
    #[default]
    Stable,
    Lazer,
}

// Published reference points at OD 0 / 5 / 10, in milliseconds.
const GREAT_RANGE: (f64, f64, f64) = (80.0, 50.0, 20.0);
const OK_RANGE: (f64, f64, f64) = (140.0, 100.0, 60.0);
const MEH_RANGE: (f64, f64, f64) = (200.0, 150.0, 100.0);
const MISS_CUTOFF: f64 = 400.0;

// Stable compares against integer milliseconds, which narrows every hit
// window by half a millisecond relative to the lazer real-valued table.
const STABLE_WINDOW_ADJUST: f64 = 0.5;

/// The `[great, ok, meh, miss]` windows in milliseconds. A timing delta
/// qualifies for a verdict when its magnitude is at or below the window.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitWindows {
    pub great: f64,
    pub ok: f64,
    pub meh: f64,
    pub miss: f64,
}

impl HitWindows {
    pub fn from_overall_difficulty(od: f64, style: HitWindowStyle) -> Self {
        let (g, o, m) = (GREAT_RANGE, OK_RANGE, MEH_RANGE);
        let great = difficulty_range(od, g.0, g.1, g.2);
        let ok = difficulty_range(od, o.0, o.1, o.2);
        let meh = difficulty_range(od, m.0, m.1, m.2);
        match style {
            HitWindowStyle::Stable => HitWindows {
                great: great - STABLE_WINDOW_ADJUST,
                ok: ok - STABLE_WINDOW_ADJUST,
                meh: meh - STABLE_WINDOW_ADJUST,
                miss: MISS_CUTOFF - STABLE_WINDOW_ADJUST,
            },
            HitWindowStyle::Lazer => HitWindows {
                great,
                ok,
                meh,
                miss: MISS_CUTOFF,
            },
        }
    }

    pub fn window(&self, verdict: Verdict) -> f64 {
        match verdict {
            Verdict::Great => self.great,
            Verdict::Ok => self.ok,
            Verdict::Meh => self.meh,
            Verdict::Miss => self.miss,
        }
    }

    /// Classify an absolute timing offset into a hit verdict, testing
    /// GREAT, OK, MEH in order. `None` when outside every hit window.
    #[inline(always)]
    pub fn classify(&self, abs_offset: f64) -> Option<Verdict> {
        if abs_offset <= self.great {
            Some(Verdict::Great)
        } else if abs_offset <= self.ok {
            Some(Verdict::Ok)
        } else if abs_offset <= self.meh {
            Some(Verdict::Meh)
        } else {
            None
        }
    }
}
