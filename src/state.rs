//! Judgement state: per-object decision records and the central
//! `GameState` the frame evaluator mutates.

use std::collections::{BTreeMap, BTreeSet};

use cgmath::Vector2;

use crate::beatmap::ObjectId;
use crate::replay::BUTTON_COUNT;

/// Sentinel for a button that is not currently held.
pub const NOT_PRESSING: f64 = f64::INFINITY;

/// Judgement outcome, ordered by leniency.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verdict {
    Great,
    Ok,
    Meh,
    Miss,
}

pub const VERDICT_COUNT: usize = 4;

#[inline(always)]
pub const fn verdict_ix(verdict: Verdict) -> usize {
    match verdict {
        Verdict::Great => 0,
        Verdict::Ok => 1,
        Verdict::Meh => 2,
        Verdict::Miss => 3,
    }
}

/// Why a circle was recorded as a miss.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MissReason {
    /// The late window closed without a usable click.
    TimeExpired,
    /// A spatially valid click landed inside the miss window, early side.
    HitTooEarly,
    /// A later circle was clicked past this one under the lazer policy.
    ForceMissNoteLock,
    /// The owning slider ended before the head was ever clicked.
    SliderFinishedFaster,
}

/// Decision for a circle: a hit verdict, or a miss with its reason.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CircleResult {
    Hit(Verdict),
    Miss(MissReason),
}

impl CircleResult {
    #[inline(always)]
    pub const fn verdict(self) -> Verdict {
        match self {
            CircleResult::Hit(v) => v,
            CircleResult::Miss(_) => Verdict::Miss,
        }
    }

    #[inline(always)]
    pub const fn is_miss(self) -> bool {
        matches!(self, CircleResult::Miss(_))
    }
}

/// Finalized circle decision. `judgement_time` is the replay time the
/// decision was recorded at, not the object's authored hit time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HitCircleState {
    pub judgement_time: f64,
    pub result: CircleResult,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SliderBodyState {
    pub is_tracking: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CheckPointState {
    pub hit: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SpinnerState {
    pub whole_spin_count: u32,
}

/// The complete simulation state at one instant.
///
/// All containers are ordered so two identical runs iterate, and hence
/// mutate, identically. Cloning deep-copies every container: a clone
/// and its source never alias.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    pub current_time: f64,
    pub cursor_position: Vector2<f32>,

    pub hit_circle_state: BTreeMap<ObjectId, HitCircleState>,
    pub slider_body_state: BTreeMap<ObjectId, SliderBodyState>,
    pub checkpoint_state: BTreeMap<ObjectId, CheckPointState>,
    pub spinner_state: BTreeMap<ObjectId, SpinnerState>,
    /// Finalized per-slider verdict.
    pub slider_verdict: BTreeMap<ObjectId, Verdict>,

    pub alive_hit_circles: BTreeSet<ObjectId>,
    pub alive_sliders: BTreeSet<ObjectId>,
    pub alive_spinners: BTreeSet<ObjectId>,

    /// For each alive slider, the index of its next unevaluated checkpoint.
    pub next_checkpoint_index: BTreeMap<ObjectId, usize>,

    /// Monotonic cursor into the spawn-ordered object list.
    pub latest_hit_object_index: usize,

    /// Ids in the order decisions were recorded.
    pub judged_objects: Vec<ObjectId>,

    /// Per button: start of the current uninterrupted press, or
    /// [`NOT_PRESSING`].
    pub pressing_since: [f64; BUTTON_COUNT],

    /// Per-frame scratch: whether this frame's fresh click was consumed.
    pub click_was_useful: bool,
}

impl GameState {
    /// State before the first frame. The first `advance` establishes the
    /// initial time.
    pub fn new() -> Self {
        GameState {
            current_time: f64::NEG_INFINITY,
            cursor_position: Vector2::new(0.0, 0.0),
            hit_circle_state: BTreeMap::new(),
            slider_body_state: BTreeMap::new(),
            checkpoint_state: BTreeMap::new(),
            spinner_state: BTreeMap::new(),
            slider_verdict: BTreeMap::new(),
            alive_hit_circles: BTreeSet::new(),
            alive_sliders: BTreeSet::new(),
            alive_spinners: BTreeSet::new(),
            next_checkpoint_index: BTreeMap::new(),
            latest_hit_object_index: 0,
            judged_objects: Vec::new(),
            pressing_since: [NOT_PRESSING; BUTTON_COUNT],
            click_was_useful: false,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new()
    }
}
