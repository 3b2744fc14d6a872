//! Deterministic gameplay judgement core for a circle-clicking rhythm
//! game replay viewer.
//!
//! The pipeline: a parsed [`blueprint::Blueprint`] plus a [`mods::Mods`]
//! set becomes an immutable [`beatmap::Beatmap`] through
//! [`builder::build`]; the [`judge::Evaluator`] advances a
//! [`state::GameState`] one replay frame at a time; the
//! [`timeline::Timeline`] snapshots that process so the state at any
//! time can be reconstructed cheaply; [`stats::summarize`] derives
//! combo, verdict counts and accuracy from a state.
//!
//! Two runs over the same beatmap, mods and frames produce bit-identical
//! states: the evaluator performs no I/O, keeps no hidden clocks, and
//! iterates only ordered containers.

pub mod beatmap;
pub mod blueprint;
pub mod builder;
pub mod error;
pub mod hit_windows;
pub mod judge;
pub mod math;
pub mod mods;
pub mod path;
pub mod replay;
pub mod state;
pub mod stats;
pub mod timeline;

pub use beatmap::{Beatmap, HitObject, ObjectId, ObjectRole};
pub use blueprint::Blueprint;
pub use builder::build;
pub use error::{BeatmapError, JudgeError};
pub use hit_windows::{HitWindowStyle, HitWindows};
pub use judge::{Evaluator, NoteLockStyle};
pub use mods::Mods;
pub use replay::{RawFrame, ReplayFrame, decode_frames};
pub use state::{GameState, Verdict};
pub use stats::{ScoreSummary, summarize};
pub use timeline::Timeline;
