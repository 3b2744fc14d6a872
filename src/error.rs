use thiserror::Error;

use crate::beatmap::ObjectId;

/// A beatmap that cannot be built. Surfaced during construction; the
/// simulation refuses to start on any of these.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum BeatmapError {
    #[error("hit object {index} starts at {time} ms, before its predecessor at {previous} ms")]
    NonMonotonicTimes {
        index: usize,
        time: f64,
        previous: f64,
    },

    #[error("slider at {time} ms has an unsampleable path: {reason}")]
    UnsampleablePath { time: f64, reason: &'static str },

    #[error("slider at {time} ms spans a non-positive or non-finite duration")]
    BadSliderSpan { time: f64 },

    #[error("slider at {time} ms has a non-positive tick interval")]
    BadTickInterval { time: f64 },

    #[error("checkpoint at {checkpoint_time} ms lies outside the span of the slider at {time} ms")]
    CheckpointOutsideSpan { time: f64, checkpoint_time: f64 },
}

/// A failure inside the frame evaluator. None of these are recoverable
/// within the core; the caller discards the session or reports.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum JudgeError {
    /// The caller handed a frame older than the state it is advancing.
    /// The state is left untouched.
    #[error("frame at {frame_time} ms precedes the current state time {current_time} ms")]
    FrameOutOfOrder { frame_time: f64, current_time: f64 },

    /// An id lookup failed: the state and the beatmap have desynchronized.
    #[error("hit object id {0} is unknown to this beatmap")]
    UnknownHitObjectId(ObjectId),

    /// A structural invariant broke mid-simulation.
    #[error("internal invariant violated for object {id}: {detail}")]
    InternalInvariantViolated { id: ObjectId, detail: &'static str },
}
