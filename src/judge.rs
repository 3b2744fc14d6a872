//! The frame evaluator: advances a [`GameState`] through replay frames.
//!
//! Each `advance` call runs a fixed sequence of phases: bind frame,
//! button timing, spawning, supposed-click times, circle resolution,
//! slider finalization, checkpoint evaluation, body tracking, spinners.
//! The phase order is observable through `judged_objects`.

use std::sync::Arc;

use cgmath::{InnerSpace, Vector2};
use log::{debug, trace};

use crate::beatmap::{Beatmap, HitObject, ObjectId, Slider};
use crate::error::JudgeError;
use crate::hit_windows::{HitWindowStyle, HitWindows};
use crate::replay::{BUTTON_COUNT, ReplayFrame};
use crate::state::{
    CheckPointState, CircleResult, GameState, HitCircleState, MissReason, NOT_PRESSING,
    SliderBodyState, SpinnerState, Verdict,
};

/// Policy preventing out-of-order clicks from judging a later circle
/// while an earlier one is still pending.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum NoteLockStyle {
    None,
    #[default]
    Stable,
    Lazer,
}

// Follow circle radius as a multiple of the object radius: generous while
// already tracking, tight to enter.
const FOLLOW_SCALE_TRACKING: f32 = 2.4;
const FOLLOW_SCALE_ENTER: f32 = 1.0;

// A circle stays clickable until this long past its MEH window.
const TIMEOUT_MARGIN: f64 = 1.0;

// Subtracted before rounding a checkpoint time up to a whole millisecond,
// so a checkpoint authored on an integer boundary checks at that boundary.
const CHECKPOINT_EPSILON: f64 = 1e-10;

/// The frame evaluator. Holds the immutable beatmap and the rule
/// configuration; all mutation happens on the caller's [`GameState`].
#[derive(Clone, Debug)]
pub struct Evaluator {
    beatmap: Arc<Beatmap>,
    windows: HitWindows,
    note_lock: NoteLockStyle,
}

impl Evaluator {
    pub fn new(beatmap: Arc<Beatmap>, windows: HitWindows, note_lock: NoteLockStyle) -> Self {
        Evaluator {
            beatmap,
            windows,
            note_lock,
        }
    }

    /// Derive the hit windows from the beatmap's overall difficulty.
    pub fn with_style(
        beatmap: Arc<Beatmap>,
        window_style: HitWindowStyle,
        note_lock: NoteLockStyle,
    ) -> Self {
        let windows =
            HitWindows::from_overall_difficulty(f64::from(beatmap.overall_difficulty), window_style);
        Evaluator::new(beatmap, windows, note_lock)
    }

    pub fn beatmap(&self) -> &Arc<Beatmap> {
        &self.beatmap
    }

    pub fn windows(&self) -> HitWindows {
        self.windows
    }

    /// State before any frame has been applied.
    pub fn initial_state(&self) -> GameState {
        GameState::new()
    }

    /// Apply the next replay frame. Frames must arrive in non-decreasing
    /// time order; an out-of-order frame is rejected with the state left
    /// untouched.
    pub fn advance(&self, state: &mut GameState, frame: &ReplayFrame) -> Result<(), JudgeError> {
        if frame.time < state.current_time {
            return Err(JudgeError::FrameOutOfOrder {
                frame_time: frame.time,
                current_time: state.current_time,
            });
        }

        // Phase 1: bind the frame.
        let previous_position = state.cursor_position;
        let previous_time = state.current_time;
        let old_pressing_since = state.pressing_since;
        state.current_time = frame.time;
        state.cursor_position = frame.position;
        state.click_was_useful = false;

        // Phase 2: button timings. A press keeps its original start time
        // for as long as it is uninterrupted.
        for button in 0..BUTTON_COUNT {
            state.pressing_since[button] = if frame.held(button) {
                state.pressing_since[button].min(frame.time)
            } else {
                NOT_PRESSING
            };
        }

        // Phase 3: spawn everything due.
        self.spawn_objects(state);

        // Phases 4-5: resolve clickable circles.
        self.resolve_hit_circles(state)?;

        // Phase 6: finalize sliders whose span has ended.
        self.finalize_expired_sliders(state, previous_time, previous_position, &old_pressing_since)?;

        // Phase 7: evaluate checkpoints crossed since the previous frame.
        self.evaluate_crossed_checkpoints(
            state,
            previous_time,
            previous_position,
            &old_pressing_since,
        )?;

        // Phase 8: recompute body tracking from the current frame.
        self.update_slider_tracking(state)?;

        // Phase 9: retire finished spinners.
        self.advance_spinners(state);

        Ok(())
    }

    fn spawn_objects(&self, state: &mut GameState) {
        let objects = self.beatmap.objects();
        while state.latest_hit_object_index < objects.len() {
            let object = &objects[state.latest_hit_object_index];
            if object.spawn_time() > state.current_time {
                break;
            }
            match object {
                HitObject::Circle(c) => {
                    state.alive_hit_circles.insert(c.id);
                }
                HitObject::Slider(s) => {
                    state.alive_sliders.insert(s.id);
                    state.alive_hit_circles.insert(s.head.id);
                    state
                        .slider_body_state
                        .insert(s.id, SliderBodyState::default());
                    if !s.checkpoints.is_empty() {
                        state.next_checkpoint_index.insert(s.id, 0);
                    }
                }
                HitObject::Spinner(s) => {
                    state.alive_spinners.insert(s.id);
                    state.spinner_state.insert(s.id, SpinnerState::default());
                }
            }
            state.latest_hit_object_index += 1;
        }
    }

    /// Phases 4 and 5: supposed-click times, then per-circle resolution
    /// in ascending hit-time order.
    fn resolve_hit_circles(&self, state: &mut GameState) -> Result<(), JudgeError> {
        // Phase 4: supposed-click times over the alive set, fixed for the
        // rest of the frame.
        let mut t_supposed: Option<f64> = None;
        let mut t_next_supposed: Option<f64> = None;
        let mut order: Vec<(f64, ObjectId)> = Vec::with_capacity(state.alive_hit_circles.len());
        for &id in &state.alive_hit_circles {
            let hit_time = self.beatmap.circle(id)?.hit_time;
            t_supposed = Some(t_supposed.map_or(hit_time, |t: f64| t.min(hit_time)));
            if hit_time >= state.current_time {
                t_next_supposed = Some(t_next_supposed.map_or(hit_time, |t: f64| t.min(hit_time)));
            }
            order.push((hit_time, id));
        }
        order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let fresh_click = state.pressing_since.contains(&state.current_time);

        for &(hit_time, id) in &order {
            // A lazer force-miss may have removed this circle already.
            if !state.alive_hit_circles.contains(&id) {
                continue;
            }
            let circle = self.beatmap.circle(id)?;

            // Timeout: the late window closed.
            let deadline = hit_time + self.windows.meh + TIMEOUT_MARGIN;
            if state.current_time >= deadline {
                self.finalize_circle(
                    state,
                    id,
                    deadline,
                    CircleResult::Miss(MissReason::TimeExpired),
                );
                continue;
            }

            if !fresh_click || state.click_was_useful {
                continue;
            }

            // A click outside the circle neither hits nor punishes.
            let distance = (state.cursor_position - circle.position).magnitude();
            if distance > circle.radius {
                continue;
            }

            match self.note_lock {
                NoteLockStyle::None => {}
                NoteLockStyle::Stable => {
                    if t_supposed.is_some_and(|t| t < hit_time) {
                        continue;
                    }
                }
                NoteLockStyle::Lazer => {
                    if t_next_supposed.is_some_and(|t| t < hit_time) {
                        self.force_miss_blockers(state, hit_time);
                    }
                }
            }

            let delta = state.current_time - hit_time;
            if let Some(verdict) = self.windows.classify(delta.abs()) {
                let judgement_time = state.current_time;
                self.finalize_circle(state, id, judgement_time, CircleResult::Hit(verdict));
                state.click_was_useful = true;
                continue;
            }

            // Early side of the miss window punishes; the late side is
            // unreachable here because the timeout arm already fired.
            if delta.abs() <= self.windows.miss && delta < 0.0 {
                let judgement_time = state.current_time;
                self.finalize_circle(
                    state,
                    id,
                    judgement_time,
                    CircleResult::Miss(MissReason::HitTooEarly),
                );
            }
            // Otherwise: spatially valid but temporally useless ("shake",
            // a rendering concern).
        }
        Ok(())
    }

    /// Lazer lock: every alive circle supposed to be clicked between now
    /// and the clicked circle's time is missed on the spot.
    fn force_miss_blockers(&self, state: &mut GameState, clicked_hit_time: f64) {
        let blockers: Vec<ObjectId> = state
            .alive_hit_circles
            .iter()
            .copied()
            .filter(|&id| {
                self.beatmap.circle(id).is_ok_and(|c| {
                    c.hit_time >= state.current_time && c.hit_time < clicked_hit_time
                })
            })
            .collect();
        for id in blockers {
            let judgement_time = state.current_time;
            self.finalize_circle(
                state,
                id,
                judgement_time,
                CircleResult::Miss(MissReason::ForceMissNoteLock),
            );
        }
    }

    fn finalize_circle(
        &self,
        state: &mut GameState,
        id: ObjectId,
        judgement_time: f64,
        result: CircleResult,
    ) {
        debug!(
            "JUDGE CIRCLE: id={}, result={:?}, judged_at={:.3}, t={:.3}",
            id, result, judgement_time, state.current_time
        );
        state.hit_circle_state.insert(
            id,
            HitCircleState {
                judgement_time,
                result,
            },
        );
        state.alive_hit_circles.remove(&id);
        state.judged_objects.push(id);
    }

    /// Phase 6. An expiring slider first consumes its remaining
    /// checkpoints, then force-misses an unclicked head, then records its
    /// verdict, so the verdict never precedes the head or a checkpoint.
    fn finalize_expired_sliders(
        &self,
        state: &mut GameState,
        previous_time: f64,
        previous_position: Vector2<f32>,
        old_pressing_since: &[f64; BUTTON_COUNT],
    ) -> Result<(), JudgeError> {
        let expired: Vec<ObjectId> = state
            .alive_sliders
            .iter()
            .copied()
            .filter(|&id| {
                self.beatmap
                    .slider(id)
                    .is_ok_and(|s| s.end_time <= state.current_time)
            })
            .collect();

        for id in expired {
            let slider = self.beatmap.slider(id)?;

            // All checkpoints lie strictly inside the span, so everything
            // still pending has been crossed by now.
            while let Some(&ix) = state.next_checkpoint_index.get(&id) {
                self.evaluate_checkpoint(
                    state,
                    slider,
                    ix,
                    previous_time,
                    previous_position,
                    old_pressing_since,
                )?;
            }

            let head_id = slider.head.id;
            if !state.hit_circle_state.contains_key(&head_id) {
                self.finalize_circle(
                    state,
                    head_id,
                    slider.end_time,
                    CircleResult::Miss(MissReason::SliderFinishedFaster),
                );
            }
            let head = state
                .hit_circle_state
                .get(&head_id)
                .ok_or(JudgeError::InternalInvariantViolated {
                    id: head_id,
                    detail: "slider head state absent at finalization",
                })?;

            let total = slider.checkpoints.len() + 1;
            let head_hit = usize::from(!head.result.is_miss());
            let checkpoint_hits = slider
                .checkpoints
                .iter()
                .filter(|cp| {
                    state
                        .checkpoint_state
                        .get(&cp.id)
                        .is_some_and(|s| s.hit)
                })
                .count();
            let hits = head_hit + checkpoint_hits;

            let verdict = if hits == total {
                Verdict::Great
            } else if hits == 0 {
                Verdict::Miss
            } else if hits * 2 >= total {
                Verdict::Ok
            } else {
                Verdict::Meh
            };

            debug!(
                "JUDGE SLIDER: id={}, verdict={:?}, hits={}/{}, t={:.3}",
                id, verdict, hits, total, state.current_time
            );
            state.slider_verdict.insert(id, verdict);
            state.judged_objects.push(id);
            state.alive_sliders.remove(&id);
            state.next_checkpoint_index.remove(&id);
            state.slider_body_state.remove(&id);
        }
        Ok(())
    }

    /// Phase 7: repeatedly take the globally earliest crossed checkpoint,
    /// tie-broken by slider id.
    fn evaluate_crossed_checkpoints(
        &self,
        state: &mut GameState,
        previous_time: f64,
        previous_position: Vector2<f32>,
        old_pressing_since: &[f64; BUTTON_COUNT],
    ) -> Result<(), JudgeError> {
        loop {
            let mut best: Option<(f64, ObjectId, usize)> = None;
            for (&slider_id, &ix) in &state.next_checkpoint_index {
                let slider = self.beatmap.slider(slider_id)?;
                let hit_time = slider.checkpoints[ix].hit_time;
                if hit_time >= state.current_time {
                    continue;
                }
                let candidate = (hit_time, slider_id, ix);
                best = match best {
                    Some(current) if (current.0, current.1) <= (hit_time, slider_id) => {
                        Some(current)
                    }
                    _ => Some(candidate),
                };
            }
            let Some((_, slider_id, ix)) = best else {
                break;
            };
            let slider = self.beatmap.slider(slider_id)?;
            self.evaluate_checkpoint(
                state,
                slider,
                ix,
                previous_time,
                previous_position,
                old_pressing_since,
            )?;
        }
        Ok(())
    }

    /// Shared by phases 6 and 7. Uses the pre-frame press state so a
    /// release landing exactly on this frame cannot retroactively
    /// validate an earlier checkpoint.
    fn evaluate_checkpoint(
        &self,
        state: &mut GameState,
        slider: &Slider,
        ix: usize,
        previous_time: f64,
        previous_position: Vector2<f32>,
        old_pressing_since: &[f64; BUTTON_COUNT],
    ) -> Result<(), JudgeError> {
        let checkpoint = slider.checkpoints.get(ix).ok_or({
            JudgeError::InternalInvariantViolated {
                id: slider.id,
                detail: "next checkpoint index out of range",
            }
        })?;

        let time_to_check = (checkpoint.hit_time - CHECKPOINT_EPSILON).ceil();
        let denominator = state.current_time - previous_time;
        let predicted = if denominator > 0.0 && denominator.is_finite() {
            let ratio = ((time_to_check - previous_time) / denominator) as f32;
            previous_position + (state.cursor_position - previous_position) * ratio
        } else {
            state.cursor_position
        };

        let was_tracking = state
            .slider_body_state
            .get(&slider.id)
            .is_some_and(|b| b.is_tracking);
        let head_hit_time = head_hit_time(state, slider);
        let hit = tracking(
            was_tracking,
            slider,
            predicted,
            time_to_check,
            old_pressing_since,
            head_hit_time,
        );

        trace!(
            "JUDGE CHECKPOINT: slider={}, id={}, kind={:?}, hit={}, checked_at={:.3}",
            slider.id, checkpoint.id, checkpoint.kind, hit, time_to_check
        );
        state
            .checkpoint_state
            .insert(checkpoint.id, CheckPointState { hit });
        state.judged_objects.push(checkpoint.id);
        if ix + 1 < slider.checkpoints.len() {
            state.next_checkpoint_index.insert(slider.id, ix + 1);
        } else {
            state.next_checkpoint_index.remove(&slider.id);
        }
        Ok(())
    }

    /// Phase 8: body tracking from the current frame's cursor and press
    /// state, for every slider still alive.
    fn update_slider_tracking(&self, state: &mut GameState) -> Result<(), JudgeError> {
        let alive: Vec<ObjectId> = state.alive_sliders.iter().copied().collect();
        for id in alive {
            let slider = self.beatmap.slider(id)?;
            let was_tracking = state
                .slider_body_state
                .get(&id)
                .is_some_and(|b| b.is_tracking);
            let is_tracking = tracking(
                was_tracking,
                slider,
                state.cursor_position,
                state.current_time,
                &state.pressing_since,
                head_hit_time(state, slider),
            );
            state
                .slider_body_state
                .insert(id, SliderBodyState { is_tracking });
        }
        Ok(())
    }

    /// Phase 9: a spinner past its end leaves the alive set. Spin
    /// counting is not modelled yet; the recorded count stays at zero.
    fn advance_spinners(&self, state: &mut GameState) {
        let finished: Vec<ObjectId> = state
            .alive_spinners
            .iter()
            .copied()
            .filter(|&id| {
                self.beatmap
                    .spinner(id)
                    .is_ok_and(|s| s.end_time < state.current_time)
            })
            .collect();
        for id in finished {
            debug!("JUDGE SPINNER: id={}, t={:.3}", id, state.current_time);
            state.judged_objects.push(id);
            state.alive_spinners.remove(&id);
        }
    }
}

/// The head's judgement time, when the head was judged and not missed.
fn head_hit_time(state: &GameState, slider: &Slider) -> Option<f64> {
    state
        .hit_circle_state
        .get(&slider.head.id)
        .filter(|s| !s.result.is_miss())
        .map(|s| s.judgement_time)
}

/// The tracking predicate: a button held, inside the slider's span,
/// cursor within the follow circle of the ball, and (when the head was
/// hit) a press that started no earlier than the head judgement.
fn tracking(
    was_tracking: bool,
    slider: &Slider,
    cursor: Vector2<f32>,
    t: f64,
    pressing_since: &[f64; BUTTON_COUNT],
    head_hit_time: Option<f64>,
) -> bool {
    if !pressing_since.iter().any(|&p| p != NOT_PRESSING) {
        return false;
    }
    if !(slider.start_time <= t && t < slider.end_time) {
        return false;
    }

    let ball = slider.ball_position_at(slider.completion_at(t));
    let follow_scale = if was_tracking {
        FOLLOW_SCALE_TRACKING
    } else {
        FOLLOW_SCALE_ENTER
    };
    if (ball - cursor).magnitude() > follow_scale * slider.radius {
        return false;
    }

    match head_hit_time {
        Some(head_time) => pressing_since
            .iter()
            .any(|&p| p != NOT_PRESSING && p >= head_time),
        None => true,
    }
}
