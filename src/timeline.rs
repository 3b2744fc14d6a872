//! The time machine: a scrubbable index over a full replay.
//!
//! Game state snapshots are taken at a fixed replay-time cadence while
//! the replay runs forward once. Answering "state at time T" clones the
//! latest snapshot at or before T and replays the few frames in between,
//! so arbitrary scrubbing costs at most one snapshot interval of frames.

use log::info;

use crate::error::JudgeError;
use crate::judge::Evaluator;
use crate::replay::ReplayFrame;
use crate::state::GameState;

/// Replay time between snapshots.
pub const SNAPSHOT_INTERVAL_MS: f64 = 1000.0;

#[derive(Clone, Debug)]
struct Bucket {
    /// Index of the first frame not yet applied to `state`.
    frame_cursor: usize,
    state: GameState,
}

#[derive(Clone, Debug)]
pub struct Timeline {
    evaluator: Evaluator,
    frames: Vec<ReplayFrame>,
    buckets: Vec<Bucket>,
}

impl Timeline {
    /// Run the whole replay once, snapshotting along the way. Frames must
    /// be in non-decreasing time order (the decoder guarantees this).
    pub fn build(evaluator: Evaluator, frames: Vec<ReplayFrame>) -> Result<Self, JudgeError> {
        let mut state = evaluator.initial_state();
        let mut buckets = vec![Bucket {
            frame_cursor: 0,
            state: state.clone(),
        }];
        let mut last_snapshot = f64::NEG_INFINITY;

        for (index, frame) in frames.iter().enumerate() {
            evaluator.advance(&mut state, frame)?;
            if frame.time - last_snapshot >= SNAPSHOT_INTERVAL_MS {
                buckets.push(Bucket {
                    frame_cursor: index + 1,
                    state: state.clone(),
                });
                last_snapshot = frame.time;
            }
        }

        info!(
            "timeline ready: {} frames, {} snapshots",
            frames.len(),
            buckets.len()
        );
        Ok(Timeline {
            evaluator,
            frames,
            buckets,
        })
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn frames(&self) -> &[ReplayFrame] {
        &self.frames
    }

    /// Reconstruct the state at an arbitrary time. The returned state is
    /// an owned deep copy; callers may advance it further or fork more
    /// queries without affecting the timeline.
    pub fn state_at(&self, time: f64) -> Result<GameState, JudgeError> {
        // The initial bucket sits at -inf, so there is always one at or
        // before any query time.
        let bucket_ix = self
            .buckets
            .partition_point(|b| b.state.current_time <= time)
            .max(1)
            - 1;
        let bucket = &self.buckets[bucket_ix];

        let mut state = bucket.state.clone();
        for frame in &self.frames[bucket.frame_cursor..] {
            if frame.time > time {
                break;
            }
            self.evaluator.advance(&mut state, frame)?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{Blueprint, BlueprintKind, BlueprintObject};
    use crate::builder;
    use crate::hit_windows::HitWindowStyle;
    use crate::judge::NoteLockStyle;
    use crate::mods::Mods;
    use crate::replay::{BUTTON_LEFT, BUTTON_RIGHT};
    use crate::stats::summarize;
    use cgmath::Vector2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    fn test_blueprint() -> Blueprint {
        Blueprint {
            overall_difficulty: 5.0,
            circle_size: 4.0,
            approach_rate: 9.0,
            stack_leniency: 0.7,
            objects: vec![
                BlueprintObject::circle(1000.0, 100.0, 100.0),
                BlueprintObject::circle(1400.0, 200.0, 150.0),
                BlueprintObject {
                    time: 2000.0,
                    x: 100.0,
                    y: 200.0,
                    kind: BlueprintKind::Slider {
                        path: vec![(100.0, 200.0), (300.0, 200.0)],
                        span_count: 1,
                        span_duration: 1000.0,
                        tick_interval: 250.0,
                    },
                },
                BlueprintObject::circle(3500.0, 300.0, 100.0),
                BlueprintObject::spinner(4000.0, 4800.0, 256.0, 192.0),
            ],
        }
    }

    fn test_evaluator() -> Evaluator {
        let beatmap = Arc::new(builder::build(&test_blueprint(), Mods::none()).unwrap());
        Evaluator::with_style(beatmap, HitWindowStyle::Stable, NoteLockStyle::Stable)
    }

    fn random_frames(seed: u64, count: usize) -> Vec<ReplayFrame> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut time = 0.0_f64;
        let mut frames = Vec::with_capacity(count);
        for _ in 0..count {
            time += rng.random_range(5.0..40.0);
            let buttons = match rng.random_range(0..4) {
                0 => 0,
                1 => BUTTON_LEFT,
                2 => BUTTON_RIGHT,
                _ => BUTTON_LEFT | BUTTON_RIGHT,
            };
            frames.push(ReplayFrame::new(
                time,
                Vector2::new(rng.random_range(0.0..512.0), rng.random_range(0.0..384.0)),
                buttons,
            ));
        }
        frames
    }

    fn reference_state_at(evaluator: &Evaluator, frames: &[ReplayFrame], time: f64) -> GameState {
        let mut state = evaluator.initial_state();
        for frame in frames {
            if frame.time > time {
                break;
            }
            evaluator.advance(&mut state, frame).unwrap();
        }
        state
    }

    #[test]
    fn scrubbing_matches_a_straight_run() {
        let evaluator = test_evaluator();
        let frames = random_frames(0xC0FFEE, 400);
        let timeline = Timeline::build(evaluator.clone(), frames.clone()).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..25 {
            let t = rng.random_range(-100.0..6000.0);
            let scrubbed = timeline.state_at(t).unwrap();
            let reference = reference_state_at(&evaluator, &frames, t);
            assert_eq!(scrubbed, reference, "diverged at t={t}");
        }
    }

    #[test]
    fn query_before_the_first_frame_is_the_initial_state() {
        let evaluator = test_evaluator();
        let frames = random_frames(1, 50);
        let first = frames[0].time;
        let timeline = Timeline::build(evaluator.clone(), frames).unwrap();

        let state = timeline.state_at(first - 1.0).unwrap();
        assert_eq!(state, evaluator.initial_state());
    }

    #[test]
    fn repeated_and_out_of_order_queries_agree() {
        let evaluator = test_evaluator();
        let frames = random_frames(2, 300);
        let timeline = Timeline::build(evaluator, frames).unwrap();

        let late = timeline.state_at(5000.0).unwrap();
        let early = timeline.state_at(1500.0).unwrap();
        let late_again = timeline.state_at(5000.0).unwrap();
        let early_again = timeline.state_at(1500.0).unwrap();
        assert_eq!(late, late_again);
        assert_eq!(early, early_again);
        assert!(early.judged_objects.len() <= late.judged_objects.len());
    }

    #[test]
    fn forked_queries_stay_isolated() {
        let evaluator = test_evaluator();
        let frames = random_frames(3, 300);
        let timeline = Timeline::build(evaluator.clone(), frames.clone()).unwrap();

        let held = timeline.state_at(2000.0).unwrap();
        let mut advanced = held.clone();
        for frame in frames.iter().filter(|f| f.time > 2000.0) {
            evaluator.advance(&mut advanced, frame).unwrap();
        }

        // Mutating the fork leaves the held copy identical to a fresh query.
        assert_eq!(held, timeline.state_at(2000.0).unwrap());
        assert_ne!(held.current_time, advanced.current_time);
    }

    #[test]
    fn clone_isolation_over_random_sequences() {
        let evaluator = test_evaluator();
        for seed in 0..5 {
            let frames = random_frames(seed, 200);
            let mut state = evaluator.initial_state();
            let mut held: Vec<(usize, GameState)> = Vec::new();

            for (i, frame) in frames.iter().enumerate() {
                evaluator.advance(&mut state, frame).unwrap();
                if i % 40 == 0 {
                    held.push((i, state.clone()));
                }
            }

            for (i, snapshot) in held {
                let reference = reference_state_at(&evaluator, &frames, frames[i].time);
                assert_eq!(snapshot, reference, "seed {seed}, frame {i}");
            }
        }
    }

    #[test]
    fn full_pipeline_produces_consistent_statistics() {
        let _ = env_logger::builder().is_test(true).try_init();
        let evaluator = test_evaluator();
        // Clean play: click both circles, track the slider, wait out the
        // spinner.
        let mut frames = vec![
            ReplayFrame::new(500.0, Vector2::new(0.0, 0.0), 0),
            ReplayFrame::new(1002.0, Vector2::new(100.0, 100.0), BUTTON_LEFT),
            ReplayFrame::new(1100.0, Vector2::new(100.0, 100.0), 0),
            ReplayFrame::new(1398.0, Vector2::new(200.0, 150.0), BUTTON_LEFT),
            ReplayFrame::new(1500.0, Vector2::new(200.0, 150.0), 0),
            ReplayFrame::new(2000.0, Vector2::new(100.0, 200.0), BUTTON_LEFT),
        ];
        // Ride the slider ball from 2000 to 3000 in 50 ms steps.
        for i in 1..=20 {
            let t = 2000.0 + f64::from(i) * 50.0;
            let x = 100.0 + 200.0 * ((t - 2000.0) / 1000.0) as f32;
            frames.push(ReplayFrame::new(t, Vector2::new(x, 200.0), BUTTON_LEFT));
        }
        frames.push(ReplayFrame::new(3200.0, Vector2::new(300.0, 200.0), 0));
        frames.push(ReplayFrame::new(3503.0, Vector2::new(300.0, 100.0), BUTTON_LEFT));
        frames.push(ReplayFrame::new(5000.0, Vector2::new(300.0, 100.0), 0));

        let timeline = Timeline::build(evaluator.clone(), frames).unwrap();
        let end = timeline.state_at(5000.0).unwrap();
        let summary = summarize(&end, evaluator.beatmap()).unwrap();

        // Three circles, one slider, one spinner, all clean.
        assert_eq!(summary.verdict_counts, [5, 0, 0, 0]);
        assert_eq!(summary.accuracy, 1.0);
        // Combo: circle, circle, head, slider, circle, spinner.
        assert_eq!(summary.max_combo, 6);

        // Halfway through, only the first two circles are judged.
        let mid = timeline.state_at(1900.0).unwrap();
        let mid_summary = summarize(&mid, evaluator.beatmap()).unwrap();
        assert_eq!(mid_summary.verdict_counts, [2, 0, 0, 0]);
    }
}
