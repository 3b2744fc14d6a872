//! Derived statistics: a pure traversal of the judgement record.

use serde::Serialize;

use crate::beatmap::{Beatmap, ObjectRole};
use crate::error::JudgeError;
use crate::state::{GameState, VERDICT_COUNT, Verdict, verdict_ix};

/// Running score summary for one game state.
///
/// Combo counts heads, sliders and spinners; checkpoints never touch it.
/// The histogram and accuracy count circles, sliders and spinners;
/// a head's own verdict is folded into its slider's.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub combo: u32,
    pub max_combo: u32,
    /// `[great, ok, meh, miss]`, indexed by [`verdict_ix`].
    pub verdict_counts: [u32; VERDICT_COUNT],
    pub accuracy: f64,
}

const ACCURACY_WEIGHTS: [f64; VERDICT_COUNT] = [300.0, 100.0, 50.0, 0.0];

pub fn summarize(state: &GameState, beatmap: &Beatmap) -> Result<ScoreSummary, JudgeError> {
    fn apply_combo(verdict: Verdict, combo: &mut u32, max_combo: &mut u32) {
        if verdict == Verdict::Miss {
            *combo = 0;
        } else {
            *combo += 1;
            *max_combo = (*max_combo).max(*combo);
        }
    }

    let mut combo: u32 = 0;
    let mut max_combo: u32 = 0;
    let mut counts = [0u32; VERDICT_COUNT];

    for &id in &state.judged_objects {
        match beatmap.role(id)? {
            ObjectRole::Circle => {
                let verdict = state
                    .hit_circle_state
                    .get(&id)
                    .ok_or(JudgeError::UnknownHitObjectId(id))?
                    .result
                    .verdict();
                counts[verdict_ix(verdict)] += 1;
                apply_combo(verdict, &mut combo, &mut max_combo);
            }
            ObjectRole::SliderHead => {
                let verdict = state
                    .hit_circle_state
                    .get(&id)
                    .ok_or(JudgeError::UnknownHitObjectId(id))?
                    .result
                    .verdict();
                apply_combo(verdict, &mut combo, &mut max_combo);
            }
            ObjectRole::Slider => {
                let verdict = *state
                    .slider_verdict
                    .get(&id)
                    .ok_or(JudgeError::UnknownHitObjectId(id))?;
                counts[verdict_ix(verdict)] += 1;
                apply_combo(verdict, &mut combo, &mut max_combo);
            }
            ObjectRole::Spinner => {
                // Spin counting is stubbed; a finished spinner reads as a
                // GREAT until rotations are modelled.
                counts[verdict_ix(Verdict::Great)] += 1;
                apply_combo(Verdict::Great, &mut combo, &mut max_combo);
            }
            ObjectRole::CheckPoint => {}
        }
    }

    let judged: u32 = counts.iter().sum();
    let accuracy = if judged == 0 {
        1.0
    } else {
        let earned: f64 = counts
            .iter()
            .zip(ACCURACY_WEIGHTS)
            .map(|(&n, w)| f64::from(n) * w)
            .sum();
        earned / (300.0 * f64::from(judged))
    };

    Ok(ScoreSummary {
        combo,
        max_combo,
        verdict_counts: counts,
        accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::{Beatmap, HitCircle, HitObject, Spinner};
    use crate::state::{CircleResult, HitCircleState, MissReason};
    use cgmath::Vector2;

    fn circle(hit_time: f64) -> HitObject {
        HitObject::Circle(HitCircle {
            id: 0,
            position: Vector2::new(100.0, 100.0),
            radius: 30.0,
            hit_time,
            spawn_time: hit_time - 600.0,
        })
    }

    fn judged_circle_state(verdicts: &[CircleResult]) -> (Beatmap, GameState) {
        let beatmap = Beatmap::from_objects(
            5.0,
            (0..verdicts.len())
                .map(|i| circle(1000.0 + i as f64 * 100.0))
                .collect(),
        );
        let mut state = GameState::new();
        for (i, &result) in verdicts.iter().enumerate() {
            let id = i as u32;
            state.hit_circle_state.insert(
                id,
                HitCircleState {
                    judgement_time: 1000.0 + i as f64 * 100.0,
                    result,
                },
            );
            state.judged_objects.push(id);
        }
        (beatmap, state)
    }

    #[test]
    fn empty_state_is_full_accuracy() {
        let (beatmap, state) = judged_circle_state(&[]);
        let summary = summarize(&state, &beatmap).unwrap();
        assert_eq!(summary, ScoreSummary {
            combo: 0,
            max_combo: 0,
            verdict_counts: [0; 4],
            accuracy: 1.0,
        });
    }

    #[test]
    fn miss_resets_combo_but_max_survives() {
        let (beatmap, state) = judged_circle_state(&[
            CircleResult::Hit(Verdict::Great),
            CircleResult::Hit(Verdict::Ok),
            CircleResult::Hit(Verdict::Meh),
            CircleResult::Miss(MissReason::TimeExpired),
            CircleResult::Hit(Verdict::Great),
        ]);
        let summary = summarize(&state, &beatmap).unwrap();
        assert_eq!(summary.combo, 1);
        assert_eq!(summary.max_combo, 3);
        assert_eq!(summary.verdict_counts, [2, 1, 1, 1]);
    }

    #[test]
    fn accuracy_is_the_standard_weighted_sum() {
        let (beatmap, state) = judged_circle_state(&[
            CircleResult::Hit(Verdict::Great),
            CircleResult::Hit(Verdict::Ok),
            CircleResult::Hit(Verdict::Meh),
            CircleResult::Miss(MissReason::HitTooEarly),
        ]);
        let summary = summarize(&state, &beatmap).unwrap();
        // (300 + 100 + 50 + 0) / (300 * 4)
        assert!((summary.accuracy - 0.375).abs() < 1e-12);
    }

    #[test]
    fn spinner_counts_as_a_great() {
        let beatmap = Beatmap::from_objects(
            5.0,
            vec![HitObject::Spinner(Spinner {
                id: 0,
                start_time: 500.0,
                end_time: 1500.0,
            })],
        );
        let mut state = GameState::new();
        state.judged_objects.push(0);
        let summary = summarize(&state, &beatmap).unwrap();
        assert_eq!(summary.verdict_counts, [1, 0, 0, 0]);
        assert_eq!(summary.combo, 1);
        assert_eq!(summary.accuracy, 1.0);
    }

    #[test]
    fn head_counts_for_combo_but_not_the_histogram() {
        use crate::beatmap::{CheckPoint, CheckPointKind, Slider};
        use crate::path::SliderPath;
        use crate::state::CheckPointState;

        let beatmap = Beatmap::from_objects(
            5.0,
            vec![HitObject::Slider(Slider {
                id: 0,
                head: HitCircle {
                    id: 0,
                    position: Vector2::new(100.0, 100.0),
                    radius: 30.0,
                    hit_time: 1000.0,
                    spawn_time: 400.0,
                },
                checkpoints: vec![CheckPoint {
                    id: 0,
                    kind: CheckPointKind::Tail,
                    hit_time: 1564.0,
                }],
                start_time: 1000.0,
                end_time: 1600.0,
                duration: 600.0,
                radius: 30.0,
                span_count: 1,
                path: SliderPath::new(
                    vec![Vector2::new(100.0, 100.0), Vector2::new(300.0, 100.0)],
                    1000.0,
                )
                .unwrap(),
            })],
        );

        // Ids: slider 0, head 1, checkpoint 2. Judged: head, tail, slider.
        let mut state = GameState::new();
        state.hit_circle_state.insert(
            1,
            HitCircleState {
                judgement_time: 1003.0,
                result: CircleResult::Hit(Verdict::Great),
            },
        );
        state
            .checkpoint_state
            .insert(2, CheckPointState { hit: false });
        state.slider_verdict.insert(0, Verdict::Ok);
        state.judged_objects.extend([1, 2, 0]);

        let summary = summarize(&state, &beatmap).unwrap();
        assert_eq!(summary.verdict_counts, [0, 1, 0, 0]);
        assert_eq!(summary.combo, 2);
        assert_eq!(summary.max_combo, 2);
    }

    #[test]
    fn desynchronized_record_is_an_unknown_id() {
        let (beatmap, mut state) = judged_circle_state(&[CircleResult::Hit(Verdict::Great)]);
        state.judged_objects.push(42);
        assert_eq!(
            summarize(&state, &beatmap),
            Err(JudgeError::UnknownHitObjectId(42))
        );
    }
}
