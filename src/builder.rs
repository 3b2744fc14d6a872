//! Beatmap construction: blueprint + mod set → the materialized,
//! spawn-ordered beatmap the evaluator consumes.

use cgmath::{InnerSpace, Vector2};
use log::info;

use crate::beatmap::{
    Beatmap, CheckPoint, CheckPointKind, HitCircle, HitObject, Slider, Spinner,
};
use crate::blueprint::{Blueprint, BlueprintKind, BlueprintObject};
use crate::error::BeatmapError;
use crate::math::difficulty_range;
use crate::mods::{HR_CIRCLE_SIZE_FACTOR, HR_DIFFICULTY_FACTOR, Mods};
use crate::path::SliderPath;

pub const PLAYFIELD_HEIGHT: f32 = 384.0;

// Preempt reference points at AR 0 / 5 / 10, in milliseconds.
const PREEMPT_RANGE: (f64, f64, f64) = (1800.0, 1200.0, 450.0);

// Objects whose positions land within this distance participate in a stack.
const STACK_DISTANCE: f32 = 3.0;

// The tail checkpoint sits this far before the slider end, clamped to the
// midpoint for very short sliders.
const LEGACY_LAST_TICK_OFFSET: f64 = 36.0;

// Ticks stop this fraction of an interval short of the span end.
const TICK_CUTOFF_FRACTION: f64 = 1.0 / 8.0;

/// Scratch entry carried through stacking before final assembly.
struct ProtoObject {
    time: f64,
    end_time: f64,
    position: Vector2<f32>,
    end_position: Vector2<f32>,
    stack_height: f32,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum ProtoKind {
    Circle,
    Slider,
    Spinner,
}

/// Build the immutable beatmap from authored data and the active mods.
pub fn build(blueprint: &Blueprint, mods: Mods) -> Result<Beatmap, BeatmapError> {
    let circle_size = mods.scale_difficulty(blueprint.circle_size, HR_CIRCLE_SIZE_FACTOR);
    let approach_rate = mods.scale_difficulty(blueprint.approach_rate, HR_DIFFICULTY_FACTOR);
    let overall_difficulty =
        mods.scale_difficulty(blueprint.overall_difficulty, HR_DIFFICULTY_FACTOR);

    let scale = (1.0 - 0.7 * (circle_size - 5.0) / 5.0) / 2.0;
    let radius = 64.0 * scale;
    let preempt = difficulty_range(f64::from(approach_rate), PREEMPT_RANGE.0, PREEMPT_RANGE.1, PREEMPT_RANGE.2);

    validate_monotonic(&blueprint.objects)?;

    // Positions (HardRock flip applied) and slider paths, pre-stacking.
    let flip = mods.hr();
    let mut kinds = Vec::with_capacity(blueprint.objects.len());
    let mut paths: Vec<Option<SliderPath>> = Vec::with_capacity(blueprint.objects.len());
    let mut protos = Vec::with_capacity(blueprint.objects.len());

    for object in &blueprint.objects {
        let y = if flip { PLAYFIELD_HEIGHT - object.y } else { object.y };
        let position = Vector2::new(object.x, y);

        match &object.kind {
            BlueprintKind::Circle => {
                kinds.push(ProtoKind::Circle);
                paths.push(None);
                protos.push(ProtoObject {
                    time: object.time,
                    end_time: object.time,
                    position,
                    end_position: position,
                    stack_height: 0.0,
                });
            }
            BlueprintKind::Slider {
                path,
                span_count,
                span_duration,
                tick_interval,
            } => {
                if *span_count == 0 || !span_duration.is_finite() || *span_duration <= 0.0 {
                    return Err(BeatmapError::BadSliderSpan { time: object.time });
                }
                if !tick_interval.is_finite() || *tick_interval <= 0.0 {
                    return Err(BeatmapError::BadTickInterval { time: object.time });
                }
                let points = path
                    .iter()
                    .map(|&(x, py)| {
                        Vector2::new(x, if flip { PLAYFIELD_HEIGHT - py } else { py })
                    })
                    .collect();
                let path = SliderPath::new(points, object.time)?;
                let duration = span_duration * f64::from(*span_count);
                let end_position = if span_count % 2 == 1 {
                    path.end()
                } else {
                    path.start()
                };
                kinds.push(ProtoKind::Slider);
                protos.push(ProtoObject {
                    time: object.time,
                    end_time: object.time + duration,
                    position,
                    end_position,
                    stack_height: 0.0,
                });
                paths.push(Some(path));
            }
            BlueprintKind::Spinner { end_time } => {
                kinds.push(ProtoKind::Spinner);
                paths.push(None);
                protos.push(ProtoObject {
                    time: object.time,
                    end_time: *end_time,
                    position,
                    end_position: position,
                    stack_height: 0.0,
                });
            }
        }
    }

    let stack_threshold = preempt * f64::from(blueprint.stack_leniency);
    apply_stacking(&mut protos, &kinds, stack_threshold);

    // Stack offsets shift up-left along both axes.
    let stack_factor = scale * -6.4;

    let mut circles = 0usize;
    let mut sliders = 0usize;
    let mut spinners = 0usize;
    let mut objects = Vec::with_capacity(blueprint.objects.len());

    for (index, object) in blueprint.objects.iter().enumerate() {
        let proto = &protos[index];
        let offset = proto.stack_height * stack_factor;
        let position = proto.position + Vector2::new(offset, offset);

        match &object.kind {
            BlueprintKind::Circle => {
                circles += 1;
                objects.push(HitObject::Circle(HitCircle {
                    id: 0,
                    position,
                    radius,
                    hit_time: object.time,
                    spawn_time: object.time - preempt,
                }));
            }
            BlueprintKind::Slider {
                span_count,
                span_duration,
                tick_interval,
                ..
            } => {
                sliders += 1;
                let mut path = paths[index].take().ok_or(BeatmapError::UnsampleablePath {
                    time: object.time,
                    reason: "missing path",
                })?;
                path.translate(Vector2::new(offset, offset));

                let duration = span_duration * f64::from(*span_count);
                let end_time = object.time + duration;
                let checkpoints =
                    generate_checkpoints(object.time, end_time, *span_count, *span_duration, *tick_interval)?;

                objects.push(HitObject::Slider(Slider {
                    id: 0,
                    head: HitCircle {
                        id: 0,
                        position,
                        radius,
                        hit_time: object.time,
                        spawn_time: object.time - preempt,
                    },
                    checkpoints,
                    start_time: object.time,
                    end_time,
                    duration,
                    radius,
                    span_count: *span_count,
                    path,
                }));
            }
            BlueprintKind::Spinner { end_time } => {
                spinners += 1;
                objects.push(HitObject::Spinner(Spinner {
                    id: 0,
                    start_time: object.time,
                    end_time: *end_time,
                }));
            }
        }
    }

    // Spawn order: preempt is uniform, so only spinners (which spawn at
    // their start time) can reorder relative to authored order.
    objects.sort_by(|a, b| a.spawn_time().total_cmp(&b.spawn_time()));

    info!(
        "built beatmap: {} objects ({} circles, {} sliders, {} spinners), radius {:.2}, preempt {:.0} ms",
        objects.len(),
        circles,
        sliders,
        spinners,
        radius,
        preempt
    );

    Ok(Beatmap::from_objects(overall_difficulty, objects))
}

fn validate_monotonic(objects: &[BlueprintObject]) -> Result<(), BeatmapError> {
    for (index, pair) in objects.windows(2).enumerate() {
        if pair[1].time < pair[0].time {
            return Err(BeatmapError::NonMonotonicTimes {
                index: index + 1,
                time: pair[1].time,
                previous: pair[0].time,
            });
        }
    }
    Ok(())
}

/// Ticks per span (mirrored on reverse traversals), repeat checkpoints at
/// interior span boundaries, and the legacy tail checkpoint.
fn generate_checkpoints(
    start: f64,
    end: f64,
    span_count: u32,
    span_duration: f64,
    tick_interval: f64,
) -> Result<Vec<CheckPoint>, BeatmapError> {
    let cutoff = span_duration - tick_interval * TICK_CUTOFF_FRACTION;
    let mut forward = Vec::new();
    let mut offset = tick_interval;
    while offset < cutoff {
        forward.push(offset);
        offset += tick_interval;
    }

    let mut checkpoints = Vec::new();
    for span in 0..span_count {
        let span_start = start + f64::from(span) * span_duration;
        if span % 2 == 0 {
            for &t in &forward {
                checkpoints.push(CheckPoint {
                    id: 0,
                    kind: CheckPointKind::Tick,
                    hit_time: span_start + t,
                });
            }
        } else {
            for &t in forward.iter().rev() {
                checkpoints.push(CheckPoint {
                    id: 0,
                    kind: CheckPointKind::Tick,
                    hit_time: span_start + (span_duration - t),
                });
            }
        }
    }
    for span in 1..span_count {
        checkpoints.push(CheckPoint {
            id: 0,
            kind: CheckPointKind::Repeat,
            hit_time: start + f64::from(span) * span_duration,
        });
    }

    let duration = end - start;
    checkpoints.push(CheckPoint {
        id: 0,
        kind: CheckPointKind::Tail,
        hit_time: (end - LEGACY_LAST_TICK_OFFSET).max(start + duration / 2.0),
    });

    checkpoints.sort_by(|a, b| a.hit_time.total_cmp(&b.hit_time));

    for cp in &checkpoints {
        if cp.hit_time < start || cp.hit_time > end {
            return Err(BeatmapError::CheckpointOutsideSpan {
                time: start,
                checkpoint_time: cp.hit_time,
            });
        }
    }
    Ok(checkpoints)
}

/// Backward stacking pass for modern-format maps: walk objects from the
/// end, chaining anything within [`STACK_DISTANCE`] and the time
/// threshold into a stack, sliders only stacking by their resting end.
fn apply_stacking(objects: &mut [ProtoObject], kinds: &[ProtoKind], stack_threshold: f64) {
    if objects.is_empty() {
        return;
    }

    let mut extended_start_idx = 0;
    let extended_end_idx = objects.len() - 1;

    for i in (1..=extended_end_idx).rev() {
        let mut i = i;
        let mut n = i;

        if objects[i].stack_height.abs() > 0.0 || kinds[i] == ProtoKind::Spinner {
            continue;
        }

        if kinds[i] == ProtoKind::Circle {
            loop {
                n = match n.checked_sub(1) {
                    Some(n) => n,
                    None => break,
                };

                if kinds[n] == ProtoKind::Spinner {
                    continue;
                } else if objects[i].time - objects[n].end_time > stack_threshold {
                    break;
                } else if n < extended_start_idx {
                    objects[n].stack_height = 0.0;
                    extended_start_idx = n;
                }

                if kinds[n] == ProtoKind::Slider
                    && (objects[n].end_position - objects[i].position).magnitude() < STACK_DISTANCE
                {
                    let offset = objects[i].stack_height - objects[n].stack_height + 1.0;

                    for j in n + 1..=i {
                        if (objects[n].position - objects[j].position).magnitude() < STACK_DISTANCE
                        {
                            objects[j].stack_height -= offset;
                        }
                    }

                    break;
                } else if (objects[n].position - objects[i].position).magnitude() < STACK_DISTANCE {
                    objects[n].stack_height = objects[i].stack_height + 1.0;
                    i = n;
                }
            }
        } else if kinds[i] == ProtoKind::Slider {
            loop {
                n = match n.checked_sub(1) {
                    Some(n) => n,
                    None => break,
                };

                if kinds[n] == ProtoKind::Spinner {
                    continue;
                } else if objects[i].time - objects[n].time > stack_threshold {
                    break;
                } else if (objects[n].end_position - objects[i].position).magnitude()
                    < STACK_DISTANCE
                {
                    objects[n].stack_height = objects[i].stack_height + 1.0;
                    i = n;
                }
            }
        }
    }
}
