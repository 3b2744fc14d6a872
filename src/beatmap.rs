//! The immutable, fully materialized beatmap the evaluator runs against.
//!
//! Every judgeable entity (standalone circles, sliders, slider heads,
//! slider checkpoints, spinners) carries one id out of a single global
//! space assigned at build time in spawn order, so id comparisons double
//! as deterministic tie-breakers.

use cgmath::Vector2;

use crate::error::JudgeError;
use crate::path::SliderPath;

pub type ObjectId = u32;

/// A clickable circle: standalone, or the head a slider owns by value.
#[derive(Clone, Debug, PartialEq)]
pub struct HitCircle {
    pub id: ObjectId,
    pub position: Vector2<f32>,
    pub radius: f32,
    /// The moment the player is supposed to click.
    pub hit_time: f64,
    /// Earliest moment judgement tracks this object.
    pub spawn_time: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CheckPointKind {
    Tick,
    Repeat,
    Tail,
}

/// A sub-position along a slider body, evaluated once for tracking when
/// the simulation crosses its time.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckPoint {
    pub id: ObjectId,
    pub kind: CheckPointKind,
    pub hit_time: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Slider {
    pub id: ObjectId,
    pub head: HitCircle,
    /// Ticks, repeats and the tail, ordered by time.
    pub checkpoints: Vec<CheckPoint>,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub radius: f32,
    pub span_count: u32,
    pub path: SliderPath,
}

impl Slider {
    /// Ball position at `completion` in [0, 1] over the whole duration.
    /// Odd spans traverse the path backwards, so the raw span progress is
    /// folded before sampling.
    pub fn ball_position_at(&self, completion: f64) -> Vector2<f32> {
        let mut progress = completion.clamp(0.0, 1.0) * f64::from(self.span_count);
        if progress % 2.0 >= 1.0 {
            progress = 1.0 - progress % 1.0;
        } else {
            progress %= 1.0;
        }
        self.path.position_at(progress)
    }

    /// Fraction of the slider elapsed at time `t`, clamped to [0, 1].
    #[inline(always)]
    pub fn completion_at(&self, t: f64) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        ((t - self.start_time) / self.duration).clamp(0.0, 1.0)
    }

    /// Where the ball rests when the slider ends.
    pub fn end_position(&self) -> Vector2<f32> {
        if self.span_count % 2 == 1 {
            self.path.end()
        } else {
            self.path.start()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Spinner {
    pub id: ObjectId,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HitObject {
    Circle(HitCircle),
    Slider(Slider),
    Spinner(Spinner),
}

impl HitObject {
    pub fn id(&self) -> ObjectId {
        match self {
            HitObject::Circle(c) => c.id,
            HitObject::Slider(s) => s.id,
            HitObject::Spinner(s) => s.id,
        }
    }

    pub fn spawn_time(&self) -> f64 {
        match self {
            HitObject::Circle(c) => c.spawn_time,
            HitObject::Slider(s) => s.head.spawn_time,
            HitObject::Spinner(s) => s.start_time,
        }
    }
}

/// Where an id lives inside the object list.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Slot {
    /// Top-level object at this index.
    Object(usize),
    /// Head of the slider at this index.
    Head(usize),
    /// Checkpoint `k` of the slider at this index.
    Checkpoint(usize, usize),
}

#[derive(Clone, Debug)]
pub struct Beatmap {
    pub overall_difficulty: f32,
    objects: Vec<HitObject>,
    slots: Vec<Slot>,
}

impl Beatmap {
    /// Assemble a beatmap from spawn-ordered objects, assigning the
    /// global id space (object, then head, then checkpoints, in order).
    /// Ids already present on the inputs are overwritten.
    pub fn from_objects(overall_difficulty: f32, mut objects: Vec<HitObject>) -> Self {
        let mut slots = Vec::new();
        for (index, object) in objects.iter_mut().enumerate() {
            match object {
                HitObject::Circle(c) => {
                    c.id = slots.len() as ObjectId;
                    slots.push(Slot::Object(index));
                }
                HitObject::Slider(s) => {
                    s.id = slots.len() as ObjectId;
                    slots.push(Slot::Object(index));
                    s.head.id = slots.len() as ObjectId;
                    slots.push(Slot::Head(index));
                    for (k, cp) in s.checkpoints.iter_mut().enumerate() {
                        cp.id = slots.len() as ObjectId;
                        slots.push(Slot::Checkpoint(index, k));
                    }
                }
                HitObject::Spinner(s) => {
                    s.id = slots.len() as ObjectId;
                    slots.push(Slot::Object(index));
                }
            }
        }
        Beatmap {
            overall_difficulty,
            objects,
            slots,
        }
    }

    pub fn objects(&self) -> &[HitObject] {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn slot(&self, id: ObjectId) -> Result<Slot, JudgeError> {
        self.slots
            .get(id as usize)
            .copied()
            .ok_or(JudgeError::UnknownHitObjectId(id))
    }

    /// Look up a clickable circle: a standalone circle or a slider head.
    pub fn circle(&self, id: ObjectId) -> Result<&HitCircle, JudgeError> {
        match self.slot(id)? {
            Slot::Object(i) => match &self.objects[i] {
                HitObject::Circle(c) => Ok(c),
                _ => Err(JudgeError::UnknownHitObjectId(id)),
            },
            Slot::Head(i) => match &self.objects[i] {
                HitObject::Slider(s) => Ok(&s.head),
                _ => Err(JudgeError::UnknownHitObjectId(id)),
            },
            Slot::Checkpoint(..) => Err(JudgeError::UnknownHitObjectId(id)),
        }
    }

    pub fn slider(&self, id: ObjectId) -> Result<&Slider, JudgeError> {
        match self.slot(id)? {
            Slot::Object(i) => match &self.objects[i] {
                HitObject::Slider(s) => Ok(s),
                _ => Err(JudgeError::UnknownHitObjectId(id)),
            },
            _ => Err(JudgeError::UnknownHitObjectId(id)),
        }
    }

    pub fn spinner(&self, id: ObjectId) -> Result<&Spinner, JudgeError> {
        match self.slot(id)? {
            Slot::Object(i) => match &self.objects[i] {
                HitObject::Spinner(s) => Ok(s),
                _ => Err(JudgeError::UnknownHitObjectId(id)),
            },
            _ => Err(JudgeError::UnknownHitObjectId(id)),
        }
    }

    /// The role of an id, for consumers walking `judged_objects`.
    pub fn role(&self, id: ObjectId) -> Result<ObjectRole, JudgeError> {
        match self.slot(id)? {
            Slot::Object(i) => Ok(match &self.objects[i] {
                HitObject::Circle(_) => ObjectRole::Circle,
                HitObject::Slider(_) => ObjectRole::Slider,
                HitObject::Spinner(_) => ObjectRole::Spinner,
            }),
            Slot::Head(_) => Ok(ObjectRole::SliderHead),
            Slot::Checkpoint(..) => Ok(ObjectRole::CheckPoint),
        }
    }
}

/// What kind of entity a judged id refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectRole {
    Circle,
    Slider,
    SliderHead,
    CheckPoint,
    Spinner,
}
