use serde::{Deserialize, Serialize};

/// Legacy mod bitmask. Only the geometry/timing mods influence the
/// built beatmap; the evaluator itself is unaware of cosmetic mods.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mods(pub u32);

impl Mods {
    pub const NO_FAIL: Mods = Mods(1 << 0);
    pub const EASY: Mods = Mods(1 << 1);
    pub const HIDDEN: Mods = Mods(1 << 3);
    pub const HARD_ROCK: Mods = Mods(1 << 4);
    pub const SUDDEN_DEATH: Mods = Mods(1 << 5);
    pub const DOUBLE_TIME: Mods = Mods(1 << 6);
    pub const RELAX: Mods = Mods(1 << 7);
    pub const HALF_TIME: Mods = Mods(1 << 8);
    pub const NIGHTCORE: Mods = Mods(1 << 9);
    pub const FLASHLIGHT: Mods = Mods(1 << 10);
    pub const SPUN_OUT: Mods = Mods(1 << 12);
    pub const AUTOPILOT: Mods = Mods(1 << 13);
    pub const PERFECT: Mods = Mods(1 << 14);

    pub const fn none() -> Self {
        Mods(0)
    }

    pub const fn contains(self, other: Mods) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn with(self, other: Mods) -> Self {
        Mods(self.0 | other.0)
    }

    #[inline(always)]
    pub const fn ez(self) -> bool {
        self.contains(Self::EASY)
    }

    #[inline(always)]
    pub const fn hr(self) -> bool {
        self.contains(Self::HARD_ROCK)
    }

    #[inline(always)]
    pub const fn dt(self) -> bool {
        self.contains(Self::DOUBLE_TIME) || self.contains(Self::NIGHTCORE)
    }

    #[inline(always)]
    pub const fn ht(self) -> bool {
        self.contains(Self::HALF_TIME)
    }

    /// Audio clock multiplier. Map-time data is untouched by rate mods;
    /// this is for the playback layer.
    pub fn clock_rate(self) -> f64 {
        if self.dt() {
            1.5
        } else if self.ht() {
            0.75
        } else {
            1.0
        }
    }

    /// Difficulty scalar (CS/AR/OD) after EASY / HARD_ROCK, capped at 10.
    /// HARD_ROCK scales circle size by 1.3 and the rest by 1.4.
    pub fn scale_difficulty(self, value: f32, hr_factor: f32) -> f32 {
        let scaled = if self.ez() {
            value * 0.5
        } else if self.hr() {
            value * hr_factor
        } else {
            value
        };
        scaled.min(10.0)
    }
}

pub const HR_CIRCLE_SIZE_FACTOR: f32 = 1.3;
pub const HR_DIFFICULTY_FACTOR: f32 = 1.4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_rate_table() {
        assert_eq!(Mods::none().clock_rate(), 1.0);
        assert_eq!(Mods::DOUBLE_TIME.clock_rate(), 1.5);
        assert_eq!(Mods::NIGHTCORE.clock_rate(), 1.5);
        assert_eq!(Mods::HALF_TIME.clock_rate(), 0.75);
    }

    #[test]
    fn hard_rock_caps_at_ten() {
        let mods = Mods::HARD_ROCK;
        assert_eq!(mods.scale_difficulty(8.0, HR_DIFFICULTY_FACTOR), 10.0);
        let od = mods.scale_difficulty(5.0, HR_DIFFICULTY_FACTOR);
        assert!((od - 7.0).abs() < 1e-6);
    }

    #[test]
    fn easy_halves() {
        let cs = Mods::EASY.scale_difficulty(4.0, HR_CIRCLE_SIZE_FACTOR);
        assert_eq!(cs, 2.0);
    }

    #[test]
    fn combined_mask_queries() {
        let mods = Mods::HIDDEN.with(Mods::DOUBLE_TIME);
        assert!(mods.dt());
        assert!(!mods.hr());
        assert!(mods.contains(Mods::HIDDEN));
    }
}
