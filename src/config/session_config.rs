use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::play::Rating;
use crate::util::error::EngineError;

/// Rating tier boundaries in milliseconds of absolute offset.
/// A tap rates PERFECT below `perfect_ms`, GOOD below `good_ms`, OK below `ok_ms`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RatingThresholds {
    pub perfect_ms: f64,
    pub good_ms: f64,
    pub ok_ms: f64,
}

impl Default for RatingThresholds {
    fn default() -> Self {
        Self {
            perfect_ms: 280.0,
            good_ms: 380.0,
            ok_ms: 500.0,
        }
    }
}

/// Base points per rating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PointValues {
    pub perfect: f64,
    pub good: f64,
    pub ok: f64,
    pub early_late: f64,
}

impl Default for PointValues {
    fn default() -> Self {
        Self {
            perfect: 1.0,
            good: 0.5,
            ok: 0.2,
            early_late: 0.0,
        }
    }
}

/// Seconds added to the time budget per rating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeBonusValues {
    pub perfect: f64,
    pub good: f64,
    pub ok: f64,
    pub early_late: f64,
}

impl Default for TimeBonusValues {
    fn default() -> Self {
        Self {
            perfect: 2.0,
            good: 1.0,
            ok: 0.5,
            early_late: 0.1,
        }
    }
}

/// Lookup of a per-rating value. `Miss` is always zero.
pub trait RatingTable {
    fn tiers(&self) -> [f64; 4];

    fn value(&self, rating: Rating) -> f64 {
        let [perfect, good, ok, early_late] = self.tiers();
        match rating {
            Rating::Perfect => perfect,
            Rating::Good => good,
            Rating::Ok => ok,
            Rating::Early | Rating::Late => early_late,
            Rating::Miss => 0.0,
        }
    }

    fn is_non_negative(&self) -> bool {
        self.tiers().iter().all(|v| *v >= 0.0 && v.is_finite())
    }
}

impl RatingTable for PointValues {
    fn tiers(&self) -> [f64; 4] {
        [self.perfect, self.good, self.ok, self.early_late]
    }
}

impl RatingTable for TimeBonusValues {
    fn tiers(&self) -> [f64; 4] {
        [self.perfect, self.good, self.ok, self.early_late]
    }
}

/// Point, combo and time-budget tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringRules {
    /// Base points per rating.
    pub base_points: PointValues,
    /// Points multiplier added per combo count: `1 + combo * combo_bonus_per_hit`.
    pub combo_bonus_per_hit: f64,
    /// Tempo multiplier is `bpm / tempo_reference_bpm` once the tempo qualifies.
    pub tempo_reference_bpm: f64,
    /// Seconds added to the time budget per rating, before speed-up decay.
    pub time_bonus: TimeBonusValues,
    /// Fraction of the time bonus lost per speed-up.
    pub time_bonus_decay_per_speed_up: f64,
    /// Lowest scale the time bonus decays to.
    pub time_bonus_floor: f64,
    /// Seconds removed from the budget by a miss once penalties are active.
    pub miss_penalty_seconds: f64,
    /// Misses cost time once the session's max combo has reached this value.
    pub penalty_activation_combo: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            base_points: PointValues::default(),
            combo_bonus_per_hit: 0.01,
            tempo_reference_bpm: 100.0,
            time_bonus: TimeBonusValues::default(),
            time_bonus_decay_per_speed_up: 0.15,
            time_bonus_floor: 0.1,
            miss_penalty_seconds: 30.0,
            penalty_activation_combo: 20,
        }
    }
}

/// Everything a session needs at start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub player_name: String,
    pub starting_bpm: f64,
    /// Beats per measure (accent every `time_signature` beats).
    pub time_signature: u32,
    /// Seconds on the clock at start.
    pub initial_time_budget: f64,
    /// The budget never exceeds this.
    pub max_time_budget: f64,
    /// Subtracted from raw tap time to approximate input delay.
    pub latency_compensation_ms: f64,
    pub rating_thresholds: RatingThresholds,
    /// Farthest a tap may be from a beat and still match it.
    pub match_radius_ms: f64,
    /// Unmatched beats older than this are swept as misses.
    pub miss_window_ms: f64,
    pub combo_step_for_speed_up: u32,
    pub speed_up_increment_bpm: f64,
    /// Below this tempo the session earns no competitive points.
    pub minimum_qualifying_bpm: f64,
    /// How far ahead of the clock beats are committed.
    pub lookahead_seconds: f64,
    /// Driver tick cadence.
    pub tick_interval_ms: u64,
    /// Gap between start and the first beat.
    pub start_delay_seconds: f64,
    /// Taps closer than this to the previous accepted tap are dropped.
    pub debounce_ms: f64,
    /// A beat stays "active" for display this long after it sounds.
    pub display_epsilon_seconds: f64,
    /// Number of most recent open beats a tap is matched against.
    pub tail_window: usize,
    /// A single miss keeps the combo; only a second consecutive miss clears it.
    pub grace_miss: bool,
    pub scoring: ScoringRules,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            player_name: String::new(),
            starting_bpm: 80.0,
            time_signature: 4,
            initial_time_budget: 20.0,
            max_time_budget: 60.0,
            latency_compensation_ms: 40.0,
            rating_thresholds: RatingThresholds::default(),
            match_radius_ms: 600.0,
            miss_window_ms: 600.0,
            combo_step_for_speed_up: 20,
            speed_up_increment_bpm: 10.0,
            minimum_qualifying_bpm: 80.0,
            lookahead_seconds: 0.20,
            tick_interval_ms: 25,
            start_delay_seconds: 0.5,
            debounce_ms: 150.0,
            display_epsilon_seconds: 0.1,
            tail_window: 10,
            grace_miss: false,
            scoring: ScoringRules::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults with a different starting tempo and signature.
    pub fn with_tempo(bpm: f64, time_signature: u32) -> Self {
        Self {
            starting_bpm: bpm,
            time_signature,
            ..Self::default()
        }
    }

    /// Loads a session config from a JSON file.
    /// Returns the default config if the file doesn't exist.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check internal consistency of the tunables.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |msg: &str| Err(EngineError::InvalidConfig(msg.to_string()));
        let t = &self.rating_thresholds;

        if self.starting_bpm <= 0.0 || !self.starting_bpm.is_finite() {
            return fail("starting_bpm must be positive");
        }
        if self.time_signature == 0 {
            return fail("time_signature must be at least 1");
        }
        if !(t.perfect_ms > 0.0 && t.perfect_ms < t.good_ms && t.good_ms < t.ok_ms) {
            return fail("rating thresholds must satisfy 0 < perfect < good < ok");
        }
        if self.match_radius_ms < t.ok_ms {
            return fail("match_radius_ms must be at least the ok threshold");
        }
        if self.miss_window_ms < self.match_radius_ms {
            return fail("miss_window_ms must be at least match_radius_ms");
        }
        if self.initial_time_budget < 0.0 || self.max_time_budget <= 0.0 {
            return fail("time budgets must be positive");
        }
        if self.initial_time_budget > self.max_time_budget {
            return fail("initial_time_budget exceeds max_time_budget");
        }
        if self.combo_step_for_speed_up == 0 {
            return fail("combo_step_for_speed_up must be at least 1");
        }
        if self.speed_up_increment_bpm < 0.0 {
            return fail("speed_up_increment_bpm must not be negative");
        }
        if self.lookahead_seconds <= 0.0 {
            return fail("lookahead_seconds must be positive");
        }
        if self.tail_window == 0 {
            return fail("tail_window must be at least 1");
        }
        if self.scoring.tempo_reference_bpm <= 0.0 {
            return fail("tempo_reference_bpm must be positive");
        }
        if !self.scoring.base_points.is_non_negative() {
            return fail("base_points must not be negative");
        }
        if !self.scoring.time_bonus.is_non_negative() {
            return fail("time_bonus must not be negative");
        }
        if self.scoring.combo_bonus_per_hit < 0.0 || self.scoring.miss_penalty_seconds < 0.0 {
            return fail("combo bonus and miss penalty must not be negative");
        }
        Ok(())
    }
}
