use serde::{Deserialize, Serialize};

use crate::config::{RatingTable, SessionConfig};

use super::TimeBudget;
use super::judge::{HitOutcome, OutcomeSource, Rating};

/// Offsets beyond this many ms count toward the early/late tendency.
pub const TENDENCY_THRESHOLD_MS: f64 = 50.0;

/// One judged event, kept for the results summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    pub rating: Rating,
    pub signed_offset_ms: f64,
    pub at_time: f64,
    pub points: f64,
}

/// Whether the player tends to tap ahead of or behind the beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tendency {
    Rushing,
    Dragging,
    Steady,
}

/// Early/late tallies over matched taps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingStats {
    pub early: u32,
    pub late: u32,
}

impl TimingStats {
    fn record(&mut self, signed_offset_ms: f64) {
        if signed_offset_ms < -TENDENCY_THRESHOLD_MS {
            self.early += 1;
        } else if signed_offset_ms > TENDENCY_THRESHOLD_MS {
            self.late += 1;
        }
    }

    pub fn tendency(&self) -> Tendency {
        match self.early.cmp(&self.late) {
            std::cmp::Ordering::Greater => Tendency::Rushing,
            std::cmp::Ordering::Less => Tendency::Dragging,
            std::cmp::Ordering::Equal => Tendency::Steady,
        }
    }
}

/// Score tracker for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreState {
    pub points: f64,
    pub combo: u32,
    pub max_combo: u32,
    /// Weighted accuracy in `[0, 100]`.
    pub accuracy: f64,
    pub consecutive_misses: u32,
    pub speed_ups: u32,
    pub timing: TimingStats,
    pub hits: Vec<HitRecord>,
    counts: [u32; 6],
    weight_sum: f64,
}

impl Default for ScoreState {
    fn default() -> Self {
        Self {
            points: 0.0,
            combo: 0,
            max_combo: 0,
            accuracy: 100.0,
            consecutive_misses: 0,
            speed_ups: 0,
            timing: TimingStats::default(),
            hits: Vec::new(),
            counts: [0; 6],
            weight_sum: 0.0,
        }
    }
}

impl ScoreState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, rating: Rating) -> u32 {
        self.counts[rating.index()]
    }

    /// Number of outcomes judged so far.
    pub fn judged_count(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Result of reducing one outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub state: ScoreState,
    pub points_earned: f64,
    /// Requested budget change in seconds, before clamping.
    pub time_delta: f64,
    /// New tempo when this outcome triggered a speed-up.
    pub speed_up: Option<f64>,
}

/// Tempo multiplier for points: zero below the qualifying tempo.
pub fn tempo_multiplier(bpm: f64, config: &SessionConfig) -> f64 {
    if bpm < config.minimum_qualifying_bpm {
        0.0
    } else {
        bpm / config.scoring.tempo_reference_bpm
    }
}

/// Pure transition `(state, outcome) -> state'` at tempo `bpm`.
///
/// Takes the state by value so the hit history is moved, not copied.
pub fn reduce(state: ScoreState, outcome: &HitOutcome, bpm: f64, config: &SessionConfig) -> Reduction {
    let rules = &config.scoring;
    let rating = outcome.rating;
    let prior_max_combo = state.max_combo;
    let prior_speed_ups = state.speed_ups;
    let mut next = state;

    if rating.continues_combo() {
        next.combo += 1;
        next.consecutive_misses = 0;
    } else {
        next.consecutive_misses += 1;
        if !config.grace_miss || next.consecutive_misses >= 2 {
            next.combo = 0;
        }
    }
    next.max_combo = next.max_combo.max(next.combo);

    let base = rules.base_points.value(rating);
    let points_earned = if base > 0.0 {
        base * (1.0 + next.combo as f64 * rules.combo_bonus_per_hit) * tempo_multiplier(bpm, config)
    } else {
        0.0
    };
    next.points += points_earned;

    let time_delta = if rating == Rating::Miss {
        if prior_max_combo >= rules.penalty_activation_combo {
            -rules.miss_penalty_seconds
        } else {
            0.0
        }
    } else {
        let scale = (1.0 - prior_speed_ups as f64 * rules.time_bonus_decay_per_speed_up)
            .max(rules.time_bonus_floor);
        rules.time_bonus.value(rating) * scale
    };

    let step = config.combo_step_for_speed_up;
    let speed_up = if rating.continues_combo() && step > 0 && next.combo % step == 0 {
        next.speed_ups += 1;
        Some(bpm + config.speed_up_increment_bpm)
    } else {
        None
    };

    next.counts[rating.index()] += 1;
    next.weight_sum += rating.accuracy_weight();
    next.accuracy = (next.weight_sum / next.judged_count() as f64 * 100.0).clamp(0.0, 100.0);

    if outcome.source == OutcomeSource::Tap {
        next.timing.record(outcome.signed_offset_ms);
    }
    next.hits.push(HitRecord {
        rating,
        signed_offset_ms: outcome.signed_offset_ms,
        at_time: outcome.at_time,
        points: points_earned,
    });

    Reduction {
        state: next,
        points_earned,
        time_delta,
        speed_up,
    }
}

/// What changed when the machine applied an outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub points_earned: f64,
    /// Budget change after clamping.
    pub time_applied: f64,
    pub speed_up: Option<f64>,
}

/// Owns the score, the time budget and the current tempo.
#[derive(Debug, Clone)]
pub struct ScoreMachine {
    config: SessionConfig,
    state: ScoreState,
    budget: TimeBudget,
    bpm: f64,
    qualified: bool,
}

impl ScoreMachine {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            state: ScoreState::new(),
            budget: TimeBudget::new(config.initial_time_budget, config.max_time_budget),
            bpm: config.starting_bpm,
            qualified: config.starting_bpm >= config.minimum_qualifying_bpm,
            config: config.clone(),
        }
    }

    pub fn state(&self) -> &ScoreState {
        &self.state
    }

    pub fn budget(&self) -> &TimeBudget {
        &self.budget
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// True once the session has played at a qualifying tempo.
    pub fn qualified(&self) -> bool {
        self.qualified
    }

    pub fn drain(&mut self, elapsed: f64) {
        self.budget.drain(elapsed);
    }

    pub fn is_exhausted(&self) -> bool {
        self.budget.is_exhausted()
    }

    pub fn apply(&mut self, outcome: &HitOutcome) -> Transition {
        let state = std::mem::take(&mut self.state);
        let reduction = reduce(state, outcome, self.bpm, &self.config);
        self.state = reduction.state;
        let time_applied = self.budget.add(reduction.time_delta);
        if let Some(bpm) = reduction.speed_up {
            self.bpm = bpm;
            self.qualified |= bpm >= self.config.minimum_qualifying_bpm;
            tracing::info!(bpm, combo = self.state.combo, "speed up");
        }
        Transition {
            points_earned: reduction.points_earned,
            time_applied,
            speed_up: reduction.speed_up,
        }
    }
}
