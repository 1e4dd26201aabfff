use serde::{Deserialize, Serialize};

use super::score::{ScoreState, Tendency};

/// Name stored when the player left theirs blank.
pub const ANONYMOUS: &str = "Anonymous";

/// Terminal snapshot of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub player_name: String,
    pub score: f64,
    pub accuracy: f64,
    pub max_combo: u32,
    /// Tempo at the end of the session.
    pub bpm: f64,
    pub starting_bpm: f64,
    pub survival_seconds: f64,
    pub speed_ups: u32,
    /// The session never reached a qualifying tempo.
    pub practice: bool,
    pub tendency: Tendency,
    pub early_count: u32,
    pub late_count: u32,
}

impl SessionResult {
    pub fn from_score(
        player_name: &str,
        score: &ScoreState,
        bpm: f64,
        starting_bpm: f64,
        survival_seconds: f64,
        practice: bool,
    ) -> Self {
        let trimmed = player_name.trim();
        Self {
            player_name: if trimmed.is_empty() {
                ANONYMOUS.to_string()
            } else {
                trimmed.to_string()
            },
            score: score.points,
            accuracy: score.accuracy.round(),
            max_combo: score.max_combo,
            bpm,
            starting_bpm,
            survival_seconds: survival_seconds.max(0.0),
            speed_ups: score.speed_ups,
            practice,
            tendency: score.timing.tendency(),
            early_count: score.timing.early,
            late_count: score.timing.late,
        }
    }

    /// Only results with points reach the leaderboard.
    pub fn is_ranked(&self) -> bool {
        self.score > 0.0
    }
}
