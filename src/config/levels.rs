use super::SessionConfig;

/// A built-in practice level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub id: u32,
    pub name: &'static str,
    pub bpm: f64,
    pub time_signature: u32,
    pub description: &'static str,
    /// Starting time budget in seconds.
    pub duration_seconds: f64,
}

pub static LEVELS: [Level; 5] = [
    Level {
        id: 1,
        name: "Quadruple Pulse",
        bpm: 60.0,
        time_signature: 4,
        description: "Four beats per measure. The fundamentals.",
        duration_seconds: 20.0,
    },
    Level {
        id: 2,
        name: "Basic Waltz (3/4)",
        bpm: 80.0,
        time_signature: 3,
        description: "Feel the triple swing. Three beats per measure.",
        duration_seconds: 20.0,
    },
    Level {
        id: 3,
        name: "Steady March",
        bpm: 100.0,
        time_signature: 4,
        description: "Consistency and precision at medium speed.",
        duration_seconds: 20.0,
    },
    Level {
        id: 4,
        name: "Quick Waltz",
        bpm: 120.0,
        time_signature: 3,
        description: "Agility in triple meter.",
        duration_seconds: 20.0,
    },
    Level {
        id: 5,
        name: "Metronome Challenge",
        bpm: 140.0,
        time_signature: 4,
        description: "Concert tempo. Stay calm.",
        duration_seconds: 20.0,
    },
];

impl Level {
    pub fn by_id(id: u32) -> Option<&'static Level> {
        LEVELS.iter().find(|level| level.id == id)
    }

    /// Session config for this level on top of `base`.
    pub fn session_config(&self, base: &SessionConfig) -> SessionConfig {
        SessionConfig {
            starting_bpm: self.bpm,
            time_signature: self.time_signature,
            initial_time_budget: self.duration_seconds.min(base.max_time_budget),
            ..base.clone()
        }
    }
}
