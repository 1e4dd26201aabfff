mod app_config;
mod levels;
mod session_config;

pub use app_config::{AppConfig, CONFIG_FILE};
pub use levels::{LEVELS, Level};
pub use session_config::{
    PointValues, RatingTable, RatingThresholds, ScoringRules, SessionConfig, TimeBonusValues,
};
