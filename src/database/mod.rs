// Leaderboard persistence using rusqlite.

mod leaderboard;
mod submit_task;

pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use submit_task::{SubmitSink, SubmitStats, SubmitTask};
