pub mod judge;
pub mod ledger;
pub mod play_result;
pub mod scheduler;
pub mod score;
pub mod session;
pub mod time_budget;

pub use judge::{HitJudge, HitOutcome, MissSweeper, OutcomeSource, Rating};
pub use ledger::{BeatEvent, BeatLedger};
pub use play_result::{ANONYMOUS, SessionResult};
pub use scheduler::{BeatScheduler, ScheduledBeat, SchedulerState};
pub use score::{
    HitRecord, Reduction, ScoreMachine, ScoreState, Tendency, TimingStats, Transition, reduce,
};
pub use session::{SessionController, SessionEvent, SessionPhase, SessionView};
pub use time_budget::TimeBudget;
