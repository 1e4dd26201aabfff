use crate::config::SessionConfig;
use crate::traits::{AudioClock, ResultSink};
use crate::util::error::EngineError;

use super::judge::{HitJudge, HitOutcome, MissSweeper, OutcomeSource, Rating};
use super::play_result::SessionResult;
use super::scheduler::{BeatScheduler, ScheduledBeat};
use super::score::{ScoreMachine, ScoreState};
use super::BeatLedger;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Playing,
    Results,
}

/// Notifications produced by `tick`, `tap` and `stop`, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    BeatScheduled(ScheduledBeat),
    Judged(HitOutcome),
    SpeedUp { bpm: f64 },
    /// Budget change actually applied, in seconds. Negative for penalties.
    TimeAdded { seconds: f64 },
    Finished(SessionResult),
}

/// Plain snapshot for a presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub combo: u32,
    pub max_combo: u32,
    pub points: f64,
    /// Remaining budget rounded to whole seconds.
    pub seconds_left: u32,
    pub bpm: f64,
    pub active_beat: Option<u32>,
    pub last_rating: Option<Rating>,
    pub last_offset_ms: Option<f64>,
    pub accuracy: f64,
}

/// Owns one session: wires scheduler, judge and sweeper into the score machine.
///
/// Single-threaded. The host calls [`tick`](Self::tick) on a fixed cadence and
/// [`tap`](Self::tap) whenever input arrives; the two never overlap.
pub struct SessionController<C: AudioClock> {
    clock: C,
    config: SessionConfig,
    phase: SessionPhase,
    ledger: BeatLedger,
    scheduler: BeatScheduler,
    judge: HitJudge,
    sweeper: MissSweeper,
    machine: ScoreMachine,
    sink: Option<Box<dyn ResultSink>>,
    started_at: f64,
    last_tick: f64,
    last_outcome: Option<HitOutcome>,
    last_view: Option<SessionView>,
    result: Option<SessionResult>,
}

impl<C: AudioClock> SessionController<C> {
    pub fn new(clock: C, config: SessionConfig) -> Self {
        Self {
            clock,
            phase: SessionPhase::Idle,
            ledger: BeatLedger::new(),
            scheduler: BeatScheduler::from_config(&config),
            judge: HitJudge::from_config(&config),
            sweeper: MissSweeper::from_config(&config),
            machine: ScoreMachine::new(&config),
            sink: None,
            started_at: 0.0,
            last_tick: 0.0,
            last_outcome: None,
            last_view: None,
            result: None,
            config,
        }
    }

    /// Attach the persistence collaborator that receives ranked results.
    pub fn with_sink(mut self, sink: Box<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn ledger(&self) -> &BeatLedger {
        &self.ledger
    }

    pub fn score(&self) -> &ScoreState {
        self.machine.state()
    }

    pub fn time_left(&self) -> f64 {
        self.machine.budget().remaining()
    }

    pub fn bpm(&self) -> f64 {
        self.machine.bpm()
    }

    /// Snapshot of the last finished session, if any.
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    /// Begin a session. Initializes the clock on first use.
    ///
    /// Allowed from `Idle` and from `Results`; everything from a previous
    /// session is discarded.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.phase == SessionPhase::Playing {
            tracing::warn!("start ignored: session already running");
            return Err(EngineError::AlreadyRunning);
        }
        self.config.validate()?;
        self.clock.init();
        if !self.clock.is_initialized() {
            tracing::warn!("start rejected: clock not initialized");
            return Err(EngineError::ClockNotInitialized);
        }

        let now = self.clock.now();
        self.machine = ScoreMachine::new(&self.config);
        self.judge = HitJudge::from_config(&self.config);
        self.sweeper = MissSweeper::from_config(&self.config);
        self.scheduler = BeatScheduler::from_config(&self.config);
        self.scheduler.start(
            now,
            self.config.starting_bpm,
            self.config.start_delay_seconds,
            &mut self.ledger,
        );
        self.started_at = now;
        self.last_tick = now;
        self.last_outcome = None;
        self.last_view = None;
        self.result = None;
        self.phase = SessionPhase::Playing;

        tracing::info!(
            bpm = self.config.starting_bpm,
            time_signature = self.config.time_signature,
            budget = self.machine.budget().remaining(),
            "session started"
        );
        Ok(())
    }

    /// One scheduler step: drain the budget, schedule beats, sweep misses.
    pub fn tick(&mut self) -> Result<Vec<SessionEvent>, EngineError> {
        self.ensure_playing()?;
        let now = self.clock.now();
        let elapsed = now - self.last_tick;
        self.last_tick = now;
        self.machine.drain(elapsed);

        let mut events = Vec::new();
        if self.machine.is_exhausted() {
            events.push(SessionEvent::Finished(self.finish(now)));
            return Ok(events);
        }

        events.extend(
            self.scheduler
                .tick(&mut self.clock, &mut self.ledger)
                .into_iter()
                .map(SessionEvent::BeatScheduled),
        );

        for outcome in self.sweeper.sweep(now, &mut self.ledger) {
            self.apply_outcome(outcome, &mut events);
            if self.machine.is_exhausted() {
                break;
            }
        }

        if self.machine.is_exhausted() {
            events.push(SessionEvent::Finished(self.finish(now)));
        }
        Ok(events)
    }

    /// Judge a tap at the current clock time. Debounced taps yield no events.
    pub fn tap(&mut self) -> Result<Vec<SessionEvent>, EngineError> {
        self.ensure_playing()?;
        let now = self.clock.now();
        let mut events = Vec::new();
        let Some(outcome) = self.judge.judge_tap(now, &mut self.ledger) else {
            return Ok(events);
        };
        self.apply_outcome(outcome, &mut events);
        if self.machine.is_exhausted() {
            events.push(SessionEvent::Finished(self.finish(now)));
        }
        Ok(events)
    }

    /// End the session early. The result is handled like budget exhaustion.
    pub fn stop(&mut self) -> Result<SessionResult, EngineError> {
        self.ensure_playing()?;
        let now = self.clock.now();
        tracing::info!("session stopped by player");
        Ok(self.finish(now))
    }

    pub fn view(&self) -> SessionView {
        let score = self.machine.state();
        SessionView {
            phase: self.phase,
            combo: score.combo,
            max_combo: score.max_combo,
            points: score.points,
            seconds_left: self.machine.budget().remaining().round() as u32,
            bpm: self.machine.bpm(),
            active_beat: self.scheduler.active_beat(),
            last_rating: self.last_outcome.map(|o| o.rating),
            last_offset_ms: self
                .last_outcome
                .filter(|o| o.source == OutcomeSource::Tap)
                .map(|o| o.signed_offset_ms),
            accuracy: score.accuracy,
        }
    }

    /// The current view, only if it differs from the last one returned here.
    pub fn view_if_changed(&mut self) -> Option<SessionView> {
        let view = self.view();
        if self.last_view == Some(view) {
            return None;
        }
        self.last_view = Some(view);
        Some(view)
    }

    fn ensure_playing(&self) -> Result<(), EngineError> {
        if !self.clock.is_initialized() {
            tracing::debug!("call rejected: clock not initialized");
            return Err(EngineError::ClockNotInitialized);
        }
        if self.phase != SessionPhase::Playing {
            tracing::debug!(phase = ?self.phase, "call rejected: session not running");
            return Err(EngineError::SessionNotRunning);
        }
        Ok(())
    }

    fn apply_outcome(&mut self, outcome: HitOutcome, events: &mut Vec<SessionEvent>) {
        let transition = self.machine.apply(&outcome);
        self.last_outcome = Some(outcome);
        events.push(SessionEvent::Judged(outcome));
        if transition.time_applied != 0.0 {
            events.push(SessionEvent::TimeAdded {
                seconds: transition.time_applied,
            });
        }
        if let Some(bpm) = transition.speed_up {
            self.scheduler.set_bpm(bpm);
            events.push(SessionEvent::SpeedUp { bpm });
        }
    }

    fn finish(&mut self, now: f64) -> SessionResult {
        self.scheduler.stop();
        self.ledger.clear();
        self.phase = SessionPhase::Results;

        let result = SessionResult::from_score(
            &self.config.player_name,
            self.machine.state(),
            self.machine.bpm(),
            self.config.starting_bpm,
            now - self.started_at,
            !self.machine.qualified(),
        );
        tracing::info!(
            score = result.score,
            accuracy = result.accuracy,
            max_combo = result.max_combo,
            survival = result.survival_seconds,
            "session finished"
        );

        if result.is_ranked() {
            if let Some(sink) = self.sink.as_mut() {
                sink.submit(&result);
            }
        } else {
            tracing::debug!("result has no points; not submitted");
        }
        self.result = Some(result.clone());
        result
    }
}
