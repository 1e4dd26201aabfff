use crate::config::SessionConfig;
use crate::traits::AudioClock;

use super::BeatLedger;

/// Scheduler lifecycle. `Stopped` is terminal for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// A beat committed to the clock during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledBeat {
    /// Position in the ledger (0-based).
    pub ordinal: usize,
    pub time: f64,
    /// First beat of a measure.
    pub accent: bool,
}

/// Look-ahead metronome scheduler.
///
/// Every tick commits each beat falling inside `[now, now + lookahead)` to
/// both the clock's playback queue and the ledger, then advances by one
/// inter-beat interval at the tempo current at that moment.
#[derive(Debug, Clone)]
pub struct BeatScheduler {
    state: SchedulerState,
    bpm: f64,
    time_signature: u32,
    lookahead: f64,
    display_epsilon: f64,
    next_beat_time: f64,
    active_beat: Option<u32>,
}

impl BeatScheduler {
    pub fn new(time_signature: u32, lookahead: f64, display_epsilon: f64) -> Self {
        Self {
            state: SchedulerState::Idle,
            bpm: 0.0,
            time_signature: time_signature.max(1),
            lookahead,
            display_epsilon,
            next_beat_time: 0.0,
            active_beat: None,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.time_signature,
            config.lookahead_seconds,
            config.display_epsilon_seconds,
        )
    }

    /// Begin a run: the first beat lands `start_delay` seconds after `now`.
    pub fn start(&mut self, now: f64, initial_bpm: f64, start_delay: f64, ledger: &mut BeatLedger) {
        ledger.clear();
        self.bpm = initial_bpm;
        self.next_beat_time = now + start_delay;
        self.active_beat = None;
        self.state = SchedulerState::Running;
        tracing::debug!(bpm = initial_bpm, first_beat = self.next_beat_time, "scheduler started");
    }

    pub fn stop(&mut self) {
        self.state = SchedulerState::Stopped;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Change the tempo. Only beats computed after this call use it.
    pub fn set_bpm(&mut self, bpm: f64) {
        if bpm > 0.0 {
            self.bpm = bpm;
        }
    }

    /// Seconds between beats at the current tempo.
    pub fn interval(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Time of the next beat not yet committed.
    pub fn next_beat_time(&self) -> f64 {
        self.next_beat_time
    }

    /// Beat-in-measure the display should highlight.
    pub fn active_beat(&self) -> Option<u32> {
        self.active_beat
    }

    /// Commit every beat inside the look-ahead horizon.
    pub fn tick<C: AudioClock>(
        &mut self,
        clock: &mut C,
        ledger: &mut BeatLedger,
    ) -> Vec<ScheduledBeat> {
        if self.state != SchedulerState::Running {
            return Vec::new();
        }
        let now = clock.now();
        let mut scheduled = Vec::new();

        while self.next_beat_time < now + self.lookahead {
            let time = self.next_beat_time;
            let ordinal = ledger.len();
            let accent = ordinal % self.time_signature as usize == 0;
            if ledger.push(time).is_none() {
                break;
            }
            clock.play_beat(time, accent);
            tracing::trace!(ordinal, time, accent, "beat scheduled");
            scheduled.push(ScheduledBeat {
                ordinal,
                time,
                accent,
            });
            self.next_beat_time += self.interval();
        }

        self.update_active_beat(now, ledger);
        scheduled
    }

    fn update_active_beat(&mut self, now: f64, ledger: &BeatLedger) {
        if let Some(index) = ledger.first_after(now - self.display_epsilon) {
            self.active_beat = Some((index % self.time_signature as usize) as u32);
        }
    }
}
