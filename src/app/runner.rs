use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::play::{SessionController, SessionEvent, SessionPhase, SessionResult};
use crate::traits::{AudioClock, TapSource};

/// Drives a session: ticks on a fixed cadence and forwards taps in between.
///
/// Ticks and taps are handled on the calling thread one after another, so
/// the session never sees them overlap. Waiting for input is the only
/// suspension point.
pub struct SessionRunner<T: TapSource> {
    taps: T,
    interval: Duration,
}

impl<T: TapSource> SessionRunner<T> {
    pub fn new(taps: T, interval: Duration) -> Self {
        Self { taps, interval }
    }

    /// Start `session` and run it to the results phase.
    ///
    /// `observer` sees every non-empty batch of events and may touch the
    /// session between steps (drain clicks, read views). When the tap source
    /// closes the session is stopped as if the player quit.
    pub fn run<C, F>(&mut self, session: &mut SessionController<C>, mut observer: F) -> Result<SessionResult>
    where
        C: AudioClock,
        F: FnMut(&mut SessionController<C>, &[SessionEvent]),
    {
        session.start()?;
        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "runner started");

        loop {
            let events = session.tick()?;
            observer(session, &events);
            if session.phase() == SessionPhase::Results {
                break;
            }

            if self.taps.is_closed() {
                tracing::info!("input closed; stopping session");
                let result = session.stop()?;
                observer(session, &[SessionEvent::Finished(result)]);
                break;
            }

            if self.taps.wait_tap(self.interval).is_some() {
                let events = session.tap()?;
                if !events.is_empty() {
                    observer(session, &events);
                }
                if session.phase() == SessionPhase::Results {
                    break;
                }
            }
        }

        session
            .result()
            .cloned()
            .ok_or_else(|| anyhow!("session ended without a result"))
    }
}
