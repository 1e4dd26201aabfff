use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// A discrete tap. Carries no payload; the session reads the clock at receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapEvent;

/// Abstraction over tap input sources.
/// Implementations: ChannelTaps (threads feeding a channel), ScriptedTaps (testing).
pub trait TapSource {
    /// Wait up to `timeout` for the next tap.
    /// Returns `None` when the timeout elapses without a tap.
    fn wait_tap(&mut self, timeout: Duration) -> Option<TapEvent>;

    /// Whether the source can never produce another tap.
    fn is_closed(&self) -> bool;
}

/// Taps delivered over a channel, e.g. from a stdin reader thread.
pub struct ChannelTaps {
    rx: Receiver<TapEvent>,
    closed: bool,
}

impl ChannelTaps {
    pub fn new(rx: Receiver<TapEvent>) -> Self {
        Self { rx, closed: false }
    }
}

impl TapSource for ChannelTaps {
    fn wait_tap(&mut self, timeout: Duration) -> Option<TapEvent> {
        if self.closed {
            std::thread::sleep(timeout);
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(tap) => Some(tap),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("tap channel closed");
                self.closed = true;
                None
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Pre-recorded tap script for tests. Each call to `wait_tap` pops one slot:
/// `true` means a tap arrives, `false` means the wait times out.
pub struct ScriptedTaps {
    script: VecDeque<bool>,
}

impl ScriptedTaps {
    pub fn new(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl TapSource for ScriptedTaps {
    fn wait_tap(&mut self, _timeout: Duration) -> Option<TapEvent> {
        match self.script.pop_front() {
            Some(true) => Some(TapEvent),
            _ => None,
        }
    }

    fn is_closed(&self) -> bool {
        self.script.is_empty()
    }
}
