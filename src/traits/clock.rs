use std::cell::Cell;
use std::collections::VecDeque;
use std::time::Instant;

/// Abstraction over the audio clock the metronome runs on.
/// Implementations: SystemClock (production), MockClock (testing).
///
/// Time is in seconds from an arbitrary epoch fixed at `init()`.
pub trait AudioClock {
    /// Prepare the clock for use. Idempotent.
    fn init(&mut self);

    /// Whether `init()` has been called.
    fn is_initialized(&self) -> bool;

    /// Current clock time in seconds. Monotonic.
    fn now(&self) -> f64;

    /// Queue an audible beat at `at_time`. Fire-and-forget.
    fn play_beat(&mut self, at_time: f64, accent: bool);
}

/// A beat click waiting to sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    pub time: f64,
    pub accent: bool,
}

/// Clock backed by `std::time::Instant`.
///
/// Beats are queued in time order; the host drains the ones that are due
/// with [`SystemClock::take_due_clicks`] and renders them however it likes.
pub struct SystemClock {
    start: Option<Instant>,
    pending: VecDeque<Click>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: None,
            pending: VecDeque::new(),
        }
    }

    /// Remove and return every queued click whose time has arrived.
    pub fn take_due_clicks(&mut self) -> Vec<Click> {
        let now = self.now();
        let mut due = Vec::new();
        while self.pending.front().is_some_and(|c| c.time <= now) {
            if let Some(click) = self.pending.pop_front() {
                due.push(click);
            }
        }
        due
    }

    /// Number of clicks queued but not yet sounded.
    pub fn pending_clicks(&self) -> usize {
        self.pending.len()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn init(&mut self) {
        if self.start.is_none() {
            self.start = Some(Instant::now());
            tracing::debug!("system clock initialized");
        }
    }

    fn is_initialized(&self) -> bool {
        self.start.is_some()
    }

    fn now(&self) -> f64 {
        self.start
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn play_beat(&mut self, at_time: f64, accent: bool) {
        if !self.is_initialized() {
            return;
        }
        tracing::trace!(at_time, accent, "beat queued");
        self.pending.push_back(Click {
            time: at_time,
            accent,
        });
    }
}

/// Mock clock for deterministic testing.
///
/// Time only moves when the test says so. Played beats are recorded.
pub struct MockClock {
    current: Cell<f64>,
    initialized: bool,
    played: Vec<Click>,
}

impl MockClock {
    /// A mock clock that still needs `init()`.
    pub fn new() -> Self {
        Self {
            current: Cell::new(0.0),
            initialized: false,
            played: Vec::new(),
        }
    }

    /// A mock clock that is already initialized.
    pub fn started() -> Self {
        let mut clock = Self::new();
        clock.init();
        clock
    }

    pub fn set_time(&self, seconds: f64) {
        self.current.set(seconds);
    }

    pub fn advance(&self, delta_seconds: f64) {
        self.current.set(self.current.get() + delta_seconds);
    }

    /// Every beat handed to `play_beat` so far.
    pub fn played(&self) -> &[Click] {
        &self.played
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for MockClock {
    fn init(&mut self) {
        self.initialized = true;
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn now(&self) -> f64 {
        self.current.get()
    }

    fn play_beat(&mut self, at_time: f64, accent: bool) {
        self.played.push(Click {
            time: at_time,
            accent,
        });
    }
}
