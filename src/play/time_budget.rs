/// Countdown that ends the session when it reaches zero.
///
/// The value is clamped to `[0, max]` after every mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBudget {
    remaining: f64,
    max: f64,
}

impl TimeBudget {
    pub fn new(initial: f64, max: f64) -> Self {
        let max = max.max(0.0);
        Self {
            remaining: initial.clamp(0.0, max),
            max,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Subtract elapsed clock time. Negative `elapsed` is ignored.
    pub fn drain(&mut self, elapsed: f64) {
        if elapsed > 0.0 {
            self.apply(-elapsed);
        }
    }

    /// Add (or with a negative delta, remove) seconds.
    /// Returns the change actually applied after clamping.
    pub fn add(&mut self, delta: f64) -> f64 {
        self.apply(delta)
    }

    fn apply(&mut self, delta: f64) -> f64 {
        let before = self.remaining;
        self.remaining = (self.remaining + delta).clamp(0.0, self.max);
        self.remaining - before
    }
}
