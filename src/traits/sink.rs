use std::sync::{Arc, Mutex};

use crate::play::SessionResult;

/// Destination for finished sessions (leaderboard, file, ...).
/// Implementations: SubmitTask (background SQLite writer), RecordingSink (testing).
///
/// `submit` must not block on I/O and must not report failure back to the
/// caller: gameplay never waits on persistence.
pub trait ResultSink {
    fn submit(&mut self, result: &SessionResult);
}

/// Sink that keeps every submitted result in memory.
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    results: Arc<Mutex<Vec<SessionResult>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything submitted so far.
    pub fn results(&self) -> Vec<SessionResult> {
        self.results
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl ResultSink for RecordingSink {
    fn submit(&mut self, result: &SessionResult) {
        if let Ok(mut results) = self.results.lock() {
            results.push(result.clone());
        }
    }
}
