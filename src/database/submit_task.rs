use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::play::SessionResult;
use crate::traits::ResultSink;

use super::Leaderboard;

/// Counters for the background writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitStats {
    pub recorded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Background task that writes finished sessions to the leaderboard.
///
/// Gameplay hands results to a [`SubmitSink`] and never waits: the write
/// happens on the worker thread, and failures are only logged.
pub struct SubmitTask {
    tx: Option<Sender<SessionResult>>,
    stats: Arc<Mutex<SubmitStats>>,
    handle: Option<JoinHandle<()>>,
}

impl SubmitTask {
    /// Spawn the worker. The database is opened on the worker thread.
    pub fn start(db_path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel();
        let stats = Arc::new(Mutex::new(SubmitStats::default()));
        let stats_clone = stats.clone();
        let handle = std::thread::spawn(move || {
            Self::run(db_path, rx, stats_clone);
        });
        Self {
            tx: Some(tx),
            stats,
            handle: Some(handle),
        }
    }

    /// A sink feeding this task. Any number may exist.
    pub fn sink(&self) -> SubmitSink {
        SubmitSink {
            tx: self.tx.clone(),
        }
    }

    pub fn stats(&self) -> SubmitStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    /// Close the queue and wait for pending writes. Sinks still alive keep
    /// the worker running until they are dropped.
    pub fn shutdown(mut self) -> SubmitStats {
        self.tx = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("leaderboard writer panicked");
            }
        }
        self.stats()
    }

    fn run(db_path: PathBuf, rx: Receiver<SessionResult>, stats: Arc<Mutex<SubmitStats>>) {
        let db = match Leaderboard::open(&db_path.to_string_lossy()) {
            Ok(db) => db,
            Err(e) => {
                tracing::error!("failed to open leaderboard {}: {e}", db_path.display());
                for result in rx {
                    tracing::warn!(player = %result.player_name, "result dropped: leaderboard unavailable");
                    Self::bump(&stats, |s| s.failed += 1);
                }
                return;
            }
        };

        for result in rx {
            match db.record(&result) {
                Ok(true) => {
                    tracing::info!(player = %result.player_name, score = result.score, "result recorded");
                    Self::bump(&stats, |s| s.recorded += 1);
                }
                Ok(false) => Self::bump(&stats, |s| s.skipped += 1),
                Err(e) => {
                    tracing::error!(player = %result.player_name, "failed to record result: {e}");
                    Self::bump(&stats, |s| s.failed += 1);
                }
            }
        }
        tracing::debug!("leaderboard writer finished");
    }

    fn bump(stats: &Mutex<SubmitStats>, f: impl FnOnce(&mut SubmitStats)) {
        if let Ok(mut s) = stats.lock() {
            f(&mut s);
        }
    }
}

/// Fire-and-forget handle onto a [`SubmitTask`].
#[derive(Clone)]
pub struct SubmitSink {
    tx: Option<Sender<SessionResult>>,
}

impl ResultSink for SubmitSink {
    fn submit(&mut self, result: &SessionResult) {
        let sent = self
            .tx
            .as_ref()
            .is_some_and(|tx| tx.send(result.clone()).is_ok());
        if !sent {
            tracing::warn!(player = %result.player_name, "leaderboard writer gone; result dropped");
        }
    }
}
