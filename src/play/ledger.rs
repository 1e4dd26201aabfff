/// A scheduled beat the player is expected to hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    /// Clock time the beat sounds, in seconds.
    pub time: f64,
    /// Set exactly once, by a matching tap or by the miss sweep.
    pub consumed: bool,
}

/// Append-only, time-sorted record of every beat scheduled this session.
#[derive(Debug, Clone, Default)]
pub struct BeatLedger {
    entries: Vec<BeatEvent>,
    /// Every entry before this index is consumed.
    open_from: usize,
}

impl BeatLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry. Only valid between sessions.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.open_from = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BeatEvent] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&BeatEvent> {
        self.entries.get(index)
    }

    /// Append a beat. Returns its ordinal, or `None` if `time` is not
    /// strictly after the last entry.
    pub fn push(&mut self, time: f64) -> Option<usize> {
        if self.entries.last().is_some_and(|last| time <= last.time) {
            tracing::warn!(time, "rejected out-of-order beat");
            return None;
        }
        self.entries.push(BeatEvent {
            time,
            consumed: false,
        });
        Some(self.entries.len() - 1)
    }

    /// Mark an entry consumed. Returns false if it already was (or doesn't exist).
    pub fn consume(&mut self, index: usize) -> bool {
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };
        if entry.consumed {
            return false;
        }
        entry.consumed = true;
        self.advance_open_from();
        true
    }

    /// The most recent `limit` unconsumed entries, newest first.
    pub fn open_tail(&self, limit: usize) -> impl Iterator<Item = (usize, &BeatEvent)> {
        self.entries[self.open_from..]
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, e)| !e.consumed)
            .take(limit)
            .map(move |(i, e)| (self.open_from + i, e))
    }

    /// Consume every open entry with `time + window < now`, oldest first.
    /// Returns the indices consumed by this call.
    pub fn expire(&mut self, now: f64, window: f64) -> Vec<usize> {
        let mut expired = Vec::new();
        for index in self.open_from..self.entries.len() {
            let entry = &mut self.entries[index];
            if now <= entry.time + window {
                // Sorted: nothing later can be older.
                break;
            }
            if !entry.consumed {
                entry.consumed = true;
                expired.push(index);
            }
        }
        self.advance_open_from();
        expired
    }

    /// Index of the earliest entry strictly later than `time`.
    pub fn first_after(&self, time: f64) -> Option<usize> {
        let index = self.entries.partition_point(|e| e.time <= time);
        (index < self.entries.len()).then_some(index)
    }

    /// Number of entries not yet consumed.
    pub fn open_count(&self) -> usize {
        self.entries[self.open_from..]
            .iter()
            .filter(|e| !e.consumed)
            .count()
    }

    fn advance_open_from(&mut self) {
        while self
            .entries
            .get(self.open_from)
            .is_some_and(|e| e.consumed)
        {
            self.open_from += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(times: &[f64]) -> BeatLedger {
        let mut ledger = BeatLedger::new();
        for &t in times {
            ledger.push(t).unwrap();
        }
        ledger
    }

    #[test]
    fn push_returns_ordinals() {
        let mut ledger = BeatLedger::new();
        assert_eq!(ledger.push(0.5), Some(0));
        assert_eq!(ledger.push(1.0), Some(1));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn push_rejects_out_of_order_and_duplicates() {
        let mut ledger = ledger_with(&[1.0]);
        assert_eq!(ledger.push(1.0), None);
        assert_eq!(ledger.push(0.5), None);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn consume_is_one_shot() {
        let mut ledger = ledger_with(&[0.5, 1.0]);
        assert!(ledger.consume(0));
        assert!(!ledger.consume(0));
        assert!(!ledger.consume(7));
        assert!(ledger.get(0).unwrap().consumed);
        assert_eq!(ledger.open_count(), 1);
    }

    #[test]
    fn open_tail_skips_consumed_and_is_newest_first() {
        let mut ledger = ledger_with(&[0.5, 1.0, 1.5, 2.0]);
        ledger.consume(2);
        let tail: Vec<usize> = ledger.open_tail(2).map(|(i, _)| i).collect();
        assert_eq!(tail, vec![3, 1]);
    }

    #[test]
    fn expire_only_touches_old_open_entries() {
        let mut ledger = ledger_with(&[0.5, 1.0, 1.5]);
        ledger.consume(0);
        let expired = ledger.expire(1.7, 0.6);
        assert_eq!(expired, vec![1]);
        assert!(!ledger.get(2).unwrap().consumed);
        // Second pass emits nothing new.
        assert!(ledger.expire(1.7, 0.6).is_empty());
    }

    #[test]
    fn expire_boundary_is_exclusive() {
        let mut ledger = ledger_with(&[1.0]);
        assert!(ledger.expire(1.5, 0.5).is_empty());
        assert_eq!(ledger.expire(1.5001, 0.5), vec![0]);
    }

    #[test]
    fn first_after_finds_next_entry() {
        let ledger = ledger_with(&[0.5, 1.0, 1.5]);
        assert_eq!(ledger.first_after(0.0), Some(0));
        assert_eq!(ledger.first_after(0.5), Some(1));
        assert_eq!(ledger.first_after(1.5), None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut ledger = ledger_with(&[0.5, 1.0]);
        ledger.consume(0);
        ledger.clear();
        assert!(ledger.is_empty());
        assert_eq!(ledger.push(0.1), Some(0));
        assert_eq!(ledger.open_count(), 1);
    }
}
