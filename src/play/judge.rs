use serde::{Deserialize, Serialize};

use crate::config::{RatingThresholds, SessionConfig};

use super::BeatLedger;

/// Rating tier for a single judged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rating {
    Perfect,
    Good,
    Ok,
    Early,
    Late,
    Miss,
}

impl Rating {
    pub const ALL: [Rating; 6] = [
        Rating::Perfect,
        Rating::Good,
        Rating::Ok,
        Rating::Early,
        Rating::Late,
        Rating::Miss,
    ];

    /// Returns true if this rating continues combo.
    pub fn continues_combo(self) -> bool {
        matches!(self, Self::Perfect | Self::Good | Self::Ok)
    }

    /// Returns the index for this rating (for array indexing).
    pub fn index(self) -> usize {
        match self {
            Self::Perfect => 0,
            Self::Good => 1,
            Self::Ok => 2,
            Self::Early => 3,
            Self::Late => 4,
            Self::Miss => 5,
        }
    }

    /// Contribution to the accuracy average.
    pub fn accuracy_weight(self) -> f64 {
        match self {
            Self::Perfect => 1.0,
            Self::Good => 0.8,
            Self::Ok => 0.5,
            Self::Early | Self::Late | Self::Miss => 0.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Perfect => "PERFECT",
            Self::Good => "GOOD",
            Self::Ok => "OK",
            Self::Early => "EARLY",
            Self::Late => "LATE",
            Self::Miss => "MISS",
        }
    }
}

/// What produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeSource {
    /// A tap matched an open beat.
    Tap,
    /// A tap with no open beat within reach.
    ExtraTap,
    /// A beat passed the miss window unmatched.
    Timeout,
}

/// Result of judging one tap or one expired beat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOutcome {
    pub rating: Rating,
    /// Compensated tap time minus beat time, in ms. Negative is early.
    pub signed_offset_ms: f64,
    /// Nominal time of the beat this outcome consumed, if any.
    pub source_beat_time: Option<f64>,
    pub source: OutcomeSource,
    /// Clock time the outcome was produced.
    pub at_time: f64,
}

impl HitOutcome {
    pub fn is_miss(&self) -> bool {
        self.rating == Rating::Miss
    }
}

/// Matches taps against the ledger and rates them.
#[derive(Debug, Clone)]
pub struct HitJudge {
    thresholds: RatingThresholds,
    match_radius_ms: f64,
    latency_compensation: f64,
    debounce: f64,
    tail_window: usize,
    last_accepted_tap: Option<f64>,
}

impl HitJudge {
    pub fn new(
        thresholds: RatingThresholds,
        match_radius_ms: f64,
        latency_compensation_ms: f64,
        debounce_ms: f64,
        tail_window: usize,
    ) -> Self {
        Self {
            thresholds,
            match_radius_ms,
            latency_compensation: latency_compensation_ms / 1000.0,
            debounce: debounce_ms / 1000.0,
            tail_window: tail_window.max(1),
            last_accepted_tap: None,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.rating_thresholds,
            config.match_radius_ms,
            config.latency_compensation_ms,
            config.debounce_ms,
            config.tail_window,
        )
    }

    /// Rate a signed offset that is already known to be inside the match radius.
    pub fn classify(&self, signed_offset_ms: f64) -> Rating {
        let abs = signed_offset_ms.abs();
        if abs < self.thresholds.perfect_ms {
            Rating::Perfect
        } else if abs < self.thresholds.good_ms {
            Rating::Good
        } else if abs < self.thresholds.ok_ms {
            Rating::Ok
        } else if signed_offset_ms < 0.0 {
            Rating::Early
        } else {
            Rating::Late
        }
    }

    /// Judge a tap read at clock time `raw_now`.
    ///
    /// Returns `None` when the tap is debounced. Otherwise the nearest open
    /// beat among the newest `tail_window` is consumed and rated; with no beat
    /// inside the match radius the tap is an extra tap rated `Miss`.
    pub fn judge_tap(&mut self, raw_now: f64, ledger: &mut BeatLedger) -> Option<HitOutcome> {
        if self
            .last_accepted_tap
            .is_some_and(|last| raw_now - last < self.debounce)
        {
            tracing::trace!(raw_now, "tap debounced");
            return None;
        }
        self.last_accepted_tap = Some(raw_now);

        let compensated = raw_now - self.latency_compensation;
        let radius = self.match_radius_ms / 1000.0;

        let nearest = ledger
            .open_tail(self.tail_window)
            .map(|(index, beat)| (index, beat.time, (compensated - beat.time).abs()))
            .filter(|&(_, _, distance)| distance < radius)
            .min_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)));

        let Some((index, beat_time, _)) = nearest else {
            return Some(HitOutcome {
                rating: Rating::Miss,
                signed_offset_ms: 0.0,
                source_beat_time: None,
                source: OutcomeSource::ExtraTap,
                at_time: raw_now,
            });
        };

        ledger.consume(index);
        let signed_offset_ms = (compensated - beat_time) * 1000.0;
        Some(HitOutcome {
            rating: self.classify(signed_offset_ms),
            signed_offset_ms,
            source_beat_time: Some(beat_time),
            source: OutcomeSource::Tap,
            at_time: raw_now,
        })
    }
}

/// Turns beats that outlived the miss window into `Miss` outcomes.
///
/// Beat age is measured on the same latency-compensated timeline the judge
/// uses, so a beat is never swept while a tap could still match it.
#[derive(Debug, Clone, Copy)]
pub struct MissSweeper {
    window: f64,
    latency_compensation: f64,
}

impl MissSweeper {
    pub fn new(miss_window_ms: f64, latency_compensation_ms: f64) -> Self {
        Self {
            window: miss_window_ms / 1000.0,
            latency_compensation: latency_compensation_ms / 1000.0,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.miss_window_ms, config.latency_compensation_ms)
    }

    pub fn sweep(&self, now: f64, ledger: &mut BeatLedger) -> Vec<HitOutcome> {
        let compensated = now - self.latency_compensation;
        ledger
            .expire(compensated, self.window)
            .into_iter()
            .filter_map(|index| ledger.get(index).map(|beat| beat.time))
            .map(|beat_time| HitOutcome {
                rating: Rating::Miss,
                signed_offset_ms: (compensated - beat_time) * 1000.0,
                source_beat_time: Some(beat_time),
                source: OutcomeSource::Timeout,
                at_time: now,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judge() -> HitJudge {
        // No latency compensation so offsets are easy to read.
        HitJudge::new(RatingThresholds::default(), 600.0, 0.0, 150.0, 10)
    }

    fn ledger_with(times: &[f64]) -> BeatLedger {
        let mut ledger = BeatLedger::new();
        for &t in times {
            ledger.push(t).unwrap();
        }
        ledger
    }

    #[test]
    fn classify_tiers() {
        let judge = judge();
        assert_eq!(judge.classify(0.0), Rating::Perfect);
        assert_eq!(judge.classify(-279.9), Rating::Perfect);
        assert_eq!(judge.classify(280.0), Rating::Good);
        assert_eq!(judge.classify(-379.0), Rating::Good);
        assert_eq!(judge.classify(380.0), Rating::Ok);
        assert_eq!(judge.classify(-520.0), Rating::Early);
        assert_eq!(judge.classify(520.0), Rating::Late);
    }

    #[test]
    fn continues_combo() {
        assert!(Rating::Perfect.continues_combo());
        assert!(Rating::Good.continues_combo());
        assert!(Rating::Ok.continues_combo());
        assert!(!Rating::Early.continues_combo());
        assert!(!Rating::Late.continues_combo());
        assert!(!Rating::Miss.continues_combo());
    }

    #[test]
    fn rating_index_is_unique() {
        for (i, rating) in Rating::ALL.iter().enumerate() {
            assert_eq!(rating.index(), i);
        }
    }

    #[test]
    fn exact_tap_is_perfect_and_consumes_one() {
        let mut judge = judge();
        let mut ledger = ledger_with(&[1.0, 2.0]);
        let outcome = judge.judge_tap(1.0, &mut ledger).unwrap();
        assert_eq!(outcome.rating, Rating::Perfect);
        assert_eq!(outcome.source, OutcomeSource::Tap);
        assert_eq!(outcome.source_beat_time, Some(1.0));
        assert!(ledger.get(0).unwrap().consumed);
        assert!(!ledger.get(1).unwrap().consumed);
    }

    #[test]
    fn latency_compensation_shifts_tap() {
        let mut judge = HitJudge::new(RatingThresholds::default(), 600.0, 40.0, 150.0, 10);
        let mut ledger = ledger_with(&[1.0]);
        let outcome = judge.judge_tap(1.04, &mut ledger).unwrap();
        assert!(outcome.signed_offset_ms.abs() < 1e-6);
    }

    #[test]
    fn picks_nearest_open_beat() {
        let mut judge = judge();
        let mut ledger = ledger_with(&[1.0, 1.5]);
        let outcome = judge.judge_tap(1.4, &mut ledger).unwrap();
        assert_eq!(outcome.source_beat_time, Some(1.5));
        assert!(outcome.signed_offset_ms < 0.0);
        assert!(!ledger.get(0).unwrap().consumed);
    }

    #[test]
    fn equidistant_tap_prefers_older_beat() {
        let mut judge = judge();
        let mut ledger = ledger_with(&[1.0, 2.0]);
        let outcome = judge.judge_tap(1.5, &mut ledger).unwrap();
        assert_eq!(outcome.source_beat_time, Some(1.0));
        // Exactly on the OK boundary, so strict comparison falls through.
        assert_eq!(outcome.rating, Rating::Late);
    }

    #[test]
    fn consumed_beats_are_skipped() {
        let mut judge = judge();
        let mut ledger = ledger_with(&[1.0]);
        ledger.consume(0);
        let outcome = judge.judge_tap(1.0, &mut ledger).unwrap();
        assert_eq!(outcome.source, OutcomeSource::ExtraTap);
        assert_eq!(outcome.rating, Rating::Miss);
    }

    #[test]
    fn far_tap_is_extra_tap_without_consumption() {
        let mut judge = judge();
        let mut ledger = ledger_with(&[1.0]);
        let outcome = judge.judge_tap(2.0, &mut ledger).unwrap();
        assert_eq!(outcome.source, OutcomeSource::ExtraTap);
        assert!(outcome.source_beat_time.is_none());
        assert!(!ledger.get(0).unwrap().consumed);
    }

    #[test]
    fn debounce_drops_rapid_second_tap() {
        let mut judge = judge();
        let mut ledger = ledger_with(&[1.0, 1.1]);
        assert!(judge.judge_tap(1.0, &mut ledger).is_some());
        assert!(judge.judge_tap(1.1, &mut ledger).is_none());
        assert!(!ledger.get(1).unwrap().consumed);
        assert!(judge.judge_tap(1.2, &mut ledger).is_some());
    }

    #[test]
    fn only_tail_window_is_searched() {
        let mut judge = HitJudge::new(RatingThresholds::default(), 600.0, 0.0, 0.0, 2);
        let mut ledger = ledger_with(&[1.0, 5.0, 9.0]);
        // Beat 0 is open but outside the two newest open entries.
        let outcome = judge.judge_tap(1.0, &mut ledger).unwrap();
        assert_eq!(outcome.source, OutcomeSource::ExtraTap);
        assert!(!ledger.get(0).unwrap().consumed);
    }

    #[test]
    fn sweeper_emits_once_per_beat() {
        let sweeper = MissSweeper::new(600.0, 0.0);
        let mut ledger = ledger_with(&[1.0, 2.0]);
        let misses = sweeper.sweep(1.7, &mut ledger);
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].source, OutcomeSource::Timeout);
        assert_eq!(misses[0].source_beat_time, Some(1.0));
        assert!((misses[0].signed_offset_ms - 700.0).abs() < 1e-6);
        assert!(sweeper.sweep(1.7, &mut ledger).is_empty());
    }

    #[test]
    fn sweeper_waits_for_latency_compensation() {
        let sweeper = MissSweeper::new(600.0, 40.0);
        let mut judge = HitJudge::new(RatingThresholds::default(), 600.0, 40.0, 150.0, 10);
        let mut ledger = ledger_with(&[1.0]);
        // Raw 1.63 is 590 ms after the beat once compensated: still matchable.
        assert!(sweeper.sweep(1.63, &mut ledger).is_empty());
        let outcome = judge.judge_tap(1.635, &mut ledger).unwrap();
        assert_eq!(outcome.source, OutcomeSource::Tap);
        assert_eq!(outcome.rating, Rating::Late);
    }

    #[test]
    fn sweeper_ignores_beats_taken_by_judge() {
        let sweeper = MissSweeper::new(600.0, 0.0);
        let mut judge = judge();
        let mut ledger = ledger_with(&[1.0]);
        judge.judge_tap(1.0, &mut ledger).unwrap();
        assert!(sweeper.sweep(5.0, &mut ledger).is_empty());
    }
}
