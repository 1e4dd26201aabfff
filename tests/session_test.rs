use ritmo::config::SessionConfig;
use ritmo::play::{OutcomeSource, Rating, SessionController, SessionEvent, SessionPhase};
use ritmo::traits::{AudioClock, MockClock, RecordingSink};
use ritmo::util::EngineError;

const LATENCY: f64 = 0.040;

fn started(config: SessionConfig) -> SessionController<MockClock> {
    let mut session = SessionController::new(MockClock::new(), config);
    session.start().unwrap();
    session
}

fn tick_at(session: &mut SessionController<MockClock>, t: f64) -> Vec<SessionEvent> {
    session.clock().set_time(t);
    session.tick().unwrap()
}

fn tap_at(session: &mut SessionController<MockClock>, t: f64) -> Vec<SessionEvent> {
    session.clock().set_time(t);
    session.tap().unwrap()
}

fn judged(events: &[SessionEvent]) -> Vec<ritmo::play::HitOutcome> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Judged(outcome) => Some(*outcome),
            _ => None,
        })
        .collect()
}

/// Schedule the next beat and hit it dead on. Returns the tap's events.
fn hit_next_beat(session: &mut SessionController<MockClock>) -> Vec<SessionEvent> {
    let next = session.ledger().len();
    let mut t = session.clock().now();
    while session.ledger().len() == next {
        t += 0.05;
        tick_at(session, t);
    }
    let beat = session.ledger().get(next).unwrap().time;
    tap_at(session, beat + LATENCY)
}

#[test]
fn test_tap_on_beat_is_perfect() {
    let config = SessionConfig {
        minimum_qualifying_bpm: 60.0,
        ..SessionConfig::with_tempo(60.0, 4)
    };
    let mut session = started(config);
    tick_at(&mut session, 0.4);
    assert_eq!(session.ledger().len(), 1);

    let events = tap_at(&mut session, 0.5 + LATENCY);
    let outcomes = judged(&events);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].rating, Rating::Perfect);
    assert!(outcomes[0].signed_offset_ms.abs() < 1e-6);
    assert_eq!(session.score().combo, 1);
    assert!(session.score().points > 0.0);
    assert!(session.ledger().get(0).unwrap().consumed);
}

#[test]
fn test_late_tap_then_sweep_emits_miss() {
    let mut session = started(SessionConfig::with_tempo(60.0, 4));
    tick_at(&mut session, 0.4);
    assert_eq!(session.ledger().len(), 1);

    // 700 ms after the only beat: too far to match.
    let events = tap_at(&mut session, 1.2);
    let outcomes = judged(&events);
    assert_eq!(outcomes[0].source, OutcomeSource::ExtraTap);
    assert!(!session.ledger().get(0).unwrap().consumed);

    let events = tick_at(&mut session, 1.2);
    let outcomes = judged(&events);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].rating, Rating::Miss);
    assert_eq!(outcomes[0].source, OutcomeSource::Timeout);
    assert_eq!(outcomes[0].source_beat_time, Some(0.5));
    assert_eq!(session.score().combo, 0);

    // Swept once only.
    assert!(judged(&tick_at(&mut session, 1.25)).is_empty());
}

#[test]
fn test_late_tap_rating_does_not_depend_on_tick_phase() {
    // Raw tap 620 ms after the beat is 580 ms after it once compensated.
    for tick_before_tap in [false, true] {
        let mut session = started(SessionConfig::with_tempo(60.0, 4));
        tick_at(&mut session, 0.4);
        assert_eq!(session.ledger().len(), 1);

        if tick_before_tap {
            let events = tick_at(&mut session, 1.11);
            assert!(judged(&events).is_empty());
        }
        let events = tap_at(&mut session, 1.12);
        let outcomes = judged(&events);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].rating, Rating::Late);
        assert_eq!(outcomes[0].source, OutcomeSource::Tap);
        assert_eq!(outcomes[0].source_beat_time, Some(0.5));

        // Consumed by the tap, so the sweep has nothing left to claim.
        assert!(judged(&tick_at(&mut session, 1.3)).is_empty());
        assert_eq!(session.score().count(Rating::Miss), 0);
    }
}

#[test]
fn test_unhit_beat_resets_combo() {
    let mut session = started(SessionConfig::with_tempo(60.0, 4));
    hit_next_beat(&mut session);
    hit_next_beat(&mut session);
    assert_eq!(session.score().combo, 2);

    // Beat at 2.5 is left alone.
    let events = tick_at(&mut session, 3.2);
    assert!(judged(&events).iter().any(|o| o.rating == Rating::Miss));
    assert_eq!(session.score().combo, 0);
    assert_eq!(session.score().max_combo, 2);
}

#[test]
fn test_consumed_beat_is_never_swept() {
    let mut session = started(SessionConfig::with_tempo(60.0, 4));
    hit_next_beat(&mut session);
    let events = tick_at(&mut session, 1.3);
    assert!(judged(&events).is_empty());
    assert_eq!(session.score().count(Rating::Miss), 0);
}

#[test]
fn test_speed_up_changes_following_interval_only() {
    let mut session = started(SessionConfig::with_tempo(100.0, 4));
    for _ in 0..19 {
        hit_next_beat(&mut session);
    }
    assert_eq!(session.score().combo, 19);
    assert_eq!(session.bpm(), 100.0);

    let events = hit_next_beat(&mut session);
    assert!(events.contains(&SessionEvent::SpeedUp { bpm: 110.0 }));
    assert_eq!(session.score().combo, 20);
    assert_eq!(session.bpm(), 110.0);

    // The beat after the 20th was computed at the old tempo.
    let twentieth = session.ledger().get(19).unwrap().time;
    hit_next_beat(&mut session);
    let twenty_first = session.ledger().get(20).unwrap().time;
    assert!((twenty_first - twentieth - 0.6).abs() < 1e-9);

    hit_next_beat(&mut session);
    let twenty_second = session.ledger().get(21).unwrap().time;
    assert!((twenty_second - twenty_first - 60.0 / 110.0).abs() < 1e-9);
}

#[test]
fn test_practice_tempo_scores_nothing() {
    let sink = RecordingSink::new();
    let mut session = SessionController::new(MockClock::new(), SessionConfig::with_tempo(60.0, 4))
        .with_sink(Box::new(sink.clone()));
    session.start().unwrap();
    for _ in 0..5 {
        hit_next_beat(&mut session);
    }
    assert_eq!(session.score().combo, 5);

    let result = session.stop().unwrap();
    assert_eq!(result.score, 0.0);
    assert!(result.practice);
    assert!(sink.results().is_empty());
}

#[test]
fn test_session_ends_exactly_when_budget_runs_out() {
    let config = SessionConfig {
        initial_time_budget: 3.0,
        ..SessionConfig::with_tempo(80.0, 4)
    };
    let mut session = started(config);
    let mut t = 0.0;
    while session.phase() == SessionPhase::Playing {
        assert!(session.time_left() > 0.0);
        t += 0.025;
        tick_at(&mut session, t);
        assert!(session.time_left() >= 0.0);
    }
    assert_eq!(session.time_left(), 0.0);
    assert!(t > 2.99 && t < 3.05);
    assert!(session.ledger().is_empty());
    assert_eq!(session.tick(), Err(EngineError::SessionNotRunning));
}

#[test]
fn test_miss_penalty_after_first_speed_up_can_end_session() {
    let sink = RecordingSink::new();
    let mut config = SessionConfig::with_tempo(100.0, 4);
    config.player_name = "Ana".to_string();
    config.scoring.miss_penalty_seconds = 60.0;
    let mut session = SessionController::new(MockClock::new(), config)
        .with_sink(Box::new(sink.clone()));
    session.start().unwrap();

    // Before any speed-up a stray tap costs nothing.
    let before = session.time_left();
    let events = tap_at(&mut session, 0.1);
    assert_eq!(judged(&events)[0].source, OutcomeSource::ExtraTap);
    assert_eq!(session.time_left(), before);

    for _ in 0..20 {
        hit_next_beat(&mut session);
    }
    assert_eq!(session.score().max_combo, 20);

    let now = session.clock().now();
    let events = tap_at(&mut session, now + 0.3);
    assert!(matches!(events.last(), Some(SessionEvent::Finished(_))));
    assert_eq!(session.phase(), SessionPhase::Results);

    let results = sink.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].player_name, "Ana");
    assert_eq!(results[0].max_combo, 20);
    assert_eq!(results[0].bpm, 110.0);
}

#[test]
fn test_debounced_tap_has_no_effect() {
    let mut session = started(SessionConfig::with_tempo(100.0, 4));
    hit_next_beat(&mut session);
    let now = session.clock().now();
    let events = tap_at(&mut session, now + 0.05);
    assert!(events.is_empty());
    assert_eq!(session.score().judged_count(), 1);
}

#[test]
fn test_calls_before_init_leave_state_untouched() {
    let mut session = SessionController::new(MockClock::new(), SessionConfig::default());
    assert_eq!(session.tap(), Err(EngineError::ClockNotInitialized));
    assert_eq!(session.tick(), Err(EngineError::ClockNotInitialized));
    assert_eq!(session.stop(), Err(EngineError::ClockNotInitialized));
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(session.ledger().is_empty());
    assert_eq!(session.score().judged_count(), 0);
    assert!(session.clock().played().is_empty());
}

#[test]
fn test_every_ledger_beat_reaches_the_clock() {
    let mut session = started(SessionConfig::with_tempo(120.0, 3));
    tick_at(&mut session, 5.0);
    let played = session.clock().played();
    assert_eq!(played.len(), session.ledger().len());
    for (click, beat) in played.iter().zip(session.ledger().entries()) {
        assert_eq!(click.time, beat.time);
    }
    let accents: Vec<bool> = played.iter().map(|c| c.accent).collect();
    assert_eq!(accents[..4], [true, false, false, true]);
}
