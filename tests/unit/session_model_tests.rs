use std::time::Duration;

use agent_duet::models::session::{Session, SessionPhase, TimeBudget};

fn session_in(phase: SessionPhase) -> Session {
    let mut session = Session::new("topic".into(), 180);
    session.phase = phase;
    session
}

#[test]
fn new_session_is_idle_without_room() {
    let session = Session::new("enterprise software sales".into(), 180);
    assert_eq!(session.phase, SessionPhase::Idle);
    assert!(session.room_url.is_none());
    assert!(!session.id.is_empty());
    assert_eq!(
        session.time_budget(),
        TimeBudget::Bounded(Duration::from_secs(180))
    );
}

#[test]
fn zero_and_negative_durations_are_unbounded() {
    assert_eq!(TimeBudget::from_seconds(0), TimeBudget::Unbounded);
    assert_eq!(TimeBudget::from_seconds(-5), TimeBudget::Unbounded);
    assert_eq!(
        TimeBudget::from_seconds(1),
        TimeBudget::Bounded(Duration::from_secs(1))
    );
}

#[test]
fn happy_path_transitions_are_allowed() {
    let mut session = Session::new("topic".into(), 10);
    for next in [
        SessionPhase::Provisioning,
        SessionPhase::Launching,
        SessionPhase::Running,
        SessionPhase::ShuttingDown,
        SessionPhase::Stopped,
    ] {
        session.advance(next).expect("transition allowed");
    }
    assert_eq!(session.phase, SessionPhase::Stopped);
}

#[test]
fn idle_can_stop_directly_on_config_error() {
    assert!(session_in(SessionPhase::Idle).can_transition_to(SessionPhase::Stopped));
}

#[test]
fn shutdown_reachable_from_every_active_phase() {
    for phase in [
        SessionPhase::Provisioning,
        SessionPhase::Launching,
        SessionPhase::Running,
    ] {
        assert!(session_in(phase).can_transition_to(SessionPhase::ShuttingDown));
    }
    assert!(!session_in(SessionPhase::Idle).can_transition_to(SessionPhase::ShuttingDown));
}

#[test]
fn running_cannot_skip_shutdown() {
    assert!(!session_in(SessionPhase::Running).can_transition_to(SessionPhase::Stopped));
}

#[test]
fn stopped_is_terminal() {
    let mut session = session_in(SessionPhase::Stopped);
    for next in [
        SessionPhase::Idle,
        SessionPhase::Provisioning,
        SessionPhase::Running,
        SessionPhase::ShuttingDown,
    ] {
        assert!(session.advance(next).is_err());
    }
    assert_eq!(session.phase, SessionPhase::Stopped);
}

#[test]
fn cannot_launch_before_provisioning() {
    let mut session = session_in(SessionPhase::Idle);
    let err = session
        .advance(SessionPhase::Launching)
        .expect_err("illegal transition");
    assert!(err.to_string().contains("illegal session transition"));
}
