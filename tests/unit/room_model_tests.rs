use agent_duet::models::agent::{AgentRole, AgentState};
use agent_duet::models::room::AccessToken;

#[test]
fn token_debug_is_redacted() {
    let token = AccessToken::new("secret-value");
    let debug = format!("{token:?}");
    assert!(!debug.contains("secret-value"));
    assert!(debug.contains("redacted"));
}

#[test]
fn token_exposes_raw_value() {
    assert_eq!(AccessToken::new("abc").expose(), "abc");
}

#[test]
fn token_serializes_transparently() {
    let json = serde_json::to_string(&AccessToken::new("abc")).unwrap();
    assert_eq!(json, "\"abc\"");
}

#[test]
fn role_display_names() {
    assert_eq!(AgentRole::FirstAgent.to_string(), "first_agent");
    assert_eq!(AgentRole::SecondAgent.to_string(), "second_agent");
}

#[test]
fn only_exited_is_not_live() {
    assert!(AgentState::Spawned.is_live());
    assert!(AgentState::Running.is_live());
    assert!(AgentState::Terminating.is_live());
    assert!(!AgentState::Exited.is_live());
}
