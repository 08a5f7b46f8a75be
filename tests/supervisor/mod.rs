//! Session supervisor tests.

mod engine_test;

/// Verify the public supervisor types are exported from the library.
#[test]
fn test_all_supervisor_types_exported() {
    use cli_relay::supervisor::{
        EngineError, OutputThrottle, RunState, SessionRegistry, SessionSupervisor, SpawnError,
        TurnEvent, TurnOutput, TurnRequest,
    };

    let _ = SessionRegistry::new();
    let _ = OutputThrottle::new(cli_relay::config::ThrottleConfig::default());
    let _ = TurnOutput::new(
        cli_relay::decode::OutputGrammar::Plain,
        cli_relay::config::ThrottleConfig::default(),
    );
    let _ = SessionSupervisor::from_config(&cli_relay::config::RelayConfig::default());
    let _ = TurnRequest::new("s", "claude-code", "hi", "/");
    let _: fn() -> EngineError = || EngineError::UnknownTool("x".into());
    let _: fn(std::io::Error) -> SpawnError = SpawnError::from_io;
    assert_eq!(RunState::default(), RunState::Idle);
    assert!(TurnEvent::Done { exit_code: 0 }.is_terminal());
}
