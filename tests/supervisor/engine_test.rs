//! End-to-end runs through real `/bin/sh` subprocesses.

use std::path::Path;
use std::time::Duration;

use cli_relay::command::{BuiltCommand, CommandBuilder, TurnOptions};
use cli_relay::config::{RelayConfig, ShellConfig};
use cli_relay::decode::OutputGrammar;
use cli_relay::profile::{ArgGroups, ToolProfile, ToolRegistry};
use cli_relay::supervisor::{
    EngineError, RunState, SessionSupervisor, TurnEvent, TurnHandle, TurnRequest,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn config() -> RelayConfig {
    RelayConfig {
        shell: ShellConfig::new("/bin/sh", false),
        ..RelayConfig::default()
    }
}

fn engine_with(profiles: Vec<ToolProfile>) -> SessionSupervisor {
    let mut tools = ToolRegistry::empty();
    for profile in profiles {
        tools.register(profile);
    }
    SessionSupervisor::new(tools, &config())
}

fn plain(id: &str) -> ToolProfile {
    ToolProfile::new(id, id, "true")
}

fn structured(grammar: OutputGrammar) -> ToolProfile {
    ToolProfile::new("fake", "Fake", "true").with_grammar(grammar)
}

async fn collect(handle: TurnHandle) -> Vec<TurnEvent> {
    tokio::time::timeout(TIMEOUT, handle.collect())
        .await
        .expect("run did not finish in time")
}

fn text_of(events: &[TurnEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            TurnEvent::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn terminal_count(events: &[TurnEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}

fn run_script(
    engine: &SessionSupervisor,
    session: &str,
    profile: &ToolProfile,
    script: &str,
) -> TurnHandle {
    engine.send_command(session, profile, BuiltCommand::new(script), Path::new("/"))
}

#[tokio::test]
async fn plain_turn_streams_text_then_done() {
    let echo = ToolProfile::new("echo", "Echo", "echo");
    let engine = engine_with(vec![echo]);
    let handle = engine
        .send(TurnRequest::new("s1", "echo", "hello world", "/"))
        .unwrap();

    let events = collect(handle).await;
    assert_eq!(text_of(&events), "hello world\n");
    let n = events.len();
    assert_eq!(events[n - 1], TurnEvent::Done { exit_code: 0 });
    assert_eq!(
        events[n - 2],
        TurnEvent::Render {
            text: "hello world\n".into(),
            is_final: true
        }
    );
    assert_eq!(terminal_count(&events), 1);
    assert_eq!(engine.state("s1"), RunState::Exited);
}

#[tokio::test]
async fn plain_turn_hides_thinking() {
    let profile = plain("p");
    let engine = engine_with(vec![profile.clone()]);
    let handle = run_script(
        &engine,
        "s",
        &profile,
        "printf 'a<think'; sleep 0.05; printf 'ing>secret</thinking>\\nb\\n'",
    );
    let events = collect(handle).await;
    assert_eq!(text_of(&events), "ab\n");
}

#[tokio::test]
async fn stderr_is_relayed_in_plain_mode() {
    let profile = plain("p");
    let engine = engine_with(vec![profile.clone()]);
    let events = collect(run_script(&engine, "s", &profile, "echo oops >&2")).await;
    assert_eq!(text_of(&events), "oops\n");
}

#[tokio::test]
async fn exit_code_is_reported() {
    let profile = plain("p");
    let engine = engine_with(vec![profile.clone()]);
    let events = collect(run_script(&engine, "s", &profile, "echo partial; exit 7")).await;
    assert_eq!(events.last(), Some(&TurnEvent::Done { exit_code: 7 }));
}

#[tokio::test]
async fn structured_turn_latches_session_id() {
    let profile = structured(OutputGrammar::Gemini);
    let engine = engine_with(vec![profile.clone()]);
    let script = r#"printf '%s\n' '{"type":"init","session_id":"A"}' '{"type":"init","session_id":"B"}' '{"type":"message","role":"assistant","content":"hi"}'"#;
    let events = collect(run_script(&engine, "s", &profile, script)).await;

    let ids: Vec<&TurnEvent> = events
        .iter()
        .filter(|e| matches!(e, TurnEvent::NativeSessionId { .. }))
        .collect();
    assert_eq!(
        ids,
        vec![&TurnEvent::NativeSessionId {
            session_id: "A".into()
        }]
    );
    assert_eq!(text_of(&events), "hi");
}

#[tokio::test]
async fn structured_turn_reassembles_split_tool_call() {
    let profile = structured(OutputGrammar::Claude);
    let engine = engine_with(vec![profile.clone()]);
    let script = concat!(
        r#"printf '%s\n' '{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","name":"Edit"}}'; "#,
        r#"printf '%s' '{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"file\":'; "#,
        "sleep 0.05; ",
        r#"printf '%s\n' '"}}' '{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"\"a.txt\"}"}}' '{"type":"content_block_stop","index":0}'"#,
    );
    let events = collect(run_script(&engine, "s", &profile, script)).await;

    let records: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            TurnEvent::ToolCall { record } => Some(record),
            _ => None,
        })
        .collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Edit");
    assert_eq!(records[0].label, "a.txt");
}

#[tokio::test]
async fn unterminated_last_line_is_discarded() {
    let profile = structured(OutputGrammar::Codex);
    let engine = engine_with(vec![profile.clone()]);
    let script = r#"printf '%s' '{"type":"message.output_text.delta","delta":"lost"}'"#;
    let events = collect(run_script(&engine, "s", &profile, script)).await;
    assert_eq!(text_of(&events), "");
    assert_eq!(events.last(), Some(&TurnEvent::Done { exit_code: 0 }));
}

#[tokio::test]
async fn cancel_suppresses_completion() {
    let profile = plain("p");
    let engine = engine_with(vec![profile.clone()]);
    let handle = run_script(&engine, "s", &profile, "sleep 30");
    assert!(engine.is_running("s"));

    assert!(engine.cancel("s"));
    let events = collect(handle).await;
    assert_eq!(terminal_count(&events), 0);
    assert_eq!(engine.state("s"), RunState::Cancelled);
    assert!(!engine.cancel("s"));
}

#[tokio::test]
async fn new_send_supersedes_running_turn() {
    let profile = plain("p");
    let engine = engine_with(vec![profile.clone()]);
    let first = run_script(&engine, "s", &profile, "echo first; sleep 30");
    let second = run_script(&engine, "s", &profile, "echo second");
    assert!(second.generation() > first.generation());

    let first_events = collect(first).await;
    let second_events = collect(second).await;
    assert_eq!(terminal_count(&first_events), 0);
    assert_eq!(text_of(&second_events), "second\n");
    assert_eq!(second_events.last(), Some(&TurnEvent::Done { exit_code: 0 }));
    assert_eq!(engine.state("s"), RunState::Exited);
}

#[tokio::test]
async fn sessions_run_independently() {
    let profile = plain("p");
    let engine = engine_with(vec![profile.clone()]);
    let slow = run_script(&engine, "a", &profile, "sleep 30");
    let fast = run_script(&engine, "b", &profile, "sleep 0.1; echo b");
    assert!(engine.cancel("a"));

    let fast_events = collect(fast).await;
    assert_eq!(text_of(&fast_events), "b\n");
    assert_eq!(fast_events.last(), Some(&TurnEvent::Done { exit_code: 0 }));
    assert_eq!(terminal_count(&collect(slow).await), 0);
}

#[tokio::test]
async fn destroy_all_cancels_every_session() {
    let profile = plain("p");
    let engine = engine_with(vec![profile.clone()]);
    let a = run_script(&engine, "a", &profile, "sleep 30");
    let b = run_script(&engine, "b", &profile, "sleep 30");
    assert_eq!(engine.destroy_all(), 2);
    assert_eq!(terminal_count(&collect(a).await), 0);
    assert_eq!(terminal_count(&collect(b).await), 0);
    assert!(!engine.is_running("a"));
    assert!(!engine.is_running("b"));
}

#[tokio::test]
async fn spawn_failure_reports_error_and_stays_idle() {
    let profile = plain("p");
    let engine = engine_with(vec![profile.clone()]);
    let handle = engine.send_command(
        "s",
        &profile,
        BuiltCommand::new("true"),
        Path::new("/nonexistent/cli-relay-cwd"),
    );
    let events = collect(handle).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], TurnEvent::Error { .. }));
    assert_eq!(engine.state("s"), RunState::Idle);
}

#[tokio::test]
async fn spawn_failure_with_dropped_handle_leaves_session_usable() {
    let profile = plain("p");
    let engine = engine_with(vec![profile.clone()]);
    drop(engine.send_command(
        "s",
        &profile,
        BuiltCommand::new("true"),
        Path::new("/nonexistent/cli-relay-cwd"),
    ));
    assert_eq!(engine.state("s"), RunState::Idle);

    let events = collect(run_script(&engine, "s", &profile, "echo again")).await;
    assert_eq!(text_of(&events), "again\n");
    assert_eq!(events.last(), Some(&TurnEvent::Done { exit_code: 0 }));
}

#[tokio::test]
async fn unknown_tool_is_rejected() {
    let engine = engine_with(Vec::new());
    let err = engine
        .send(TurnRequest::new("s", "nope", "hi", "/"))
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownTool(id) if id == "nope"));
    assert_eq!(engine.state("s"), RunState::Idle);
}

#[tokio::test]
async fn structured_input_file_is_removed_after_exit() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("a.png");
    std::fs::write(&image, b"png").unwrap();

    let profile = ToolProfile::new("piped", "Piped", "true")
        .with_args(ArgGroups {
            input_format: vec!["--input-format".into(), "stream-json".into()],
            ..ArgGroups::default()
        })
        .with_grammar(OutputGrammar::Claude);
    let built = CommandBuilder::new(&profile)
        .temp_dir(dir.path())
        .build("look", &TurnOptions::new().image(&image))
        .unwrap();
    let temp_file = built.temp_file.clone().unwrap();
    assert!(temp_file.exists());

    let engine = engine_with(vec![profile.clone()]);
    let events = collect(engine.send_command("s", &profile, built, dir.path())).await;
    assert_eq!(events.last(), Some(&TurnEvent::Done { exit_code: 0 }));
    assert!(!temp_file.exists());
}

#[tokio::test]
async fn renders_never_outnumber_fragments() {
    let profile = plain("p");
    let engine = engine_with(vec![profile.clone()]);
    let script = "for i in 1 2 3 4 5 6 7 8 9 10; do echo line $i; sleep 0.01; done";
    let events = collect(run_script(&engine, "s", &profile, script)).await;

    let texts = events
        .iter()
        .filter(|e| matches!(e, TurnEvent::Text { .. }))
        .count();
    let renders: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            TurnEvent::Render { text, is_final } => Some((text, *is_final)),
            _ => None,
        })
        .collect();
    let intermediate = renders.iter().filter(|(_, f)| !*f).count();
    assert!(intermediate >= 1);
    assert!(intermediate <= texts);
    let (final_text, is_final) = renders.last().unwrap();
    assert!(is_final);
    assert!(final_text.ends_with("line 10\n"));
    assert_eq!(renders.iter().filter(|(_, f)| *f).count(), 1);
}
