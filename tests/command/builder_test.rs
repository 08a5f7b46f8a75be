//! Command building against the built-in and custom profiles.

use std::process::Command;

use cli_relay::command::{shell_escape, CommandBuilder, TurnOptions};
use cli_relay::profile::{ArgGroups, ToolProfile, ToolRegistry};
use serde_json::Value;

fn builtin(id: &str) -> ToolProfile {
    ToolRegistry::builtin().lookup(id).unwrap().clone()
}

fn sh(command: &str) -> String {
    let output = Command::new("/bin/sh").arg("-c").arg(command).output().unwrap();
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn claude_first_turn() {
    let profile = builtin("claude-code");
    let built = CommandBuilder::new(&profile)
        .build("hello", &TurnOptions::new())
        .unwrap();
    assert_eq!(
        built.command,
        "claude -p 'hello' --dangerously-skip-permissions --output-format stream-json --verbose"
    );
    assert!(built.temp_file.is_none());
}

#[test]
fn claude_follow_up_turn_continues() {
    let profile = builtin("claude-code");
    let built = CommandBuilder::new(&profile)
        .build("next", &TurnOptions::new().follow_up())
        .unwrap();
    assert!(built.command.ends_with("--verbose -c"));
}

#[test]
fn resume_after_message_replaces_continue() {
    let profile = ToolProfile::new("t", "T", "tool").with_args(ArgGroups {
        continue_session: vec!["-c".into()],
        resume: vec!["--resume".into()],
        ..ArgGroups::default()
    });
    let options = TurnOptions::new().follow_up().resume("S1");
    let built = CommandBuilder::new(&profile).build("msg", &options).unwrap();
    assert!(built.command.ends_with("--resume S1"));
    assert!(!built.command.split(' ').any(|part| part == "-c"));
}

#[test]
fn resume_before_message_precedes_escaped_message() {
    let profile = builtin("codex");
    let options = TurnOptions::new().follow_up().resume("S1");
    let built = CommandBuilder::new(&profile).build("fix it", &options).unwrap();
    assert_eq!(
        built.command,
        "codex exec resume S1 'fix it' --full-auto --skip-git-repo-check --json"
    );
}

#[test]
fn resume_before_message_never_continues() {
    let profile = builtin("codex");
    let built = CommandBuilder::new(&profile)
        .build("again", &TurnOptions::new().follow_up())
        .unwrap();
    assert_eq!(
        built.command,
        "codex exec 'again' --full-auto --skip-git-repo-check --json"
    );
}

#[test]
fn gemini_model_override_and_resume() {
    let profile = builtin("gemini-cli");
    let options = TurnOptions::new().model("gemini-2.5-pro").resume("abc");
    let built = CommandBuilder::new(&profile).build("hi", &options).unwrap();
    assert_eq!(
        built.command,
        "gemini 'hi' -y -m gemini-2.5-pro -o stream-json -r abc"
    );
}

#[test]
fn codex_images_are_passed_by_path_and_missing_ones_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("screen.png");
    std::fs::write(&image, b"png").unwrap();
    let missing = dir.path().join("gone.png");

    let profile = builtin("codex");
    let options = TurnOptions::new().image(&image).image(&missing);
    let built = CommandBuilder::new(&profile).build("see", &options).unwrap();

    let expected_arg = format!("-i {}", shell_escape(&image.to_string_lossy()));
    assert!(built.command.ends_with(&format!("--json {expected_arg}")));
    assert!(!built.command.contains("gone.png"));
    assert!(built.temp_file.is_none());
}

#[test]
fn claude_images_use_structured_input_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("diagram.jpg");
    std::fs::write(&image, [0xFF, 0xD8, 0xFF]).unwrap();

    let profile = builtin("claude-code");
    let options = TurnOptions::new()
        .image(&image)
        .image(dir.path().join("missing.png"))
        .model("sonnet")
        .resume("S1");
    let built = CommandBuilder::new(&profile)
        .temp_dir(dir.path())
        .build("what's this?", &options)
        .unwrap();

    let temp_file = built.temp_file.clone().unwrap();
    assert!(temp_file.starts_with(dir.path()));
    assert_eq!(
        built.command,
        format!(
            "cat {} | claude --print --dangerously-skip-permissions --input-format stream-json \
             --model sonnet --output-format stream-json --verbose --resume S1",
            shell_escape(&temp_file.to_string_lossy())
        )
    );

    let document = std::fs::read_to_string(&temp_file).unwrap();
    assert_eq!(document.trim_end().lines().count(), 1);
    let document: Value = serde_json::from_str(&document).unwrap();
    assert_eq!(document["type"], "user");
    let content = document["message"]["content"].as_array().unwrap();
    assert_eq!(content.len(), 2);
    assert_eq!(content[0]["type"], "image");
    assert_eq!(content[0]["source"]["media_type"], "image/jpeg");
    assert_eq!(content[1]["text"], "what's this?");

    built.remove_temp_file();
    assert!(!temp_file.exists());
    built.remove_temp_file();
}

#[test]
fn shell_escape_round_trip() {
    let original = "it's a test";
    assert_eq!(sh(&format!("printf %s {}", shell_escape(original))), original);
}

#[test]
fn built_command_delivers_message_verbatim() {
    let profile = ToolProfile::new("printf", "Printf", "printf %s");
    let message = "don't `rm` $HOME; echo \"pwned\" | cat\n<thinking>";
    let built = CommandBuilder::new(&profile)
        .build(message, &TurnOptions::new())
        .unwrap();
    assert_eq!(sh(&built.command), message);
}
