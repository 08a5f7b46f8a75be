//! Recorded tool transcripts fed through line reassembly, decoding and
//! tool-call reassembly under different chunkings.

use cli_relay::decode::{NormalizedEvent, OutputGrammar, UsageReport};
use cli_relay::stream::{LineReassembler, ToolCallRecord, ToolCallReassembler};

const CLAUDE_TRANSCRIPT: &str = concat!(
    r#"{"type":"system","subtype":"init","session_id":"sess-1","tools":["Bash","Edit"]}"#,
    "\n",
    r#"{"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Let me look."}},"session_id":"sess-1"}"#,
    "\n\n",
    r#"{"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"toolu_1","name":"Bash","input":{}}}"#,
    "\n",
    r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"command\": \"cargo"}}"#,
    "\n",
    r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":" test\"}"}}"#,
    "\n",
    r#"{"type":"content_block_stop","index":1}"#,
    "\n",
    r#"{"type":"content_block_stop","index":5}"#,
    "\n",
    r#"{"type":"result","subtype":"success","session_id":"sess-1","usage":{"input_tokens":12,"output_tokens":34,"cache_creation_input_tokens":5,"cache_read_input_tokens":6}}"#,
    "\n",
);

#[derive(Debug, PartialEq)]
enum Surfaced {
    Event(NormalizedEvent),
    Tool(ToolCallRecord),
}

fn run(grammar: OutputGrammar, chunks: &[&[u8]]) -> Vec<Surfaced> {
    let mut lines = LineReassembler::new();
    let mut tools = ToolCallReassembler::new();
    let mut out = Vec::new();
    for chunk in chunks {
        for line in lines.push(chunk) {
            let Some(event) = grammar.decode_line(&line) else {
                continue;
            };
            if event.is_tool_call() {
                if let Some(record) = tools.apply(&event) {
                    out.push(Surfaced::Tool(record));
                }
            } else {
                out.push(Surfaced::Event(event));
            }
        }
    }
    out
}

fn expected_claude() -> Vec<Surfaced> {
    vec![
        Surfaced::Event(NormalizedEvent::NativeSessionId("sess-1".into())),
        Surfaced::Event(NormalizedEvent::TextFragment("Let me look.".into())),
        Surfaced::Tool(ToolCallRecord {
            name: "Bash".into(),
            label: "cargo test".into(),
            preview: "cargo test".into(),
        }),
        Surfaced::Event(NormalizedEvent::Usage(UsageReport {
            input_tokens: 12,
            output_tokens: 34,
            cache_creation_input_tokens: 5,
            cache_read_input_tokens: 6,
        })),
    ]
}

#[test]
fn claude_transcript_in_one_chunk() {
    assert_eq!(
        run(OutputGrammar::Claude, &[CLAUDE_TRANSCRIPT.as_bytes()]),
        expected_claude()
    );
}

#[test]
fn claude_transcript_in_small_chunks() {
    for size in [1, 3, 7, 64] {
        let chunks: Vec<&[u8]> = CLAUDE_TRANSCRIPT.as_bytes().chunks(size).collect();
        assert_eq!(
            run(OutputGrammar::Claude, &chunks),
            expected_claude(),
            "chunk size {size}"
        );
    }
}

#[test]
fn gemini_transcript() {
    let transcript = concat!(
        r#"{"type":"init","session_id":"g-1","model":"auto"}"#,
        "\n",
        r#"{"type":"message","role":"user","content":"hi"}"#,
        "\n",
        r#"{"type":"message","role":"assistant","content":"Hello","delta":true}"#,
        "\n",
        "Loaded cached credentials.\n",
        r#"{"type":"result","status":"success","stats":{"input_tokens":3,"output_tokens":4}}"#,
        "\n",
    );
    let events = run(OutputGrammar::Gemini, &[transcript.as_bytes()]);
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        Surfaced::Event(NormalizedEvent::NativeSessionId("g-1".into()))
    );
    assert_eq!(
        events[1],
        Surfaced::Event(NormalizedEvent::TextFragment("Hello".into()))
    );
    let Surfaced::Event(NormalizedEvent::Usage(usage)) = &events[2] else {
        panic!("expected usage, got {:?}", events[2]);
    };
    assert_eq!(usage.total(), 7);
}

#[test]
fn codex_transcript() {
    let transcript = concat!(
        r#"{"type":"thread.started","thread_id":"th-9"}"#,
        "\n",
        r#"{"type":"turn.started"}"#,
        "\n",
        r#"{"type":"message.output_text.delta","delta":"Done"}"#,
        "\n",
        r#"{"type":"turn.completed","usage":{"input_tokens":10,"cached_input_tokens":2,"output_tokens":1}}"#,
        "\n",
    );
    let events = run(OutputGrammar::Codex, &[transcript.as_bytes()]);
    assert_eq!(
        events,
        vec![
            Surfaced::Event(NormalizedEvent::NativeSessionId("th-9".into())),
            Surfaced::Event(NormalizedEvent::TextFragment("Done".into())),
            Surfaced::Event(NormalizedEvent::Usage(UsageReport {
                input_tokens: 10,
                output_tokens: 1,
                cache_creation_input_tokens: 0,
                cache_read_input_tokens: 2,
            })),
        ]
    );
}

#[test]
fn plain_grammar_decodes_nothing() {
    assert!(run(OutputGrammar::Plain, &[CLAUDE_TRANSCRIPT.as_bytes()]).is_empty());
}

#[test]
fn garbage_between_records_is_skipped() {
    let noisy = format!("\u{1b}[0mwarning: something\n{{{{\n{CLAUDE_TRANSCRIPT}[1,2]\nnull\n");
    assert_eq!(
        run(OutputGrammar::Claude, &[noisy.as_bytes()]),
        expected_claude()
    );
}
