//! Drives one turn: pumps process output through decoding and pacing.

use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::command::BuiltCommand;
use crate::config::ThrottleConfig;
use crate::decode::{MarkerFilter, NormalizedEvent, OutputGrammar};
use crate::stream::{LineReassembler, ToolCallReassembler, Utf8Decoder};

use super::{exit_code, OutputThrottle, Pace, RunState, SessionRegistry, TurnEvent, TurnProcess};

/// Capacity of the raw chunk channel between pipe readers and the run loop.
pub const CHUNK_CHANNEL_BUFFER: usize = 64;

/// How long output may keep arriving after the process exited.
///
/// Background children can inherit the pipes and hold them open; once no
/// chunk arrived for this long after exit, reading stops.
pub const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(500);

const READ_BUFFER_SIZE: usize = 8192;

/// Which pipe a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

#[derive(Debug)]
struct Chunk {
    source: OutputSource,
    bytes: Vec<u8>,
}

async fn pump<R>(mut reader: R, source: OutputSource, tx: mpsc::Sender<Chunk>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = Chunk {
                    source,
                    bytes: buf[..n].to_vec(),
                };
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(?source, error = %e, "Pipe read failed");
                break;
            }
        }
    }
}

/// Runtime state of one run's output: line buffers, decoders, the
/// native session id latch, in-flight tool calls and the throttle.
///
/// Complete assistant messages are relayed only while no text fragment has
/// been seen in the run; once the tool streams deltas they are repeats.
///
/// Pure with respect to I/O; every input returns the events it produced.
#[derive(Debug)]
pub struct TurnOutput {
    grammar: OutputGrammar,
    stdout_lines: LineReassembler,
    stderr_lines: LineReassembler,
    stdout_text: Utf8Decoder,
    stderr_text: Utf8Decoder,
    marker: MarkerFilter,
    native_session_id: Option<String>,
    streamed_text: bool,
    tool_calls: ToolCallReassembler,
    throttle: OutputThrottle,
}

impl TurnOutput {
    #[must_use]
    pub fn new(grammar: OutputGrammar, throttle: ThrottleConfig) -> Self {
        Self {
            grammar,
            stdout_lines: LineReassembler::new(),
            stderr_lines: LineReassembler::new(),
            stdout_text: Utf8Decoder::new(),
            stderr_text: Utf8Decoder::new(),
            marker: MarkerFilter::thinking(),
            native_session_id: None,
            streamed_text: false,
            tool_calls: ToolCallReassembler::new(),
            throttle: OutputThrottle::new(throttle),
        }
    }

    /// Feed a raw chunk received at `now`.
    pub fn on_chunk(&mut self, source: OutputSource, bytes: &[u8], now: Instant) -> Vec<TurnEvent> {
        let mut events = Vec::new();

        if self.grammar.is_structured() {
            match source {
                OutputSource::Stdout => {
                    for line in self.stdout_lines.push(bytes) {
                        match self.grammar.decode_line(&line) {
                            Some(event) => self.dispatch(event, now, &mut events),
                            None => tracing::trace!(line = %line, "Line produced no event"),
                        }
                    }
                }
                OutputSource::Stderr => {
                    for line in self.stderr_lines.push(bytes) {
                        tracing::debug!(line = %line, "stderr");
                    }
                }
            }
        } else {
            let text = match source {
                OutputSource::Stdout => {
                    let raw = self.stdout_text.push(bytes);
                    self.marker.push(&raw)
                }
                OutputSource::Stderr => self.stderr_text.push(bytes),
            };
            self.on_text(text, now, &mut events);
        }

        events
    }

    fn dispatch(&mut self, event: NormalizedEvent, now: Instant, events: &mut Vec<TurnEvent>) {
        match event {
            NormalizedEvent::TextFragment(text) => {
                self.streamed_text = true;
                self.on_text(text, now, events);
            }
            NormalizedEvent::MessageText(text) => {
                if self.streamed_text {
                    tracing::trace!(chars = text.len(), "Message already streamed as fragments");
                } else {
                    self.on_text(text, now, events);
                }
            }
            NormalizedEvent::NativeSessionId(session_id) => {
                if let Some(latched) = &self.native_session_id {
                    tracing::debug!(latched = %latched, ignored = %session_id, "Native session id already latched");
                } else {
                    tracing::info!(native_session = %session_id, "Native session id");
                    self.native_session_id = Some(session_id.clone());
                    events.push(TurnEvent::NativeSessionId { session_id });
                }
            }
            NormalizedEvent::Usage(usage) => events.push(TurnEvent::Usage { usage }),
            tool_event => {
                if let Some(record) = self.tool_calls.apply(&tool_event) {
                    events.push(TurnEvent::ToolCall { record });
                }
            }
        }
    }

    fn on_text(&mut self, text: String, now: Instant, events: &mut Vec<TurnEvent>) {
        if text.is_empty() {
            return;
        }
        let pace = self.throttle.push(&text, now);
        events.push(TurnEvent::Text { text });
        if let Pace::RenderNow { next_check } = pace {
            tracing::trace!(?next_check, chars = self.throttle.len(), "Render");
            events.push(self.render(false));
        }
    }

    fn render(&self, is_final: bool) -> TurnEvent {
        TurnEvent::Render {
            text: self.throttle.text().to_string(),
            is_final,
        }
    }

    /// Deadline of the pending throttle timer.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }

    /// The throttle timer fired.
    pub fn on_timer(&mut self) -> Option<TurnEvent> {
        self.throttle.timer_fired().then(|| self.render(false))
    }

    /// End of output: release text held by the marker filter and drop
    /// everything still incomplete.
    pub fn finish(&mut self, now: Instant) -> Vec<TurnEvent> {
        let mut events = Vec::new();
        if !self.grammar.is_structured() {
            let tail = self.marker.flush();
            self.on_text(tail, now, &mut events);
        }
        self.discard();
        events
    }

    /// The final render over the complete text. Disarms the timer.
    pub fn final_render(&mut self) -> TurnEvent {
        TurnEvent::Render {
            text: self.throttle.finalize(),
            is_final: true,
        }
    }

    /// Drop buffered partial lines and in-flight tool calls.
    pub fn discard(&mut self) {
        let dropped = self.stdout_lines.discard() + self.stderr_lines.discard();
        if dropped > 0 {
            tracing::debug!(bytes = dropped, "Discarding unterminated output");
        }
        let in_flight = self.tool_calls.in_flight();
        if in_flight > 0 {
            tracing::debug!(in_flight, "Discarding unfinished tool calls");
        }
        self.tool_calls.clear();
    }

    /// Latched native session id.
    #[must_use]
    pub fn native_session_id(&self) -> Option<&str> {
        self.native_session_id.as_deref()
    }
}

/// Sends events unless the run has been cancelled.
struct EventSink {
    tx: UnboundedSender<TurnEvent>,
    cancel: CancellationToken,
}

impl EventSink {
    fn emit(&self, event: TurnEvent) {
        if self.cancel.is_cancelled() {
            tracing::trace!(?event, "Suppressed event of cancelled run");
            return;
        }
        if self.tx.send(event).is_err() {
            tracing::trace!("Turn consumer dropped");
        }
    }

    fn emit_all(&self, events: impl IntoIterator<Item = TurnEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Everything one run task needs.
#[derive(Debug)]
pub(crate) struct TurnRun {
    pub session_id: String,
    pub generation: u64,
    pub grammar: OutputGrammar,
    pub throttle: ThrottleConfig,
    pub built: BuiltCommand,
    pub registry: Arc<SessionRegistry>,
    pub cancel: CancellationToken,
    pub events: UnboundedSender<TurnEvent>,
}

impl TurnRun {
    /// Run until the process exits or the run is cancelled.
    pub(crate) async fn run(self, mut process: TurnProcess) {
        let sink = EventSink {
            tx: self.events.clone(),
            cancel: self.cancel.clone(),
        };

        let (tx, mut rx) = mpsc::channel(CHUNK_CHANNEL_BUFFER);
        if let Some(stdout) = process.take_stdout() {
            tokio::spawn(pump(stdout, OutputSource::Stdout, tx.clone()));
        }
        if let Some(stderr) = process.take_stderr() {
            tokio::spawn(pump(stderr, OutputSource::Stderr, tx.clone()));
        }
        drop(tx);

        let mut output = TurnOutput::new(self.grammar, self.throttle.clone());
        let mut status: Option<io::Result<ExitStatus>> = None;
        let mut streams_open = true;
        let mut drain_deadline: Option<Instant> = None;

        let cancelled = loop {
            if status.is_some() && !streams_open {
                break false;
            }
            let timer = output.deadline();

            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break true,

                chunk = rx.recv(), if streams_open => match chunk {
                    Some(chunk) => {
                        sink.emit_all(output.on_chunk(chunk.source, &chunk.bytes, Instant::now()));
                        if status.is_some() {
                            drain_deadline = Some(Instant::now() + EXIT_DRAIN_GRACE);
                        }
                    }
                    None => streams_open = false,
                },

                () = sleep_until(timer.unwrap_or_else(Instant::now)), if timer.is_some() => {
                    if let Some(event) = output.on_timer() {
                        sink.emit(event);
                    }
                }

                result = process.wait(), if status.is_none() => {
                    self.registry.detach_pid(&self.session_id, self.generation);
                    status = Some(result);
                    drain_deadline = Some(Instant::now() + EXIT_DRAIN_GRACE);
                }

                () = sleep_until(drain_deadline.unwrap_or_else(Instant::now)),
                    if streams_open && drain_deadline.is_some() =>
                {
                    tracing::debug!(session = %self.session_id, "Output still open after exit");
                    streams_open = false;
                }
            }
        };

        if cancelled {
            process.kill();
            output.discard();
            self.built.remove_temp_file();
            if let Err(e) = process.wait().await {
                tracing::debug!(error = %e, "Failed to reap cancelled process");
            }
            tracing::info!(
                session = %self.session_id,
                generation = self.generation,
                "Turn cancelled"
            );
            return;
        }

        let code = match status {
            Some(Ok(status)) => exit_code(status),
            Some(Err(e)) => {
                tracing::warn!(session = %self.session_id, error = %e, "Failed to wait for process");
                -1
            }
            None => -1,
        };
        let tail = output.finish(Instant::now());
        self.built.remove_temp_file();

        if self
            .registry
            .finish(&self.session_id, self.generation, RunState::Exited)
        {
            tracing::info!(
                session = %self.session_id,
                generation = self.generation,
                exit_code = code,
                "Turn finished"
            );
            sink.emit_all(tail);
            sink.emit(output.final_render());
            sink.emit(TurnEvent::Done { exit_code: code });
        }
    }
}
