//! cli-relay - one conversation interface over several coding-assistant CLIs.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli_relay::command::TurnOptions;
use cli_relay::config::{ConfigLoader, RelayConfig};
use cli_relay::display;
use cli_relay::history::{list_native_sessions, load_native_messages};
use cli_relay::profile::{detect_all, ToolRegistry};
use cli_relay::supervisor::{SessionSupervisor, TurnEvent, TurnRequest};

#[derive(Parser)]
#[command(
    name = "cli-relay",
    about = "One conversation interface over several coding-assistant CLIs",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to ./.cli-relay.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and stream the reply.
    Send {
        /// The message to send.
        message: String,
        /// Tool profile id.
        #[arg(short, long, default_value = "claude-code")]
        tool: String,
        /// Working directory (defaults to the current directory).
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Engine session id (random when omitted).
        #[arg(long)]
        session: Option<String>,
        /// Resume the tool's native session with this id.
        #[arg(short, long)]
        resume: Option<String>,
        /// Continue the tool's most recent conversation.
        #[arg(short = 'c', long = "continue")]
        continue_session: bool,
        /// Model override.
        #[arg(short, long)]
        model: Option<String>,
        /// Request extended thinking.
        #[arg(long)]
        thinking: bool,
        /// Attach an image (repeatable).
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,
        /// Show untruncated ids and tool-call previews.
        #[arg(long)]
        raw: bool,
    },
    /// List registered tools.
    Tools {
        /// Probe whether each tool is installed.
        #[arg(long)]
        detect: bool,
    },
    /// List or print native sessions of a tool.
    History {
        /// Tool profile id.
        #[arg(short, long, default_value = "claude-code")]
        tool: String,
        /// Project directory (defaults to the current directory).
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Print the messages of this session instead of listing.
        #[arg(long)]
        session: Option<String>,
        /// Do not truncate titles.
        #[arg(long)]
        raw: bool,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn resolve_cwd(cwd: Option<PathBuf>) -> PathBuf {
    cwd.or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn exit_code_from(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}

struct SendArgs {
    message: String,
    tool: String,
    cwd: PathBuf,
    session: String,
    options: TurnOptions,
    raw: bool,
}

async fn run_send(config: &RelayConfig, args: SendArgs) -> ExitCode {
    let supervisor = SessionSupervisor::from_config(config);
    let request = TurnRequest::new(&args.session, &args.tool, args.message, &args.cwd)
        .with_options(args.options);

    let mut handle = match supervisor.send(request) {
        Ok(handle) => handle,
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };
    display::print_turn_start(&args.tool, &args.cwd.display().to_string());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                supervisor.cancel(&args.session);
                display::print_cancelled();
                return ExitCode::from(130);
            }
            event = handle.recv() => match event {
                Some(TurnEvent::Text { text }) => display::print_text(&text),
                Some(TurnEvent::Render { .. }) => {}
                Some(TurnEvent::NativeSessionId { session_id }) => {
                    display::print_native_session(&session_id, args.raw);
                }
                Some(TurnEvent::ToolCall { record }) => display::print_tool_call(&record, args.raw),
                Some(TurnEvent::Usage { usage }) => display::print_usage(&usage),
                Some(TurnEvent::Done { exit_code }) => {
                    display::print_turn_end(exit_code);
                    return exit_code_from(exit_code);
                }
                Some(TurnEvent::Error { message }) => {
                    display::print_error(&message);
                    return ExitCode::FAILURE;
                }
                None => {
                    display::print_cancelled();
                    return ExitCode::FAILURE;
                }
            },
        }
    }
}

async fn run_tools(config: &RelayConfig, detect: bool) -> ExitCode {
    let registry = ToolRegistry::from_config(&config.tools);
    let detections = if detect {
        detect_all(registry.iter(), &config.shell).await
    } else {
        Vec::new()
    };
    for profile in registry.iter() {
        let detection = detections.iter().find(|d| d.tool_id == profile.id);
        display::print_tool(profile, detection);
    }
    ExitCode::SUCCESS
}

async fn run_history(tool: &str, cwd: PathBuf, session: Option<String>, raw: bool) -> ExitCode {
    if let Some(session_id) = session {
        let messages = load_native_messages(tool, &cwd, &session_id).await;
        if messages.is_empty() {
            display::print_error(&format!("No messages found for session {session_id}"));
            return ExitCode::FAILURE;
        }
        for message in &messages {
            display::print_native_message(message);
        }
    } else {
        let sessions = list_native_sessions(tool, &cwd).await;
        if sessions.is_empty() {
            println!("No sessions found for {tool} in {}", cwd.display());
        }
        for session in &sessions {
            display::print_native_session_entry(session, raw);
        }
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = cli.config.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Send {
            message,
            tool,
            cwd,
            session,
            resume,
            continue_session,
            model,
            thinking,
            images,
            raw,
        } => {
            let options = TurnOptions {
                is_first: !continue_session,
                native_session_id: resume,
                image_paths: images,
                model,
                thinking,
            };
            let args = SendArgs {
                message,
                tool,
                cwd: resolve_cwd(cwd),
                session: session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                options,
                raw,
            };
            tracing::info!(session = %args.session, tool = %args.tool, "Sending message");
            run_send(&config, args).await
        }
        Commands::Tools { detect } => run_tools(&config, detect).await,
        Commands::History {
            tool,
            cwd,
            session,
            raw,
        } => run_history(&tool, resolve_cwd(cwd), session, raw).await,
    }
}
