//! Interactive terminal host for the floatchat widget runtime.
//!
//! Embeds the runtime the way a page embed would: supplies storage
//! backends, renders the widget's view-state, and drives the public
//! control surface (open, close, send, clear, status) from stdin. Durable
//! state lives in `--state-dir`; the conversation is session-scoped and
//! dies with the process, like a browser tab.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use floatchat::{
    ChannelEvent, ChatWidget, JsonFileStorage, MemoryStorage, Role, ScriptContext, StorageArea,
    TransportState, WidgetOptions, WsConnector,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, thiserror::Error)]
enum HostError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Widget(#[from] floatchat::Error),
}

#[derive(Parser, Debug)]
#[command(name = "floatchat-cli", about = "Floating chat widget terminal host")]
struct Cli {
    /// Realtime channel / backend origin.
    #[arg(long, env = "FLOATCHAT_SOCKET_URL")]
    socket_url: Option<String>,

    /// Request/response reply endpoint; takes precedence over the channel.
    #[arg(long, env = "FLOATCHAT_API_URL")]
    api_url: Option<String>,

    /// Bearer credential for the reply endpoint.
    #[arg(long, env = "FLOATCHAT_API_KEY")]
    api_key: Option<String>,

    /// Owner identifier, as explicit embed config would set it.
    #[arg(long, env = "FLOATCHAT_OWNER_ID")]
    owner_id: Option<String>,

    /// Settings API origin.
    #[arg(long, env = "FLOATCHAT_API_BASE")]
    api_base: Option<String>,

    /// Simulated loading-script URL, exercising the `cid` resolution path,
    /// e.g. `https://x.test/script.js?cid=abc123`.
    #[arg(long)]
    script_url: Option<String>,

    /// Directory for durable widget state (identity, pre-chat metadata).
    #[arg(long, default_value = ".floatchat")]
    state_dir: PathBuf,
}

enum Step {
    Line(Option<String>),
    Event(Option<ChannelEvent>),
}

#[tokio::main]
async fn main() -> Result<(), HostError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let options = WidgetOptions {
        owner_id: cli.owner_id,
        api_base: cli.api_base,
        api_url: cli.api_url,
        api_key: cli.api_key,
        socket_url: cli.socket_url,
        ..Default::default()
    };
    let backend = options.backend_url().to_owned();

    let context = ScriptContext {
        page_url: None,
        current_script: cli.script_url.clone(),
        scripts: cli.script_url.into_iter().collect(),
    };

    std::fs::create_dir_all(&cli.state_dir)?;
    let storage = StorageArea::new(
        Box::new(JsonFileStorage::open(cli.state_dir.join("durable.json"))),
        Box::new(MemoryStorage::new()),
    );

    let mut widget = ChatWidget::new(options, &context, storage);
    widget.activate(Arc::new(WsConnector::new(backend))).await?;
    widget.open();

    print_help();
    print_gate_hint(&widget);

    let mut rendered = render_messages(&widget, 0);
    let mut was_typing = false;
    let mut last_unread = 0;
    let mut channel_alive = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let step = tokio::select! {
            line = lines.next_line() => Step::Line(line?),
            event = widget.next_event(), if channel_alive => Step::Event(event),
        };

        match step {
            Step::Line(None) => break,
            Step::Line(Some(line)) => {
                if !handle_line(&mut widget, line.trim()).await {
                    break;
                }
            }
            Step::Event(None) => channel_alive = false,
            Step::Event(Some(event)) => {
                if let ChannelEvent::Connected = event {
                    println!("(connected)");
                }
            }
        }

        rendered = render_messages(&widget, rendered);
        render_indicators(&widget, &mut was_typing, &mut last_unread);
    }

    Ok(())
}

/// Dispatch one input line. Returns `false` to quit.
async fn handle_line(widget: &mut ChatWidget, line: &str) -> bool {
    match line {
        "" => {}
        "/quit" => return false,
        "/open" => {
            widget.open();
            print_gate_hint(widget);
        }
        "/close" => widget.close(),
        "/toggle" => widget.toggle(),
        "/clear" => {
            widget.clear();
            println!("(conversation cleared)");
        }
        "/status" => print_status(widget),
        "/help" => print_help(),
        _ if line.starts_with("/start") => submit_gate(widget, line).await,
        _ if line.starts_with('/') => println!("(unknown command: {line})"),
        text => widget.send(text).await,
    }
    true
}

/// Parse `/start name=.. email=.. phone=..` and submit the pre-chat gate.
async fn submit_gate(widget: &mut ChatWidget, line: &str) {
    let mut name = None;
    let mut email = None;
    let mut phone = None;
    for pair in line.split_whitespace().skip(1) {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "name" => name = Some(value),
            "email" => email = Some(value),
            "phone" => phone = Some(value),
            _ => {}
        }
    }

    match widget.submit_metadata(name, email, phone).await {
        Ok(()) => println!("(thanks, say hello)"),
        Err(error) => println!("({error})"),
    }
}

/// Print messages appended since the last render; returns the new total.
fn render_messages(widget: &ChatWidget, from: usize) -> usize {
    let messages = widget.messages();
    for message in &messages[from.min(messages.len())..] {
        let label = match message.role {
            Role::User => "you",
            Role::Bot => "bot",
        };
        println!("[{label}] {}", message.text);
    }
    messages.len()
}

fn render_indicators(widget: &ChatWidget, was_typing: &mut bool, last_unread: &mut u32) {
    let view = widget.view();
    if view.typing && !*was_typing {
        println!("[bot is typing...]");
    }
    *was_typing = view.typing;

    if view.unread > *last_unread {
        println!("({} unread)", view.unread);
    }
    *last_unread = view.unread;
}

fn print_status(widget: &ChatWidget) {
    let status = widget.status();
    let connection = match status.connection {
        TransportState::Uninitialized => "uninitialized",
        TransportState::LoadingChannel => "loading channel",
        TransportState::Connecting => "connecting",
        TransportState::Connected => "connected",
        TransportState::Disconnected => "disconnected",
    };
    println!(
        "owner: {}  origin: {}  channel: {}  panel: {}",
        status.owner_id.as_deref().unwrap_or("-"),
        if status.api_origin.is_empty() { "(same origin)" } else { status.api_origin.as_str() },
        connection,
        if status.open { "open" } else { "closed" },
    );
}

fn print_gate_hint(widget: &ChatWidget) {
    if widget.view().gate.visible {
        println!("(before we start: /start name=.. email=.. phone=..)");
    }
}

fn print_help() {
    println!("commands: /open /close /toggle /clear /status /start /help /quit");
    println!("anything else is sent as a message");
}
