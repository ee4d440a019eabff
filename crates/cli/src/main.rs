use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use widget::clipboard::SystemClipboard;
use widget::config::{self, ChatConfig};
use widget::conversation::ConversationEvent;
use widget::message::Sender;
use widget::widget::{ChatWidget, WidgetControl, WidgetOptions};

#[derive(Parser)]
#[command(name = "chatwidget")]
#[command(about = "Chat widget CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: CHATWIDGET_CONFIG_PATH or ~/.chatwidget/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Chat interactively through the configured webhook. Type /help for commands.
    Chat {
        /// Config file path (default: CHATWIDGET_CONFIG_PATH or ~/.chatwidget/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Webhook URL for this session (overrides config and CHATWIDGET_WEBHOOK_URL).
        #[arg(long, value_name = "URL")]
        webhook: Option<String>,
    },

    /// Send a single message and print the agent's answer.
    Send {
        /// Config file path (default: CHATWIDGET_CONFIG_PATH or ~/.chatwidget/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Webhook URL (overrides config and CHATWIDGET_WEBHOOK_URL).
        #[arg(long, value_name = "URL")]
        webhook: Option<String>,

        message: String,
    },

    /// Run a local echo webhook that replies "You said: <message>".
    EchoWebhook {
        /// Port on 127.0.0.1 (default 8787)
        #[arg(long, short, default_value_t = 8787)]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("chatwidget {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config, webhook }) => {
            if let Err(e) = run_chat(config, webhook).await {
                log::error!("chat failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send {
            config,
            webhook,
            message,
        }) => {
            if let Err(e) = run_send(config, webhook, message).await {
                log::error!("send failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::EchoWebhook { port }) => {
            let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
            if let Err(e) = widget::echo::run_echo_webhook(addr).await {
                log::error!("echo webhook failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(config::default_config_path);
    let dir = widget::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

/// Build the widget from config, env, and an optional `--webhook` override.
fn build_widget(config_path: Option<PathBuf>, webhook: Option<String>) -> anyhow::Result<ChatWidget> {
    let (config, path) = config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());
    let mut chat = config::effective_widget_config(&config);
    if let Some(url) = webhook {
        chat.webhook_url = Some(url);
    }
    chat.validate()?;
    Ok(ChatWidget::new(chat, WidgetOptions::from(&config.pacing)))
}

async fn run_send(
    config_path: Option<PathBuf>,
    webhook: Option<String>,
    message: String,
) -> anyhow::Result<()> {
    let widget = build_widget(config_path, webhook)?;
    let Some(pending) = widget.send(&message).await else {
        anyhow::bail!("message is empty");
    };
    pending.await?;
    if let Some(reply) = widget.conversation().messages().await.last() {
        println!("{}", reply.text);
    }
    Ok(())
}

const HELP: &str = "\
commands:
  /clear              clear the conversation
  /transcript         print the transcript
  /copy               copy the transcript to the clipboard
  /download [DIR]     save the transcript (default: current directory)
  /send-transcript    send the transcript to the webhook
  /webhook [URL]      set the webhook URL (no URL: unset)
  /name NAME          set the agent name
  /open, /close       open or close the widget
  /quit               exit";

async fn run_chat(config_path: Option<PathBuf>, webhook: Option<String>) -> anyhow::Result<()> {
    let widget = build_widget(config_path, webhook)?;
    widget.apply(WidgetControl::Open).await;

    let printer = tokio::spawn(print_events(widget.clone(), widget.conversation().subscribe()));

    let agent_name = widget.config().await.agent_name;
    for m in widget.conversation().messages().await {
        println!("< {}: {}", agent_name, m.text);
    }
    println!("(type /help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if handle_line(&widget, &line).await == Flow::Quit {
            break;
        }
    }

    printer.abort();
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Run one REPL line against the widget. Control commands take effect before this returns.
async fn handle_line(widget: &ChatWidget, line: &str) -> Flow {
    let input = line.trim();
    if input.is_empty() {
        return Flow::Continue;
    }
    let (cmd, arg) = match input.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (input, ""),
    };
    match cmd {
        "/quit" | "/exit" => return Flow::Quit,
        "/help" => println!("{}", HELP),
        "/open" => widget.apply(WidgetControl::Open).await,
        "/close" => widget.apply(WidgetControl::Close).await,
        _ if !widget.is_open() => println!("(widget is closed; /open to continue)"),
        "/clear" => {
            widget.clear().await;
        }
        "/transcript" => println!("{}", widget.transcript().await),
        "/copy" => {
            if let Err(e) = widget.copy_transcript(Arc::new(SystemClipboard::new())).await {
                eprintln!("copy failed: {}", e);
            }
        }
        "/download" => {
            let dir = if arg.is_empty() { PathBuf::from(".") } else { PathBuf::from(arg) };
            match widget.download_transcript(&dir).await {
                Ok(path) => println!("(saved {})", path.display()),
                Err(e) => eprintln!("download failed: {:#}", e),
            }
        }
        "/send-transcript" => {
            widget.send_transcript().await;
        }
        "/webhook" => {
            let next = ChatConfig {
                webhook_url: if arg.is_empty() { None } else { Some(arg.to_string()) },
                ..widget.config().await
            };
            match next.validate() {
                Ok(()) => widget.apply(WidgetControl::Init(next)).await,
                Err(e) => eprintln!("{}", e),
            }
        }
        "/name" if !arg.is_empty() => {
            let next = ChatConfig {
                agent_name: arg.to_string(),
                ..widget.config().await
            };
            widget.apply(WidgetControl::Init(next)).await;
        }
        _ if cmd.starts_with('/') => println!("unknown command; /help lists commands"),
        _ => {
            widget.send(input).await;
        }
    }
    Flow::Continue
}

/// Render conversation changes as they happen. User messages are not echoed; the user just typed them.
async fn print_events(widget: ChatWidget, mut rx: broadcast::Receiver<ConversationEvent>) {
    loop {
        match rx.recv().await {
            Ok(ConversationEvent::Appended(m)) if m.sender == Sender::Agent => {
                let name = widget.config().await.agent_name;
                println!("< {}: {}", name, m.text);
            }
            Ok(ConversationEvent::Cleared(seed)) => {
                let name = widget.config().await.agent_name;
                println!("-- conversation cleared --");
                println!("< {}: {}", name, seed.text);
            }
            Ok(ConversationEvent::Typing(true)) => {
                let name = widget.config().await.agent_name;
                println!("({} is typing...)", name);
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                log::debug!("event printer lagged {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn widget() -> ChatWidget {
        ChatWidget::new(
            ChatConfig::default(),
            WidgetOptions {
                pacing: Duration::ZERO,
                notice_ttl: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn open_and_close_apply_immediately() {
        let w = widget();
        assert_eq!(handle_line(&w, "/open").await, Flow::Continue);
        assert!(w.is_open());
        handle_line(&w, "/close").await;
        assert!(!w.is_open());
    }

    #[tokio::test]
    async fn name_applies_before_next_line() {
        let w = widget();
        handle_line(&w, "/open").await;
        handle_line(&w, "/name Ada").await;
        assert_eq!(w.config().await.agent_name, "Ada");
    }

    #[tokio::test]
    async fn webhook_set_and_unset() {
        let w = widget();
        handle_line(&w, "/open").await;
        handle_line(&w, "/webhook http://127.0.0.1:9/hook").await;
        assert_eq!(
            w.config().await.webhook_url.as_deref(),
            Some("http://127.0.0.1:9/hook")
        );
        handle_line(&w, "/webhook").await;
        assert_eq!(w.config().await.webhook_url, None);
    }

    #[tokio::test]
    async fn message_while_closed_is_not_sent() {
        let w = widget();
        handle_line(&w, "hello").await;
        assert_eq!(w.conversation().len().await, 1);

        handle_line(&w, "/open").await;
        handle_line(&w, "hello").await;
        assert_eq!(w.conversation().messages().await[1].text, "hello");
    }

    #[tokio::test]
    async fn quit_ends_the_loop() {
        let w = widget();
        assert_eq!(handle_line(&w, "  /quit ").await, Flow::Quit);
        assert_eq!(handle_line(&w, "").await, Flow::Continue);
    }
}
