//! snop-cli: terminal front end for the SNoP sales data chat
//!
//! Embeds the chat widget and talks to a running `snop-server` relay. The
//! session id lives in `~/.snop/chat-session` (configurable), so history
//! follows the user across invocations.
//!
//! # Subcommands
//! - `chat`: interactive conversation
//! - `ask <question> [--json]`: one question, one answer
//! - `history [--json]`: print the stored session history
//! - `clear`: delete the stored session history
//! - `export <sql> [--csv] [--out <dir>]`: save query results as a spreadsheet
//! - `session`: show the session id and where it is kept
//! - `status`: show relay and backend health

mod text;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use snop_core::models::{ExportFormat, Message};
use snop_core::{FileSessionStore, SessionStore, SnopConfig};
use snop_widget::{ChatWidget, Exporter, RelayApi, ResultView, ViewKind, WidgetApi};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "snop-cli",
    version,
    about = "SNoP sales data chat: ask questions about sales in plain language"
)]
struct Cli {
    /// Relay URL (overrides SNOP_RELAY_URL env var and the config file)
    #[arg(long, env = "SNOP_RELAY_URL")]
    relay: Option<String>,

    /// Config file
    #[arg(short, long, default_value = "snop.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start an interactive chat
    Chat,

    /// Ask a single question
    Ask {
        /// Question in natural language
        question: String,

        /// Print the raw answer payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the stored history of this session
    History {
        /// Print messages as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the stored history of this session
    Clear,

    /// Export the results of a query
    Export {
        /// SQL whose results to export
        sql: String,

        /// Export CSV instead of an Excel workbook
        #[arg(long)]
        csv: bool,

        /// Directory to save into (defaults to the configured download dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show the session id
    Session,

    /// Show relay and backend status
    Status,
}

// ============================================================================
// Context
// ============================================================================

struct Context {
    config: SnopConfig,
    api: Arc<RelayApi>,
    sessions: FileSessionStore,
}

impl Context {
    fn new(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = SnopConfig::load(Some(cli.config.as_str()))?;
        if let Some(relay) = cli.relay.as_deref().filter(|r| !r.trim().is_empty()) {
            config.widget.relay_url = relay.trim().to_string();
        }

        let api = Arc::new(RelayApi::new(&config.widget)?);
        let sessions = FileSessionStore::new(config.widget.session_path());
        Ok(Self {
            config,
            api,
            sessions,
        })
    }

    fn widget(&self) -> ChatWidget {
        ChatWidget::new(
            self.api.clone(),
            &self.sessions,
            self.config.widget.download_path(),
        )
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn do_ask(ctx: &Context, question: &str, json_output: bool) -> anyhow::Result<()> {
    let mut widget = ctx.widget();
    if !widget.submit(question).await {
        anyhow::bail!("question is empty");
    }

    let Some(data) = latest_answer(&widget) else {
        anyhow::bail!("no answer received");
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else {
        let view = ResultView::new(data);
        let table = view.table();
        print!("{}", text::render_answer(&view, table.as_ref()));
    }
    Ok(())
}

async fn do_history(ctx: &Context, json_output: bool) -> anyhow::Result<()> {
    let session_id = ctx.sessions.get_or_create();
    let history = ctx.api.get_history(&session_id).await?;
    let loaded_at = chrono::Utc::now();
    let messages: Vec<Message> = history
        .messages
        .into_iter()
        .map(|r| Message::from_history(r, loaded_at))
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        eprintln!("No history for session {}", session_id);
        return Ok(());
    }
    for m in &messages {
        println!("{}", text::render_message(m));
    }
    Ok(())
}

async fn do_clear(ctx: &Context) -> anyhow::Result<()> {
    let session_id = ctx.sessions.get_or_create();
    ctx.api.delete_history(&session_id).await?;
    println!("History cleared for session {}", session_id);
    Ok(())
}

async fn do_export(
    ctx: &Context,
    sql: &str,
    format: ExportFormat,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let dir = out.unwrap_or_else(|| ctx.config.widget.download_path());
    let exporter = Exporter::new(ctx.api.clone(), dir);
    match exporter.export_sql(sql, format).await {
        Ok(path) => {
            println!("Saved {}", path.display());
            Ok(())
        }
        Err(e) => anyhow::bail!(e.alert_message()),
    }
}

fn do_session(ctx: &Context) {
    println!("Session: {}", ctx.sessions.get_or_create());
    println!("Stored:  {}", ctx.sessions.path().display());
}

async fn do_status(ctx: &Context) -> anyhow::Result<()> {
    let body = match ctx.api.health().await {
        Ok(body) => body,
        Err(e) => {
            eprintln!("snop-cli: cannot reach {}: {}", ctx.api.relay_url(), e);
            std::process::exit(1);
        }
    };

    println!("Relay:    {}", ctx.api.relay_url());
    println!("Status:   {}", body["status"].as_str().unwrap_or("unknown"));
    println!("Version:  {}", body["version"].as_str().unwrap_or("?"));
    println!("Backend:  {}", body["backend"].as_str().unwrap_or("?"));
    println!(
        "Upstream: {}",
        body["backend_status"].as_str().unwrap_or("unreachable")
    );
    Ok(())
}

// ============================================================================
// Interactive chat
// ============================================================================

/// How the latest answer is being looked at. Rebuilt onto a fresh view
/// every time it is drawn.
#[derive(Debug, Default)]
struct Selection {
    view: Option<ViewKind>,
    sorts: Vec<String>,
    page: usize,
}

impl Selection {
    fn reset(&mut self) {
        *self = Selection::default();
    }
}

fn latest_answer(widget: &ChatWidget) -> Option<&snop_core::models::ChatResponse> {
    widget
        .conversation()
        .messages()
        .iter()
        .rev()
        .find(|m| !m.is_user())
        .and_then(|m| m.data.as_ref())
}

fn draw_latest(widget: &ChatWidget, selection: &Selection) -> Option<String> {
    let data = latest_answer(widget)?;
    let mut view = ResultView::new(data);
    if let Some(kind) = selection.view {
        view.select_view(kind);
    }

    let mut table = view.table();
    if let Some(t) = table.as_mut() {
        for column in &selection.sorts {
            t.toggle_sort(column);
        }
        for _ in 0..selection.page {
            t.next_page();
        }
    }
    Some(text::render_answer(&view, table.as_ref()))
}

const CHAT_HELP: &str = "\
Commands:
  /table /chart        switch the view of the latest answer
  /sort <column>       cycle sorting on a column
  /next /prev          page through the table
  /export [csv]        save the latest answer's results
  /copy                print the latest SQL for copying
  /history             reload the stored history
  /clear               delete the history and start over
  /quit                leave";

async fn do_chat(ctx: &Context) -> anyhow::Result<()> {
    let mut widget = ctx.widget();
    widget.open().await;

    println!(
        "SNoP chat (session {}). Type /help for commands.",
        widget.conversation().session_id()
    );
    for m in widget.conversation().messages() {
        println!("{}", text::render_message(m));
    }

    let mut selection = Selection::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "/quit" | "/exit" => break,
            "/help" => println!("{}", CHAT_HELP),
            "/clear" => {
                widget.clear().await;
                selection.reset();
                println!("History cleared.");
            }
            "/history" => {
                widget.close();
                widget.open().await;
                selection.reset();
                for m in widget.conversation().messages() {
                    println!("{}", text::render_message(m));
                }
            }
            "/table" | "/chart" => {
                selection.view = Some(if command == "/table" {
                    ViewKind::Table
                } else {
                    ViewKind::Chart
                });
                print_latest(&widget, &selection);
            }
            "/sort" => {
                selection.sorts.push(arg.trim().to_string());
                selection.page = 0;
                print_latest(&widget, &selection);
            }
            "/next" => {
                selection.page += 1;
                print_latest(&widget, &selection);
            }
            "/prev" => {
                selection.page = selection.page.saturating_sub(1);
                print_latest(&widget, &selection);
            }
            "/copy" => match latest_answer(&widget).and_then(|d| ResultView::new(d).mark_copied()) {
                Some(sql) => println!("{}", sql.trim()),
                None => println!("No SQL to copy."),
            },
            "/export" => {
                let format = if arg.trim().eq_ignore_ascii_case("csv") {
                    ExportFormat::Csv
                } else {
                    ExportFormat::Xlsx
                };
                match latest_answer(&widget) {
                    Some(data) => match widget.export(data, format).await {
                        Ok(path) => println!("Saved {}", path.display()),
                        Err(e) => eprintln!("{}", e.alert_message()),
                    },
                    None => println!("Nothing to export yet."),
                }
            }
            _ if command.starts_with('/') => println!("Unknown command. Type /help."),
            _ => {
                if widget.submit(line).await {
                    selection.reset();
                    print_latest(&widget, &selection);
                }
            }
        }
    }
    Ok(())
}

fn print_latest(widget: &ChatWidget, selection: &Selection) {
    match draw_latest(widget, selection) {
        Some(text) => print!("{}", text),
        None => println!("No answer yet."),
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = match Context::new(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("snop-cli: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Chat => do_chat(&ctx).await,
        Commands::Ask { question, json } => do_ask(&ctx, &question, json).await,
        Commands::History { json } => do_history(&ctx, json).await,
        Commands::Clear => do_clear(&ctx).await,
        Commands::Export { sql, csv, out } => {
            let format = if csv { ExportFormat::Csv } else { ExportFormat::Xlsx };
            do_export(&ctx, &sql, format, out).await
        }
        Commands::Session => {
            do_session(&ctx);
            Ok(())
        }
        Commands::Status => do_status(&ctx).await,
    };

    if let Err(e) = result {
        eprintln!("snop-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
