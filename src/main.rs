mod config;
mod output;

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use logspan_logs::{
    FileKvStore, KeyValueStore, LogEvent, LogStore, MemoryEventSource, MemoryKvStore,
    RequestLifecycle, VisibleLogs,
};

use crate::config::Config;
use crate::output::{LineRenderer, read_events, unseen};

/// Logspan - render process output with ANSI styling and browse paginated event logs
#[derive(Parser, Debug)]
#[command(name = "logspan")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Key-value state file (overrides the config file)
    #[arg(long, global = true, value_name = "FILE")]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse raw lines into styled spans
    Spans {
        /// Input file (stdin when omitted)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Keep colours and styles from one line to the next
        #[arg(long)]
        persist_style: bool,

        /// Print spans as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Show a workspace's event log through the log store
    Tail {
        /// JSON-lines file of events
        #[arg(long, value_name = "FILE")]
        events: PathBuf,

        /// Workspace id
        #[arg(long, default_value = "default")]
        workspace: String,

        /// Only show events whose message contains this text
        #[arg(long)]
        filter: Option<String>,

        /// Keep polling for new events until interrupted
        #[arg(long, short)]
        follow: bool,

        /// Keep colours and styles from one line to the next per stream
        #[arg(long)]
        persist_style: bool,

        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Hide a process's logs
    Hide {
        #[arg(value_name = "PROCESS")]
        process: String,
    },

    /// Show a previously hidden process's logs
    Show {
        #[arg(value_name = "PROCESS")]
        process: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays clean for piping
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(state_file) = args.state_file {
        config.state_file = Some(state_file);
    }

    match args.command {
        Command::Spans {
            file,
            persist_style,
            json,
        } => render_spans(file.as_deref(), LineRenderer::new(persist_style, json)),
        Command::Tail {
            events,
            workspace,
            filter,
            follow,
            persist_style,
            json,
        } => {
            let opts = TailOptions {
                events,
                workspace,
                filter,
                follow,
            };
            tail(&config, opts, LineRenderer::new(persist_style, json)).await
        }
        Command::Hide { process } => set_visibility(&config, &process, false),
        Command::Show { process } => set_visibility(&config, &process, true),
    }
}

fn render_spans(file: Option<&Path>, mut renderer: LineRenderer) -> Result<()> {
    let reader: Box<dyn BufRead> = match file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in reader.lines() {
        let line = line.context("reading input")?;
        renderer.write_line(&mut out, "-", &line)?;
    }
    out.flush()?;
    Ok(())
}

fn open_kv(config: &Config) -> Arc<dyn KeyValueStore> {
    match &config.state_file {
        Some(path) => Arc::new(FileKvStore::open(path)),
        None => Arc::new(MemoryKvStore::new()),
    }
}

fn set_visibility(config: &Config, process: &str, visible: bool) -> Result<()> {
    if config.state_file.is_none() {
        anyhow::bail!("--state-file (or state_file in the config) is required to persist visibility");
    }
    let logs = VisibleLogs::new(open_kv(config));
    logs.set_log_visibility(process, visible)?;

    let hidden: Vec<String> = logs.hidden_logs().into_iter().collect();
    println!("hidden: [{}]", hidden.join(", "));
    Ok(())
}

struct TailOptions {
    events: PathBuf,
    workspace: String,
    filter: Option<String>,
    follow: bool,
}

fn load_events(path: &Path) -> Result<Vec<LogEvent>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_events(BufReader::new(file))
}

/// Append events the file has gained since the last sync and register
/// their processes
fn sync_source(source: &MemoryEventSource, visible: &VisibleLogs, path: &Path) -> Result<()> {
    let events = load_events(path)?;
    let processes: BTreeSet<String> = events.iter().map(|e| e.process_id().to_string()).collect();
    for event in events.into_iter().skip(source.len()) {
        source.push(event);
    }
    visible.set_processes(processes);
    Ok(())
}

async fn tail(config: &Config, opts: TailOptions, mut renderer: LineRenderer) -> Result<()> {
    let source = MemoryEventSource::new();
    let visible = Arc::new(VisibleLogs::new(open_kv(config)));
    sync_source(&source, &visible, &opts.events)?;

    let store = LogStore::with_config(visible.clone(), config.store_config());
    let ws = opts.workspace.as_str();
    match opts.filter.as_deref() {
        Some(filter) => store.set_filter_str(ws, &source, Some(filter)).await,
        None => store.load_initial_logs(ws, &source).await,
    }

    let mut last_seen = print_new(&store, ws, None, &mut renderer)?;
    if !opts.follow {
        return Ok(());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let mut interval = tokio::time::interval(config.poll_interval());
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = interval.tick() => {
                sync_source(&source, &visible, &opts.events)?;
                store.refresh_logs(ws, &source).await;
                last_seen = print_new(&store, ws, last_seen.as_deref(), &mut renderer)?;
            }
        }
    }

    Ok(())
}

/// Print events newer than `last_seen`; returns the id of the newest event
fn print_new(
    store: &LogStore,
    workspace: &str,
    last_seen: Option<&str>,
    renderer: &mut LineRenderer,
) -> Result<Option<String>> {
    let data = match store.events(workspace) {
        RequestLifecycle::Error { message } => anyhow::bail!("fetching logs: {}", message),
        events => match events.into_data() {
            Some(data) => data,
            // Nothing visible, so nothing was fetched
            None => return Ok(last_seen.map(str::to_string)),
        },
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for event in unseen(&data, last_seen) {
        renderer.write_event(&mut out, event)?;
    }
    out.flush()?;

    Ok(data
        .last()
        .map(|e| e.id.clone())
        .or_else(|| last_seen.map(str::to_string)))
}
