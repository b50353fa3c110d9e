use std::{path::PathBuf, process::Stdio, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    connect_json_lines, print_phrase, ClipboardProvider, PrintBridge, SystemClipboard,
};
use print_host::{load_settings, serve_json_lines, serve_requester, PrintCoordinator};
use recovery_phrase::{decode, encode, Phrase, PhraseEditor};
use surface_integration::{HeadlessSurfaceFactory, HeadlessWindow, PrintSpool};
use tokio::{
    io::{AsyncReadExt, BufReader},
    process::Command as ChildCommand,
    sync::mpsc,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "desktop", about = "Recovery phrase codec and print host")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the canonical text for the given words.
    Encode {
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Decode canonical text from a file, stdin, or the system clipboard.
    Decode {
        #[arg(long, default_value_t = 12)]
        words_count: usize,
        #[arg(long, conflicts_with = "clipboard")]
        file: Option<PathBuf>,
        #[arg(long)]
        clipboard: bool,
    },
    /// Serve print requests as JSON lines on stdin/stdout.
    Host {
        #[arg(long)]
        spool_dir: Option<PathBuf>,
    },
    /// Decode a phrase and send it to a print host.
    Print {
        #[arg(long, default_value_t = 12)]
        words_count: usize,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        spool_dir: Option<PathBuf>,
        #[arg(long)]
        spawn_host: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries protocol and phrase output, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    match args.command {
        Command::Encode { words } => {
            let phrase = Phrase::from_values(words)?;
            print!("{}", encode(&phrase));
        }
        Command::Decode {
            words_count,
            file,
            clipboard,
        } => {
            let text = if clipboard {
                SystemClipboard
                    .read_text()?
                    .context("clipboard holds no text")?
            } else {
                read_input(file).await?
            };
            let phrase = decode(&text, words_count)?;
            println!("{}", phrase.values().collect::<Vec<_>>().join(" "));
        }
        Command::Host { spool_dir } => run_host(spool_dir).await?,
        Command::Print {
            words_count,
            file,
            spool_dir,
            spawn_host,
        } => {
            let mut editor = PhraseEditor::new(words_count, false)?;
            let text = read_input(file).await?;
            editor
                .paste_text(&text)
                .context("input is not a valid recovery phrase")?;
            editor.set_read_only(true);

            if spawn_host {
                print_with_child_host(&editor, spool_dir).await?;
            } else {
                print_in_process(&editor, spool_dir).await?;
            }
        }
    }

    Ok(())
}

async fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn spool(spool_dir: Option<PathBuf>) -> PrintSpool {
    match spool_dir {
        Some(dir) => PrintSpool::with_directory(dir),
        None => PrintSpool::in_memory(),
    }
}

fn start_coordinator(
    spool_dir: Option<PathBuf>,
) -> Result<(Arc<PrintCoordinator>, Arc<HeadlessWindow>)> {
    let settings = load_settings();
    info!(
        page = %settings.print_page_uri,
        queue_depth = settings.queue_depth,
        "starting print host"
    );
    let factory = Arc::new(HeadlessSurfaceFactory::new(spool(spool_dir)));
    let coordinator = Arc::new(PrintCoordinator::new(factory, settings));
    let window = HeadlessWindow::new("main");
    coordinator.initialize(window.clone())?;
    Ok((coordinator, window))
}

async fn run_host(spool_dir: Option<PathBuf>) -> Result<()> {
    let (coordinator, window) = start_coordinator(spool_dir)?;
    let served = serve_json_lines(
        coordinator,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;
    window.destroy();
    served
}

async fn print_in_process(editor: &PhraseEditor, spool_dir: Option<PathBuf>) -> Result<()> {
    let (coordinator, window) = start_coordinator(spool_dir)?;
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let server = serve_requester(coordinator, request_rx, event_tx);
    let bridge = PrintBridge::connect(request_tx, event_rx, Arc::new(SystemClipboard));

    let result = report(print_phrase(editor, &bridge).await?);

    drop(bridge);
    if let Err(err) = server.await {
        warn!("print host task ended abnormally: {err}");
    }
    window.destroy();
    result
}

async fn print_with_child_host(editor: &PhraseEditor, spool_dir: Option<PathBuf>) -> Result<()> {
    let exe = std::env::current_exe().context("failed to locate own executable")?;
    let mut command = ChildCommand::new(exe);
    command.arg("host");
    if let Some(dir) = &spool_dir {
        command.arg("--spool-dir").arg(dir);
    }
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .context("failed to spawn print host")?;
    let stdin = child.stdin.take().context("print host stdin unavailable")?;
    let stdout = child.stdout.take().context("print host stdout unavailable")?;

    let (requests, events) = connect_json_lines(BufReader::new(stdout), stdin);
    let bridge = PrintBridge::connect(requests, events, Arc::new(SystemClipboard));
    let result = report(print_phrase(editor, &bridge).await?);

    // Closing the request stream lets the host reach EOF and exit.
    drop(bridge);
    let status = child.wait().await.context("failed to wait for print host")?;
    if !status.success() {
        warn!(%status, "print host exited with failure");
    }
    result
}

fn report(outcome: shared::domain::PrintOutcome) -> Result<()> {
    if outcome.success {
        info!("phrase printed");
        return Ok(());
    }
    match outcome.reason {
        Some(reason) => bail!("print failed: {reason}"),
        None => bail!("print failed"),
    }
}
