use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use strum::EnumString;
use tokio::io::AsyncBufReadExt;

use saathi::client::GeminiClient;
use saathi::config::Config;
use saathi::controller::{SubmitOutcome, TurnController, TurnEvent};
use saathi::locale::{self, Language};
use saathi::session::Attachment;

#[derive(Parser)]
#[command(name = "saathi")]
#[command(version = "0.1.0")]
#[command(about = "Bilingual voter-registration chat assistant", long_about = None)]
struct Cli {
    /// Display language (en or hi); overrides the configured default
    #[arg(long)]
    language: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single prompt and print the shaped reply
    Ask { prompt: String },
}

/// Session commands entered with a leading slash in the REPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
enum ReplCommand {
    Lang,
    Attach,
    Detach,
    Clear,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let language = match cli.language.as_deref() {
        Some(raw) => Language::from_str(raw)
            .map_err(|_| anyhow::anyhow!("unknown language '{raw}', expected 'en' or 'hi'"))?,
        None => config.default_language,
    };

    let transport = Arc::new(GeminiClient::new(&config).context("configuration error")?);
    let mut controller = TurnController::new(transport, language, config.reveal_interval());

    match cli.command {
        Some(Commands::Ask { prompt }) => ask_once(&mut controller, &prompt).await,
        None => interactive(&mut controller).await,
    }
}

async fn ask_once(controller: &mut TurnController, prompt: &str) -> Result<()> {
    match controller.submit(prompt, None) {
        SubmitOutcome::Accepted { .. } => pump_turn(controller).await,
        SubmitOutcome::RejectedEmpty => anyhow::bail!("prompt is empty"),
        SubmitOutcome::RejectedBusy => anyhow::bail!("another turn is in flight"),
    }
}

/// Print reveal deltas as they arrive; Ctrl-C cancels the in-flight turn.
async fn pump_turn(controller: &mut TurnController) -> Result<()> {
    let language = controller.language();
    let cancel = controller.cancel_handle();
    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            event = controller.next_event() => match event {
                Some(TurnEvent::RevealDelta(chunk)) => {
                    print!("{chunk}");
                    stdout.flush()?;
                }
                Some(TurnEvent::Completed(_)) => {
                    println!();
                    return Ok(());
                }
                Some(TurnEvent::Stopped) => {
                    println!("{}", locale::stopped(language));
                    return Ok(());
                }
                Some(TurnEvent::Failed(message)) => {
                    println!("{message}");
                    return Ok(());
                }
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                if let Some(cancel) = &cancel {
                    cancel.cancel();
                }
            }
        }
    }
}

async fn interactive(controller: &mut TurnController) -> Result<()> {
    println!("{}", locale::greeting(controller.language()));
    println!("({})", locale::placeholder(controller.language()));
    println!("Commands: /lang <en|hi>, /attach <path>, /detach, /clear, /quit");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
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
        if let Some(rest) = line.strip_prefix('/') {
            if handle_command(controller, rest)? {
                break;
            }
            continue;
        }
        match controller.submit(line, None) {
            SubmitOutcome::Accepted { .. } => {
                println!("{}", locale::processing(controller.language()));
                pump_turn(controller).await?;
            }
            SubmitOutcome::RejectedBusy => println!("a turn is already in flight"),
            SubmitOutcome::RejectedEmpty => {}
        }
    }
    Ok(())
}

/// Handle a slash command. Returns `true` when the REPL should exit.
fn handle_command(controller: &mut TurnController, input: &str) -> Result<bool> {
    let mut words = input.split_whitespace();
    let keyword = words.next().unwrap_or_default();
    let argument = words.next();

    let Ok(command) = ReplCommand::from_str(keyword) else {
        println!("unknown command: /{keyword}");
        return Ok(false);
    };

    match command {
        ReplCommand::Lang => {
            let Some(target) = argument.and_then(|raw| Language::from_str(raw).ok()) else {
                println!("usage: /lang <en|hi>");
                return Ok(false);
            };
            match controller.set_language(target) {
                Ok(()) => {
                    println!("{}", locale::greeting(controller.language()));
                    println!("({})", locale::placeholder(controller.language()));
                }
                Err(err) => println!("{err}"),
            }
        }
        ReplCommand::Attach => {
            let Some(path) = argument else {
                println!("usage: /attach <path>");
                return Ok(false);
            };
            match read_attachment(Path::new(path)) {
                Ok(attachment) => {
                    println!(
                        "attached {} ({}{})",
                        attachment.file_name,
                        attachment.mime_type,
                        if attachment.is_image { ", image" } else { "" }
                    );
                    controller.attach(attachment);
                }
                Err(err) => println!("{err:#}"),
            }
        }
        ReplCommand::Detach => {
            if controller.detach_pending().is_some() {
                println!("attachment removed");
            }
        }
        ReplCommand::Clear => match controller.reset() {
            Ok(()) => println!("{}", locale::greeting(controller.language())),
            Err(err) => println!("{err}"),
        },
        ReplCommand::Quit => return Ok(true),
    }
    Ok(false)
}

/// File-reading boundary: decode a file into an attachment the pipeline can
/// carry. MIME type is guessed from the extension.
fn read_attachment(path: &Path) -> Result<Attachment> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = guess_mime_type(path);
    let is_image = mime_type.starts_with("image/");
    Ok(Attachment {
        file_name,
        mime_type,
        data,
        is_image,
    })
}

fn guess_mime_type(path: &Path) -> String {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
    .to_string()
}
