use std::{io, path::Path, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use dialoguer::{Input, Password};
use tracing::{error, info};

use tgc_core::{
    config::{load_dotenv_if_present, CliValues, Config},
    errors::Error,
    ports::{ChatBackend, Prompter},
    throttled::ThrottledBackend,
    workflow::{self, Outcome, RunOptions},
};
use tgc_telegram::TelegramBackend;

#[derive(Parser)]
#[command(
    name = "tgc",
    version,
    about = "Telegram message cleaner: delete your own messages from groups",
    after_help = "Examples:\n  tgc --api-id 12345 --api-hash 0123abcd --dry-run\n  tgc --api-id 12345 --api-hash 0123abcd --list --json\n  TG_API_ID=12345 TG_API_HASH=0123abcd tgc"
)]
struct Cli {
    #[arg(long, env = "TG_API_ID", help = "Your Telegram API ID")]
    api_id: String,

    #[arg(long, env = "TG_API_HASH", hide_env_values = true, help = "Your Telegram API hash")]
    api_hash: String,

    #[arg(long, help = "Simulate deletion without actually deleting messages")]
    dry_run: bool,

    #[arg(long, env = "TG_PHONE", help = "Phone number used when logging in for the first time")]
    phone: Option<String>,

    #[arg(long = "session", value_name = "PATH", help = "Session file (default: default.session)")]
    session: Option<PathBuf>,

    #[arg(long = "list", help = "Print groups ranked by message count and exit")]
    list: bool,

    #[arg(long, requires = "list", help = "With --list, print the ranking as JSON on stdout")]
    json: bool,
}

impl From<Cli> for CliValues {
    fn from(cli: Cli) -> Self {
        Self {
            api_id: cli.api_id,
            api_hash: cli.api_hash,
            phone: cli.phone,
            session_file: cli.session,
            dry_run: cli.dry_run,
            list_only: cli.list,
            json: cli.json,
        }
    }
}

/// Prompts on the controlling terminal.
struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn line(&self, prompt: &str) -> tgc_core::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)
    }

    fn secret(&self, prompt: &str) -> tgc_core::Result<String> {
        Password::new()
            .with_prompt(prompt)
            .interact()
            .map_err(prompt_error)
    }
}

/// dialoguer reads in raw mode, so Ctrl-C at a prompt shows up as an
/// `Interrupted` read instead of a SIGINT.
fn prompt_error(e: dialoguer::Error) -> Error {
    match e {
        dialoguer::Error::IO(io) if io.kind() == io::ErrorKind::Interrupted => Error::Interrupted,
        other => Error::Input(format!("could not read answer: {other}")),
    }
}

fn is_interrupt(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<Error>(), Some(Error::Interrupted))
}

const INTERRUPTED_EXIT: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv_if_present(Path::new(".env"));
    let cli = Cli::parse();

    if let Err(e) = tgc_core::logging::init("tgc") {
        eprintln!("{e}");
    }

    // Prompts block the main thread; the watcher runs on a worker.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Script interrupted by user.");
            std::process::exit(i32::from(INTERRUPTED_EXIT));
        }
    });

    info!("Telegram message cleaner");
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_interrupt(&e) => {
            info!("Script interrupted by user.");
            ExitCode::from(INTERRUPTED_EXIT)
        }
        Err(e) => {
            error!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = Config::load(cli.into())?;
    if cfg.dry_run {
        info!("Dry-run mode: nothing will be deleted.");
    }

    let prompter = TerminalPrompter;
    let telegram = Arc::new(
        TelegramBackend::connect(&cfg, &prompter)
            .await
            .context("telegram login failed")?,
    );

    let backend: Arc<dyn ChatBackend> = if cfg.delete_interval.is_zero() {
        telegram.clone()
    } else {
        Arc::new(ThrottledBackend::new(telegram.clone(), cfg.delete_interval))
    };

    let result = workflow::run(backend.as_ref(), &prompter, RunOptions::from(&cfg)).await;
    let closed = telegram.close();
    let outcome = result?;
    closed.context("failed to save session")?;

    match outcome {
        Outcome::Listed(ranked) if cfg.json => println!("{}", ranked.to_json()?),
        Outcome::Completed(reports) => {
            let deleted: usize = reports.iter().map(|r| r.deleted).sum();
            let requested: usize = reports.iter().map(|r| r.requested).sum();
            if cfg.dry_run {
                info!(
                    "Dry-run: {requested} messages in {} groups would be deleted.",
                    reports.len()
                );
            } else {
                info!(
                    "Deleted {deleted} of {requested} messages in {} groups.",
                    reports.len()
                );
            }
        }
        Outcome::Listed(_) | Outcome::NothingSelected | Outcome::Cancelled => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interrupted_read() -> dialoguer::Error {
        dialoguer::Error::IO(io::Error::from(io::ErrorKind::Interrupted))
    }

    #[test]
    fn ctrl_c_at_prompt_is_an_interrupt() {
        assert!(matches!(prompt_error(interrupted_read()), Error::Interrupted));
    }

    #[test]
    fn other_read_failures_stay_input_errors() {
        let e = dialoguer::Error::IO(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(prompt_error(e), Error::Input(_)));
    }

    #[test]
    fn interrupt_is_found_through_context() {
        let err = anyhow::Error::new(prompt_error(interrupted_read()))
            .context("telegram login failed");
        assert!(is_interrupt(&err));

        let err = anyhow::Error::new(Error::Input("\"0 abc\" is not a group number".to_string()));
        assert!(!is_interrupt(&err));
    }
}
