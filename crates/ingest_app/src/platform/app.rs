use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use engine_logging::{engine_info, engine_warn};
use ingest_core::{update, DashboardState, DashboardStep, FileUpload, Msg};
use ingest_engine::{Credential, CredentialStore, EngineEvent, EngineHandle, FileCredentialStore};

use super::cli::{Args, Command};
use super::config::AppConfig;
use super::effects::EffectRunner;
use super::logging::{self, LogDestination};
use super::ui;

/// Idle wait between engine polls; each empty poll becomes a `Msg::Tick`.
const TICK: Duration = Duration::from_millis(250);

pub fn run_app(args: Args) -> anyhow::Result<ExitCode> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(path) = args.token_file {
        config.token_file = path;
    }
    if let Some(base) = args.api_base_url {
        config.api_base_url = base;
    }
    logging::initialize(LogDestination::from_settings(
        config.log_file.as_deref(),
        args.verbose,
    ));

    let credentials = Arc::new(FileCredentialStore::new(config.token_file.clone()));
    match args.command {
        Command::Login { token } => {
            let token = token.trim();
            anyhow::ensure!(!token.is_empty(), "token is empty");
            credentials
                .store(&Credential::new(token))
                .with_context(|| format!("failed to store token in {}", config.token_file.display()))?;
            println!("Token stored in {}", config.token_file.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Logout => {
            credentials.clear();
            println!("Token removed");
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask {
            collection,
            question,
        } => ask_once(&config, credentials, &question, &collection),
        Command::Upload { file, ask } => {
            let upload = read_upload(&file)?;
            run_dashboard(&config, credentials, Msg::FileChosen(upload), ask)
        }
        Command::Scrape { url, ask } => {
            run_dashboard(&config, credentials, Msg::UrlSubmitted(url), ask)
        }
    }
}

fn read_upload(path: &Path) -> anyhow::Result<FileUpload> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let content_type = content_type_for(&filename);
    Ok(FileUpload::new(filename, content_type, bytes))
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html") | Some("htm") => "text/html",
        _ => "application/octet-stream",
    }
}

/// Feeds messages through `update` until the task completes (and the
/// optional question is answered) or fails with nothing left in flight.
fn run_dashboard(
    config: &AppConfig,
    credentials: Arc<dyn CredentialStore>,
    first: Msg,
    question: Option<String>,
) -> anyhow::Result<ExitCode> {
    let runner = EffectRunner::new(config.engine_config(), credentials)
        .context("failed to start engine")?;
    let mut state = DashboardState::with_policy(config.upload_policy());
    let mut question = question;
    let mut asked = false;
    let mut next = Some(first);

    loop {
        let msg = next
            .take()
            .or_else(|| runner.next_msg(TICK))
            .unwrap_or(Msg::Tick);
        let (new_state, effects) = update(state, msg);
        state = new_state;
        runner.enqueue(effects);

        if state.consume_dirty() {
            print_frame(&state);
        }

        match outcome(&state) {
            Outcome::Running => {}
            Outcome::Ready => match question.take() {
                Some(q) => {
                    asked = true;
                    next = Some(Msg::QuestionAsked(q));
                }
                None if asked && state.view().last_answer.is_none() => {
                    return Ok(ExitCode::FAILURE)
                }
                None => return Ok(ExitCode::SUCCESS),
            },
            Outcome::Failed => {
                engine_warn!("Giving up; live subscriptions: {}", runner.live_subscriptions());
                return Ok(ExitCode::FAILURE);
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Running,
    /// Collection is ready and no question is in flight.
    Ready,
    /// An error with no submission or stream left to recover it.
    Failed,
}

fn outcome(state: &DashboardState) -> Outcome {
    let view = state.view();
    match state.step() {
        DashboardStep::Upload | DashboardStep::Processing => {
            let in_flight =
                state.has_pending_submission() || state.live_subscription().is_some();
            if view.last_error.is_some() && !in_flight {
                Outcome::Failed
            } else {
                Outcome::Running
            }
        }
        DashboardStep::Customize | DashboardStep::Complete => {
            if view.awaiting_answer {
                Outcome::Running
            } else {
                Outcome::Ready
            }
        }
    }
}

fn print_frame(state: &DashboardState) {
    println!("--- {}", Local::now().format("%H:%M:%S"));
    for line in ui::render::render(&state.view()) {
        println!("{line}");
    }
}

fn ask_once(
    config: &AppConfig,
    credentials: Arc<dyn CredentialStore>,
    question: &str,
    collection: &str,
) -> anyhow::Result<ExitCode> {
    let engine =
        EngineHandle::new(config.engine_config(), credentials.clone()).context("failed to start engine")?;
    engine_info!("Asking collection {}", collection);
    engine.ask(question, collection);

    let timeout = Duration::from_secs(config.request_timeout_secs.saturating_add(5));
    match engine.recv_timeout(timeout) {
        Some(EngineEvent::Answered(Ok(answer))) => {
            println!("{answer}");
            Ok(ExitCode::SUCCESS)
        }
        Some(EngineEvent::Answered(Err(err))) => {
            if err.is_auth() {
                if matches!(err, ingest_core::ClientError::AuthenticationExpired) {
                    credentials.clear();
                }
                eprintln!("Login required: run `ingest login <TOKEN>`");
            }
            Err(anyhow::Error::new(err).context("question failed"))
        }
        other => anyhow::bail!("no answer received ({other:?})"),
    }
}
