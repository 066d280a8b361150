use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use duetask_cli::cli::{
    Cli, Command, collect_config_overrides, resolve_due_date, split_command_line,
};
use duetask_cli::render::{self, ListView};
use duetask_core::clock::SystemClock;
use duetask_core::config::{Config, load_config_with_fallback, merge_overrides};
use duetask_core::display::DateStyle;
use duetask_core::error::AppError;
use duetask_core::notify::{ConsoleNotifier, Notifier, notifier_for, surface_storage_errors};
use duetask_core::scheduler::CleanupScheduler;
use duetask_core::storage::JsonFileStore;
use duetask_core::{SharedStore, StoreEvent, TaskStore};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

const LOG_ENV_VAR: &str = "DUETASK_LOG";

struct Session {
    store: SharedStore<JsonFileStore>,
    events: broadcast::Receiver<StoreEvent>,
    notifier: Box<dyn Notifier>,
    config: Config,
    date_style: DateStyle,
}

impl Session {
    async fn open(raw_overrides: &[String]) -> Result<Self, AppError> {
        let overrides = collect_config_overrides(raw_overrides).map_err(AppError::invalid_input)?;

        let loaded = load_config_with_fallback();
        if let Some(err) = loaded.error {
            log::info!("using default config: {err}");
            ConsoleNotifier.alert("Could not load config", &err.to_string())?;
        }
        let config = merge_overrides(&loaded.config, &overrides)?;
        let notifier = notifier_for(config.desktop_alerts);

        let persistence = JsonFileStore::from_env()?;
        log::debug!("storing tasks in {}", persistence.dir().display());
        let mut store = TaskStore::open(persistence, Arc::new(SystemClock), config.policy()).await;
        surface_storage_errors(notifier.as_ref(), &store.take_load_errors());
        let events = store.subscribe();

        Ok(Self {
            store: store.into_shared(),
            events,
            notifier,
            date_style: config.date_style(),
            config,
        })
    }

    fn handle_event(&self, event: StoreEvent) {
        match event {
            StoreEvent::PersistFailed(err) => {
                surface_storage_errors(self.notifier.as_ref(), &[err]);
            }
            other => log::trace!("store event: {other:?}"),
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    log::warn!("missed {skipped} store events");
                }
                Err(_) => break,
            }
        }
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn is_help_request(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

/// Not-found ids and blank task text leave the lists untouched and are not
/// reported as failures.
fn ignore_benign(result: Result<(), AppError>) -> Result<(), AppError> {
    match result {
        Err(err) if err.is_benign() => {
            log::info!("nothing changed: {err}");
            Ok(())
        }
        other => other,
    }
}

async fn run_command(session: &Session, command: Command, json: bool) -> Result<(), AppError> {
    match command {
        Command::Add { text, due, in_days } => {
            let Some(text) = text.filter(|value| !value.trim().is_empty()) else {
                log::info!("ignoring add without task text");
                return Ok(());
            };

            let mut store = session.store.lock().await;
            let today = store.today();
            let due_date = resolve_due_date(due.as_deref(), in_days, today)?;
            let task = store.add_task(&text, due_date).await?.value;
            if json {
                println!("{}", render::task_json(&task, today, &session.date_style));
            } else {
                println!(
                    "Added task: {} ({}) due {}",
                    task.text,
                    task.id,
                    session.date_style.format_date(task.due_date)
                );
            }
        }
        Command::Done { id } => {
            let mut store = session.store.lock().await;
            let entry = store.complete_task(&id).await?.value;
            if json {
                let offset = store.now().offset();
                println!(
                    "{}",
                    render::completed_json(&entry, offset, &session.date_style)?
                );
            } else {
                println!("Completed task: {} ({})", entry.task.text, entry.task.id);
            }
        }
        Command::Remove { id, completed } => {
            let mut store = session.store.lock().await;
            let task = store.remove_task(&id, completed).await?.value;
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "id": task.id,
                        "text": task.text,
                        "from_completed": completed,
                    })
                );
            } else {
                println!("Removed task: {} ({})", task.text, task.id);
            }
        }
        Command::List { list } => {
            let view = {
                let store = session.store.lock().await;
                ListView {
                    today: store.today(),
                    offset: store.now().offset(),
                    classified: store.classify(),
                    completed: store.completed(),
                }
            };
            let sections = render::sections_for(list);
            if json {
                println!(
                    "{}",
                    render::sections_json(&view, sections, &session.date_style)?
                );
            } else {
                println!(
                    "{}",
                    render::render_sections(
                        &view,
                        sections,
                        &session.date_style,
                        session.config.theme()
                    )
                );
            }
        }
        Command::Cleanup => {
            let mut store = session.store.lock().await;
            let now = store.now();
            let removed = store.cleanup_completed(now).await.value;
            if json {
                println!("{}", serde_json::json!({ "removed": removed }));
            } else {
                println!("Removed {removed} completed tasks");
            }
        }
        Command::Shell => {
            return Err(AppError::invalid_input("already in an interactive session"));
        }
    }

    Ok(())
}

enum LineOutcome {
    Continue,
    Exit,
}

async fn handle_line(session: &Session, line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Continue;
    }

    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return LineOutcome::Exit;
    }

    if line == "help" || line == "?" {
        print_help();
        return LineOutcome::Continue;
    }

    let args = match split_command_line(line) {
        Ok(args) if !args.is_empty() => args,
        Ok(_) => return LineOutcome::Continue,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            return LineOutcome::Continue;
        }
    };

    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push("duetask".to_string());
    argv.extend(args);

    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) if is_help_request(&err) => {
            println!("{err}");
            return LineOutcome::Continue;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            return LineOutcome::Continue;
        }
    };

    if !cli.config_override.is_empty() {
        eprintln!(
            "ERROR: {}",
            AppError::invalid_input("config overrides only apply when duetask starts")
        );
        return LineOutcome::Continue;
    }

    if let Err(err) = ignore_benign(run_command(session, cli.command, cli.json).await) {
        eprintln!("ERROR: {}", err);
    }
    LineOutcome::Continue
}

async fn interactive_loop(session: &mut Session) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = session.events.recv() => match event {
                Ok(event) => session.handle_event(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("missed {skipped} store events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line.map_err(|err| AppError::io(err.to_string()))? else {
                    break;
                };
                if let LineOutcome::Exit = handle_line(session, &line).await {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Reads commands from stdin until `exit`, `quit` or end of input, with
/// retention cleanup running in the background.
async fn run_interactive(mut session: Session) -> Result<(), AppError> {
    let scheduler =
        CleanupScheduler::start(session.store.clone(), session.config.cleanup_period());
    let result = interactive_loop(&mut session).await;
    scheduler.stop().await;
    session.drain_events();
    result
}

async fn run() -> Result<(), AppError> {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        let session = Session::open(&[]).await?;
        return run_interactive(session).await;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if is_help_request(&err) => err.exit(),
        Err(err) => return Err(normalize_parse_error(err)),
    };

    let mut session = Session::open(&cli.config_override).await?;
    if let Command::Shell = cli.command {
        return run_interactive(session).await;
    }

    let result = ignore_benign(run_command(&session, cli.command, cli.json).await);
    session.drain_events();
    result
}

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().filter_or(LOG_ENV_VAR, "warn"));

    if let Err(err) = run().await {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
