mod app;
mod cli;
mod config;
mod input;
mod layout;
mod model;
mod runtime;
mod scheduler;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand, AppEvent, StatusKind};
use clap::Parser;
use cli::CliArgs;
use config::Theme;
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use runtime::RuntimeGateway;
use scheduler::RefreshScheduler;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let theme = Theme::load(args.theme.as_deref())?;
    let gateway = RuntimeGateway::new(args.runtime.clone());
    info!("using container runtime '{}'", gateway.program());

    let mut app = App::new();
    run(
        &mut app,
        &gateway,
        &theme,
        Duration::from_millis(args.refresh_delay_ms),
    )
    .await?;

    // The error view was already shown; repeat it on the restored screen.
    if let Some(report) = fatal_report(&app) {
        eprintln!("{report}");
    }
    Ok(())
}

fn fatal_report(app: &App) -> Option<String> {
    app.fatal_error().map(|error| format!("Error: {error}"))
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder.with_writer(Mutex::new(file)).try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    Ok(())
}

async fn run(
    app: &mut App,
    gateway: &RuntimeGateway,
    theme: &Theme,
    refresh_delay: Duration,
) -> Result<()> {
    let mut terminal = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, gateway, theme, refresh_delay).await;
    let restore_result = restore_terminal(&mut terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: &RuntimeGateway,
    theme: &Theme,
    refresh_delay: Duration,
) -> Result<()> {
    let size = terminal.size().context("failed to read terminal size")?;
    resize(app, size.width, size.height);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut scheduler = RefreshScheduler::new(refresh_delay, event_tx.clone());
    let mut reader = EventStream::new();

    let command = app.bootstrap();
    execute_app_command(command, gateway, &event_tx, &mut scheduler);

    loop {
        terminal
            .draw(|frame| ui::render(frame, app, theme))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            execute_app_command(command, gateway, &event_tx, &mut scheduler);
                        }
                    }
                    Some(Ok(Event::Resize(width, height))) => resize(app, width, height),
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(StatusKind::Failure, format!("terminal event error: {error}"));
                    }
                    None => {
                        debug!("terminal event stream closed");
                        break;
                    }
                }
            }
            maybe_event = event_rx.recv() => {
                if let Some(event) = maybe_event {
                    if let AppEvent::RefreshDue { action_id } = &event {
                        scheduler.fired(*action_id);
                    }
                    let command = app.handle_event(event);
                    execute_app_command(command, gateway, &event_tx, &mut scheduler);
                }
            }
        }
    }

    scheduler.cancel_all();
    Ok(())
}

fn resize(app: &mut App, width: u16, height: u16) {
    app.resize(width, height);
    let (width, height) = app.dimensions();
    debug!(
        "terminal {width}x{height}, table {} wide and {} rows tall",
        app.layout().total_width(),
        app.layout().table_height
    );
}

fn execute_app_command(
    command: AppCommand,
    gateway: &RuntimeGateway,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
    scheduler: &mut RefreshScheduler,
) {
    match command {
        AppCommand::None => {}
        AppCommand::Refresh => spawn_refresh(gateway.clone(), event_tx.clone()),
        AppCommand::Perform {
            action_id,
            action,
            id,
        } => {
            info!("dispatching {action} for container {id} (action {action_id})");
            let gateway = gateway.clone();
            let tx = event_tx.clone();
            tokio::spawn(async move {
                let outcome = gateway.perform(action, &id).await;
                let _ = tx.send(AppEvent::ActionFinished { action_id, outcome });
            });
            scheduler.schedule(action_id);
            debug!("{} delayed refresh pending", scheduler.pending());
        }
    }
}

fn spawn_refresh(gateway: RuntimeGateway, tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let event = match gateway.list().await {
            Ok(records) => AppEvent::ContainersLoaded(records),
            Err(error) => AppEvent::ListFailed(compact_error(&error)),
        };
        let _ = tx.send(event);
    });
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join(": ")
}
