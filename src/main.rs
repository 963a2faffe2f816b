// ============================================================================
// LazySignals - Signaux et comparaisons sur graphique journalier
// ============================================================================
// Programme TUI : watchlist d'actifs, graphique en chandeliers avec les
// signaux en marqueurs, et comparaison de prix par glisser à la souris.
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle qui gère résultats, rendu et événements
// 3. Deux runtimes tokio : un worker dédié aux appels HTTP, un runtime
//    principal pour le chargement des surfaces de graphique
// 4. Channels mpsc : seul moyen de communication entre les threads
// ============================================================================

use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use tracing::{debug, error, info, warn};

use lazysignals::api::{load_signal_file, PriceSeriesProvider, YahooProvider};
use lazysignals::app::App;
use lazysignals::chart::host::{LoadedSurface, MountTask};
use lazysignals::chart::TerminalSurface;
use lazysignals::config::AppConfig;
use lazysignals::models::{CandleSeries, Lookback};
use lazysignals::ui::{container_area, events::EventHandler, render};

/// Délai entre deux requêtes au fournisseur (rate limiting)
const FETCH_SPACING: Duration = Duration::from_millis(500);

/// Arguments de la ligne de commande
#[derive(Parser, Debug)]
#[command(name = "lazysignals", version, about = "Signaux et comparaisons sur graphique journalier")]
struct Cli {
    /// Fichier de configuration TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fichier de signaux JSON (remplace signals_path de la configuration)
    #[arg(long)]
    signals: Option<PathBuf>,
}

// ============================================================================
// AppCommand / AppResult : messages entre la boucle et les tâches de fond
// ============================================================================

/// Commandes envoyées au worker thread
#[derive(Debug, Clone)]
enum AppCommand {
    /// Récupérer les chandelles journalières d'un actif
    FetchCandles { symbol: String },
}

/// Résultats renvoyés à la boucle principale
enum AppResult {
    CandlesLoaded { symbol: String, series: CandleSeries },

    LoadError { symbol: String, error: String },

    /// Surface de graphique chargée (peut-être pour un montage périmé)
    SurfaceLoaded(LoadedSurface<TerminalSurface>),
}

// ============================================================================
// Initialisation du logging
// ============================================================================
// CONCEPT : Logging dans une app TUI
// - Les println! ne fonctionnent pas une fois le TUI lancé
// - On log vers un fichier, avec rotation quotidienne
// ============================================================================

/// Initialise le système de logging vers ./logs/lazysignals.log
///
/// ```bash
/// tail -f logs/lazysignals.log
/// RUST_LOG=lazysignals=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = PathBuf::from("./logs");
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "lazysignals.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lazysignals=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    let cli = Cli::parse();
    info!(?cli, "LazySignals starting up");

    let config = AppConfig::load(cli.config.as_deref())?;
    let signals_path = cli.signals.unwrap_or_else(|| config.signals_path.clone());
    let signals = load_signal_file(&signals_path)?;
    let provider = YahooProvider::new(&config.provider)?;

    // Runtime principal : exécute les MountTask (chargement des surfaces)
    let runtime = tokio::runtime::Runtime::new().context("Échec de la création du runtime tokio")?;

    let mut app = App::new(&config, signals);

    let (command_tx, command_rx) = mpsc::channel::<AppCommand>();
    let (result_tx, result_rx) = mpsc::channel::<AppResult>();

    info!("Spawning background worker thread");
    spawn_background_worker(command_rx, result_tx.clone(), provider, config.lookback);

    for item in &app.watchlist {
        let _ = command_tx.send(AppCommand::FetchCandles {
            symbol: item.symbol.clone(),
        });
    }

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;
    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &events, &runtime, &result_tx, &result_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    // Ferme le canal des commandes : le worker sort de sa boucle
    drop(command_tx);

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }
    result
}

// ============================================================================
// Background Worker Thread
// ============================================================================
// CONCEPT RUST : Thread + runtime dédié
// - Les appels HTTP bloquent le worker, jamais l'UI
// - Les résultats repassent par result_tx
// ============================================================================

fn spawn_background_worker(
    command_rx: mpsc::Receiver<AppCommand>,
    result_tx: mpsc::Sender<AppResult>,
    provider: YahooProvider,
    lookback: Lookback,
) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = ?e, "Failed to create worker runtime, no candles will be loaded");
                return;
            }
        };

        while let Ok(command) = command_rx.recv() {
            debug!(?command, "Worker received command");

            match command {
                AppCommand::FetchCandles { symbol } => {
                    let result = runtime.block_on(provider.fetch(&symbol, lookback));

                    let message = match result {
                        Ok(series) => AppResult::CandlesLoaded {
                            symbol: symbol.clone(),
                            series,
                        },
                        Err(e) => {
                            error!(ticker = %symbol, error = ?e, "Failed to load candles");
                            AppResult::LoadError {
                                symbol: symbol.clone(),
                                error: e.to_string(),
                            }
                        }
                    };

                    if result_tx.send(message).is_err() {
                        break;
                    }
                    runtime.block_on(tokio::time::sleep(FETCH_SPACING));
                }
            }
        }

        info!("Worker thread exiting (channel closed)");
    });
}

/// Lance le chargement d'une surface sur le runtime principal
fn spawn_mount(
    runtime: &tokio::runtime::Runtime,
    task: Option<MountTask<TerminalSurface>>,
    result_tx: &mpsc::Sender<AppResult>,
) {
    let Some(task) = task else {
        return;
    };
    debug!(symbol = task.symbol(), "Spawning surface load");

    let tx = result_tx.clone();
    runtime.spawn(async move {
        let loaded = task.run().await;
        let _ = tx.send(AppResult::SurfaceLoaded(loaded));
    });
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   0. résultats des tâches de fond
//   1. taille de la zone graphique
//   2. rendu
//   3. événements (clavier, souris)
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    runtime: &tokio::runtime::Runtime,
    result_tx: &mpsc::Sender<AppResult>,
    result_rx: &mpsc::Receiver<AppResult>,
) -> Result<()> {
    while app.is_running() {
        // 0. RÉSULTATS
        while let Ok(result) = result_rx.try_recv() {
            handle_result(app, result, runtime, result_tx);
        }

        // 1. TAILLE : le conteneur suit la zone graphique de l'écran
        let area = container_area(terminal.size()?);
        app.resize_chart_area(area.width, area.height);

        // 2. RENDER
        terminal.draw(|frame| render(frame, app))?;

        // 3. INPUT
        match events.next() {
            Ok(event) => handle_event(app, event, area, runtime, result_tx),
            Err(e) => warn!(error = ?e, "Failed to read terminal event"),
        }

        app.tick();
    }

    Ok(())
}

fn handle_result(
    app: &mut App,
    result: AppResult,
    runtime: &tokio::runtime::Runtime,
    result_tx: &mpsc::Sender<AppResult>,
) {
    match result {
        AppResult::CandlesLoaded { symbol, series } => {
            let task = app.on_candles_loaded(&symbol, series);
            spawn_mount(runtime, task, result_tx);
        }
        AppResult::LoadError { symbol, error } => {
            let task = app.on_load_failed(&symbol, error);
            spawn_mount(runtime, task, result_tx);
        }
        AppResult::SurfaceLoaded(loaded) => {
            let symbol = loaded.symbol().to_string();
            if app.attach_surface(loaded).is_ok() {
                info!(ticker = %symbol, "Chart ready");
            }
        }
    }
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Traite un événement et met à jour l'état de l'application
///
/// CONCEPT RUST : Pattern matching avec guards
/// - Navigation contextuelle selon l'écran actuel
/// - `area` : zone graphique, pour traduire la souris en coordonnées locales
fn handle_event(
    app: &mut App,
    event: lazysignals::ui::Event,
    area: Rect,
    runtime: &tokio::runtime::Runtime,
    result_tx: &mpsc::Sender<AppResult>,
) {
    use lazysignals::ui::events::{
        is_down_event, is_enter_event, is_escape_event, is_fit_event, is_pan_left_event,
        is_pan_right_event, is_quit_event, is_up_event, is_zoom_in_event, is_zoom_out_event,
        pointer_from_mouse, Event,
    };

    match event {
        Event::Key(_) if is_quit_event(&event) => {
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                app.request_quit();
            }
        }

        // N'importe quelle autre touche annule la demande de quit
        Event::Key(_) if app.is_awaiting_quit_confirmation() => app.cancel_quit(),

        Event::Key(_) if is_escape_event(&event) && app.is_on_chart() => app.close_chart(),

        Event::Key(_) if is_up_event(&event) && app.is_on_dashboard() => app.navigate_up(),
        Event::Key(_) if is_down_event(&event) && app.is_on_dashboard() => app.navigate_down(),

        Event::Key(_) if is_enter_event(&event) && app.is_on_dashboard() => {
            let task = app.open_chart();
            spawn_mount(runtime, task, result_tx);
        }

        Event::Key(_) if is_pan_left_event(&event) && app.is_on_chart() => app.pan(-1.0),
        Event::Key(_) if is_pan_right_event(&event) && app.is_on_chart() => app.pan(1.0),
        Event::Key(_) if is_zoom_in_event(&event) && app.is_on_chart() => app.zoom_in(),
        Event::Key(_) if is_zoom_out_event(&event) && app.is_on_chart() => app.zoom_out(),
        Event::Key(_) if is_fit_event(&event) && app.is_on_chart() => app.fit_chart(),

        Event::Mouse(mouse) => {
            if let Some((kind, column, row)) = pointer_from_mouse(&mouse) {
                let x = i32::from(column) - i32::from(area.x);
                let y = i32::from(row) - i32::from(area.y);
                app.pointer(kind, x, y);
            }
        }

        // Le redimensionnement est pris en compte au début de chaque itération
        Event::Resize(..) | Event::Key(_) | Event::Tick => {}
    }
}

// ============================================================================
// Terminal
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
