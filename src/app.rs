// ============================================================================
// Structure App : État de l'application
// ============================================================================
// Contient toutes les données de l'application :
// - la watchlist (actifs, chandelles, signaux)
// - l'écran courant (dashboard ou graphique)
// - le contrôleur de graphique et la zone d'écran qu'il occupe
//
// CONCEPTS RUST :
// 1. Ownership : App possède le contrôleur et le conteneur, la boucle
//    principale possède App (pas de Mutex partagé)
// 2. Option<MountTask> : le chargement de surface est rendu à l'appelant,
//    qui décide où l'exécuter
// ============================================================================

use tracing::{debug, info, warn};

use crate::api::SignalBook;
use crate::chart::host::{LoadedSurface, MountTask};
use crate::chart::{
    ChartContainer, ChartError, ChartHost, ChartSurface, PointerEvent, PointerKind, TerminalSurface,
    TerminalSurfaceLoader,
};
use crate::config::AppConfig;
use crate::models::{CandleSeries, LoadState, WatchlistItem};

/// Facteur de zoom appliqué par + et -
const ZOOM_STEP: f64 = 0.8;

/// Nombre de barres décalées par ← et →
const PAN_STEP: f64 = 5.0;

/// Écrans de l'application
///
/// CONCEPT RUST : Enum pour state management
/// - Un seul écran actif à la fois (state machine)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Vue watchlist
    Dashboard,
    /// Graphique de l'actif sélectionné
    ChartView,
}

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Actifs surveillés
    pub watchlist: Vec<WatchlistItem>,

    /// Index de l'actif sélectionné dans la watchlist
    pub selected_index: usize,

    /// Écran actuellement affiché
    pub current_screen: Screen,

    /// Two-step quit : première pression de 'q' arme, la seconde quitte
    pub confirm_quit: bool,

    /// Index de l'actif dont le graphique est ouvert
    chart_index: Option<usize>,

    host: ChartHost<TerminalSurfaceLoader>,
    container: ChartContainer,
}

impl App {
    /// Crée l'application à partir de la configuration et des signaux chargés
    ///
    /// CONCEPT RUST : Iterator + remove
    /// - Chaque actif récupère ses signaux dans le SignalBook
    pub fn new(config: &AppConfig, mut signals: SignalBook) -> Self {
        let watchlist = config
            .watchlist
            .iter()
            .map(|entry| {
                let item_signals = signals.remove(&entry.symbol).unwrap_or_default();
                WatchlistItem::new(entry.symbol.clone(), entry.name.clone()).with_signals(item_signals)
            })
            .collect();

        if !signals.is_empty() {
            warn!(
                symbols = ?signals.keys().collect::<Vec<_>>(),
                "Signals for symbols outside the watchlist ignored"
            );
        }

        Self {
            running: true,
            watchlist,
            selected_index: 0,
            current_screen: Screen::Dashboard,
            confirm_quit: false,
            chart_index: None,
            host: ChartHost::new(config.chart.clone(), config.chart_symbols(), TerminalSurfaceLoader),
            container: ChartContainer::new(0.0, 0.0),
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Navigue vers le haut dans la watchlist
    ///
    /// CONCEPT RUST : saturating_sub
    /// - Soustraction qui ne descend pas en dessous de 0
    pub fn navigate_up(&mut self) {
        if !self.watchlist.is_empty() {
            self.selected_index = self.selected_index.saturating_sub(1);
        }
    }

    /// Navigue vers le bas dans la watchlist
    pub fn navigate_down(&mut self) {
        if !self.watchlist.is_empty() && self.selected_index < self.watchlist.len() - 1 {
            self.selected_index += 1;
        }
    }

    pub fn selected_item(&self) -> Option<&WatchlistItem> {
        self.watchlist.get(self.selected_index)
    }

    /// Tick régulier (rien à animer pour l'instant)
    pub fn tick(&mut self) {}

    pub fn is_on_dashboard(&self) -> bool {
        self.current_screen == Screen::Dashboard
    }

    pub fn is_on_chart(&self) -> bool {
        self.current_screen == Screen::ChartView
    }

    // ========================================================================
    // Quit two-step
    // ========================================================================

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    // ========================================================================
    // Graphique
    // ========================================================================

    pub fn host(&self) -> &ChartHost<TerminalSurfaceLoader> {
        &self.host
    }

    pub fn container(&self) -> &ChartContainer {
        &self.container
    }

    /// Actif affiché sur l'écran graphique
    pub fn chart_item(&self) -> Option<&WatchlistItem> {
        self.watchlist.get(self.chart_index?)
    }

    /// Ouvre le graphique de l'actif sélectionné
    ///
    /// Retourne la tâche de chargement de la surface s'il y a quelque chose à
    /// monter. Si les chandelles ne sont pas encore arrivées, le montage se
    /// fera dans `on_candles_loaded`.
    pub fn open_chart(&mut self) -> Option<MountTask<TerminalSurface>> {
        let index = self.selected_index;
        self.watchlist.get(index)?;

        self.current_screen = Screen::ChartView;
        self.chart_index = Some(index);
        self.mount_chart(index)
    }

    /// Retour au dashboard : l'instance est démontée
    pub fn close_chart(&mut self) {
        self.host.teardown(&mut self.container);
        self.chart_index = None;
        self.current_screen = Screen::Dashboard;
    }

    fn mount_chart(&mut self, index: usize) -> Option<MountTask<TerminalSurface>> {
        let item = self.watchlist.get(index)?;
        let symbol = item.symbol.clone();

        let candles = match &item.state {
            LoadState::Loading => {
                // Un actif sans graphique n'attend pas ses données
                if !self.host.supports(&symbol) {
                    let result = self
                        .host
                        .mount(&mut self.container, &symbol, CandleSeries::default(), Vec::new());
                    return started(&symbol, result);
                }
                debug!(symbol = %symbol, "Candles not loaded yet, mount deferred");
                self.host.teardown(&mut self.container);
                return None;
            }
            LoadState::Loaded(series) => series.clone(),
            LoadState::Failed(_) => CandleSeries::default(),
        };
        let signals = item.signals.clone();

        let result = self.host.set_data(&mut self.container, &symbol, candles, signals);
        started(&symbol, result)
    }

    /// Chandelles reçues du fournisseur
    ///
    /// Si le graphique de cet actif est ouvert, il est remonté avec les
    /// nouvelles données.
    pub fn on_candles_loaded(&mut self, symbol: &str, series: CandleSeries) -> Option<MountTask<TerminalSurface>> {
        let index = self.watchlist.iter().position(|item| item.symbol == symbol)?;
        info!(symbol, candles = series.len(), "Updating watchlist item with new candles");
        self.watchlist[index].state = LoadState::Loaded(series);

        if self.chart_index == Some(index) {
            return self.mount_chart(index);
        }
        None
    }

    /// Le fournisseur a échoué pour cet actif
    pub fn on_load_failed(&mut self, symbol: &str, error: String) -> Option<MountTask<TerminalSurface>> {
        let index = self.watchlist.iter().position(|item| item.symbol == symbol)?;
        self.watchlist[index].state = LoadState::Failed(error);

        if self.chart_index == Some(index) {
            return self.mount_chart(index);
        }
        None
    }

    /// Remet une surface chargée au contrôleur
    pub fn attach_surface(&mut self, loaded: LoadedSurface<TerminalSurface>) -> Result<(), ChartError> {
        let result = self.host.attach(&mut self.container, loaded);
        if let Err(err) = &result {
            debug!(error = %err, "Surface not attached");
        }
        result
    }

    /// Taille de la zone graphique (en cellules)
    pub fn resize_chart_area(&mut self, width: u16, height: u16) {
        self.container.resize(f64::from(width), f64::from(height));
        self.host.pump(&mut self.container);
    }

    /// Événement souris, en cellules relatives à la zone graphique
    ///
    /// Le pointeur est placé au centre de la cellule. Les coordonnées peuvent
    /// être négatives (clic au-dessus ou à gauche de la zone).
    pub fn pointer(&mut self, kind: PointerKind, column: i32, row: i32) {
        if !self.is_on_chart() {
            return;
        }
        let event = PointerEvent::new(kind, f64::from(column) + 0.5, f64::from(row) + 0.5);
        self.container.dispatch_pointer(event);
        self.host.pump(&mut self.container);
    }

    /// Décale le graphique vers le passé (négatif) ou le récent (positif)
    pub fn pan(&mut self, direction: f64) {
        if let Some(surface) = self.host.surface_mut() {
            surface.scroll_by(direction * PAN_STEP);
        }
        self.host.pump(&mut self.container);
    }

    pub fn zoom_in(&mut self) {
        self.zoom(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom(1.0 / ZOOM_STEP);
    }

    fn zoom(&mut self, factor: f64) {
        if let Some(surface) = self.host.surface_mut() {
            surface.zoom(factor);
        }
        self.host.pump(&mut self.container);
    }

    /// Réaffiche les dernières chandelles
    pub fn fit_chart(&mut self) {
        if let Some(surface) = self.host.surface_mut() {
            surface.fit_content();
        }
        self.host.pump(&mut self.container);
    }
}

/// Tâche de chargement à lancer, ou raison pour laquelle rien n'est monté
fn started(
    symbol: &str,
    result: Result<MountTask<TerminalSurface>, ChartError>,
) -> Option<MountTask<TerminalSurface>> {
    match result {
        Ok(task) => Some(task),
        Err(err) => {
            warn!(symbol, error = %err, "Chart not mounted");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::HostState;
    use crate::config::WatchlistEntry;
    use crate::models::{Candle, Signal, SignalCategory};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn series() -> CandleSeries {
        CandleSeries::new(vec![
            Candle::new(day(2), 100.0, 101.0, 99.0, 100.0),
            Candle::new(day(3), 100.0, 106.0, 99.0, 105.0),
        ])
        .unwrap()
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.watchlist = vec![
            WatchlistEntry {
                symbol: "AAPL".to_string(),
                name: "Apple Inc.".to_string(),
                chart: true,
            },
            WatchlistEntry {
                symbol: "DOGE-USD".to_string(),
                name: "Dogecoin".to_string(),
                chart: false,
            },
        ];
        config
    }

    fn app() -> App {
        let mut book = SignalBook::new();
        book.insert(
            "AAPL".to_string(),
            vec![Signal::new("a1", Some(day(2)), SignalCategory::Buy)],
        );
        book.insert(
            "MSFT".to_string(),
            vec![Signal::new("m1", Some(day(2)), SignalCategory::Sell)],
        );
        let mut app = App::new(&config(), book);
        app.resize_chart_area(60, 20);
        app
    }

    #[test]
    fn test_signals_attached_to_watchlist() {
        let app = app();
        assert_eq!(app.watchlist.len(), 2);
        assert_eq!(app.watchlist[0].signals.len(), 1);
        assert!(app.watchlist[1].signals.is_empty());
    }

    #[test]
    fn test_navigation_bounds() {
        let mut app = app();
        app.navigate_up();
        assert_eq!(app.selected_index, 0);
        app.navigate_down();
        app.navigate_down();
        assert_eq!(app.selected_index, 1);
    }

    #[test]
    fn test_quit_confirmation() {
        let mut app = app();
        app.request_quit();
        assert!(app.is_awaiting_quit_confirmation());
        app.cancel_quit();
        assert!(!app.is_awaiting_quit_confirmation());
        app.quit();
        assert!(!app.is_running());
    }

    #[test]
    fn test_open_chart_waits_for_candles() {
        let mut app = app();
        assert!(app.open_chart().is_none());
        assert!(app.is_on_chart());
        assert_eq!(*app.host().state(), HostState::Empty);

        assert!(app.on_candles_loaded("AAPL", series()).is_some());
        assert_eq!(*app.host().state(), HostState::Loading("AAPL".to_string()));
    }

    #[test]
    fn test_unsupported_asset_shows_no_chart() {
        let mut app = app();
        app.navigate_down();
        assert!(app.open_chart().is_none());
        assert_eq!(*app.host().state(), HostState::Unsupported("DOGE-USD".to_string()));
    }

    #[test]
    fn test_unsupported_asset_ignores_candles() {
        let mut app = app();
        app.navigate_down();
        app.open_chart();

        assert!(app.on_candles_loaded("DOGE-USD", series()).is_none());
        assert_eq!(*app.host().state(), HostState::Unsupported("DOGE-USD".to_string()));
        assert!(app.container().overlay().is_none());
    }

    #[test]
    fn test_failed_load_reports_unavailable() {
        let mut app = app();
        app.open_chart();
        assert!(app.on_load_failed("AAPL", "HTTP 404".to_string()).is_none());
        assert!(matches!(
            app.host().state(),
            HostState::Failed { error: ChartError::DataUnavailable(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_chart_lifecycle() {
        let mut app = app();
        app.on_candles_loaded("AAPL", series());

        let task = app.open_chart().unwrap();
        let loaded = task.run().await;
        app.attach_surface(loaded).unwrap();
        assert_eq!(*app.host().state(), HostState::Ready("AAPL".to_string()));
        assert_eq!(app.chart_item().map(|item| item.symbol.as_str()), Some("AAPL"));

        app.close_chart();
        assert!(app.is_on_dashboard());
        assert!(app.container().overlay().is_none());
        assert_eq!(app.container().listener_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_surface_after_close() {
        let mut app = app();
        app.on_candles_loaded("AAPL", series());

        let task = app.open_chart().unwrap();
        app.close_chart();
        let loaded = task.run().await;

        assert_eq!(app.attach_surface(loaded), Err(ChartError::Cancelled));
        assert!(app.container().overlay().is_none());
    }

    #[tokio::test]
    async fn test_click_on_marker_from_cells() {
        let mut app = app();
        app.on_candles_loaded("AAPL", series());
        let loaded = app.open_chart().unwrap().run().await;
        app.attach_surface(loaded).unwrap();

        let view = app
            .host()
            .instance()
            .and_then(|instance| instance.markers().view(&crate::models::SignalId::new("a1")))
            .and_then(|view| view.position)
            .unwrap();

        app.pointer(PointerKind::Down, view.x.floor() as i32, view.y.floor() as i32);
        let detail = app.host().instance().and_then(|instance| instance.markers().detail_signal().cloned());
        assert_eq!(detail.map(|id| id.0), Some("a1".to_string()));
    }
}
