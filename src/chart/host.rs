// ============================================================================
// Contrôleur de graphique
// ============================================================================
// Gère la vie d'UNE instance de graphique dans un conteneur :
//
//   mount() ──► MountTask::run().await ──► attach() ──► Ready
//      │                                                  │
//      └──────────── teardown() (changement d'actif) ◄────┘
//
// - La surface se charge de façon asynchrone : un LifetimeToken lie le
//   chargement à l'instance qui l'a demandé. Si l'instance a été démontée
//   entre-temps, la surface fraîche est détruite sans toucher au conteneur.
// - Les callbacks de la surface et les listeners du conteneur ne font
//   qu'envoyer un HostEvent dans un canal ; `pump()` les traite ensuite un
//   par un, jusqu'au bout.
// - Chaque abonnement retourne un handle rangé dans les Disposers de
//   l'instance, tous exécutés au démontage.
//
// CONCEPTS RUST :
// 1. Generics + type associé : ChartHost<L> connaît le type exact de surface
// 2. std::sync::mpsc : file d'événements entre callbacks et contrôleur
// 3. async fn sur une tâche Send qui n'emprunte pas le contrôleur
// ============================================================================

use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, error, info, instrument, warn};

use crate::chart::comparison::RangeComparison;
use crate::chart::container::{ChartContainer, ContainerEvent, ListenerTarget, PointerEvent, PointerKind};
use crate::chart::lifetime::{Disposers, LifetimeToken};
use crate::chart::markers::{MarkerOverlay, SyncReport};
use crate::chart::overlay::{OverlayLayer, Point};
use crate::chart::resolver::ResolverPolicy;
use crate::chart::surface::{ChartSurface, SurfaceFuture, SurfaceLoader, SurfaceOptions, VisibleRange};
use crate::chart::ChartError;
use crate::config::ChartConfig;
use crate::models::{CandleSeries, Signal};

/// État affiché par l'écran du graphique
#[derive(Debug, Clone, PartialEq)]
pub enum HostState {
    /// Aucun graphique demandé
    Empty,
    /// Actif sans graphique : aucune surface n'est créée
    Unsupported(String),
    /// Surface en cours de chargement
    Loading(String),
    Ready(String),
    /// Données ou surface indisponibles (message statique, pas de nouvel essai)
    Failed { symbol: String, error: ChartError },
}

/// Événements relayés vers le contrôleur
#[derive(Debug, Clone, Copy, PartialEq)]
enum HostEvent {
    VisibleRangeChanged(VisibleRange),
    Resized { width: f64, height: f64 },
    Pointer(PointerEvent),
    DocumentPointerDown(Point),
}

/// Une instance de graphique montée
pub struct ChartInstance<S> {
    symbol: String,
    surface: S,
    candles: CandleSeries,
    signals: Vec<Signal>,
    markers: MarkerOverlay,
    comparison: RangeComparison,
    disposers: Disposers,
    token: LifetimeToken,
}

impl<S: ChartSurface> ChartInstance<S> {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn candles(&self) -> &CandleSeries {
        &self.candles
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn markers(&self) -> &MarkerOverlay {
        &self.markers
    }

    pub fn comparison(&self) -> &RangeComparison {
        &self.comparison
    }

    fn sync_markers(&mut self, overlay: &mut OverlayLayer) -> SyncReport {
        self.markers
            .sync(&self.signals, &self.candles, &self.surface, overlay)
    }

    /// Routage d'un événement de pointeur dans la zone du graphique
    ///
    /// Marqueurs et comparaison s'excluent : un pointer-down sur un nœud
    /// interactif ne démarre jamais de glisser.
    fn handle_pointer(&mut self, event: PointerEvent, overlay: &mut OverlayLayer) {
        let point = event.position;

        match event.kind {
            PointerKind::Down => match overlay.hit_test(point) {
                Some(node) if Some(node) == self.comparison.result_node() => {
                    self.comparison.dismiss(overlay);
                }
                Some(node) => {
                    if let Some(id) = self.markers.signal_for_marker(node) {
                        self.markers.open_detail(&id, overlay);
                    }
                }
                None => {
                    let plot = self.surface.plot_bounds();
                    self.comparison.begin(point, plot, &self.surface, overlay);
                }
            },
            PointerKind::Move => {
                if self.comparison.is_dragging() {
                    let plot = self.surface.plot_bounds();
                    self.comparison.update(point.x, plot, overlay);
                    return;
                }
                match self.markers.marker_at(point, overlay) {
                    Some(id) => self.markers.hover_enter(&id, point, &self.symbol, overlay),
                    None => {
                        if let Some(id) = self.markers.hovered().cloned() {
                            self.markers.hover_leave(&id, overlay);
                        }
                    }
                }
            }
            PointerKind::Up => {
                if self.comparison.is_dragging() {
                    self.comparison
                        .finish(point, &self.candles, &self.surface, overlay);
                }
            }
        }
    }
}

struct PendingMount {
    token: LifetimeToken,
    symbol: String,
    candles: CandleSeries,
    signals: Vec<Signal>,
}

/// Chargement de surface en cours, détaché du contrôleur
///
/// `run()` peut être confié à `tokio::spawn` : la tâche n'emprunte rien.
pub struct MountTask<S> {
    token: LifetimeToken,
    symbol: String,
    future: SurfaceFuture<S>,
}

/// Résultat d'un MountTask, à remettre à `ChartHost::attach`
pub struct LoadedSurface<S> {
    token: LifetimeToken,
    symbol: String,
    result: Result<S, ChartError>,
}

impl<S: ChartSurface + 'static> MountTask<S> {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub async fn run(self) -> LoadedSurface<S> {
        let MountTask {
            token,
            symbol,
            future,
        } = self;

        let result = future.await;

        // Première chose après le point de suspension
        if token.is_cancelled() {
            if let Ok(mut surface) = result {
                surface.dispose();
            }
            debug!(symbol = %symbol, "Surface loaded for a cancelled mount, disposed");
            return LoadedSurface {
                token,
                symbol,
                result: Err(ChartError::Cancelled),
            };
        }

        LoadedSurface {
            token,
            symbol,
            result,
        }
    }
}

impl<S> LoadedSurface<S> {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

pub struct ChartHost<L: SurfaceLoader> {
    config: ChartConfig,
    chart_symbols: BTreeSet<String>,
    loader: L,
    state: HostState,
    pending: Option<PendingMount>,
    instance: Option<ChartInstance<L::Surface>>,
    events: Sender<HostEvent>,
    inbox: Receiver<HostEvent>,
}

impl<L: SurfaceLoader> ChartHost<L> {
    pub fn new(config: ChartConfig, chart_symbols: BTreeSet<String>, loader: L) -> Self {
        let (events, inbox) = mpsc::channel();
        Self {
            config,
            chart_symbols,
            loader,
            state: HostState::Empty,
            pending: None,
            instance: None,
            events,
            inbox,
        }
    }

    pub fn state(&self) -> &HostState {
        &self.state
    }

    pub fn instance(&self) -> Option<&ChartInstance<L::Surface>> {
        self.instance.as_ref()
    }

    /// Accès à la surface montée (pan, zoom, fit depuis le clavier)
    pub fn surface_mut(&mut self) -> Option<&mut L::Surface> {
        self.instance.as_mut().map(|instance| &mut instance.surface)
    }

    pub fn supports(&self, symbol: &str) -> bool {
        self.chart_symbols.contains(symbol)
    }

    // ========================================================================
    // Montage
    // ========================================================================

    /// Démarre le montage d'un graphique
    ///
    /// Démonte toujours l'instance précédente d'abord. Retourne la tâche de
    /// chargement de la surface, ou l'erreur si aucun graphique ne peut être
    /// affiché (l'état reflète alors la raison).
    #[instrument(skip(self, container, candles, signals), fields(candles = candles.len(), signals = signals.len()))]
    pub fn mount(
        &mut self,
        container: &mut ChartContainer,
        symbol: &str,
        candles: CandleSeries,
        signals: Vec<Signal>,
    ) -> Result<MountTask<L::Surface>, ChartError> {
        self.teardown(container);

        if !self.supports(symbol) {
            info!("Chart not available for this asset");
            self.state = HostState::Unsupported(symbol.to_string());
            return Err(ChartError::UnsupportedAsset(symbol.to_string()));
        }

        if candles.is_empty() {
            warn!("No candles to display");
            let error = ChartError::DataUnavailable(symbol.to_string());
            self.state = HostState::Failed {
                symbol: symbol.to_string(),
                error: error.clone(),
            };
            return Err(error);
        }

        let token = LifetimeToken::new();
        let (width, height) = container.size();
        let future = self.loader.load(SurfaceOptions { width, height });

        self.pending = Some(PendingMount {
            token: token.clone(),
            symbol: symbol.to_string(),
            candles,
            signals,
        });
        self.state = HostState::Loading(symbol.to_string());
        debug!("Surface load started");

        Ok(MountTask {
            token,
            symbol: symbol.to_string(),
            future,
        })
    }

    /// Données changées (nouvel actif ou rechargement) : démonte puis remonte
    pub fn set_data(
        &mut self,
        container: &mut ChartContainer,
        symbol: &str,
        candles: CandleSeries,
        signals: Vec<Signal>,
    ) -> Result<MountTask<L::Surface>, ChartError> {
        debug!(symbol, "Chart data changed, remounting");
        self.mount(container, symbol, candles, signals)
    }

    /// Termine le montage avec la surface chargée
    ///
    /// Une surface arrivée pour un montage annulé ou remplacé est détruite et
    /// le conteneur n'est pas touché.
    pub fn attach(
        &mut self,
        container: &mut ChartContainer,
        loaded: LoadedSurface<L::Surface>,
    ) -> Result<(), ChartError> {
        let LoadedSurface {
            token,
            symbol,
            result,
        } = loaded;

        let pending = match self.pending.take() {
            Some(pending) if pending.token.same_as(&token) && !token.is_cancelled() => pending,
            other => {
                self.pending = other;
                if let Ok(mut surface) = result {
                    surface.dispose();
                }
                debug!(symbol = %symbol, "Stale surface discarded");
                return Err(ChartError::Cancelled);
            }
        };

        match result {
            Ok(surface) => {
                self.build_instance(container, pending, surface);
                Ok(())
            }
            Err(err) => {
                error!(symbol = %symbol, error = %err, "Chart surface failed to load");
                self.state = HostState::Failed {
                    symbol,
                    error: err.clone(),
                };
                Err(err)
            }
        }
    }

    /// Montage complet en une fois (mount, chargement, attach)
    pub async fn open(
        &mut self,
        container: &mut ChartContainer,
        symbol: &str,
        candles: CandleSeries,
        signals: Vec<Signal>,
    ) -> Result<(), ChartError> {
        let task = self.mount(container, symbol, candles, signals)?;
        let loaded = task.run().await;
        self.attach(container, loaded)
    }

    fn build_instance(&mut self, container: &mut ChartContainer, pending: PendingMount, mut surface: L::Surface) {
        let PendingMount {
            token,
            symbol,
            candles,
            signals,
        } = pending;

        let (width, height) = container.size();
        surface.resize(width, height);
        surface.set_series(&candles);
        surface.fit_content();

        let mut disposers = Disposers::new();

        let tx = self.events.clone();
        disposers.push_subscription(surface.on_visible_range_changed(Box::new(move |range| {
            let _ = tx.send(HostEvent::VisibleRangeChanged(range));
        })));

        let tx = self.events.clone();
        disposers.push_subscription(container.add_listener(ListenerTarget::Resize, move |event| {
            if let ContainerEvent::Resized { width, height } = *event {
                let _ = tx.send(HostEvent::Resized { width, height });
            }
        }));

        let tx = self.events.clone();
        disposers.push_subscription(container.add_listener(ListenerTarget::Document, move |event| {
            if let ContainerEvent::Pointer(pointer) = *event {
                if pointer.kind == PointerKind::Down {
                    let _ = tx.send(HostEvent::DocumentPointerDown(pointer.position));
                }
            }
        }));

        let tx = self.events.clone();
        disposers.push_subscription(container.add_listener(ListenerTarget::Plot, move |event| {
            if let ContainerEvent::Pointer(pointer) = *event {
                let _ = tx.send(HostEvent::Pointer(pointer));
            }
        }));

        let mut instance = ChartInstance {
            symbol: symbol.clone(),
            surface,
            candles,
            signals,
            markers: MarkerOverlay::new(ResolverPolicy::from(&self.config), self.config.preview_offset),
            comparison: RangeComparison::new(&self.config),
            disposers,
            token,
        };

        let overlay = container.create_overlay_root();
        let report = instance.sync_markers(overlay);

        info!(
            symbol = %symbol,
            candles = instance.candles.len(),
            shown = report.shown,
            hidden = report.hidden,
            "Chart mounted"
        );
        self.instance = Some(instance);
        self.state = HostState::Ready(symbol);
    }

    // ========================================================================
    // Démontage
    // ========================================================================

    /// Démonte l'instance courante (idempotent)
    ///
    /// Annule le jeton, exécute les disposers, retire l'overlay du conteneur,
    /// détruit la surface et vide la file d'événements.
    pub fn teardown(&mut self, container: &mut ChartContainer) {
        if let Some(pending) = self.pending.take() {
            pending.token.cancel();
            debug!(symbol = %pending.symbol, "Pending mount cancelled");
        }

        if let Some(mut instance) = self.instance.take() {
            instance.token.cancel();
            instance.disposers.dispose_all();
            if let Some(overlay) = container.overlay_mut() {
                instance.markers.clear(overlay);
                instance.comparison.dismiss(overlay);
            }
            instance.surface.dispose();
            info!(symbol = %instance.symbol, "Chart torn down");
        }

        container.remove_overlay_root();
        while self.inbox.try_recv().is_ok() {}
        self.state = HostState::Empty;
    }

    // ========================================================================
    // Événements
    // ========================================================================

    /// Traite tous les événements en attente, dans l'ordre
    ///
    /// Retourne le nombre d'événements traités.
    pub fn pump(&mut self, container: &mut ChartContainer) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbox.try_recv() {
            handled += 1;
            self.handle(container, event);
        }
        handled
    }

    fn handle(&mut self, container: &mut ChartContainer, event: HostEvent) {
        let Some(instance) = self.instance.as_mut() else {
            return;
        };
        let Some(overlay) = container.overlay_mut() else {
            return;
        };

        match event {
            HostEvent::VisibleRangeChanged(_) => {
                instance.sync_markers(overlay);
            }
            HostEvent::Resized { width, height } => {
                instance.surface.resize(width, height);
                instance.comparison.relayout(instance.surface.plot_bounds(), overlay);
                instance.sync_markers(overlay);
            }
            HostEvent::DocumentPointerDown(point) => {
                if !instance.markers.is_on_interactive(point, overlay) {
                    instance.markers.dismiss_detail(overlay);
                }
            }
            HostEvent::Pointer(pointer) => instance.handle_pointer(pointer, overlay),
        }
    }
}
