// ============================================================================
// Gestionnaire des marqueurs de signaux
// ============================================================================
// Maintient une vue par signal positionnable :
// - marqueur (glyphe) au-dessus de la clôture de référence
// - ligne de liaison entre la clôture et le marqueur
// - bulle d'aperçu, visible seulement au survol
//
// Les vues sont créées la première fois qu'un signal est positionnable, puis
// seulement cachées / repositionnées. `clear()` les détruit au démontage.
// ============================================================================

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::chart::overlay::{
    Bounds, NodeId, NodeKind, OverlayLayer, Point, PopoverContent, BUBBLE_Z, CONNECTOR_Z,
    MARKER_HOVER_Z, MARKER_Z, POPOVER_Z,
};
use crate::chart::resolver::{resolve_marker_position, MarkerPoint, Placement, ResolverPolicy};
use crate::chart::surface::CoordinateSpace;
use crate::models::{CandleSeries, Signal, SignalId};

/// Largeur du popover de détail (bordures comprises)
pub const POPOVER_WIDTH: f64 = 42.0;

/// Vue d'un signal dans l'overlay
#[derive(Debug, Clone)]
pub struct MarkerView {
    pub signal: Signal,
    pub position: Option<MarkerPoint>,
    marker: NodeId,
    connector: NodeId,
    bubble: NodeId,
}

impl MarkerView {
    pub fn marker_node(&self) -> NodeId {
        self.marker
    }

    pub fn connector_node(&self) -> NodeId {
        self.connector
    }

    pub fn bubble_node(&self) -> NodeId {
        self.bubble
    }
}

/// Bilan d'une passe de synchronisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub shown: usize,
    pub hidden: usize,
}

#[derive(Debug, Clone)]
struct DetailPopover {
    signal: SignalId,
    node: NodeId,
}

#[derive(Debug)]
pub struct MarkerOverlay {
    views: BTreeMap<SignalId, MarkerView>,
    policy: ResolverPolicy,
    preview_offset: f64,
    hovered: Option<SignalId>,
    detail: Option<DetailPopover>,
}

impl MarkerOverlay {
    pub fn new(policy: ResolverPolicy, preview_offset: f64) -> Self {
        Self {
            views: BTreeMap::new(),
            policy,
            preview_offset,
            hovered: None,
            detail: None,
        }
    }

    // ========================================================================
    // Synchronisation
    // ========================================================================

    /// Recalcule la position de tous les marqueurs
    ///
    /// Idempotent : deux appels avec les mêmes entrées laissent l'overlay
    /// dans le même état. Un id déjà vu dans la liste est ignoré.
    pub fn sync<C>(
        &mut self,
        signals: &[Signal],
        candles: &CandleSeries,
        coords: &C,
        overlay: &mut OverlayLayer,
    ) -> SyncReport
    where
        C: CoordinateSpace + ?Sized,
    {
        let mut report = SyncReport::default();
        let mut seen = BTreeSet::new();

        for signal in signals {
            if !seen.insert(signal.id.clone()) {
                continue;
            }

            match resolve_marker_position(signal, candles, coords, &self.policy) {
                Placement::Positioned(point) => {
                    let view = self
                        .views
                        .entry(signal.id.clone())
                        .or_insert_with(|| create_view(signal, overlay));
                    view.position = Some(point);
                    place_view(view, point, overlay);
                    report.shown += 1;
                }
                Placement::Hidden(_) => {
                    if self.hovered.as_ref() == Some(&signal.id) {
                        self.hover_leave(&signal.id, overlay);
                    }
                    if let Some(view) = self.views.get_mut(&signal.id) {
                        view.position = None;
                        overlay.set_visible(view.marker, false);
                        overlay.set_visible(view.connector, false);
                        overlay.set_visible(view.bubble, false);
                    }
                    report.hidden += 1;
                }
            }
        }

        // Signaux disparus de la liste
        let stale: Vec<SignalId> = self
            .views
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for id in stale {
            self.remove_view(&id, overlay);
        }

        self.place_detail(overlay);
        report
    }

    /// Marqueurs actuellement visibles
    pub fn visible_count(&self) -> usize {
        self.views.values().filter(|v| v.position.is_some()).count()
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn view(&self, id: &SignalId) -> Option<&MarkerView> {
        self.views.get(id)
    }

    pub fn hovered(&self) -> Option<&SignalId> {
        self.hovered.as_ref()
    }

    pub fn detail_signal(&self) -> Option<&SignalId> {
        self.detail.as_ref().map(|d| &d.signal)
    }

    // ========================================================================
    // Hit testing
    // ========================================================================

    /// Signal dont le marqueur est sous le point
    pub fn marker_at(&self, point: Point, overlay: &OverlayLayer) -> Option<SignalId> {
        let node = overlay.hit_test(point)?;
        self.signal_for_marker(node)
    }

    pub fn signal_for_marker(&self, node: NodeId) -> Option<SignalId> {
        self.views
            .iter()
            .find(|(_, view)| view.marker == node)
            .map(|(id, _)| id.clone())
    }

    /// Vrai si le point tombe sur un marqueur, une bulle ou le popover
    pub fn is_on_interactive(&self, point: Point, overlay: &OverlayLayer) -> bool {
        let Some(node) = overlay.hit_test(point) else {
            return false;
        };
        self.detail.as_ref().is_some_and(|d| d.node == node)
            || self
                .views
                .values()
                .any(|view| view.marker == node || view.bubble == node)
    }

    // ========================================================================
    // Survol
    // ========================================================================

    /// Début de survol : agrandit le marqueur, affiche la bulle, allume la ligne
    pub fn hover_enter(&mut self, id: &SignalId, cursor: Point, symbol: &str, overlay: &mut OverlayLayer) {
        if let Some(previous) = self.hovered.clone() {
            if &previous != id {
                self.hover_leave(&previous, overlay);
            }
        }

        let Some(view) = self.views.get(id) else {
            return;
        };
        if view.position.is_none() {
            return;
        }

        if let Some(node) = overlay.get_mut(view.marker) {
            if let NodeKind::Marker { enlarged, .. } = &mut node.kind {
                *enlarged = true;
            }
            node.z = MARKER_HOVER_Z;
        }

        let lines = vec![symbol.to_string(), view.signal.category.label().to_string()];
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as f64 + 4.0;
        if let Some(node) = overlay.get_mut(view.bubble) {
            node.kind = NodeKind::PreviewBubble { lines };
            node.bounds = Bounds::new(
                (cursor.x + self.preview_offset).floor(),
                (cursor.y - 4.0).floor(),
                width,
                4.0,
            );
            node.visible = true;
        }

        set_connector_lit(overlay, view.connector, true);
        self.hovered = Some(id.clone());
    }

    /// Fin de survol
    pub fn hover_leave(&mut self, id: &SignalId, overlay: &mut OverlayLayer) {
        if self.hovered.as_ref() == Some(id) {
            self.hovered = None;
        }

        let Some(view) = self.views.get(id) else {
            return;
        };

        if let Some(node) = overlay.get_mut(view.marker) {
            if let NodeKind::Marker { enlarged, .. } = &mut node.kind {
                *enlarged = false;
            }
            node.z = MARKER_Z;
        }
        overlay.set_visible(view.bubble, false);

        let pinned = self.detail.as_ref().is_some_and(|d| &d.signal == id);
        if !pinned {
            set_connector_lit(overlay, view.connector, false);
        }
    }

    // ========================================================================
    // Popover de détail
    // ========================================================================

    /// Ouvre le popover de détail d'un signal (remplace celui déjà ouvert)
    pub fn open_detail(&mut self, id: &SignalId, overlay: &mut OverlayLayer) -> bool {
        let Some(view) = self.views.get(id) else {
            return false;
        };

        let content = PopoverContent {
            attribution: view.signal.attribution.clone(),
            category: view.signal.category,
            text: view.signal.text.clone(),
            link: view.signal.external_link.clone(),
        };
        let connector = view.connector;

        match self.detail.take() {
            Some(previous) => {
                if previous.signal != *id {
                    if let Some(old) = self.views.get(&previous.signal) {
                        set_connector_lit(overlay, old.connector, false);
                    }
                }
                if let Some(node) = overlay.get_mut(previous.node) {
                    node.kind = NodeKind::DetailPopover(content);
                }
                self.detail = Some(DetailPopover {
                    signal: id.clone(),
                    node: previous.node,
                });
            }
            None => {
                let node = overlay.insert(
                    NodeKind::DetailPopover(content),
                    Bounds::default(),
                    POPOVER_Z,
                    false,
                );
                self.detail = Some(DetailPopover {
                    signal: id.clone(),
                    node,
                });
            }
        }

        set_connector_lit(overlay, connector, true);
        self.place_detail(overlay);
        debug!(signal = %id, "Detail popover opened");
        true
    }

    /// Ferme le popover et éteint les lignes allumées (sauf celle survolée)
    pub fn dismiss_detail(&mut self, overlay: &mut OverlayLayer) {
        let Some(detail) = self.detail.take() else {
            return;
        };
        overlay.remove(detail.node);

        for (id, view) in &self.views {
            if self.hovered.as_ref() != Some(id) {
                set_connector_lit(overlay, view.connector, false);
            }
        }
    }

    /// Détruit toutes les vues et le popover
    pub fn clear(&mut self, overlay: &mut OverlayLayer) {
        if let Some(detail) = self.detail.take() {
            overlay.remove(detail.node);
        }
        let ids: Vec<SignalId> = self.views.keys().cloned().collect();
        for id in ids {
            self.remove_view(&id, overlay);
        }
        self.hovered = None;
    }

    fn remove_view(&mut self, id: &SignalId, overlay: &mut OverlayLayer) {
        if let Some(view) = self.views.remove(id) {
            overlay.remove(view.marker);
            overlay.remove(view.connector);
            overlay.remove(view.bubble);
        }
        if self.hovered.as_ref() == Some(id) {
            self.hovered = None;
        }
        if self.detail.as_ref().is_some_and(|d| &d.signal == id) {
            if let Some(detail) = self.detail.take() {
                overlay.remove(detail.node);
            }
        }
    }

    /// Ancre le popover à droite de son marqueur (caché si le marqueur l'est)
    fn place_detail(&self, overlay: &mut OverlayLayer) {
        let Some(detail) = &self.detail else {
            return;
        };
        let position = self.views.get(&detail.signal).and_then(|v| v.position);

        let Some(node) = overlay.get_mut(detail.node) else {
            return;
        };
        match position {
            Some(point) => {
                let height = match &node.kind {
                    NodeKind::DetailPopover(content) => popover_height(content),
                    _ => 4.0,
                };
                node.bounds = Bounds::new(point.x.floor() + 2.0, point.y.floor(), POPOVER_WIDTH, height);
                node.visible = true;
            }
            None => node.visible = false,
        }
    }
}

fn create_view(signal: &Signal, overlay: &mut OverlayLayer) -> MarkerView {
    let marker = overlay.insert(
        NodeKind::Marker {
            category: signal.category,
            enlarged: false,
        },
        Bounds::default(),
        MARKER_Z,
        false,
    );
    let connector = overlay.insert(NodeKind::Connector { lit: false }, Bounds::default(), CONNECTOR_Z, false);
    let bubble = overlay.insert(
        NodeKind::PreviewBubble { lines: Vec::new() },
        Bounds::default(),
        BUBBLE_Z,
        false,
    );
    debug!(signal = %signal.id, "Marker view created");

    MarkerView {
        signal: signal.clone(),
        position: None,
        marker,
        connector,
        bubble,
    }
}

fn place_view(view: &MarkerView, point: MarkerPoint, overlay: &mut OverlayLayer) {
    let marker = Bounds::cell_at(Point::new(point.x, point.y));
    overlay.set_bounds(view.marker, marker);
    overlay.set_visible(view.marker, true);

    // La ligne part sous le marqueur et descend jusqu'à la clôture
    let top = marker.bottom();
    let height = (point.anchor_y.floor() + 1.0 - top).max(0.0);
    overlay.set_bounds(view.connector, Bounds::new(marker.x, top, 1.0, height));
    overlay.set_visible(view.connector, height > 0.0);
}

fn set_connector_lit(overlay: &mut OverlayLayer, node: NodeId, value: bool) {
    if let Some(node) = overlay.get_mut(node) {
        if let NodeKind::Connector { lit } = &mut node.kind {
            *lit = value;
        }
    }
}

/// Hauteur du popover : bordures, badge, texte replié, lien éventuel
fn popover_height(content: &PopoverContent) -> f64 {
    let inner = (POPOVER_WIDTH - 2.0) as usize;
    let text_lines = content
        .text
        .lines()
        .map(|line| line.chars().count().max(1).div_ceil(inner))
        .sum::<usize>()
        .max(1);
    let link = usize::from(content.link.is_some());
    (2 + 1 + text_lines + link) as f64
}
