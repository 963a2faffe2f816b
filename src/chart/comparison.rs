// ============================================================================
// Outil de comparaison de prix par glisser
// ============================================================================
// Machine à états : Idle → Dragging → Resolved → Idle
//
// - pointer-down dans la zone de tracé : ancre (date + position)
// - pointer-move : rectangle translucide entre l'ancre et le curseur
// - pointer-up : chandelles les plus proches des deux dates, variation
//   absolue et relative, popover de résultat près du point de relâche
//
// Ne modifie jamais les chandelles ni les signaux.
// ============================================================================

use chrono::NaiveDate;
use tracing::debug;

use crate::chart::overlay::{Bounds, NodeId, NodeKind, OverlayLayer, Point, POPOVER_Z, SELECTION_Z};
use crate::chart::surface::CoordinateSpace;
use crate::config::ChartConfig;
use crate::models::{Candle, CandleSeries};

/// Résultat d'une comparaison entre deux chandelles
///
/// `start` est toujours la date la plus ancienne.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub start_close: f64,
    pub end_close: f64,
    pub delta: f64,
    pub delta_pct: f64,
}

impl Comparison {
    /// Compare deux chandelles, dans n'importe quel ordre
    ///
    /// None si elles sont à la même date ou si la clôture de départ est nulle.
    pub fn between(a: &Candle, b: &Candle) -> Option<Self> {
        if a.time == b.time {
            return None;
        }
        let (first, last) = if a.time < b.time { (a, b) } else { (b, a) };
        if first.close == 0.0 {
            return None;
        }

        let delta = last.close - first.close;
        Some(Self {
            start: first.time,
            end: last.time,
            start_close: first.close,
            end_close: last.close,
            delta,
            delta_pct: delta / first.close * 100.0,
        })
    }

    pub fn is_gain(&self) -> bool {
        self.delta >= 0.0
    }

    /// "+20.00"
    pub fn format_delta(&self) -> String {
        format!("{:+.2}", self.delta)
    }

    /// "+20.0%"
    pub fn format_pct(&self) -> String {
        format!("{:+.1}%", self.delta_pct)
    }

    /// "2025-01-01 – 2025-01-10"
    pub fn format_span(&self) -> String {
        format!("{} – {}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }

    /// Lignes du popover de résultat
    pub fn lines(&self) -> Vec<String> {
        vec![
            self.format_span(),
            format!("{:.2} → {:.2}", self.start_close, self.end_close),
            format!("{}  ({})", self.format_delta(), self.format_pct()),
        ]
    }
}

/// Glisser en cours
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub anchor_time: NaiveDate,
    pub anchor_x: f64,
    pub anchor_y: f64,
    pub current_x: f64,
    interior: Bounds,
    rect: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Idle,
    Dragging(DragState),
    Resolved { comparison: Comparison, popover: NodeId },
}

/// Pourquoi un relâchement ne produit pas de comparaison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abandon {
    NotDragging,
    UnresolvedTime,
    BelowThreshold,
    SameTime,
    NoCandle,
    /// Clôture de départ nulle : variation relative indéfinie
    ZeroBase,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    Compared(Comparison),
    Abandoned(Abandon),
}

#[derive(Debug)]
pub struct RangeComparison {
    state: Selection,
    min_drag_distance: f64,
    plot_margin: f64,
    max_gap_days: i64,
}

impl RangeComparison {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            state: Selection::Idle,
            min_drag_distance: config.min_drag_distance,
            plot_margin: config.plot_margin,
            max_gap_days: config.max_gap_days,
        }
    }

    pub fn state(&self) -> &Selection {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, Selection::Dragging(_))
    }

    /// Nœud du popover de résultat, s'il est affiché
    pub fn result_node(&self) -> Option<NodeId> {
        match &self.state {
            Selection::Resolved { popover, .. } => Some(*popover),
            _ => None,
        }
    }

    /// Démarre un glisser
    ///
    /// Refusé hors de l'intérieur de la zone de tracé (marges exclues) ou si
    /// aucune date ne correspond au point.
    pub fn begin<C>(&mut self, point: Point, plot: Bounds, coords: &C, overlay: &mut OverlayLayer) -> bool
    where
        C: CoordinateSpace + ?Sized,
    {
        let interior = plot.shrink(self.plot_margin);
        if !interior.contains(point) {
            return false;
        }
        let Some(anchor_time) = coords.coordinate_to_time(point.x) else {
            return false;
        };

        self.dismiss(overlay);

        let rect = overlay.insert(
            NodeKind::SelectionRect,
            selection_bounds(&interior, point.x, point.x),
            SELECTION_Z,
            true,
        );
        self.state = Selection::Dragging(DragState {
            anchor_time,
            anchor_x: point.x,
            anchor_y: point.y,
            current_x: point.x,
            interior,
            rect,
        });
        debug!(%anchor_time, "Range selection started");
        true
    }

    /// Suit le curseur (rectangle seulement, aucun calcul de prix)
    ///
    /// `plot` est la zone de tracé courante : elle a pu changer depuis
    /// `begin` (redimensionnement pendant le glisser).
    pub fn update(&mut self, x: f64, plot: Bounds, overlay: &mut OverlayLayer) -> bool {
        let Selection::Dragging(drag) = &mut self.state else {
            return false;
        };
        drag.interior = plot.shrink(self.plot_margin);
        drag.current_x = x.clamp(drag.interior.x, drag.interior.right());
        overlay.set_bounds(drag.rect, selection_bounds(&drag.interior, drag.anchor_x, drag.current_x));
        true
    }

    /// Recale le rectangle en cours sur une nouvelle zone de tracé
    pub fn relayout(&mut self, plot: Bounds, overlay: &mut OverlayLayer) -> bool {
        let Selection::Dragging(drag) = &self.state else {
            return false;
        };
        let x = drag.current_x;
        self.update(x, plot, overlay)
    }

    /// Termine le glisser
    pub fn finish<C>(
        &mut self,
        point: Point,
        candles: &CandleSeries,
        coords: &C,
        overlay: &mut OverlayLayer,
    ) -> GestureOutcome
    where
        C: CoordinateSpace + ?Sized,
    {
        let drag = match std::mem::replace(&mut self.state, Selection::Idle) {
            Selection::Dragging(drag) => drag,
            other => {
                self.state = other;
                return GestureOutcome::Abandoned(Abandon::NotDragging);
            }
        };
        overlay.remove(drag.rect);

        let outcome = self.compare(&drag, point, candles, coords);
        match outcome {
            GestureOutcome::Compared(comparison) => {
                let lines = comparison.lines();
                let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as f64 + 4.0;
                let popover = overlay.insert(
                    NodeKind::ComparisonResult {
                        lines,
                        gain: comparison.is_gain(),
                    },
                    Bounds::new(point.x.floor() + 1.0, point.y.floor(), width, 5.0),
                    POPOVER_Z,
                    true,
                );
                self.state = Selection::Resolved { comparison, popover };
                debug!(
                    start = %comparison.start,
                    end = %comparison.end,
                    delta = comparison.delta,
                    "Range comparison resolved"
                );
            }
            GestureOutcome::Abandoned(reason) => {
                debug!(?reason, "Range selection abandoned");
            }
        }
        outcome
    }

    /// Cache le résultat (ou abandonne un glisser) et revient à Idle
    pub fn dismiss(&mut self, overlay: &mut OverlayLayer) {
        match std::mem::replace(&mut self.state, Selection::Idle) {
            Selection::Idle => {}
            Selection::Dragging(drag) => {
                overlay.remove(drag.rect);
            }
            Selection::Resolved { popover, .. } => {
                overlay.remove(popover);
            }
        }
    }

    fn compare<C>(&self, drag: &DragState, point: Point, candles: &CandleSeries, coords: &C) -> GestureOutcome
    where
        C: CoordinateSpace + ?Sized,
    {
        let Some(release_time) = coords.coordinate_to_time(point.x) else {
            return GestureOutcome::Abandoned(Abandon::UnresolvedTime);
        };
        if (point.x - drag.anchor_x).abs() < self.min_drag_distance {
            return GestureOutcome::Abandoned(Abandon::BelowThreshold);
        }
        if release_time == drag.anchor_time {
            return GestureOutcome::Abandoned(Abandon::SameTime);
        }

        let start = candles.nearest_within(drag.anchor_time, self.max_gap_days);
        let end = candles.nearest_within(release_time, self.max_gap_days);
        let (Some(start), Some(end)) = (start, end) else {
            return GestureOutcome::Abandoned(Abandon::NoCandle);
        };

        // Deux dates différentes peuvent retomber sur la même chandelle
        if start.time == end.time {
            return GestureOutcome::Abandoned(Abandon::SameTime);
        }
        match Comparison::between(start, end) {
            Some(comparison) => GestureOutcome::Compared(comparison),
            None => GestureOutcome::Abandoned(Abandon::ZeroBase),
        }
    }
}

/// Rectangle de sélection : de l'ancre au curseur, toute la hauteur intérieure
fn selection_bounds(interior: &Bounds, anchor_x: f64, current_x: f64) -> Bounds {
    let left = anchor_x.min(current_x).floor();
    let right = anchor_x.max(current_x).floor() + 1.0;
    Bounds::new(left, interior.y, right - left, interior.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::resolver::tests::{day, LinearCoords};

    fn candles() -> CandleSeries {
        CandleSeries::new(vec![
            Candle::new(day("2025-01-01"), 100.0, 100.0, 100.0, 100.0),
            Candle::new(day("2025-01-10"), 120.0, 120.0, 120.0, 120.0),
        ])
        .unwrap()
    }

    fn plot() -> Bounds {
        Bounds::new(-1.0, -200.0, 40.0, 400.0)
    }

    fn tool() -> RangeComparison {
        RangeComparison::new(&ChartConfig::default())
    }

    fn drag(
        tool: &mut RangeComparison,
        layer: &mut OverlayLayer,
        coords: &LinearCoords,
        from: f64,
        to: f64,
    ) -> GestureOutcome {
        assert!(tool.begin(Point::new(from, 0.0), plot(), coords, layer));
        tool.update(to, plot(), layer);
        tool.finish(Point::new(to, 0.0), &candles(), coords, layer)
    }

    #[test]
    fn test_drag_between_two_candles() {
        let mut layer = OverlayLayer::new();
        let mut tool = tool();
        let coords = LinearCoords::new(day("2025-01-01"), 30);

        let GestureOutcome::Compared(result) = drag(&mut tool, &mut layer, &coords, 0.0, 9.0) else {
            panic!("expected a comparison");
        };

        assert_eq!(result.format_delta(), "+20.00");
        assert_eq!(result.format_pct(), "+20.0%");
        assert_eq!(result.format_span(), "2025-01-01 – 2025-01-10");
        assert!(tool.result_node().is_some());
        assert_eq!(layer.count_visible(|k| matches!(k, NodeKind::SelectionRect)), 0);
    }

    #[test]
    fn test_direction_does_not_matter() {
        let mut layer = OverlayLayer::new();
        let mut tool = tool();
        let coords = LinearCoords::new(day("2025-01-01"), 30);

        let forward = drag(&mut tool, &mut layer, &coords, 0.0, 9.0);
        let backward = drag(&mut tool, &mut layer, &coords, 9.0, 0.0);

        assert_eq!(forward, backward);
        assert_eq!(layer.count_visible(|k| matches!(k, NodeKind::ComparisonResult { .. })), 1);
    }

    #[test]
    fn test_short_drag_is_ignored() {
        let mut layer = OverlayLayer::new();
        let mut tool = tool();
        let coords = LinearCoords::new(day("2025-01-01"), 30);

        let outcome = drag(&mut tool, &mut layer, &coords, 3.0, 3.4);

        assert_eq!(outcome, GestureOutcome::Abandoned(Abandon::BelowThreshold));
        assert_eq!(*tool.state(), Selection::Idle);
        assert!(layer.is_empty());
    }

    #[test]
    fn test_release_outside_data_is_ignored() {
        let mut layer = OverlayLayer::new();
        let mut tool = tool();
        let coords = LinearCoords::new(day("2025-01-01"), 30);

        let outcome = drag(&mut tool, &mut layer, &coords, 0.0, -0.8);
        assert_eq!(outcome, GestureOutcome::Abandoned(Abandon::UnresolvedTime));
    }

    #[test]
    fn test_no_midpoint_fallback_for_far_dates() {
        let mut layer = OverlayLayer::new();
        let mut tool = tool();
        let coords = LinearCoords::new(day("2025-01-01"), 30);

        // 2025-01-05 est à 4 jours de toute chandelle
        let outcome = drag(&mut tool, &mut layer, &coords, 0.0, 4.0);
        assert_eq!(outcome, GestureOutcome::Abandoned(Abandon::NoCandle));
    }

    #[test]
    fn test_zero_start_close_is_ignored() {
        let mut layer = OverlayLayer::new();
        let mut tool = tool();
        let coords = LinearCoords::new(day("2025-01-01"), 30);
        let candles = CandleSeries::new(vec![
            Candle::new(day("2025-01-01"), 0.0, 0.0, 0.0, 0.0),
            Candle::new(day("2025-01-10"), 5.0, 5.0, 5.0, 5.0),
        ])
        .unwrap();

        assert!(tool.begin(Point::new(0.0, 0.0), plot(), &coords, &mut layer));
        let outcome = tool.finish(Point::new(9.0, 0.0), &candles, &coords, &mut layer);

        assert_eq!(outcome, GestureOutcome::Abandoned(Abandon::ZeroBase));
        assert_eq!(*tool.state(), Selection::Idle);
        assert!(layer.is_empty());
    }

    #[test]
    fn test_dates_sharing_a_candle_are_ignored() {
        let mut layer = OverlayLayer::new();
        let mut tool = tool();
        let coords = LinearCoords::new(day("2025-01-01"), 30);

        // 01-09 et 01-11 retombent toutes deux sur la chandelle du 01-10
        let outcome = drag(&mut tool, &mut layer, &coords, 8.0, 10.0);

        assert_eq!(outcome, GestureOutcome::Abandoned(Abandon::SameTime));
        assert!(tool.result_node().is_none());
        assert!(layer.is_empty());
    }

    #[test]
    fn test_update_follows_resized_plot() {
        let mut layer = OverlayLayer::new();
        let mut tool = tool();
        let coords = LinearCoords::new(day("2025-01-01"), 30);
        assert!(tool.begin(Point::new(2.0, 0.0), plot(), &coords, &mut layer));

        // La zone de tracé rétrécit pendant le glisser
        let smaller = Bounds::new(-1.0, -50.0, 20.0, 100.0);
        assert!(tool.update(35.0, smaller, &mut layer));

        let Selection::Dragging(drag) = tool.state() else {
            panic!("expected a drag in progress");
        };
        assert_eq!(drag.current_x, 18.0);
        let rect = layer.painted()[0].1.bounds;
        assert_eq!(rect, Bounds::new(2.0, -49.0, 17.0, 98.0));

        // Et grandit de nouveau : le rectangle suit sans mouvement du curseur
        assert!(tool.relayout(plot(), &mut layer));
        let rect = layer.painted()[0].1.bounds;
        assert_eq!(rect.y, -199.0);
        assert_eq!(rect.height, 398.0);
    }

    #[test]
    fn test_begin_outside_interior_is_refused() {
        let mut layer = OverlayLayer::new();
        let mut tool = tool();
        let coords = LinearCoords::new(day("2025-01-01"), 30);

        // Marge d'une cellule à gauche de la zone de tracé
        assert!(!tool.begin(Point::new(-0.5, 0.0), plot(), &coords, &mut layer));
        assert_eq!(*tool.state(), Selection::Idle);
    }

    #[test]
    fn test_new_drag_hides_previous_result() {
        let mut layer = OverlayLayer::new();
        let mut tool = tool();
        let coords = LinearCoords::new(day("2025-01-01"), 30);
        drag(&mut tool, &mut layer, &coords, 0.0, 9.0);

        assert!(tool.begin(Point::new(2.0, 0.0), plot(), &coords, &mut layer));
        assert_eq!(layer.count_visible(|k| matches!(k, NodeKind::ComparisonResult { .. })), 0);
        assert!(tool.is_dragging());

        tool.dismiss(&mut layer);
        assert!(layer.is_empty());
    }
}
