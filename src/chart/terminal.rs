// ============================================================================
// Surface de graphique pour le terminal
// ============================================================================
// Implémente ChartSurface sur une grille de cellules :
// - axe des prix à gauche (Y_AXIS_WIDTH colonnes), axe des dates en bas
// - échelle de temps : plage visible en index logiques, une barre = `spacing`
//   colonnes, la barre i est centrée en x(i) = plot.x + (i - from + 0.5) * spacing
// - échelle de prix : auto-ajustée sur les chandelles visibles (+2% de marge)
//
// CONCEPTS RUST :
// 1. impl Trait for Struct : la surface remplit le contrat du moteur
// 2. Registry partagée : les callbacks survivent aux emprunts de la surface
// ============================================================================

use chrono::NaiveDate;
use tracing::debug;

use crate::chart::lifetime::{Registry, Subscription};
use crate::chart::overlay::Bounds;
use crate::chart::surface::{
    ChartSurface, CoordinateSpace, RangeCallback, SurfaceFuture, SurfaceLoader, SurfaceOptions,
    VisibleRange,
};
use crate::chart::ChartError;
use crate::models::{Candle, CandleSeries};

/// Largeur de l'axe des prix (à gauche)
pub const Y_AXIS_WIDTH: f64 = 10.0;

/// Hauteur de l'axe des dates (en bas)
pub const X_AXIS_HEIGHT: f64 = 1.0;

/// Nombre minimal de barres visibles après un zoom
const MIN_VISIBLE_BARS: f64 = 5.0;

/// Marge ajoutée à l'échelle de prix (en fraction de l'amplitude)
const PRICE_MARGIN: f64 = 0.02;

pub struct TerminalSurface {
    width: f64,
    height: f64,
    candles: CandleSeries,
    range: Option<VisibleRange>,
    subscribers: Registry<RangeCallback>,
    disposed: bool,
}

impl TerminalSurface {
    pub fn new(options: SurfaceOptions) -> Self {
        Self {
            width: options.width,
            height: options.height,
            candles: CandleSeries::default(),
            range: None,
            subscribers: Registry::new(),
            disposed: false,
        }
    }

    pub fn candles(&self) -> &CandleSeries {
        &self.candles
    }

    /// Nombre de callbacks de plage visible encore abonnés
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Largeur d'une barre en colonnes
    pub fn bar_spacing(&self) -> Option<f64> {
        let range = self.range?;
        let plot = self.plot_bounds();
        if plot.width <= 0.0 || range.span() <= 0.0 {
            return None;
        }
        Some(plot.width / range.span())
    }

    /// x du centre de la barre d'index logique `index`
    pub fn index_to_coordinate(&self, index: f64) -> Option<f64> {
        let range = self.range?;
        let spacing = self.bar_spacing()?;
        Some(self.plot_bounds().x + (index - range.from + 0.5) * spacing)
    }

    /// Index des chandelles visibles (au moins partiellement)
    pub fn visible_indices(&self) -> std::ops::Range<usize> {
        let Some(range) = self.range else {
            return 0..0;
        };
        let len = self.candles.len() as f64;
        let start = range.from.floor().clamp(0.0, len) as usize;
        let end = range.to.ceil().clamp(0.0, len) as usize;
        start..end.max(start)
    }

    /// Chandelles visibles avec leur index
    pub fn visible_candles(&self) -> impl Iterator<Item = (usize, &Candle)> + '_ {
        let range = self.visible_indices();
        self.candles
            .as_slice()
            .get(range.clone())
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .map(move |(offset, candle)| (range.start + offset, candle))
    }

    /// Échelle de prix courante (plus bas, plus haut), marge incluse
    pub fn price_scale(&self) -> Option<(f64, f64)> {
        let (low, high) = self.candles.price_bounds(self.visible_indices())?;
        let amplitude = high - low;
        let margin = if amplitude > 0.0 {
            amplitude * PRICE_MARGIN
        } else {
            (high.abs() * PRICE_MARGIN).max(1.0)
        };
        Some((low - margin, high + margin))
    }

    /// Prix correspondant à une ligne de la zone de tracé
    pub fn coordinate_to_price(&self, y: f64) -> Option<f64> {
        let (min, max) = self.price_scale()?;
        let plot = self.plot_bounds();
        if plot.height <= 0.0 {
            return None;
        }
        Some(max - (y - plot.y) / plot.height * (max - min))
    }

    /// Décale la plage visible de `bars` barres (positif = vers le récent)
    pub fn scroll_by(&mut self, bars: f64) {
        let Some(range) = self.range else {
            return;
        };
        let len = self.candles.len() as f64;
        let span = range.span();

        // Au moins une chandelle doit rester à l'écran
        let from = (range.from + bars).clamp(1.0 - span, (len - 1.0).max(0.0));
        self.set_visible_range(VisibleRange::new(from, from + span));
    }

    /// Zoom autour du bord droit (factor < 1 : zoom avant)
    pub fn zoom(&mut self, factor: f64) {
        let Some(range) = self.range else {
            return;
        };
        let max_span = (self.candles.len() as f64).max(MIN_VISIBLE_BARS).max(self.plot_bounds().width);
        let span = (range.span() * factor).clamp(MIN_VISIBLE_BARS, max_span);
        self.set_visible_range(VisibleRange::new(range.to - span, range.to));
    }

    fn notify(&self, range: VisibleRange) {
        self.subscribers.for_each(|callback| callback(range));
    }
}

impl CoordinateSpace for TerminalSurface {
    fn time_to_coordinate(&self, time: NaiveDate) -> Option<f64> {
        let index = self.candles.logical_index(time)?;
        let x = self.index_to_coordinate(index)?;
        let plot = self.plot_bounds();
        (x >= plot.x && x < plot.right()).then_some(x)
    }

    fn price_to_coordinate(&self, price: f64) -> Option<f64> {
        let (min, max) = self.price_scale()?;
        let plot = self.plot_bounds();
        if plot.height <= 0.0 {
            return None;
        }
        Some(plot.y + (max - price) / (max - min) * plot.height)
    }

    fn coordinate_to_time(&self, x: f64) -> Option<NaiveDate> {
        let range = self.range?;
        let spacing = self.bar_spacing()?;
        let plot = self.plot_bounds();
        if x < plot.x || x >= plot.right() {
            return None;
        }

        let logical = range.from + (x - plot.x) / spacing - 0.5;
        let index = logical.round();
        if index < 0.0 {
            return None;
        }
        self.candles.get(index as usize).map(|c| c.time)
    }
}

impl ChartSurface for TerminalSurface {
    fn set_series(&mut self, candles: &CandleSeries) {
        self.candles = candles.clone();
        self.fit_content();
    }

    fn on_visible_range_changed(&mut self, callback: RangeCallback) -> Subscription {
        self.subscribers.register(callback)
    }

    /// Affiche les dernières chandelles qui tiennent à une colonne par barre
    fn fit_content(&mut self) {
        let len = self.candles.len() as f64;
        if len == 0.0 {
            self.range = None;
            return;
        }
        let bars = len.min(self.plot_bounds().width.max(1.0));
        self.set_visible_range(VisibleRange::new(len - bars, len));
    }

    fn set_visible_range(&mut self, range: VisibleRange) {
        if self.disposed || range.span() <= 0.0 {
            return;
        }
        if self.range == Some(range) {
            return;
        }
        self.range = Some(range);
        self.notify(range);
    }

    fn visible_range(&self) -> Option<VisibleRange> {
        self.range
    }

    fn resize(&mut self, width: f64, height: f64) {
        debug!(width, height, "Surface resized");
        self.width = width;
        self.height = height;
    }

    fn plot_bounds(&self) -> Bounds {
        Bounds::new(
            Y_AXIS_WIDTH,
            0.0,
            (self.width - Y_AXIS_WIDTH).max(0.0),
            (self.height - X_AXIS_HEIGHT).max(0.0),
        )
    }

    fn dispose(&mut self) {
        self.subscribers.clear();
        self.candles = CandleSeries::default();
        self.range = None;
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Loader de la surface terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSurfaceLoader;

impl SurfaceLoader for TerminalSurfaceLoader {
    type Surface = TerminalSurface;

    fn load(&self, options: SurfaceOptions) -> SurfaceFuture<TerminalSurface> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            Ok::<_, ChartError>(TerminalSurface::new(options))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, n).unwrap()
    }

    /// `count` chandelles quotidiennes à partir du 1er janvier, close = 100 + i
    fn daily(count: u32) -> CandleSeries {
        CandleSeries::new(
            (0..count)
                .map(|i| {
                    let close = 100.0 + i as f64;
                    Candle::new(day(i + 1), close, close + 1.0, close - 1.0, close)
                })
                .collect(),
        )
        .unwrap()
    }

    /// 10 colonnes de zone de tracé, 20 lignes
    fn surface(count: u32) -> TerminalSurface {
        let mut surface = TerminalSurface::new(SurfaceOptions {
            width: Y_AXIS_WIDTH + 10.0,
            height: 21.0,
        });
        surface.set_series(&daily(count));
        surface
    }

    #[test]
    fn test_fit_content_shows_last_bars() {
        let surface = surface(30);
        assert_eq!(surface.visible_range(), Some(VisibleRange::new(20.0, 30.0)));
        assert_eq!(surface.visible_indices(), 20..30);
        assert_eq!(surface.bar_spacing(), Some(1.0));
    }

    #[test]
    fn test_time_coordinate_round_trip() {
        let surface = surface(10);

        let x = surface.time_to_coordinate(day(4)).unwrap();
        assert_eq!(x, Y_AXIS_WIDTH + 3.5);
        assert_eq!(surface.coordinate_to_time(x), Some(day(4)));
        assert_eq!(surface.coordinate_to_time(Y_AXIS_WIDTH + 3.9), Some(day(4)));
    }

    #[test]
    fn test_hidden_dates_have_no_coordinate() {
        let surface = surface(30);

        assert!(surface.time_to_coordinate(day(5)).is_none());
        assert!(surface.time_to_coordinate(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()).is_none());
        assert!(surface.coordinate_to_time(Y_AXIS_WIDTH - 1.0).is_none());
    }

    #[test]
    fn test_price_scale_follows_visible_candles() {
        let surface = surface(10);
        let (min, max) = surface.price_scale().unwrap();
        assert!(min < 99.0 && max > 110.0);

        let top = surface.price_to_coordinate(max).unwrap();
        let bottom = surface.price_to_coordinate(min).unwrap();
        assert_eq!(top, 0.0);
        assert_eq!(bottom, 20.0);
    }

    #[test]
    fn test_scroll_and_zoom_notify_subscribers() {
        let mut surface = surface(30);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = surface.on_visible_range_changed(Box::new(move |range| {
            sink.lock().unwrap().push(range);
        }));

        surface.scroll_by(-5.0);
        surface.zoom(0.5);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![VisibleRange::new(15.0, 25.0), VisibleRange::new(20.0, 25.0)]
        );

        subscription.unsubscribe();
        surface.scroll_by(-1.0);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_scroll_keeps_one_candle_visible() {
        let mut surface = surface(30);
        surface.scroll_by(100.0);
        assert_eq!(surface.visible_range(), Some(VisibleRange::new(29.0, 39.0)));

        surface.scroll_by(-1000.0);
        assert_eq!(surface.visible_range(), Some(VisibleRange::new(-9.0, 1.0)));
    }

    #[test]
    fn test_dispose_drops_subscribers() {
        let mut surface = surface(10);
        let _subscription = surface.on_visible_range_changed(Box::new(|_| {}));
        surface.dispose();

        assert!(surface.is_disposed());
        assert!(surface.visible_range().is_none());
        assert!(surface.time_to_coordinate(day(1)).is_none());
    }

    #[tokio::test]
    async fn test_loader_builds_surface() {
        let surface = TerminalSurfaceLoader
            .load(SurfaceOptions {
                width: 40.0,
                height: 10.0,
            })
            .await
            .unwrap();

        assert!(!surface.is_disposed());
        assert_eq!(surface.plot_bounds().width, 30.0);
    }
}
