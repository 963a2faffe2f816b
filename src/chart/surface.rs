// ============================================================================
// Surface de graphique : le contrat
// ============================================================================
// La surface possède le système de coordonnées (échelle de temps, échelle de
// prix) et dessine les chandelles. Le moteur d'annotation ne la connaît qu'à
// travers ces traits.
//
// CONCEPTS RUST :
// 1. Supertrait : ChartSurface exige CoordinateSpace
// 2. Type associé : chaque loader annonce le type de surface qu'il produit
// 3. Pin<Box<dyn Future>> : future 'static qui n'emprunte pas le loader
// ============================================================================

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;

use crate::chart::lifetime::Subscription;
use crate::chart::overlay::Bounds;
use crate::chart::ChartError;
use crate::models::CandleSeries;

/// Plage visible en index logiques de la série
///
/// `from` est le bord gauche, `to` le bord droit (exclu).
/// Les valeurs peuvent être fractionnaires ou sortir de la série.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRange {
    pub from: f64,
    pub to: f64,
}

impl VisibleRange {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Nombre de barres couvertes
    pub fn span(&self) -> f64 {
        self.to - self.from
    }
}

/// Dimensions initiales de la surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceOptions {
    pub width: f64,
    pub height: f64,
}

/// Conversions entre le domaine (dates, prix) et l'écran
pub trait CoordinateSpace {
    /// x d'une date, None si elle est hors des données ou hors de la plage visible
    fn time_to_coordinate(&self, time: NaiveDate) -> Option<f64>;

    /// y d'un prix, None si l'échelle de prix n'est pas établie
    fn price_to_coordinate(&self, price: f64) -> Option<f64>;

    /// Date de la chandelle sous x, None hors de la zone de tracé
    fn coordinate_to_time(&self, x: f64) -> Option<NaiveDate>;
}

/// Callback de changement de plage visible
pub type RangeCallback = Box<dyn FnMut(VisibleRange) + Send>;

/// Capacités attendues d'une surface de graphique
pub trait ChartSurface: CoordinateSpace + Send {
    /// Remplace les données affichées
    fn set_series(&mut self, candles: &CandleSeries);

    /// S'abonne aux changements de plage visible (pan, zoom, fit)
    fn on_visible_range_changed(&mut self, callback: RangeCallback) -> Subscription;

    /// Ajuste la plage visible aux données
    fn fit_content(&mut self);

    fn set_visible_range(&mut self, range: VisibleRange);

    fn visible_range(&self) -> Option<VisibleRange>;

    fn resize(&mut self, width: f64, height: f64);

    /// Zone de tracé (hors axes), dans le repère du conteneur
    fn plot_bounds(&self) -> Bounds;

    /// Libère la surface ; plus aucune notification après cet appel
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}

/// Future retournée par un loader
pub type SurfaceFuture<S> = Pin<Box<dyn Future<Output = Result<S, ChartError>> + Send + 'static>>;

/// Construction asynchrone d'une surface
pub trait SurfaceLoader {
    type Surface: ChartSurface + 'static;

    fn load(&self, options: SurfaceOptions) -> SurfaceFuture<Self::Surface>;
}
