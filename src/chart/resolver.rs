// ============================================================================
// Résolution de la position d'un marqueur
// ============================================================================
// Fonction pure : (signal, chandelles, repère) → position à l'écran ou raison
// pour laquelle le marqueur reste caché.
//
// Étapes :
// 1. pas de date d'événement → caché
// 2. x de la date via la surface → caché si hors plage visible
// 3. chandelle de référence : date exacte, sinon la plus proche dans
//    `max_gap_days`, sinon selon `ReferenceFallback`
// 4. y = y(clôture de référence) - décalage vertical
// ============================================================================

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::trace;

use crate::chart::surface::CoordinateSpace;
use crate::config::ChartConfig;
use crate::models::{Candle, CandleSeries, Signal};

/// Que faire quand aucune chandelle n'est assez proche de la date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceFallback {
    /// Le marqueur reste caché
    #[default]
    Hide,
    /// Utilise la chandelle du milieu de la série
    SeriesMidpoint,
}

/// Paramètres de résolution, issus de la configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverPolicy {
    pub vertical_offset: f64,
    pub max_gap_days: i64,
    pub fallback: ReferenceFallback,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self::from(&ChartConfig::default())
    }
}

impl From<&ChartConfig> for ResolverPolicy {
    fn from(config: &ChartConfig) -> Self {
        Self {
            vertical_offset: config.marker_offset,
            max_gap_days: config.max_gap_days,
            fallback: config.reference_fallback,
        }
    }
}

/// Position résolue d'un marqueur
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPoint {
    pub x: f64,
    /// y du marqueur (au-dessus de la clôture)
    pub y: f64,
    /// y de la clôture de référence (bas de la ligne de liaison)
    pub anchor_y: f64,
    /// Date de la chandelle de référence
    pub reference: NaiveDate,
}

/// Raison pour laquelle un marqueur n'a pas de position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenReason {
    NoEventDate,
    OutsideVisibleRange,
    NoReferenceCandle,
    NoPriceCoordinate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Positioned(MarkerPoint),
    Hidden(HiddenReason),
}

impl Placement {
    pub fn point(&self) -> Option<MarkerPoint> {
        match self {
            Placement::Positioned(point) => Some(*point),
            Placement::Hidden(_) => None,
        }
    }
}

/// Chandelle de référence d'une date selon la politique
pub fn reference_candle<'a>(
    date: NaiveDate,
    candles: &'a CandleSeries,
    policy: &ResolverPolicy,
) -> Option<&'a Candle> {
    candles
        .exact(date)
        .or_else(|| candles.nearest_within(date, policy.max_gap_days))
        .or_else(|| match policy.fallback {
            ReferenceFallback::Hide => None,
            ReferenceFallback::SeriesMidpoint => candles.midpoint(),
        })
}

/// Calcule la position d'un marqueur
///
/// Déterministe : mêmes entrées, même résultat. Un marqueur caché n'est pas
/// une erreur.
pub fn resolve_marker_position<C>(
    signal: &Signal,
    candles: &CandleSeries,
    coords: &C,
    policy: &ResolverPolicy,
) -> Placement
where
    C: CoordinateSpace + ?Sized,
{
    let placement = resolve(signal, candles, coords, policy);
    if let Placement::Hidden(reason) = placement {
        trace!(signal = %signal.id, ?reason, "Marker not positionable");
    }
    placement
}

fn resolve<C>(signal: &Signal, candles: &CandleSeries, coords: &C, policy: &ResolverPolicy) -> Placement
where
    C: CoordinateSpace + ?Sized,
{
    let Some(date) = signal.event_date else {
        return Placement::Hidden(HiddenReason::NoEventDate);
    };

    let Some(x) = coords.time_to_coordinate(date) else {
        return Placement::Hidden(HiddenReason::OutsideVisibleRange);
    };

    let Some(reference) = reference_candle(date, candles, policy) else {
        return Placement::Hidden(HiddenReason::NoReferenceCandle);
    };

    let Some(anchor_y) = coords.price_to_coordinate(reference.close) else {
        return Placement::Hidden(HiddenReason::NoPriceCoordinate);
    };

    Placement::Positioned(MarkerPoint {
        x,
        y: anchor_y - policy.vertical_offset,
        anchor_y,
        reference: reference.time,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::SignalCategory;

    /// Repère linéaire : x = jours depuis `origin`, y = -prix
    pub(crate) struct LinearCoords {
        pub origin: NaiveDate,
        pub visible_days: i64,
        pub has_price_scale: bool,
    }

    impl LinearCoords {
        pub fn new(origin: NaiveDate, visible_days: i64) -> Self {
            Self {
                origin,
                visible_days,
                has_price_scale: true,
            }
        }
    }

    impl CoordinateSpace for LinearCoords {
        fn time_to_coordinate(&self, time: NaiveDate) -> Option<f64> {
            let days = (time - self.origin).num_days();
            (0..=self.visible_days).contains(&days).then_some(days as f64)
        }

        fn price_to_coordinate(&self, price: f64) -> Option<f64> {
            self.has_price_scale.then_some(-price)
        }

        fn coordinate_to_time(&self, x: f64) -> Option<NaiveDate> {
            if x < 0.0 || x > self.visible_days as f64 {
                return None;
            }
            Some(self.origin + chrono::Duration::days(x.round() as i64))
        }
    }

    pub(crate) fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn series(points: &[(&str, f64)]) -> CandleSeries {
        CandleSeries::new(
            points
                .iter()
                .map(|(d, close)| Candle::new(day(d), *close, *close, *close, *close))
                .collect(),
        )
        .unwrap()
    }

    fn policy() -> ResolverPolicy {
        ResolverPolicy {
            vertical_offset: 1.0,
            max_gap_days: 1,
            fallback: ReferenceFallback::Hide,
        }
    }

    #[test]
    fn test_nearest_candle_within_one_day() {
        let candles = series(&[("2025-01-01", 100.0), ("2025-01-04", 110.0), ("2025-01-10", 120.0)]);
        let coords = LinearCoords::new(day("2025-01-01"), 30);
        let signal = Signal::new("s", Some(day("2025-01-05")), SignalCategory::Buy);

        let point = resolve_marker_position(&signal, &candles, &coords, &policy())
            .point()
            .unwrap();

        assert_eq!(point.reference, day("2025-01-04"));
        assert_eq!(point.anchor_y, -110.0);
        assert_eq!(point.y, -111.0);
        assert_eq!(point.x, 4.0);
    }

    #[test]
    fn test_exact_date_without_tolerance() {
        let candles = series(&[("2025-01-02", 105.0), ("2025-01-03", 107.0)]);
        let coords = LinearCoords::new(day("2025-01-01"), 30);
        let policy = ResolverPolicy {
            max_gap_days: 0,
            ..policy()
        };

        let on_day = Signal::new("s", Some(day("2025-01-03")), SignalCategory::Buy);
        let point = resolve_marker_position(&on_day, &candles, &coords, &policy)
            .point()
            .unwrap();
        assert_eq!(point.reference, day("2025-01-03"));
        assert_eq!(point.anchor_y, -107.0);

        let next_day = Signal::new("t", Some(day("2025-01-04")), SignalCategory::Buy);
        assert_eq!(
            resolve_marker_position(&next_day, &candles, &coords, &policy),
            Placement::Hidden(HiddenReason::NoReferenceCandle)
        );
    }

    #[test]
    fn test_missing_event_date_never_positioned() {
        let candles = series(&[("2025-01-01", 100.0)]);
        let coords = LinearCoords::new(day("2025-01-01"), 30);
        let signal = Signal::new("s", None, SignalCategory::Buy);

        assert_eq!(
            resolve_marker_position(&signal, &candles, &coords, &policy()),
            Placement::Hidden(HiddenReason::NoEventDate)
        );
    }

    #[test]
    fn test_outside_visible_range() {
        let candles = series(&[("2025-01-01", 100.0)]);
        let coords = LinearCoords::new(day("2025-01-01"), 5);
        let signal = Signal::new("s", Some(day("2025-02-01")), SignalCategory::Sell);

        assert_eq!(
            resolve_marker_position(&signal, &candles, &coords, &policy()),
            Placement::Hidden(HiddenReason::OutsideVisibleRange)
        );
    }

    #[test]
    fn test_gap_too_large_hides_by_default() {
        let candles = series(&[("2025-01-01", 100.0), ("2025-01-10", 120.0)]);
        let coords = LinearCoords::new(day("2025-01-01"), 30);
        let signal = Signal::new("s", Some(day("2025-01-05")), SignalCategory::Hold);

        assert_eq!(
            resolve_marker_position(&signal, &candles, &coords, &policy()),
            Placement::Hidden(HiddenReason::NoReferenceCandle)
        );
    }

    #[test]
    fn test_midpoint_fallback_is_opt_in() {
        let candles = series(&[("2025-01-01", 100.0), ("2025-01-10", 120.0), ("2025-01-20", 90.0)]);
        let coords = LinearCoords::new(day("2025-01-01"), 30);
        let signal = Signal::new("s", Some(day("2025-01-05")), SignalCategory::Hold);
        let policy = ResolverPolicy {
            fallback: ReferenceFallback::SeriesMidpoint,
            ..policy()
        };

        let point = resolve_marker_position(&signal, &candles, &coords, &policy)
            .point()
            .unwrap();
        assert_eq!(point.reference, day("2025-01-10"));
    }

    #[test]
    fn test_no_price_coordinate() {
        let candles = series(&[("2025-01-01", 100.0)]);
        let mut coords = LinearCoords::new(day("2025-01-01"), 30);
        coords.has_price_scale = false;
        let signal = Signal::new("s", Some(day("2025-01-01")), SignalCategory::Buy);

        assert_eq!(
            resolve_marker_position(&signal, &candles, &coords, &policy()),
            Placement::Hidden(HiddenReason::NoPriceCoordinate)
        );
    }
}
