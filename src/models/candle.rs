// ============================================================================
// Structure : Candle (Open, High, Low, Close) et CandleSeries
// ============================================================================
// Représente une chandelle journalière et la série ordonnée d'un actif
//
// CONCEPTS RUST :
// 1. NaiveDate : date calendaire sans fuseau horaire (une chandelle = un jour)
// 2. Invariants à la construction : la série est triée et unique par date
// 3. Binary search : recherche O(log n) sur une slice triée
// ============================================================================

use std::ops::Range;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fenêtre d'historique demandée au fournisseur de prix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookback {
    /// 1 mois (30 jours)
    OneMonth,
    /// 3 mois
    ThreeMonths,
    /// 6 mois
    SixMonths,
    /// 1 an
    #[default]
    OneYear,
    /// 2 ans (730 jours)
    TwoYears,
    /// 5 ans (1825 jours)
    FiveYears,
}

impl Lookback {
    /// Retourne le nombre de jours correspondant
    pub fn to_days(&self) -> u32 {
        match self {
            Lookback::OneMonth => 30,
            Lookback::ThreeMonths => 90,
            Lookback::SixMonths => 180,
            Lookback::OneYear => 365,
            Lookback::TwoYears => 730,
            Lookback::FiveYears => 1825,
        }
    }

    /// Retourne le label pour l'affichage
    pub fn label(&self) -> &'static str {
        match self {
            Lookback::OneMonth => "1M",
            Lookback::ThreeMonths => "3M",
            Lookback::SixMonths => "6M",
            Lookback::OneYear => "1Y",
            Lookback::TwoYears => "2Y",
            Lookback::FiveYears => "5Y",
        }
    }
}

/// Une chandelle japonaise journalière
///
/// CONCEPT RUST : Copy
/// - NaiveDate et f64 sont Copy, donc Candle peut l'être aussi
/// - Pas d'allocation, la copie est un simple memcpy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Date calendaire de la chandelle
    pub time: NaiveDate,

    /// Prix d'ouverture (Open)
    pub open: f64,

    /// Prix le plus haut (High)
    pub high: f64,

    /// Prix le plus bas (Low)
    pub low: f64,

    /// Prix de clôture (Close)
    pub close: f64,
}

impl Candle {
    /// Constructeur : crée une nouvelle chandelle
    pub fn new(time: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }

    /// Vérifie si la chandelle est haussière (bullish)
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// Variation en pourcentage depuis l'ouverture
    pub fn change_percent(&self) -> f64 {
        if self.open == 0.0 {
            0.0
        } else {
            ((self.close - self.open) / self.open) * 100.0
        }
    }

    fn has_finite_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite())
    }
}

/// Erreurs de validation d'une série de chandelles
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("chandelles non triées : {previous} suivie de {next}")]
    OutOfOrder { previous: NaiveDate, next: NaiveDate },
    #[error("date dupliquée dans la série : {0}")]
    DuplicateTime(NaiveDate),
    #[error("prix non fini pour la chandelle du {0}")]
    InvalidPrice(NaiveDate),
}

/// Série de chandelles d'un actif, triée par date croissante et unique par date
///
/// CONCEPT : Validation à la frontière
/// - L'invariant (tri + unicité) est vérifié une seule fois, à la construction
/// - Tout le moteur de graphique peut ensuite s'appuyer dessus (binary search)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Crée une série à partir de chandelles déjà triées
    ///
    /// Retourne une erreur si l'ordre n'est pas strictement croissant
    /// ou si un prix n'est pas fini.
    pub fn new(candles: Vec<Candle>) -> Result<Self, SeriesError> {
        for candle in &candles {
            if !candle.has_finite_prices() {
                return Err(SeriesError::InvalidPrice(candle.time));
            }
        }

        for pair in candles.windows(2) {
            let (previous, next) = (pair[0].time, pair[1].time);
            if previous == next {
                return Err(SeriesError::DuplicateTime(next));
            }
            if previous > next {
                return Err(SeriesError::OutOfOrder { previous, next });
            }
        }

        Ok(Self { candles })
    }

    /// Crée une série à partir de données brutes (fournisseur)
    ///
    /// CONCEPT : Normalisation
    /// - Trie par date
    /// - Garde la dernière chandelle reçue pour une même date
    pub fn from_unsorted(mut candles: Vec<Candle>) -> Result<Self, SeriesError> {
        // sort_by_key est stable : l'ordre d'arrivée est conservé à date égale
        candles.sort_by_key(|c| c.time);

        let mut normalized: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match normalized.last_mut() {
                Some(last) if last.time == candle.time => *last = candle,
                _ => normalized.push(candle),
            }
        }

        Self::new(normalized)
    }

    /// Retourne le nombre de chandelles
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Vérifie si la série est vide
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Index de la chandelle à cette date (Ok) ou point d'insertion (Err)
    pub fn search(&self, date: NaiveDate) -> Result<usize, usize> {
        self.candles.binary_search_by_key(&date, |c| c.time)
    }

    /// Chandelle exactement à cette date
    pub fn exact(&self, date: NaiveDate) -> Option<&Candle> {
        self.search(date).ok().map(|i| &self.candles[i])
    }

    /// Chandelle la plus proche de `date`, à au plus `max_days` jours
    ///
    /// CONCEPT : Voisins dans une slice triée
    /// - Le point d'insertion donne les deux seuls candidats possibles
    /// - La plus petite différence absolue gagne (égalité : le plus ancien)
    pub fn nearest_within(&self, date: NaiveDate, max_days: i64) -> Option<&Candle> {
        let insertion = match self.search(date) {
            Ok(index) => return Some(&self.candles[index]),
            Err(insertion) => insertion,
        };

        let before = insertion
            .checked_sub(1)
            .and_then(|i| self.candles.get(i));
        let after = self.candles.get(insertion);

        [before, after]
            .into_iter()
            .flatten()
            .map(|candle| ((candle.time - date).num_days().abs(), candle))
            .filter(|(distance, _)| *distance <= max_days)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candle)| candle)
    }

    /// Chandelle à l'index du milieu de la série
    pub fn midpoint(&self) -> Option<&Candle> {
        self.candles.get(self.candles.len() / 2)
    }

    /// Position logique (fractionnaire) d'une date dans la série
    ///
    /// - Date présente : son index exact
    /// - Date entre deux chandelles : interpolation linéaire sur les jours
    /// - Date hors de la série : None
    pub fn logical_index(&self, date: NaiveDate) -> Option<f64> {
        match self.search(date) {
            Ok(index) => Some(index as f64),
            Err(insertion) => {
                if insertion == 0 || insertion >= self.candles.len() {
                    return None;
                }
                let before = &self.candles[insertion - 1];
                let after = &self.candles[insertion];
                let span = (after.time - before.time).num_days() as f64;
                let offset = (date - before.time).num_days() as f64;
                Some((insertion - 1) as f64 + offset / span)
            }
        }
    }

    /// Bornes de prix (plus bas, plus haut) sur une plage d'index
    pub fn price_bounds(&self, range: Range<usize>) -> Option<(f64, f64)> {
        let end = range.end.min(self.candles.len());
        let slice = self.candles.get(range.start..end)?;
        if slice.is_empty() {
            return None;
        }

        let low = slice.iter().fold(f64::INFINITY, |min, c| min.min(c.low));
        let high = slice.iter().fold(f64::NEG_INFINITY, |max, c| max.max(c.high));
        Some((low, high))
    }

    /// Variation journalière de la dernière chandelle, en pourcentage
    pub fn daily_change_percent(&self) -> Option<f64> {
        self.last().map(|c| c.change_percent())
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn candle(s: &str, close: f64) -> Candle {
        Candle::new(day(s), close, close + 1.0, close - 1.0, close)
    }

    #[test]
    fn test_candle_bullish() {
        let c = Candle::new(day("2025-01-01"), 100.0, 110.0, 95.0, 105.0);
        assert!(c.is_bullish());
        assert_eq!(c.change_percent(), 5.0);
    }

    #[test]
    fn test_series_rejects_unsorted() {
        let err = CandleSeries::new(vec![candle("2025-01-02", 1.0), candle("2025-01-01", 1.0)])
            .unwrap_err();
        assert!(matches!(err, SeriesError::OutOfOrder { .. }));
    }

    #[test]
    fn test_series_rejects_duplicates() {
        let err = CandleSeries::new(vec![candle("2025-01-01", 1.0), candle("2025-01-01", 2.0)])
            .unwrap_err();
        assert_eq!(err, SeriesError::DuplicateTime(day("2025-01-01")));
    }

    #[test]
    fn test_from_unsorted_keeps_last_per_date() {
        let series = CandleSeries::from_unsorted(vec![
            candle("2025-01-03", 3.0),
            candle("2025-01-01", 1.0),
            candle("2025-01-03", 4.0),
        ])
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().close, 4.0);
    }

    #[test]
    fn test_nearest_within_one_day() {
        let series =
            CandleSeries::new(vec![candle("2025-01-01", 100.0), candle("2025-01-04", 110.0)])
                .unwrap();

        assert_eq!(series.nearest_within(day("2025-01-05"), 1).unwrap().close, 110.0);
        assert_eq!(series.nearest_within(day("2025-01-02"), 1).unwrap().close, 100.0);
        assert!(series.nearest_within(day("2025-01-07"), 1).is_none());
        assert!(series.nearest_within(day("2024-12-29"), 1).is_none());
    }

    #[test]
    fn test_logical_index_interpolates() {
        let series =
            CandleSeries::new(vec![candle("2025-01-01", 100.0), candle("2025-01-05", 110.0)])
                .unwrap();

        assert_eq!(series.logical_index(day("2025-01-01")), Some(0.0));
        assert_eq!(series.logical_index(day("2025-01-03")), Some(0.5));
        assert_eq!(series.logical_index(day("2025-01-06")), None);
    }

    #[test]
    fn test_price_bounds() {
        let series =
            CandleSeries::new(vec![candle("2025-01-01", 100.0), candle("2025-01-02", 120.0)])
                .unwrap();

        assert_eq!(series.price_bounds(0..2), Some((99.0, 121.0)));
        assert_eq!(series.price_bounds(1..10), Some((119.0, 121.0)));
        assert_eq!(series.price_bounds(2..2), None);
    }

    #[test]
    fn test_lookback_days() {
        assert_eq!(Lookback::OneMonth.to_days(), 30);
        assert_eq!(Lookback::default(), Lookback::OneYear);
    }
}
