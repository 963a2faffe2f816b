// ============================================================================
// Structure : WatchlistItem
// ============================================================================
// Un actif affiché sur le dashboard, avec ses chandelles et ses signaux
//
// CONCEPTS RUST :
// 1. Enum avec données : l'état de chargement porte la série ou l'erreur
// 2. Option chaining : prix actuel et variation calculés à la demande
// ============================================================================

use crate::models::{CandleSeries, Signal};

/// État de chargement des chandelles d'un item
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    /// Requête en cours (ou pas encore envoyée)
    Loading,
    /// Données disponibles
    Loaded(CandleSeries),
    /// Le fournisseur a échoué : pas de données, pas de nouvel essai
    Failed(String),
}

/// Un actif de la watchlist
#[derive(Debug, Clone)]
pub struct WatchlistItem {
    /// Symbole du ticker (ex: "AAPL")
    pub symbol: String,

    /// Nom complet (ex: "Apple Inc.")
    pub name: String,

    /// Chandelles journalières
    pub state: LoadState,

    /// Signaux associés à cet actif
    pub signals: Vec<Signal>,
}

impl WatchlistItem {
    /// Crée un nouvel item de watchlist sans données
    pub fn new(symbol: String, name: String) -> Self {
        Self {
            symbol,
            name,
            state: LoadState::Loading,
            signals: Vec::new(),
        }
    }

    /// Builder : attache les signaux de l'actif
    pub fn with_signals(mut self, signals: Vec<Signal>) -> Self {
        self.signals = signals;
        self
    }

    /// Retourne la série si elle est chargée
    pub fn candles(&self) -> Option<&CandleSeries> {
        match &self.state {
            LoadState::Loaded(series) => Some(series),
            _ => None,
        }
    }

    /// Retourne le prix actuel (close de la dernière chandelle)
    pub fn current_price(&self) -> Option<f64> {
        Some(self.candles()?.last()?.close)
    }

    /// Retourne la variation journalière en pourcentage
    pub fn change_percent(&self) -> Option<f64> {
        self.candles()?.daily_change_percent()
    }

    /// Nombre de signaux datés (ceux qui peuvent devenir des marqueurs)
    pub fn dated_signal_count(&self) -> usize {
        self.signals.iter().filter(|s| s.event_date.is_some()).count()
    }

    /// Retourne true si le ticker est en hausse
    pub fn is_positive(&self) -> bool {
        self.change_percent().map(|c| c >= 0.0).unwrap_or(false)
    }

    /// Formatte l'item pour l'affichage dans la liste
    ///
    /// Format : "AAPL    Apple Inc.           $271.49  ▲ +2.11%   3 signaux"
    pub fn display(&self) -> String {
        let price_str = match (&self.state, self.current_price()) {
            (_, Some(price)) => format!("${:.2}", price),
            (LoadState::Failed(_), None) => "Indisponible".to_string(),
            _ => "Loading...".to_string(),
        };

        let change_str = match self.change_percent() {
            Some(change) => {
                let arrow = if change >= 0.0 { "▲" } else { "▼" };
                format!("{} {:+.2}%", arrow, change)
            }
            None => String::new(),
        };

        // Tronque le nom à 20 caractères avec ellipse si nécessaire
        let truncated_name = if self.name.chars().count() <= 20 {
            self.name.clone()
        } else {
            let truncated: String = self.name.chars().take(19).collect();
            format!("{}…", truncated)
        };

        format!(
            "{:<8} {:<20} {:>12}  {:<10} {:>3} signaux",
            self.symbol,
            truncated_name,
            price_str,
            change_str,
            self.dated_signal_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candle, SignalCategory};
    use chrono::NaiveDate;

    fn series() -> CandleSeries {
        let d = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        CandleSeries::new(vec![Candle::new(d, 100.0, 110.0, 95.0, 105.0)]).unwrap()
    }

    #[test]
    fn test_watchlist_item_new() {
        let item = WatchlistItem::new("AAPL".to_string(), "Apple Inc.".to_string());
        assert_eq!(item.state, LoadState::Loading);
        assert!(item.current_price().is_none());
        assert!(item.display().contains("Loading..."));
    }

    #[test]
    fn test_watchlist_item_loaded() {
        let mut item = WatchlistItem::new("AAPL".to_string(), "Apple Inc.".to_string());
        item.state = LoadState::Loaded(series());

        assert_eq!(item.current_price(), Some(105.0));
        assert!(item.is_positive());
    }

    #[test]
    fn test_dated_signal_count() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 2);
        let item = WatchlistItem::new("AAPL".to_string(), "Apple".to_string()).with_signals(vec![
            Signal::new("a", d, SignalCategory::Buy),
            Signal::new("b", None, SignalCategory::Sell),
        ]);

        assert_eq!(item.dated_signal_count(), 1);
    }
}
