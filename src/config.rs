// ============================================================================
// Configuration de l'application
// ============================================================================
// Objet de configuration explicite, chargé une fois au démarrage puis passé
// aux composants à leur construction (fournisseur de prix, moteur de graphique)
//
// CONCEPTS RUST :
// 1. #[serde(default)] : tout champ absent du fichier prend sa valeur par défaut
// 2. Impl Default : valeurs par défaut centralisées
// 3. Option<&Path> : chemin explicite optionnel (argument --config)
// ============================================================================

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::chart::resolver::ReferenceFallback;
use crate::models::Lookback;

/// Nom du fichier cherché dans le répertoire courant
const LOCAL_CONFIG_FILE: &str = "lazysignals.toml";

/// Un actif de la watchlist tel que déclaré dans la configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub name: String,

    /// Actif autorisé à afficher un graphique
    #[serde(default = "default_true")]
    pub chart: bool,
}

fn default_true() -> bool {
    true
}

/// Paramètres du fournisseur de chandelles
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// URL de base de l'API chart de Yahoo Finance
    pub base_url: String,

    /// User-Agent envoyé (Yahoo bloque les clients sans User-Agent)
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

/// Paramètres du moteur d'annotation et de comparaison
///
/// Toutes les distances sont en cellules du terminal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Décalage vertical du marqueur au-dessus de sa chandelle
    pub marker_offset: f64,

    /// Écart maximal (en jours) pour la chandelle de référence la plus proche
    pub max_gap_days: i64,

    /// Que faire quand aucune chandelle de référence n'est assez proche
    pub reference_fallback: ReferenceFallback,

    /// Distance horizontale minimale d'un glisser pour lancer une comparaison
    pub min_drag_distance: f64,

    /// Marge exclue sur chaque bord de la zone de tracé (axes)
    pub plot_margin: f64,

    /// Décalage de la bulle d'aperçu par rapport au curseur
    pub preview_offset: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            marker_offset: 1.0,
            max_gap_days: 1,
            reference_fallback: ReferenceFallback::Hide,
            min_drag_distance: 1.0,
            plot_margin: 1.0,
            preview_offset: 2.0,
        }
    }
}

/// Configuration complète de l'application
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub watchlist: Vec<WatchlistEntry>,
    pub lookback: Lookback,
    pub signals_path: PathBuf,
    pub provider: ProviderConfig,
    pub chart: ChartConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let entry = |symbol: &str, name: &str| WatchlistEntry {
            symbol: symbol.to_string(),
            name: name.to_string(),
            chart: true,
        };

        Self {
            watchlist: vec![
                entry("AAPL", "Apple Inc."),
                entry("TSLA", "Tesla"),
                entry("BTC-USD", "Bitcoin USD"),
            ],
            lookback: Lookback::default(),
            signals_path: PathBuf::from("signals.json"),
            provider: ProviderConfig::default(),
            chart: ChartConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse une configuration depuis une chaîne TOML
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Fichier de configuration TOML invalide")
    }

    /// Charge la configuration
    ///
    /// Ordre de recherche :
    /// 1. chemin explicite (argument --config), qui doit exister
    /// 2. ./lazysignals.toml
    /// 3. <config_dir>/lazysignals/config.toml
    /// 4. valeurs par défaut
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        for candidate in Self::candidate_paths() {
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Configuration invalide : {}", path.display()))?;
        info!(path = %path.display(), symbols = config.watchlist.len(), "Configuration loaded");
        Ok(config)
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("lazysignals").join("config.toml"));
        }
        paths
    }

    /// Symboles autorisés à afficher un graphique
    pub fn chart_symbols(&self) -> BTreeSet<String> {
        self.watchlist
            .iter()
            .filter(|entry| entry.chart)
            .map(|entry| entry.symbol.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.watchlist.len(), 3);
        assert_eq!(config.chart.max_gap_days, 1);
        assert_eq!(config.chart.reference_fallback, ReferenceFallback::Hide);
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            lookback = "six_months"

            [[watchlist]]
            symbol = "MSFT"
            name = "Microsoft"

            [[watchlist]]
            symbol = "DOGE-USD"
            name = "Dogecoin"
            chart = false

            [chart]
            reference_fallback = "series_midpoint"
            "#,
        )
        .unwrap();

        assert_eq!(config.lookback, Lookback::SixMonths);
        assert_eq!(config.chart.reference_fallback, ReferenceFallback::SeriesMidpoint);
        assert_eq!(config.chart.min_drag_distance, 1.0);
        assert_eq!(
            config.chart_symbols().into_iter().collect::<Vec<_>>(),
            vec!["MSFT".to_string()]
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AppConfig::from_toml("lookback = 12").is_err());
    }
}
