// ============================================================================
// Fournisseur de prix : Yahoo Finance
// ============================================================================
// Récupère les chandelles journalières d'un actif depuis l'API chart de
// Yahoo Finance et les normalise en CandleSeries (triée, unique par date).
//
// Pas de nouvel essai : une erreur est remontée telle quelle à l'appelant.
//
// CONCEPTS RUST :
// 1. Trait avec méthode async (impl Future) : le fournisseur est remplaçable
// 2. Serde : désérialisation JSON automatique
// 3. anyhow::Context : chaque erreur porte son contexte
// ============================================================================

use std::future::Future;

use anyhow::{Context, Result};
use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::models::{Candle, CandleSeries, Lookback};

/// Source de chandelles journalières
pub trait PriceSeriesProvider {
    fn fetch(&self, symbol: &str, lookback: Lookback) -> impl Future<Output = Result<CandleSeries>> + Send;
}

// ============================================================================
// Structures pour parser la réponse JSON de Yahoo Finance
// ============================================================================

#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
}

// ============================================================================
// Client
// ============================================================================

pub struct YahooProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooProvider {
    /// Construit le client HTTP à partir de la configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL de la requête : chandelles journalières sur la période demandée
    fn url(&self, symbol: &str, lookback: Lookback) -> String {
        let now = chrono::Utc::now().timestamp();
        let period1 = now - i64::from(lookback.to_days()) * 24 * 60 * 60;

        format!(
            "{}/{}?interval=1d&period1={}&period2={}",
            self.base_url, symbol, period1, now
        )
    }
}

impl PriceSeriesProvider for YahooProvider {
    /// CONCEPT RUST : #[instrument]
    /// - Tous les logs à l'intérieur ont le contexte symbol + lookback
    #[instrument(skip(self, lookback), fields(lookback = lookback.label()))]
    async fn fetch(&self, symbol: &str, lookback: Lookback) -> Result<CandleSeries> {
        let url = self.url(symbol, lookback);
        debug!(url = %url, "Built Yahoo Finance API URL");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Échec de la requête HTTP vers Yahoo Finance")?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            error!(status = %status, "Yahoo Finance returned error status");
            anyhow::bail!("Yahoo Finance a retourné une erreur : HTTP {}", status);
        }

        let yahoo_response: YahooResponse = response
            .json()
            .await
            .context("Échec du parsing JSON de la réponse Yahoo")?;

        let series = parse_yahoo_response(yahoo_response, symbol)?;
        info!(candles = series.len(), "Successfully fetched daily candles");
        Ok(series)
    }
}

/// Convertit la réponse Yahoo en série de chandelles
///
/// Les points avec une valeur manquante (jours fériés, données partielles)
/// sont ignorés.
fn parse_yahoo_response(yahoo_response: YahooResponse, symbol: &str) -> Result<CandleSeries> {
    if let Some(err) = yahoo_response.chart.error {
        anyhow::bail!("Yahoo Finance : {} ({})", err.description, err.code);
    }

    let result = yahoo_response
        .chart
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .context("Aucune donnée retournée par Yahoo Finance")?;

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .context("Pas de données OHLC dans la réponse")?;

    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.unwrap_or_default();

    let mut candles = Vec::with_capacity(timestamps.len());
    let mut skipped = 0;
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            value_at(&opens, i),
            value_at(&highs, i),
            value_at(&lows, i),
            value_at(&closes, i),
        ) else {
            skipped += 1;
            continue;
        };

        let date = DateTime::from_timestamp(timestamp, 0)
            .context("Timestamp invalide")?
            .date_naive();
        candles.push(Candle::new(date, open, high, low, close));
    }

    if skipped > 0 {
        warn!(skipped, total = timestamps.len(), "Skipped candles with missing data");
    }

    if candles.is_empty() {
        error!("No valid daily candle found");
        anyhow::bail!("Aucune chandelle valide trouvée pour {}", symbol);
    }

    CandleSeries::from_unsorted(candles)
        .with_context(|| format!("Série de chandelles invalide pour {}", symbol))
}

fn value_at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

// ============================================================================
// Tests unitaires
// ============================================================================
