// ============================================================================
// Source des signaux : fichier JSON
// ============================================================================
// Format attendu :
//
//   [
//     { "symbol": "AAPL", "signals": [
//         { "id": "s1", "eventDate": "2025-01-05", "category": "BUY",
//           "attribution": "Desk", "text": "...", "externalLink": "https://..." }
//     ] }
//   ]
//
// La validation se fait ici, à l'entrée : ids dupliqués écartés (le premier
// gagne), catégories inconnues gardées comme `Unrecognized`, enregistrements
// illisibles (date invalide, id manquant) ignorés avec un warning.
// Seul un fichier dont la structure est invalide est une erreur.
// ============================================================================

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::models::Signal;

/// Signaux indexés par symbole
pub type SignalBook = BTreeMap<String, Vec<Signal>>;

#[derive(Debug, Deserialize)]
struct SignalFileEntry {
    symbol: String,
    #[serde(default)]
    signals: Vec<serde_json::Value>,
}

/// Parse le contenu d'un fichier de signaux
pub fn parse_signals(content: &str) -> Result<SignalBook> {
    let entries: Vec<SignalFileEntry> =
        serde_json::from_str(content).context("Fichier de signaux JSON invalide")?;

    let mut book = SignalBook::new();
    for entry in entries {
        let signals = book.entry(entry.symbol.clone()).or_default();
        let mut seen: BTreeSet<_> = signals.iter().map(|s| s.id.clone()).collect();

        for raw in entry.signals {
            let signal: Signal = match serde_json::from_value(raw) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!(symbol = %entry.symbol, error = %e, "Malformed signal skipped");
                    continue;
                }
            };
            if !seen.insert(signal.id.clone()) {
                warn!(symbol = %entry.symbol, id = %signal.id, "Duplicate signal id ignored");
                continue;
            }
            signals.push(signal);
        }
    }

    debug!(symbols = book.len(), "Parsed signal file");
    Ok(book)
}

/// Charge le fichier de signaux
///
/// Un fichier absent n'est pas une erreur : aucun signal n'est affiché.
pub fn load_signal_file(path: &Path) -> Result<SignalBook> {
    if !path.exists() {
        warn!(path = %path.display(), "Signal file not found, no markers will be shown");
        return Ok(SignalBook::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    let book = parse_signals(&content).with_context(|| format!("Signaux invalides : {}", path.display()))?;

    let total: usize = book.values().map(Vec::len).sum();
    info!(path = %path.display(), symbols = book.len(), signals = total, "Signals loaded");
    Ok(book)
}
