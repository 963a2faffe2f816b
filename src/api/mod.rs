// ============================================================================
// Module : api
// ============================================================================
// Frontières d'entrée des données : fournisseur de chandelles (Yahoo Finance)
// et fichier de signaux
// ============================================================================

pub mod signals; // Fichier JSON de signaux
pub mod yahoo;   // Fournisseur de chandelles Yahoo Finance

// Re-exports
pub use signals::{load_signal_file, SignalBook};
pub use yahoo::{PriceSeriesProvider, YahooProvider};
