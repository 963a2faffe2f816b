// ============================================================================
// Module : models
// ============================================================================
// Structures de données du domaine : chandelles, signaux, watchlist
// ============================================================================

pub mod candle;         // Chandelles journalières et série ordonnée
pub mod signal;         // Signaux (commentaires datés et catégorisés)
pub mod watchlist_item; // Item de la watchlist (actif + données)

// Re-exports pour simplifier les imports
pub use candle::{Candle, CandleSeries, Lookback, SeriesError};
pub use signal::{Bias, Signal, SignalCategory, SignalId};
pub use watchlist_item::{LoadState, WatchlistItem};
