// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod chart_view; // Écran graphique : chandeliers, axes, overlay
pub mod dashboard;  // Rendu de la watchlist et routage des écrans
pub mod events;     // Clavier, souris, redimensionnement

// Re-exports pour simplifier les imports
pub use chart_view::container_area;
pub use dashboard::render;
pub use events::{Event, EventHandler};
