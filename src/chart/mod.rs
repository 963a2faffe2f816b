// ============================================================================
// Module : chart
// ============================================================================
// Moteur d'annotation et de comparaison du graphique :
// surface (repère), résolution des positions, marqueurs, outil de
// comparaison, et le contrôleur qui gère la vie d'une instance.
// ============================================================================

pub mod comparison; // Glisser pour comparer deux dates
pub mod container;  // Zone d'écran, racine d'overlay, listeners
pub mod host;       // Montage / démontage d'une instance
pub mod lifetime;   // Jeton d'annulation, abonnements, disposers
pub mod markers;    // Vues des signaux (marqueur, ligne, bulle, popover)
pub mod overlay;    // Arbre des nœuds dessinés par-dessus la surface
pub mod resolver;   // Signal → position à l'écran
pub mod surface;    // Contrat de la surface de graphique
pub mod terminal;   // Surface en cellules de terminal

use thiserror::Error;

pub use comparison::{Comparison, GestureOutcome, RangeComparison, Selection};
pub use container::{ChartContainer, PointerEvent, PointerKind};
pub use host::{ChartHost, HostState};
pub use overlay::{Bounds, NodeKind, OverlayLayer, Point};
pub use surface::{ChartSurface, CoordinateSpace, SurfaceLoader, VisibleRange};
pub use terminal::{TerminalSurface, TerminalSurfaceLoader};

/// Erreurs du moteur de graphique
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("pas de données de prix pour {0}")]
    DataUnavailable(String),

    #[error("graphique non disponible pour {0}")]
    UnsupportedAsset(String),

    #[error("échec d'initialisation de la surface : {0}")]
    SurfaceInit(String),

    #[error("montage annulé")]
    Cancelled,
}
