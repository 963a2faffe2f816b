// ============================================================================
// LazySignals - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests d'intégration
// ============================================================================

pub mod api;    // Fournisseur de chandelles et fichier de signaux
pub mod app;    // État de l'application
pub mod chart;  // Moteur d'annotation et de comparaison
pub mod config; // Configuration TOML
pub mod models; // Structures de données
pub mod ui;     // Interface utilisateur
