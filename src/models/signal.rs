// ============================================================================
// Structure : Signal
// ============================================================================
// Un commentaire tiers (achat / vente / conserver) daté et lié à un actif
//
// CONCEPTS RUST :
// 1. Newtype pattern : SignalId(String) évite de confondre un id et un texte
// 2. Enum exhaustif : chaque catégorie est un variant, le compilateur
//    force à toutes les traiter
// 3. #[serde(from = "...")] : conversion personnalisée à la désérialisation
// ============================================================================

use std::fmt;

use chrono::NaiveDate;
use serde::Deserialize;

/// Identifiant unique d'un signal
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct SignalId(pub String);

impl SignalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Orientation d'un signal (sert au choix du glyphe et de la couleur)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

/// Catégorie d'un signal
///
/// CONCEPT : Valeur inconnue tolérée
/// - Une chaîne non reconnue donne `Unrecognized` au lieu d'une erreur
/// - L'affichage utilise alors la couleur neutre par défaut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum SignalCategory {
    StrongBuy,
    Buy,
    Positive,
    Hold,
    Neutral,
    Concern,
    Sell,
    StrongSell,
    Unrecognized,
}

impl SignalCategory {
    /// Label court affiché dans les bulles et les badges
    pub fn label(&self) -> &'static str {
        match self {
            SignalCategory::StrongBuy => "Achat fort",
            SignalCategory::Buy => "Achat",
            SignalCategory::Positive => "Positif",
            SignalCategory::Hold => "Conserver",
            SignalCategory::Neutral => "Neutre",
            SignalCategory::Concern => "Prudence",
            SignalCategory::Sell => "Vente",
            SignalCategory::StrongSell => "Vente forte",
            SignalCategory::Unrecognized => "Autre",
        }
    }

    pub fn bias(&self) -> Bias {
        match self {
            SignalCategory::StrongBuy | SignalCategory::Buy | SignalCategory::Positive => {
                Bias::Bullish
            }
            SignalCategory::Concern | SignalCategory::Sell | SignalCategory::StrongSell => {
                Bias::Bearish
            }
            SignalCategory::Hold | SignalCategory::Neutral | SignalCategory::Unrecognized => {
                Bias::Neutral
            }
        }
    }

    /// Retourne toutes les catégories connues
    pub fn all() -> [SignalCategory; 8] {
        [
            SignalCategory::StrongBuy,
            SignalCategory::Buy,
            SignalCategory::Positive,
            SignalCategory::Hold,
            SignalCategory::Neutral,
            SignalCategory::Concern,
            SignalCategory::Sell,
            SignalCategory::StrongSell,
        ]
    }
}

impl From<String> for SignalCategory {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "STRONG_BUY" => SignalCategory::StrongBuy,
            "BUY" => SignalCategory::Buy,
            "POSITIVE" => SignalCategory::Positive,
            "HOLD" => SignalCategory::Hold,
            "NEUTRAL" => SignalCategory::Neutral,
            "CONCERN" => SignalCategory::Concern,
            "SELL" => SignalCategory::Sell,
            "STRONG_SELL" => SignalCategory::StrongSell,
            _ => SignalCategory::Unrecognized,
        }
    }
}

/// Un signal à annoter sur le graphique
///
/// Invariant : un signal sans `event_date` n'est jamais affiché comme marqueur.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub id: SignalId,

    /// Date de l'événement (absente pour certains commentaires)
    #[serde(default)]
    pub event_date: Option<NaiveDate>,

    pub category: SignalCategory,

    /// Auteur ou source du commentaire
    #[serde(default)]
    pub attribution: String,

    /// Texte complet du commentaire
    #[serde(default)]
    pub text: String,

    /// Lien externe optionnel vers la source
    #[serde(default)]
    pub external_link: Option<String>,
}

impl Signal {
    /// Crée un signal minimal (sans texte ni lien)
    pub fn new(id: impl Into<String>, event_date: Option<NaiveDate>, category: SignalCategory) -> Self {
        Self {
            id: SignalId::new(id),
            event_date,
            category,
            attribution: String::new(),
            text: String::new(),
            external_link: None,
        }
    }

    /// Builder : ajoute l'auteur et le texte
    pub fn with_text(mut self, attribution: impl Into<String>, text: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self.text = text.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing() {
        assert_eq!(SignalCategory::from("STRONG_BUY".to_string()), SignalCategory::StrongBuy);
        assert_eq!(SignalCategory::from("sell".to_string()), SignalCategory::Sell);
        assert_eq!(SignalCategory::from("MOON".to_string()), SignalCategory::Unrecognized);
    }

    #[test]
    fn test_signal_deserialize() {
        let json = r#"{
            "id": "s1",
            "eventDate": "2025-01-05",
            "category": "BUY",
            "attribution": "Desk",
            "text": "Breakout",
            "externalLink": "https://example.com/s1"
        }"#;

        let signal: Signal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.id.as_str(), "s1");
        assert_eq!(signal.event_date, NaiveDate::from_ymd_opt(2025, 1, 5));
        assert_eq!(signal.category, SignalCategory::Buy);
        assert_eq!(signal.external_link.as_deref(), Some("https://example.com/s1"));
    }

    #[test]
    fn test_signal_without_date_or_known_category() {
        let json = r#"{ "id": "s2", "category": "WHATEVER" }"#;

        let signal: Signal = serde_json::from_str(json).unwrap();
        assert!(signal.event_date.is_none());
        assert_eq!(signal.category, SignalCategory::Unrecognized);
        assert_eq!(signal.category.bias(), Bias::Neutral);
    }
}
