// ============================================================================
// Gestion des événements
// ============================================================================
// Gère les événements clavier, souris, redimensionnement et les ticks
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Pattern matching : helpers is_*_event pour router dans la boucle
// 3. Error handling avec Result
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};

use crate::chart::PointerKind;

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Événement souris (position absolue dans le terminal)
    Mouse(MouseEvent),

    /// Le terminal a changé de taille
    Resize(u16, u16),

    /// Tick régulier (rafraîchissement)
    Tick,
}

/// Gestionnaire d'événements
pub struct EventHandler;

impl EventHandler {
    pub fn new() -> Self {
        Self
    }

    /// Lit le prochain événement (bloquant avec timeout de 250ms)
    ///
    /// CONCEPT : Non-blocking I/O avec timeout
    /// - Si pas d'événement, retourne Ok(Event::Tick)
    pub fn next(&self) -> Result<Event> {
        if !event::poll(Duration::from_millis(250))? {
            return Ok(Event::Tick);
        }

        match event::read()? {
            // Sur certains OS, on reçoit Press ET Release : on ne garde que Press
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),
            CrosstermEvent::Mouse(mouse) => Ok(Event::Mouse(mouse)),
            CrosstermEvent::Resize(width, height) => Ok(Event::Resize(width, height)),
            _ => Ok(Event::Tick),
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers clavier
// ============================================================================

/// Vérifie si l'événement est la touche 'q' (quitter)
pub fn is_quit_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
    } else {
        false
    }
}

/// Vérifie si l'événement est Échap
pub fn is_escape_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Esc)
    } else {
        false
    }
}

/// Vérifie si l'événement est Entrée
pub fn is_enter_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Enter)
    } else {
        false
    }
}

/// Flèche vers le haut ou 'k' (vim)
pub fn is_up_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K'))
    } else {
        false
    }
}

/// Flèche vers le bas ou 'j' (vim)
pub fn is_down_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J'))
    } else {
        false
    }
}

/// Flèche gauche ou 'h' : décale le graphique vers le passé
pub fn is_pan_left_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Left | KeyCode::Char('h'))
    } else {
        false
    }
}

/// Flèche droite ou 'l' : décale le graphique vers le récent
pub fn is_pan_right_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Right | KeyCode::Char('l'))
    } else {
        false
    }
}

pub fn is_zoom_in_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Char('+') | KeyCode::Char('='))
    } else {
        false
    }
}

pub fn is_zoom_out_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Char('-') | KeyCode::Char('_'))
    } else {
        false
    }
}

/// 'f' : réaffiche les dernières chandelles
pub fn is_fit_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        matches!(key.code, KeyCode::Char('f') | KeyCode::Char('F'))
    } else {
        false
    }
}

// ============================================================================
// Helpers souris
// ============================================================================
// CONCEPT : Seul le bouton gauche pilote le graphique
// - Down / Drag / Up deviennent les gestes du conteneur
// - Moved (sans bouton) devient un survol
// ============================================================================

/// Traduit un événement souris en geste de pointeur
///
/// Retourne le genre et la cellule (colonne, ligne) absolue dans le terminal.
pub fn pointer_from_mouse(mouse: &MouseEvent) -> Option<(PointerKind, u16, u16)> {
    let kind = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => PointerKind::Down,
        MouseEventKind::Up(MouseButton::Left) => PointerKind::Up,
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => PointerKind::Move,
        _ => return None,
    };
    Some((kind, mouse.column, mouse.row))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    fn mouse(kind: MouseEventKind) -> MouseEvent {
        MouseEvent {
            kind,
            column: 12,
            row: 4,
            modifiers: KeyModifiers::empty(),
        }
    }

    #[test]
    fn test_is_quit_event() {
        assert!(is_quit_event(&key(KeyCode::Char('q'))));
        assert!(!is_quit_event(&key(KeyCode::Char('a'))));
        assert!(!is_quit_event(&Event::Tick));
    }

    #[test]
    fn test_chart_keys() {
        assert!(is_pan_left_event(&key(KeyCode::Left)));
        assert!(is_pan_right_event(&key(KeyCode::Char('l'))));
        assert!(is_zoom_in_event(&key(KeyCode::Char('+'))));
        assert!(is_zoom_out_event(&key(KeyCode::Char('-'))));
        assert!(is_fit_event(&key(KeyCode::Char('f'))));
        assert!(!is_fit_event(&Event::Resize(80, 24)));
    }

    #[test]
    fn test_pointer_from_mouse() {
        assert_eq!(
            pointer_from_mouse(&mouse(MouseEventKind::Down(MouseButton::Left))),
            Some((PointerKind::Down, 12, 4))
        );
        assert_eq!(
            pointer_from_mouse(&mouse(MouseEventKind::Drag(MouseButton::Left))).map(|p| p.0),
            Some(PointerKind::Move)
        );
        assert!(pointer_from_mouse(&mouse(MouseEventKind::Down(MouseButton::Right))).is_none());
        assert!(pointer_from_mouse(&mouse(MouseEventKind::ScrollUp)).is_none());
    }
}
