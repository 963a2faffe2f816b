// ============================================================================
// Conteneur du graphique
// ============================================================================
// Zone d'écran réservée au graphique. Elle porte :
// - la racine de l'overlay (présente seulement pendant la vie d'une instance)
// - la table des listeners (redimensionnement, pointeur)
//
// Les événements bruts (souris, taille du terminal) entrent ici par
// `resize()` et `dispatch_pointer()`, puis sont relayés aux listeners.
// ============================================================================

use crate::chart::lifetime::{Registry, Subscription};
use crate::chart::overlay::{Bounds, OverlayLayer, Point};

/// Phase d'un événement de pointeur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// Événement de pointeur, en coordonnées du conteneur
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub position: Point,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, x: f64, y: f64) -> Self {
        Self {
            kind,
            position: Point::new(x, y),
        }
    }
}

/// Événement relayé aux listeners
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContainerEvent {
    Resized { width: f64, height: f64 },
    Pointer(PointerEvent),
}

/// À quoi un listener est attaché
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerTarget {
    /// Changements de taille du conteneur
    Resize,
    /// Tout pointer-down, où qu'il tombe
    Document,
    /// Pointeur dans la zone du graphique (move/up suivis même hors zone)
    Plot,
}

pub type ListenerFn = Box<dyn FnMut(&ContainerEvent) + Send>;

struct Listener {
    target: ListenerTarget,
    handler: ListenerFn,
}

pub struct ChartContainer {
    width: f64,
    height: f64,
    overlay: Option<OverlayLayer>,
    listeners: Registry<Listener>,
}

impl ChartContainer {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            overlay: None,
            listeners: Registry::new(),
        }
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(0.0, 0.0, self.width, self.height)
    }

    /// Change la taille et prévient les observateurs (si elle a changé)
    pub fn resize(&mut self, width: f64, height: f64) {
        if (width - self.width).abs() < f64::EPSILON && (height - self.height).abs() < f64::EPSILON {
            return;
        }
        self.width = width;
        self.height = height;
        self.emit(&ContainerEvent::Resized { width, height });
    }

    /// Relaie un événement de pointeur
    ///
    /// Les listeners `Plot` passent avant `Document` (ordre de remontée).
    /// Un pointer-down hors du conteneur n'atteint que `Document`.
    pub fn dispatch_pointer(&mut self, event: PointerEvent) {
        let inside = self.bounds().contains(event.position);
        let payload = ContainerEvent::Pointer(event);

        if inside || event.kind != PointerKind::Down {
            self.emit_to(ListenerTarget::Plot, &payload);
        }
        if event.kind == PointerKind::Down {
            self.emit_to(ListenerTarget::Document, &payload);
        }
    }

    /// Attache un listener ; le handle retourné le retire
    pub fn add_listener(
        &mut self,
        target: ListenerTarget,
        handler: impl FnMut(&ContainerEvent) + Send + 'static,
    ) -> Subscription {
        self.listeners.register(Listener {
            target,
            handler: Box::new(handler),
        })
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ========================================================================
    // Racine de l'overlay
    // ========================================================================

    /// Crée (ou remplace) la racine de l'overlay
    pub fn create_overlay_root(&mut self) -> &mut OverlayLayer {
        self.overlay.insert(OverlayLayer::new())
    }

    pub fn remove_overlay_root(&mut self) -> Option<OverlayLayer> {
        self.overlay.take()
    }

    pub fn overlay(&self) -> Option<&OverlayLayer> {
        self.overlay.as_ref()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut OverlayLayer> {
        self.overlay.as_mut()
    }

    fn emit(&self, event: &ContainerEvent) {
        self.emit_to(ListenerTarget::Resize, event);
    }

    fn emit_to(&self, target: ListenerTarget, event: &ContainerEvent) {
        self.listeners.for_each(|listener| {
            if listener.target == target {
                (listener.handler)(event);
            }
        });
    }
}

impl std::fmt::Debug for ChartContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartContainer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("overlay", &self.overlay.is_some())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(
        container: &mut ChartContainer,
        target: ListenerTarget,
        log: &Arc<Mutex<Vec<(ListenerTarget, ContainerEvent)>>>,
    ) -> Subscription {
        let log = Arc::clone(log);
        container.add_listener(target, move |event| log.lock().unwrap().push((target, *event)))
    }

    #[test]
    fn test_pointer_routing() {
        let mut container = ChartContainer::new(20.0, 10.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        let _plot = recorder(&mut container, ListenerTarget::Plot, &log);
        let _doc = recorder(&mut container, ListenerTarget::Document, &log);

        container.dispatch_pointer(PointerEvent::new(PointerKind::Down, 5.0, 5.0));
        container.dispatch_pointer(PointerEvent::new(PointerKind::Down, 50.0, 5.0));
        container.dispatch_pointer(PointerEvent::new(PointerKind::Up, 50.0, 5.0));

        let targets: Vec<ListenerTarget> = log.lock().unwrap().iter().map(|(t, _)| *t).collect();
        assert_eq!(
            targets,
            vec![
                ListenerTarget::Plot,
                ListenerTarget::Document,
                ListenerTarget::Document,
                ListenerTarget::Plot,
            ]
        );
    }

    #[test]
    fn test_resize_only_when_changed() {
        let mut container = ChartContainer::new(20.0, 10.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        let subscription = recorder(&mut container, ListenerTarget::Resize, &log);

        container.resize(20.0, 10.0);
        container.resize(30.0, 12.0);
        assert_eq!(log.lock().unwrap().len(), 1);

        subscription.unsubscribe();
        assert_eq!(container.listener_count(), 0);
        container.resize(40.0, 12.0);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_overlay_root_lifecycle() {
        let mut container = ChartContainer::new(20.0, 10.0);
        assert!(container.overlay().is_none());

        container.create_overlay_root();
        assert!(container.overlay().is_some());

        container.remove_overlay_root();
        assert!(container.overlay().is_none());
    }
}
