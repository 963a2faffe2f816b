// ============================================================================
// Couche d'overlay du graphique
// ============================================================================
// Arbre plat de nœuds dessinés par-dessus la surface : marqueurs, lignes de
// liaison, bulles d'aperçu, popovers, rectangle de sélection.
//
// CONCEPTS RUST :
// 1. Arena : les nœuds vivent dans une BTreeMap, on les désigne par NodeId
// 2. Newtype : NodeId(u64) ne se confond pas avec un index quelconque
// 3. Enum avec données : chaque genre de nœud porte son propre contenu
// ============================================================================

use std::collections::BTreeMap;

use crate::models::SignalCategory;

// Ordre d'empilement (z) des différents nœuds
pub const SELECTION_Z: i32 = 1;
pub const CONNECTOR_Z: i32 = 5;
pub const MARKER_Z: i32 = 10;
pub const MARKER_HOVER_Z: i32 = 20;
pub const BUBBLE_Z: i32 = 30;
pub const POPOVER_Z: i32 = 40;

/// Point dans le repère du conteneur (en cellules, valeurs continues)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle dans le repère du conteneur
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Cellule unique contenant le point
    pub fn cell_at(point: Point) -> Self {
        Self::new(point.x.floor(), point.y.floor(), 1.0, 1.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Bord gauche/haut inclus, bord droit/bas exclu
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Retire `margin` sur chaque bord (jamais de taille négative)
    pub fn shrink(&self, margin: f64) -> Self {
        Self::new(
            self.x + margin,
            self.y + margin,
            (self.width - 2.0 * margin).max(0.0),
            (self.height - 2.0 * margin).max(0.0),
        )
    }
}

/// Identifiant d'un nœud dans la couche
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

/// Contenu du popover de détail d'un signal
#[derive(Debug, Clone, PartialEq)]
pub struct PopoverContent {
    pub attribution: String,
    pub category: SignalCategory,
    pub text: String,
    pub link: Option<String>,
}

/// Genre d'un nœud et ses données propres
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Marqueur d'un signal (agrandi pendant le survol)
    Marker {
        category: SignalCategory,
        enlarged: bool,
    },
    /// Ligne verticale entre la clôture de référence et le marqueur
    Connector { lit: bool },
    /// Bulle d'aperçu au survol
    PreviewBubble { lines: Vec<String> },
    /// Popover de détail épinglé
    DetailPopover(PopoverContent),
    /// Rectangle translucide pendant un glisser
    SelectionRect,
    /// Résultat d'une comparaison de prix
    ComparisonResult { lines: Vec<String>, gain: bool },
}

impl NodeKind {
    /// Les nœuds qui captent le pointeur
    pub fn is_interactive(&self) -> bool {
        !matches!(self, NodeKind::Connector { .. } | NodeKind::SelectionRect)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayNode {
    pub kind: NodeKind,
    pub bounds: Bounds,
    pub visible: bool,
    pub z: i32,
}

/// Racine de l'overlay, attachée au conteneur pendant la vie d'une instance
#[derive(Debug, Default)]
pub struct OverlayLayer {
    nodes: BTreeMap<NodeId, OverlayNode>,
    next_id: u64,
}

impl OverlayLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un nœud et retourne son identifiant
    pub fn insert(&mut self, kind: NodeKind, bounds: Bounds, z: i32, visible: bool) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            OverlayNode {
                kind,
                bounds,
                visible,
                z,
            },
        );
        id
    }

    pub fn remove(&mut self, id: NodeId) -> Option<OverlayNode> {
        self.nodes.remove(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&OverlayNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut OverlayNode> {
        self.nodes.get_mut(&id)
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.visible = visible;
        }
    }

    pub fn set_bounds(&mut self, id: NodeId, bounds: Bounds) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.bounds = bounds;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nombre de nœuds visibles satisfaisant le prédicat
    pub fn count_visible(&self, predicate: impl Fn(&NodeKind) -> bool) -> usize {
        self.nodes
            .values()
            .filter(|node| node.visible && predicate(&node.kind))
            .count()
    }

    /// Nœud interactif visible le plus haut sous le point
    ///
    /// À z égal, le dernier créé gagne (il est peint par-dessus).
    pub fn hit_test(&self, point: Point) -> Option<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| {
                node.visible && node.kind.is_interactive() && node.bounds.contains(point)
            })
            .max_by_key(|(id, node)| (node.z, **id))
            .map(|(id, _)| *id)
    }

    /// Nœuds visibles dans l'ordre de peinture (z croissant)
    pub fn painted(&self) -> Vec<(NodeId, &OverlayNode)> {
        let mut nodes: Vec<(NodeId, &OverlayNode)> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.visible)
            .map(|(id, node)| (*id, node))
            .collect();
        nodes.sort_by_key(|(id, node)| (node.z, *id));
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> NodeKind {
        NodeKind::Marker {
            category: SignalCategory::Buy,
            enlarged: false,
        }
    }

    #[test]
    fn test_bounds_contains_and_shrink() {
        let bounds = Bounds::new(0.0, 0.0, 10.0, 5.0);
        assert!(bounds.contains(Point::new(0.0, 0.0)));
        assert!(!bounds.contains(Point::new(10.0, 2.0)));

        let inner = bounds.shrink(1.0);
        assert_eq!(inner, Bounds::new(1.0, 1.0, 8.0, 3.0));
        assert!(!inner.contains(Point::new(0.5, 2.0)));
        assert_eq!(Bounds::new(0.0, 0.0, 1.0, 1.0).shrink(2.0).width, 0.0);
    }

    #[test]
    fn test_hit_test_prefers_highest_z() {
        let mut layer = OverlayLayer::new();
        let area = Bounds::new(0.0, 0.0, 4.0, 4.0);
        let low = layer.insert(marker(), area, MARKER_Z, true);
        let high = layer.insert(NodeKind::PreviewBubble { lines: vec![] }, area, BUBBLE_Z, true);

        assert_eq!(layer.hit_test(Point::new(1.0, 1.0)), Some(high));

        layer.set_visible(high, false);
        assert_eq!(layer.hit_test(Point::new(1.0, 1.0)), Some(low));
    }

    #[test]
    fn test_hit_test_ignores_passive_nodes() {
        let mut layer = OverlayLayer::new();
        let area = Bounds::new(0.0, 0.0, 4.0, 4.0);
        layer.insert(NodeKind::Connector { lit: false }, area, CONNECTOR_Z, true);
        layer.insert(NodeKind::SelectionRect, area, SELECTION_Z, true);

        assert_eq!(layer.hit_test(Point::new(1.0, 1.0)), None);
    }

    #[test]
    fn test_painted_order() {
        let mut layer = OverlayLayer::new();
        let area = Bounds::new(0.0, 0.0, 1.0, 1.0);
        let popover = layer.insert(NodeKind::SelectionRect, area, POPOVER_Z, true);
        let hidden = layer.insert(marker(), area, MARKER_Z, false);
        let rect = layer.insert(NodeKind::SelectionRect, area, SELECTION_Z, true);

        let order: Vec<NodeId> = layer.painted().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![rect, popover]);
        assert!(!order.contains(&hidden));
        assert_eq!(layer.count_visible(|kind| matches!(kind, NodeKind::Marker { .. })), 0);
    }
}
