// ============================================================================
// Durée de vie d'une instance de graphique
// ============================================================================
// Trois outils pour démonter proprement un graphique :
// - LifetimeToken : jeton d'annulation lié à UNE instance (monotone)
// - Registry<T> : table d'abonnés ; chaque enregistrement rend un handle
// - Disposers : liste d'actions de nettoyage exécutées d'un seul coup
//
// CONCEPTS RUST :
// 1. Arc<AtomicBool> : drapeau partagé entre threads sans verrou
// 2. Arc<Mutex<...>> + Weak : un handle qui ne garde pas la table en vie
// 3. Box<dyn FnOnce()> : action de nettoyage exécutée au plus une fois
// ============================================================================

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Jeton d'annulation d'une instance de graphique
///
/// Une fois annulé, il le reste (aucune méthode ne remet le drapeau à false).
#[derive(Debug, Clone, Default)]
pub struct LifetimeToken {
    cancelled: Arc<AtomicBool>,
}

impl LifetimeToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Vrai si les deux jetons désignent la même instance
    pub fn same_as(&self, other: &LifetimeToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// Handle retourné par un abonnement
///
/// CONCEPT : Désabonnement explicite
/// - `unsubscribe()` consomme le handle : impossible de se désabonner deux fois
/// - Le handle est collecté dans `Disposers` par l'instance de graphique
#[must_use = "un abonnement non conservé ne pourra plus être retiré"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

struct Slots<T> {
    next_id: u64,
    entries: BTreeMap<u64, T>,
}

/// Table d'abonnés partagée (callbacks de la surface, listeners du conteneur)
pub struct Registry<T> {
    inner: Arc<Mutex<Slots<T>>>,
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Slots {
                next_id: 0,
                entries: BTreeMap::new(),
            })),
        }
    }
}

impl<T: Send + 'static> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre une entrée et retourne le handle qui la retire
    pub fn register(&self, entry: T) -> Subscription {
        let id = {
            let mut slots = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.insert(id, entry);
            id
        };

        let weak: Weak<Mutex<Slots<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entries
                    .remove(&id);
            }
        })
    }

    /// Nombre d'entrées encore enregistrées
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appelle `f` sur chaque entrée, dans l'ordre d'enregistrement
    pub fn for_each(&self, mut f: impl FnMut(&mut T)) {
        let mut slots = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for entry in slots.entries.values_mut() {
            f(entry);
        }
    }

    /// Retire toutes les entrées (surface détruite)
    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clear();
    }
}

/// Liste des actions de nettoyage d'une instance
///
/// CONCEPT : Arena de ressources
/// - Chaque abonnement / listener ajouté pendant le montage pousse son handle ici
/// - `dispose_all()` les exécute tous, dans l'ordre inverse d'enregistrement
#[derive(Default)]
pub struct Disposers {
    actions: Vec<Box<dyn FnOnce() + Send>>,
}

impl Disposers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: impl FnOnce() + Send + 'static) {
        self.actions.push(Box::new(action));
    }

    pub fn push_subscription(&mut self, subscription: Subscription) {
        self.push(move || subscription.unsubscribe());
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn dispose_all(&mut self) {
        while let Some(action) = self.actions.pop() {
            action();
        }
    }
}

impl std::fmt::Debug for Disposers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposers")
            .field("pending", &self.actions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_monotonic() {
        let token = LifetimeToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
        assert!(clone.same_as(&token));
        assert!(!LifetimeToken::new().same_as(&token));
    }

    #[test]
    fn test_registry_unsubscribe() {
        let registry: Registry<u32> = Registry::new();
        let first = registry.register(1);
        let _second = registry.register(2);
        assert_eq!(registry.len(), 2);

        first.unsubscribe();
        assert_eq!(registry.len(), 1);

        let mut seen = Vec::new();
        registry.for_each(|v| seen.push(*v));
        assert_eq!(seen, vec![2]);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry: Registry<u32> = Registry::new();
        let subscription = registry.register(1);
        drop(registry);
        subscription.unsubscribe();
    }

    #[test]
    fn test_disposers_run_once_in_reverse_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut disposers = Disposers::new();

        for i in 0..3 {
            let order = Arc::clone(&order);
            disposers.push(move || order.lock().unwrap().push(i));
        }

        disposers.dispose_all();
        disposers.dispose_all();

        assert!(disposers.is_empty());
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }
}
