//! Payments context and its lazily built components.

use crate::auth::IdentityResolver;
use crate::config::PaymentsConfig;
use crate::dao::SubscriptionDao;
use crate::document::DocumentStore;
use crate::error::Result;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Typed key naming one component of type `T`.
pub struct ComponentKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ComponentKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Key of the cached subscription DAO.
pub const SUBSCRIPTION_DAO: ComponentKey<SubscriptionDao> =
    ComponentKey::new("subscription-dao");

type Slot = (&'static str, TypeId);

/// Per-context map from component keys to shared instances.
#[derive(Default)]
pub struct ComponentRegistry {
    components: Mutex<HashMap<Slot, Arc<dyn Any + Send + Sync>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot<T: 'static>(key: &ComponentKey<T>) -> Slot {
        (key.name, TypeId::of::<T>())
    }

    pub fn get<T>(&self, key: &ComponentKey<T>) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let components = self.components.lock();
        components
            .get(&Self::slot(key))
            .cloned()
            .and_then(|component| component.downcast::<T>().ok())
    }

    /// Return the cached component, building it on first use.
    ///
    /// `init` runs under the registry lock, so concurrent first callers
    /// share one instance. It must not touch the registry.
    pub fn get_or_init<T, F>(&self, key: &ComponentKey<T>, init: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let mut components = self.components.lock();
        let slot = Self::slot(key);
        if let Some(existing) = components
            .get(&slot)
            .cloned()
            .and_then(|component| component.downcast::<T>().ok())
        {
            return existing;
        }

        debug!(component = key.name(), "creating component");
        let created = Arc::new(init());
        components.insert(slot, created.clone());
        created
    }

    /// Replace the component stored under `key`.
    pub fn set<T>(&self, key: &ComponentKey<T>, component: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        self.components.lock().insert(Self::slot(key), component);
    }
}

/// Everything the subscription API needs: configuration, the document
/// store, the identity resolver, and cached components such as the DAO.
pub struct PaymentsContext {
    config: PaymentsConfig,
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityResolver>,
    components: ComponentRegistry,
}

impl PaymentsContext {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityResolver>,
        config: PaymentsConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            identity,
            components: ComponentRegistry::new(),
        })
    }

    pub fn config(&self) -> &PaymentsConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn identity(&self) -> &Arc<dyn IdentityResolver> {
        &self.identity
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// The context's subscription DAO, created on first use.
    pub fn subscription_dao(&self) -> Arc<SubscriptionDao> {
        self.components.get_or_init(&SUBSCRIPTION_DAO, || {
            SubscriptionDao::new(Arc::clone(&self.store), &self.config)
        })
    }

    /// Replace the cached subscription DAO.
    pub fn set_subscription_dao(&self, dao: Arc<SubscriptionDao>) {
        self.components.set(&SUBSCRIPTION_DAO, dao);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionIdentity;
    use crate::document::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(usize);

    const COUNTER: ComponentKey<Counter> = ComponentKey::new("counter");

    #[test]
    fn test_get_or_init_builds_once() {
        let registry = ComponentRegistry::new();
        let builds = AtomicUsize::new(0);

        let first = registry.get_or_init(&COUNTER, || {
            builds.fetch_add(1, Ordering::SeqCst);
            Counter(1)
        });
        let second = registry.get_or_init(&COUNTER, || {
            builds.fetch_add(1, Ordering::SeqCst);
            Counter(2)
        });

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.0, 1);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_name_different_type_does_not_collide() {
        let registry = ComponentRegistry::new();
        let other: ComponentKey<String> = ComponentKey::new("counter");

        registry.get_or_init(&COUNTER, || Counter(3));
        let text = registry.get_or_init(&other, || "three".to_string());

        assert_eq!(text.as_str(), "three");
        assert_eq!(registry.get(&COUNTER).map(|c| c.0), Some(3));
    }

    #[test]
    fn test_set_replaces_component() {
        let registry = ComponentRegistry::new();
        registry.get_or_init(&COUNTER, || Counter(1));
        registry.set(&COUNTER, Arc::new(Counter(5)));
        assert_eq!(registry.get(&COUNTER).map(|c| c.0), Some(5));
    }

    #[test]
    fn test_context_caches_dao_in_its_registry() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let payments = PaymentsContext::new(
            Arc::clone(&store),
            Arc::new(SessionIdentity::new()),
            PaymentsConfig::default(),
        )
        .unwrap();

        assert!(Arc::ptr_eq(payments.store(), &store));
        assert_eq!(SUBSCRIPTION_DAO.name(), "subscription-dao");
        assert!(payments.components().get(&SUBSCRIPTION_DAO).is_none());

        let dao = payments.subscription_dao();
        let cached = payments.components().get(&SUBSCRIPTION_DAO).unwrap();
        assert!(Arc::ptr_eq(&dao, &cached));

        let replacement = Arc::new(SubscriptionDao::new(Arc::clone(&store), payments.config()));
        payments.set_subscription_dao(Arc::clone(&replacement));
        assert!(Arc::ptr_eq(&payments.subscription_dao(), &replacement));
    }
}
