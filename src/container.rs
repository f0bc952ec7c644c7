use crate::{
    ContainerBuilder, DependencyId, DynSvc, InjectError, InjectResult,
    Provider, Service, Svc,
};
use parking_lot::{ReentrantMutex, RwLock};
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt::{Debug, Formatter},
};
use tracing::{debug, trace, warn};

mod proxy;
mod stack;

pub use proxy::*;
pub(crate) use stack::*;

struct ContainerInner {
    providers: RwLock<Vec<Svc<dyn Provider>>>,
    singletons: RwLock<HashMap<DependencyId, DynSvc>>,
    missing: HashSet<DependencyId>,
    instantiation: ReentrantMutex<RefCell<InstantiationStack>>,
}

/// A runtime dependency container. This holds an ordered list of providers
/// which know how to build dependencies, and a cache of the dependencies
/// which have been resolved as singletons.
///
/// # Sharing the container
///
/// Cloning the container does not clone the providers or the cache inside of
/// it. Both handles use the same state, which means a container can be stored
/// inside of the values it resolves (for example in a
/// [`TaggedDependencies`](crate::TaggedDependencies) view). Providers should
/// all be registered before the container is shared between threads.
///
/// # Resolution
///
/// Resolution of a dependency which is not cached yet is serialized by a
/// single container-wide reentrant lock. A provider may resolve other
/// dependencies through the same container while it is building a value,
/// and requesting a dependency which is already being resolved further up
/// the chain fails with [`InjectError::CycleDetected`].
///
/// ```
/// use dependency_container::{Container, Instance, ProvideResult, Provider, DependencyId, Svc};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Debug, Default)]
/// struct Counter(AtomicUsize);
///
/// impl Provider for Counter {
///     fn resolve(&self, id: &DependencyId, _container: &Container) -> ProvideResult {
///         if id != "count" {
///             return Ok(None);
///         }
///
///         let count = self.0.fetch_add(1, Ordering::SeqCst) + 1;
///         Ok(Some(Instance::singleton(count)))
///     }
/// }
///
/// let container = Container::new();
/// container.register_provider(Counter::default());
///
/// let first: Svc<usize> = container.get("count").unwrap();
/// let second: Svc<usize> = container.get("count").unwrap();
/// assert_eq!(1, *first);
/// assert!(Svc::ptr_eq(&first, &second));
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Svc<ContainerInner>,
}

impl Container {
    /// Creates a new, empty container.
    #[must_use]
    pub fn new() -> Self {
        Container::new_from_parts(Vec::new(), HashMap::new(), HashSet::new())
    }

    /// Creates a builder for a container.
    #[must_use]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    pub(crate) fn new_from_parts(
        providers: Vec<Svc<dyn Provider>>,
        singletons: HashMap<DependencyId, DynSvc>,
        missing: HashSet<DependencyId>,
    ) -> Self {
        Container {
            inner: Svc::new(ContainerInner {
                providers: RwLock::new(providers),
                singletons: RwLock::new(singletons),
                missing,
                instantiation: ReentrantMutex::new(RefCell::new(
                    InstantiationStack::default(),
                )),
            }),
        }
    }

    /// Appends a provider to this container. Providers are consulted in the
    /// order they were registered.
    pub fn register_provider<P: Provider>(&self, provider: P) {
        self.add_provider(Svc::new(provider));
    }

    /// Appends a shared provider to this container. The same provider may be
    /// registered more than once, in which case it is simply consulted again.
    pub fn add_provider(&self, provider: Svc<dyn Provider>) {
        debug!(provider = ?provider, "registering provider");
        self.inner.providers.write().push(provider);
    }

    /// Gets a copy of the registered providers, in resolution order.
    #[must_use]
    pub fn providers(&self) -> Vec<Svc<dyn Provider>> {
        self.inner.providers.read().clone()
    }

    /// Gets the first registered provider of the given type.
    ///
    /// ```
    /// use dependency_container::{Container, TagProvider};
    ///
    /// let container = Container::new();
    /// container.register_provider(TagProvider::new());
    ///
    /// let tags = container.provider::<TagProvider>().unwrap();
    /// tags.register_dependency("plugin:a", "plugin").unwrap();
    /// ```
    #[must_use]
    pub fn provider<P: Provider>(&self) -> Option<Svc<P>> {
        self.inner
            .providers
            .read()
            .iter()
            .find_map(|provider| provider.clone().downcast_arc::<P>().ok())
    }

    /// Gets a copy of the cached singletons.
    #[must_use]
    pub fn singletons(&self) -> HashMap<DependencyId, DynSvc> {
        self.inner.singletons.read().clone()
    }

    /// Returns whether a value is cached for the given dependency.
    #[must_use]
    pub fn contains_singleton(&self, id: impl Into<DependencyId>) -> bool {
        self.inner.singletons.read().contains_key(&id.into())
    }

    /// Gets the number of cached singletons.
    #[must_use]
    pub fn len_singletons(&self) -> usize {
        self.inner.singletons.read().len()
    }

    /// Resolves a dependency.
    ///
    /// Cached values are returned directly. Otherwise each provider is
    /// consulted in registration order until one of them supplies the value,
    /// which is cached if the provider marked it as a singleton.
    ///
    /// If no provider knows the dependency, [`InjectError::MissingProvider`]
    /// is returned. Errors returned by a provider are wrapped in
    /// [`InjectError::InstantiationFailed`], except for
    /// [`InjectError::CycleDetected`] which is returned unchanged.
    pub fn provide(&self, id: impl Into<DependencyId>) -> InjectResult<DynSvc> {
        self.provide_id(&id.into())
    }

    /// Resolves a dependency and downcasts it to a concrete type.
    pub fn get<T: Service>(
        &self,
        id: impl Into<DependencyId>,
    ) -> InjectResult<Svc<T>> {
        let id = id.into();
        self.provide_id(&id)?.downcast::<T>().map_err(|_| {
            InjectError::InvalidProvider {
                id,
                expected: std::any::type_name::<T>(),
            }
        })
    }

    /// Resolves a dependency and downcasts it to a concrete type. If no
    /// provider knows the dependency, then returns `Ok(None)` rather than
    /// returning an error. Missing dependencies of the requested dependency
    /// are still reported as errors.
    pub fn try_get<T: Service>(
        &self,
        id: impl Into<DependencyId>,
    ) -> InjectResult<Option<Svc<T>>> {
        let id = id.into();
        match self.get(&id) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.is_missing(&id) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Caches a value for a dependency. No provider is consulted.
    pub fn set<T: Service>(&self, id: impl Into<DependencyId>, value: T) {
        self.set_dyn(id, Svc::new(value));
    }

    /// Caches an already shared value for a dependency.
    pub fn set_dyn(&self, id: impl Into<DependencyId>, value: DynSvc) {
        let id = id.into();
        let _lock = self.inner.instantiation.lock();
        debug!(%id, "caching value");
        self.inner.singletons.write().insert(id, value);
    }

    /// Removes a value from the cache, returning it if it was cached.
    pub fn delete(&self, id: impl Into<DependencyId>) -> Option<DynSvc> {
        let id = id.into();
        let _lock = self.inner.instantiation.lock();
        debug!(%id, "removing cached value");
        self.inner.singletons.write().remove(&id)
    }

    /// Caches several values at once. The values are collected before the
    /// cache is locked, so they may be resolved from this container.
    pub fn update<K, I>(&self, values: I)
    where
        K: Into<DependencyId>,
        I: IntoIterator<Item = (K, DynSvc)>,
    {
        let values: Vec<(DependencyId, DynSvc)> = values
            .into_iter()
            .map(|(id, value)| (id.into(), value))
            .collect();

        let _lock = self.inner.instantiation.lock();
        let mut singletons = self.inner.singletons.write();
        for (id, value) in values {
            debug!(%id, "caching value");
            singletons.insert(id, value);
        }
    }

    /// Creates a builder for a new container which shares this container's
    /// providers but has its own cache.
    #[must_use]
    pub fn proxy(&self) -> ProxyBuilder<'_> {
        ProxyBuilder::new(self)
    }

    fn cached(&self, id: &DependencyId) -> Option<DynSvc> {
        self.inner.singletons.read().get(id).cloned()
    }

    fn provide_id(&self, id: &DependencyId) -> InjectResult<DynSvc> {
        if self.inner.missing.contains(id) {
            return Err(InjectError::MissingProvider { id: id.clone() });
        }

        if let Some(value) = self.cached(id) {
            trace!(%id, "cache hit");
            return Ok(value);
        }

        let stack = self.inner.instantiation.lock();
        let _frame =
            InstantiationStack::enter(&stack, id).map_err(|error| {
                warn!(%error, "dependency cycle detected");
                error
            })?;

        // Another thread may have resolved it while this one was waiting
        if let Some(value) = self.cached(id) {
            trace!(%id, "cache hit after waiting");
            return Ok(value);
        }

        let providers = self.providers();
        for provider in &providers {
            trace!(%id, ?provider, "consulting provider");
            match provider.resolve(id, self) {
                Ok(Some(instance)) => {
                    let (value, singleton) = instance.into_parts();
                    if singleton {
                        debug!(%id, "caching singleton");
                        self.inner
                            .singletons
                            .write()
                            .insert(id.clone(), value.clone());
                    }

                    return Ok(value);
                }
                Ok(None) => {}
                Err(error) => {
                    let error = instantiation_error(id, error);
                    if !matches!(error, InjectError::CycleDetected { .. }) {
                        warn!(%id, %error, "provider failed");
                    }

                    return Err(error);
                }
            }
        }

        Err(InjectError::MissingProvider { id: id.clone() })
    }
}

fn instantiation_error(
    id: &DependencyId,
    error: crate::BoxError,
) -> InjectError {
    match error.downcast::<InjectError>() {
        Ok(error) => match *error {
            error @ InjectError::CycleDetected { .. } => error,
            error => InjectError::InstantiationFailed {
                id: id.clone(),
                inner: Box::new(error),
            },
        },
        Err(error) => InjectError::InstantiationFailed {
            id: id.clone(),
            inner: error,
        },
    }
}

impl Default for Container {
    fn default() -> Self {
        Container::new()
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("providers", &*self.inner.providers.read())
            .field(
                "singletons",
                &self.inner.singletons.read().keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}
