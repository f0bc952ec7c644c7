use crate::{
    BoxError, Container, DependencyId, DynSvc, InjectError, InjectResult,
    Instance, ProvideResult, Provider, Service, Svc,
};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt::{Debug, Formatter},
};
use tracing::{debug, trace};

// Should never panic
static NAMESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").unwrap());

/// The result of looking up a resource. `Ok(None)` means the getter does not
/// have the resource and the next getter should be tried.
pub type GetterResult = Result<Option<DynSvc>, BoxError>;

type GetterFn = dyn Fn(&str) -> GetterResult + Send + Sync;

/// A function which looks up resources by name for a [`ResourceProvider`],
/// along with how it should be ranked and how its values should be cached.
///
/// By default, a getter has a priority of `0`, receives the resource name
/// without its namespace, and produces singletons.
#[derive(Clone)]
pub struct ResourceGetter {
    getter: Svc<GetterFn>,
    priority: f64,
    omit_namespace: bool,
    singleton: bool,
}

impl ResourceGetter {
    /// Creates a getter from a lookup function. Returning `None` passes the
    /// lookup on to the next getter in the namespace.
    #[must_use]
    pub fn new<F, R>(getter: F) -> Self
    where
        F: Fn(&str) -> Option<R> + Send + Sync + 'static,
        R: Service,
    {
        ResourceGetter::fallible(move |name| {
            Ok(getter(name).map(|value| Svc::new(value) as DynSvc))
        })
    }

    /// Creates a getter from a lookup function which may fail. Errors fail
    /// the whole resolution rather than passing the lookup on.
    #[must_use]
    pub fn fallible<F>(getter: F) -> Self
    where
        F: Fn(&str) -> GetterResult + Send + Sync + 'static,
    {
        ResourceGetter {
            getter: Svc::new(getter),
            priority: 0.0,
            omit_namespace: true,
            singleton: true,
        }
    }

    /// Sets the priority of this getter. Getters with a higher priority are
    /// tried first.
    #[must_use]
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// Passes the full `namespace:name` identifier to this getter rather than
    /// only the name.
    #[must_use]
    pub fn with_namespace(mut self) -> Self {
        self.omit_namespace = false;
        self
    }

    /// Marks the values of this getter as transient. They are looked up again
    /// each time they are requested.
    #[must_use]
    pub fn transient(mut self) -> Self {
        self.singleton = false;
        self
    }

    /// Gets the priority of this getter.
    #[must_use]
    pub fn priority(&self) -> f64 {
        self.priority
    }
}

impl Debug for ResourceGetter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGetter")
            .field("priority", &self.priority)
            .field("omit_namespace", &self.omit_namespace)
            .field("singleton", &self.singleton)
            .finish_non_exhaustive()
    }
}

/// Resolves string identifiers of the form `namespace:name` using getters
/// registered for each namespace.
///
/// Several getters may be registered for the same namespace. They are tried
/// from the highest priority to the lowest, and the first one that has the
/// resource wins. Two getters in a namespace can never share a priority, so
/// the order is always well defined.
///
/// ```
/// use dependency_container::{Container, ResourceGetter, ResourceProvider, Svc};
/// use std::collections::HashMap;
///
/// let overrides = HashMap::from([("port", 8080u16)]);
/// let defaults = HashMap::from([("port", 80u16), ("workers", 4u16)]);
///
/// let resources = ResourceProvider::new();
/// resources
///     .register(
///         "conf",
///         ResourceGetter::new(move |name| overrides.get(name).copied())
///             .with_priority(10.0),
///     )
///     .unwrap();
/// resources
///     .register(
///         "conf",
///         ResourceGetter::new(move |name| defaults.get(name).copied()),
///     )
///     .unwrap();
///
/// let container = Container::new();
/// container.register_provider(resources);
///
/// let port: Svc<u16> = container.get("conf:port").unwrap();
/// let workers: Svc<u16> = container.get("conf:workers").unwrap();
/// assert_eq!((8080, 4), (*port, *workers));
/// ```
#[derive(Default)]
pub struct ResourceProvider {
    namespaces: RwLock<HashMap<String, Vec<ResourceGetter>>>,
}

impl ResourceProvider {
    /// Creates a new provider with no getters.
    #[must_use]
    pub fn new() -> Self {
        ResourceProvider::default()
    }

    /// Registers a getter for a namespace.
    ///
    /// The namespace must be a non-empty string of word characters and the
    /// priority of the getter must not be NaN. If another getter in
    /// the namespace has the same priority, then
    /// [`InjectError::GetterPriorityConflict`] is returned.
    pub fn register(
        &self,
        namespace: &str,
        getter: ResourceGetter,
    ) -> InjectResult<()> {
        if !NAMESPACE.is_match(namespace) {
            return Err(InjectError::InvalidNamespace {
                namespace: namespace.to_owned(),
            });
        }

        let priority = getter.priority;
        if priority.is_nan() {
            return Err(InjectError::InvalidPriority { priority });
        }

        let mut namespaces = self.namespaces.write();
        let getters = namespaces.entry(namespace.to_owned()).or_default();

        // Sorted by descending priority, anything but NaN compares
        let position = getters.binary_search_by(|probe| {
            priority
                .partial_cmp(&probe.priority)
                .unwrap_or(Ordering::Equal)
        });
        match position {
            Ok(_) => Err(InjectError::GetterPriorityConflict {
                namespace: namespace.to_owned(),
                priority,
            }),
            Err(index) => {
                debug!(namespace, priority, "registering resource getter");
                getters.insert(index, getter);
                Ok(())
            }
        }
    }
}

impl Provider for ResourceProvider {
    fn resolve(
        &self,
        id: &DependencyId,
        _container: &Container,
    ) -> ProvideResult {
        let Some(full_name) = id.as_str() else {
            return Ok(None);
        };
        let Some((namespace, name)) = full_name.split_once(':') else {
            return Ok(None);
        };

        // Getters are user code, so don't hold the lock while calling them
        let getters = match self.namespaces.read().get(namespace) {
            Some(getters) => getters.clone(),
            None => return Ok(None),
        };

        for getter in getters {
            let key = if getter.omit_namespace { name } else { full_name };
            trace!(namespace, key, priority = getter.priority, "trying getter");
            if let Some(value) = (getter.getter)(key)? {
                return Ok(Some(Instance::new(value, getter.singleton)));
            }
        }

        Ok(None)
    }
}

impl Debug for ResourceProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.namespaces.read().iter().map(|(namespace, getters)| {
                let priorities: Vec<_> =
                    getters.iter().map(ResourceGetter::priority).collect();
                (namespace.clone(), priorities)
            }))
            .finish()
    }
}
