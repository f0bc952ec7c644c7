use crate::{BoxError, Container, DependencyId, DynSvc, Service, Svc};
use downcast_rs::{impl_downcast, DowncastSync};
use std::fmt::{Debug, Formatter};

/// The result of asking a [`Provider`] for a dependency. `Ok(None)` means the
/// provider does not know the dependency and the next provider should be
/// consulted.
pub type ProvideResult = Result<Option<Instance>, BoxError>;

/// A value resolved by a provider, along with whether the container should
/// cache it.
///
/// An instance is consumed by the container once it is returned, so it
/// cannot be cloned and handed out again:
///
/// ```compile_fail
/// use dependency_container::Instance;
///
/// let instance = Instance::singleton(1i32);
/// let again = instance.clone();
/// ```
pub struct Instance {
    value: DynSvc,
    singleton: bool,
}

impl Instance {
    /// Creates a new instance.
    #[must_use]
    pub fn new(value: DynSvc, singleton: bool) -> Self {
        Instance { value, singleton }
    }

    /// Creates an instance which is cached by the container after its first
    /// resolution.
    #[must_use]
    pub fn singleton<T: Service>(value: T) -> Self {
        Instance::new(Svc::new(value), true)
    }

    /// Creates an instance which is never cached. The provider is consulted
    /// again on every request.
    #[must_use]
    pub fn transient<T: Service>(value: T) -> Self {
        Instance::new(Svc::new(value), false)
    }

    /// Gets the resolved value.
    #[must_use]
    pub fn value(&self) -> &DynSvc {
        &self.value
    }

    /// Whether the container should cache this value.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Splits this instance into its value and its singleton flag.
    #[must_use]
    pub fn into_parts(self) -> (DynSvc, bool) {
        (self.value, self.singleton)
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("singleton", &self.singleton)
            .finish_non_exhaustive()
    }
}

/// Resolves dependencies for a [`Container`].
///
/// Providers are consulted in the order they were registered, and the first
/// one to return an [`Instance`] wins. A provider should be a function of the
/// identifier and its own registrations only. Caching is decided by the
/// container from [`Instance::is_singleton()`], so providers should not try to
/// cache values themselves. The container is passed in so that a provider can
/// resolve the dependencies of the value it is building.
///
/// # Example
///
/// ```
/// use dependency_container::{
///     Container, DependencyId, Instance, ProvideResult, Provider, Svc,
/// };
///
/// #[derive(Debug)]
/// struct Greeter;
///
/// impl Provider for Greeter {
///     fn resolve(
///         &self,
///         id: &DependencyId,
///         container: &Container,
///     ) -> ProvideResult {
///         if id != "greeting" {
///             return Ok(None);
///         }
///
///         let name: Svc<String> = container.get("name")?;
///         Ok(Some(Instance::transient(format!("Hello, {}!", name))))
///     }
/// }
///
/// let mut builder = Container::builder();
/// builder.provide(Greeter);
/// builder.singleton("name", String::from("world"));
///
/// let container = builder.build();
/// let greeting: Svc<String> = container.get("greeting").unwrap();
/// assert_eq!("Hello, world!", greeting.as_str());
/// ```
pub trait Provider: DowncastSync + Debug {
    /// Resolves a dependency, or returns `Ok(None)` if this provider does
    /// not know it.
    fn resolve(&self, id: &DependencyId, container: &Container)
        -> ProvideResult;
}

impl_downcast!(sync Provider);
