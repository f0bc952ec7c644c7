use crate::{
    BoxError, Container, DependencyId, DynSvc, Instance, ProvideResult,
    Provider, Service, Svc,
};
use std::{
    fmt::{Debug, Formatter},
    hash::{Hash, Hasher},
};

type LazyFn = dyn Fn(&Container) -> Result<DynSvc, BoxError> + Send + Sync;

/// A dependency identifier which carries the function that builds it. This
/// lets a value be declared where it is used without registering a provider
/// for it, while still being cached by the container.
///
/// Two calls are the same dependency only if they are clones of each other.
///
/// ```
/// use dependency_container::{Container, LazyCall, LazyCallProvider, Svc};
///
/// let container = Container::new();
/// container.register_provider(LazyCallProvider);
/// container.set("host", String::from("localhost"));
///
/// let url = LazyCall::new(|container: &Container| {
///     let host: Svc<String> = container.get("host")?;
///     Ok(format!("http://{}/", host))
/// });
///
/// let first: Svc<String> = container.get(url.clone()).unwrap();
/// let second: Svc<String> = container.get(url).unwrap();
/// assert_eq!("http://localhost/", first.as_str());
/// assert!(Svc::ptr_eq(&first, &second));
/// ```
#[derive(Clone)]
pub struct LazyCall {
    func: Svc<LazyFn>,
    singleton: bool,
}

impl LazyCall {
    /// Creates a call whose result is cached by the container.
    #[must_use]
    pub fn new<F, R>(func: F) -> Self
    where
        F: Fn(&Container) -> Result<R, BoxError> + Send + Sync + 'static,
        R: Service,
    {
        LazyCall {
            func: Svc::new(move |container: &Container| {
                func(container).map(|value| Svc::new(value) as DynSvc)
            }),
            singleton: true,
        }
    }

    /// Makes the function be called again each time the dependency is
    /// requested.
    #[must_use]
    pub fn transient(mut self) -> Self {
        self.singleton = false;
        self
    }

    fn addr(&self) -> *const () {
        Svc::as_ptr(&self.func).cast::<()>()
    }
}

impl PartialEq for LazyCall {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for LazyCall {}

impl Hash for LazyCall {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl Debug for LazyCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyCall")
            .field("func", &self.addr())
            .field("singleton", &self.singleton)
            .finish()
    }
}

impl From<LazyCall> for DependencyId {
    fn from(call: LazyCall) -> Self {
        DependencyId::new(call)
    }
}

/// Resolves [`LazyCall`] identifiers by invoking their function.
#[derive(Debug, Default, Clone, Copy)]
pub struct LazyCallProvider;

impl Provider for LazyCallProvider {
    fn resolve(
        &self,
        id: &DependencyId,
        container: &Container,
    ) -> ProvideResult {
        match id.downcast_ref::<LazyCall>() {
            Some(call) => {
                let value = (call.func)(container)?;
                Ok(Some(Instance::new(value, call.singleton)))
            }
            None => Ok(None),
        }
    }
}
