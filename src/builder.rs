use crate::{Container, DependencyId, DynSvc, Provider, Service, Svc};
use std::collections::{HashMap, HashSet};

/// A builder for a [`Container`].
#[derive(Default)]
pub struct ContainerBuilder {
    providers: Vec<Svc<dyn Provider>>,
    singletons: HashMap<DependencyId, DynSvc>,
}

impl ContainerBuilder {
    /// Appends a provider to the container. Providers are consulted in the
    /// order they are added.
    pub fn provide<P: Provider>(&mut self, provider: P) {
        self.add_provider(Svc::new(provider));
    }

    /// Appends a shared provider to the container.
    pub fn add_provider(&mut self, provider: Svc<dyn Provider>) {
        self.providers.push(provider);
    }

    /// Seeds the cache of the container with a value.
    pub fn singleton<T: Service>(
        &mut self,
        id: impl Into<DependencyId>,
        value: T,
    ) {
        self.singletons.insert(id.into(), Svc::new(value));
    }

    /// Builds the container.
    #[must_use]
    pub fn build(self) -> Container {
        Container::new_from_parts(
            self.providers,
            self.singletons,
            HashSet::new(),
        )
    }
}
