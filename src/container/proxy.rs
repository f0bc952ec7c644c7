use crate::{Container, DependencyId, DynSvc};
use std::collections::HashSet;

/// A builder for a container derived from another container. The new
/// container shares the providers of the source container but has its own
/// cache, so seeding or removing values in it never affects the source.
///
/// This is mostly useful in tests, where a dependency needs to be replaced or
/// hidden without rebuilding the whole container.
///
/// ```
/// use dependency_container::{Container, DynSvc, Svc};
///
/// let container = Container::new();
/// container.set("database", String::from("postgres"));
/// container.set("cache", String::from("redis"));
///
/// let proxy = container
///     .proxy()
///     .dependencies([("database", Svc::new(String::from("sqlite")) as DynSvc)])
///     .missing(["cache"])
///     .build();
///
/// let database: Svc<String> = proxy.get("database").unwrap();
/// assert_eq!("sqlite", database.as_str());
/// assert!(proxy.try_get::<String>("cache").unwrap().is_none());
///
/// let database: Svc<String> = container.get("database").unwrap();
/// assert_eq!("postgres", database.as_str());
/// ```
#[must_use]
pub struct ProxyBuilder<'a> {
    source: &'a Container,
    include: Option<Vec<DependencyId>>,
    exclude: Vec<DependencyId>,
    missing: HashSet<DependencyId>,
    dependencies: Vec<(DependencyId, DynSvc)>,
}

impl<'a> ProxyBuilder<'a> {
    pub(crate) fn new(source: &'a Container) -> Self {
        ProxyBuilder {
            source,
            include: None,
            exclude: Vec::new(),
            missing: HashSet::new(),
            dependencies: Vec::new(),
        }
    }

    /// Copies only these cached values from the source container. By
    /// default, every cached value is copied. Dependencies which are not
    /// cached in the source are skipped.
    pub fn include<K, I>(mut self, ids: I) -> Self
    where
        K: Into<DependencyId>,
        I: IntoIterator<Item = K>,
    {
        self.include
            .get_or_insert_with(Vec::new)
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// Removes these values from the cache of the new container after they
    /// have been copied.
    pub fn exclude<K, I>(mut self, ids: I) -> Self
    where
        K: Into<DependencyId>,
        I: IntoIterator<Item = K>,
    {
        self.exclude.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Makes these dependencies unresolvable in the new container, even if
    /// a provider knows them.
    pub fn missing<K, I>(mut self, ids: I) -> Self
    where
        K: Into<DependencyId>,
        I: IntoIterator<Item = K>,
    {
        self.missing.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Seeds the cache of the new container with these values. These are
    /// applied last and override anything copied from the source.
    pub fn dependencies<K, I>(mut self, values: I) -> Self
    where
        K: Into<DependencyId>,
        I: IntoIterator<Item = (K, DynSvc)>,
    {
        self.dependencies
            .extend(values.into_iter().map(|(id, value)| (id.into(), value)));
        self
    }

    /// Builds the new container.
    #[must_use]
    pub fn build(self) -> Container {
        let source = self.source.singletons();
        let mut singletons = match self.include {
            None => source,
            Some(include) => include
                .into_iter()
                .filter_map(|id| {
                    let value = source.get(&id)?.clone();
                    Some((id, value))
                })
                .collect(),
        };

        for id in &self.exclude {
            singletons.remove(id);
        }

        singletons.extend(self.dependencies);
        Container::new_from_parts(
            self.source.providers(),
            singletons,
            self.missing,
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Container, DependencyId, Instance, InjectError, ProvideResult,
        Provider, Svc,
    };

    #[derive(Debug)]
    struct Answer;

    impl Provider for Answer {
        fn resolve(
            &self,
            id: &DependencyId,
            _container: &Container,
        ) -> ProvideResult {
            Ok((id == "answer").then(|| Instance::singleton(42i32)))
        }
    }

    #[test]
    fn proxy_shares_providers_but_not_cache() {
        let container = Container::new();
        container.register_provider(Answer);

        let proxy = container.proxy().build();
        let answer: Svc<i32> = proxy.get("answer").unwrap();

        assert_eq!(42, *answer);
        assert!(proxy.contains_singleton("answer"));
        assert!(!container.contains_singleton("answer"));
    }

    #[test]
    fn include_and_exclude_filter_the_copied_cache() {
        let container = Container::new();
        container.set("a", 1i32);
        container.set("b", 2i32);
        container.set("c", 3i32);

        let proxy = container
            .proxy()
            .include(["a", "b", "missing"])
            .exclude(["b"])
            .build();

        assert!(proxy.contains_singleton("a"));
        assert!(!proxy.contains_singleton("b"));
        assert!(!proxy.contains_singleton("c"));
        assert!(!proxy.contains_singleton("missing"));
    }

    #[test]
    fn missing_hides_provided_dependencies() {
        let container = Container::new();
        container.register_provider(Answer);

        let proxy = container.proxy().missing(["answer"]).build();
        match proxy.provide("answer") {
            Err(InjectError::MissingProvider { id }) if id == "answer" => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("hidden dependency was provided"),
        }

        assert!(container.provide("answer").is_ok());
    }
}
