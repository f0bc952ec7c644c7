//! # Runtime dependency resolution.
//!
//! A [`Container`] resolves dependencies by their identifier. Identifiers are
//! opaque: any hashable, comparable value can name a dependency, whether it is
//! a string like `"conf:port"`, a type ([`DependencyId::of()`]), or a custom
//! key. The container does not know how to build anything by itself. Instead,
//! it asks an ordered chain of [`Provider`]s, and the first provider that
//! knows the identifier supplies the value.
//!
//! ## Singletons
//!
//! Providers return an [`Instance`], which is a value plus a flag telling the
//! container whether to cache it. Cached values are returned directly on
//! later requests without asking any provider again. Values can also be
//! seeded into the cache directly with [`Container::set()`], which is mostly
//! useful when bootstrapping an application or in tests.
//!
//! ## Nested resolution and cycles
//!
//! Providers are given the container so that they can resolve the
//! dependencies of the value they are building. Resolution of uncached
//! dependencies is serialized by a reentrant lock, so a provider running on
//! the thread holding the lock can call back into the container freely. If a
//! dependency is requested while it is already being resolved further up the
//! call chain, [`InjectError::CycleDetected`] is returned with the path of the
//! cycle.
//!
//! ## Built-in providers
//!
//! - **[Resources](crate::ResourceProvider):** Resolves `namespace:name`
//!   strings using getters registered for each namespace. Several getters can
//!   compete for a namespace, and they are tried from the highest priority to
//!   the lowest.
//! - **[Tags](crate::TagProvider):** Groups dependencies under named tags.
//!   Requesting [`Tagged`] returns a view over all dependencies with that tag,
//!   which are resolved lazily.
//! - **[Lazy calls](crate::LazyCallProvider):** Resolves [`LazyCall`]
//!   identifiers, which carry the function that builds them.
//!
//! Custom providers can be created by implementing [`Provider`].
//!
//! ## Example
//!
//! ```
//! use dependency_container::{
//!     Container, DependencyId, Instance, ProvideResult, Provider,
//!     ResourceGetter, ResourceProvider, Svc, TagProvider, Tagged,
//!     TaggedDependencies,
//! };
//! use std::{collections::HashMap, error::Error};
//!
//! struct Database {
//!     url: Svc<String>,
//! }
//!
//! // Builds the database from the configured url. Anything else is left to
//! // the next provider.
//! #[derive(Debug)]
//! struct DatabaseProvider;
//!
//! impl Provider for DatabaseProvider {
//!     fn resolve(&self, id: &DependencyId, container: &Container) -> ProvideResult {
//!         if *id != DependencyId::of::<Database>() {
//!             return Ok(None);
//!         }
//!
//!         let url = container.get("conf:database_url")?;
//!         Ok(Some(Instance::singleton(Database { url })))
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn Error>> {
//!     let settings = HashMap::from([("database_url", "postgres://localhost")]);
//!
//!     let resources = ResourceProvider::new();
//!     resources.register(
//!         "conf",
//!         ResourceGetter::new(move |name| settings.get(name).map(|value| value.to_string())),
//!     )?;
//!
//!     let tags = TagProvider::new();
//!     tags.register_dependency(DependencyId::of::<Database>(), "health_check")?;
//!
//!     let mut builder = Container::builder();
//!     builder.provide(resources);
//!     builder.provide(tags);
//!     builder.provide(DatabaseProvider);
//!     let container = builder.build();
//!
//!     let database: Svc<Database> = container.get(DependencyId::of::<Database>())?;
//!     assert_eq!("postgres://localhost", database.url.as_str());
//!
//!     // The database is a singleton, so the tagged view returns the same value
//!     let checks: Svc<TaggedDependencies> = container.get(Tagged::new("health_check"))?;
//!     let first = checks.get(0).unwrap()?.downcast::<Database>().unwrap();
//!     assert!(Svc::ptr_eq(&database, &first));
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::needless_doctest_main
)]

mod builder;
mod container;
mod dependency;
mod services;

pub use builder::*;
pub use container::*;
pub use dependency::*;
pub use services::*;

#[cfg(test)]
mod tests;
