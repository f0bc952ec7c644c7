use crate::{
    Container, DependencyId, DynSvc, InjectError, InjectResult, Instance,
    ProvideResult, Provider, Svc,
};
use parking_lot::{Mutex, RwLock};
use std::{
    collections::{BTreeMap, HashMap},
    fmt::{Debug, Formatter},
};
use tracing::debug;

/// An identifier requesting every dependency tagged with a given name. The
/// [`TagProvider`] resolves it to a [`TaggedDependencies`] view.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Tagged {
    name: String,
}

impl Tagged {
    /// Creates an identifier for the dependencies tagged with `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Tagged { name: name.into() }
    }

    /// Gets the name of the tag.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<Tagged> for DependencyId {
    fn from(tagged: Tagged) -> Self {
        DependencyId::new(tagged)
    }
}

/// A named label attached to a dependency. Attributes are free-form metadata
/// carried alongside the tag and are not interpreted by the provider.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tag {
    name: String,
    attrs: BTreeMap<String, String>,
}

impl Tag {
    /// Creates a tag without attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Tag {
            name: name.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Adds an attribute to this tag, replacing any previous value.
    #[must_use]
    pub fn with_attr(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Gets the name of this tag.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the value of an attribute.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Gets all the attributes of this tag.
    #[must_use]
    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::new(name)
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Tag::new(name)
    }
}

/// Associates dependencies with tags so that they can be retrieved as a group
/// by requesting [`Tagged`].
///
/// ```
/// use dependency_container::{
///     Container, Tag, TagProvider, Tagged, TaggedDependencies, Svc,
/// };
///
/// let tags = TagProvider::new();
/// tags.register_dependency("plugins:csv", Tag::new("plugin").with_attr("ext", "csv"))
///     .unwrap();
/// tags.register_dependency("plugins:json", "plugin").unwrap();
///
/// let container = Container::new();
/// container.register_provider(tags);
/// container.set("plugins:csv", String::from("CsvPlugin"));
/// container.set("plugins:json", String::from("JsonPlugin"));
///
/// let plugins: Svc<TaggedDependencies> =
///     container.get(Tagged::new("plugin")).unwrap();
/// assert_eq!(2, plugins.len());
/// assert_eq!(Some("csv"), plugins.tags().next().unwrap().attr("ext"));
///
/// let names: Vec<String> = plugins
///     .instances()
///     .map(|plugin| plugin.unwrap().downcast_ref::<String>().unwrap().clone())
///     .collect();
/// assert_eq!(vec!["CsvPlugin", "JsonPlugin"], names);
/// ```
#[derive(Default)]
pub struct TagProvider {
    tags: RwLock<HashMap<String, Vec<(DependencyId, Tag)>>>,
}

impl TagProvider {
    /// Creates a new provider with no tagged dependencies.
    #[must_use]
    pub fn new() -> Self {
        TagProvider::default()
    }

    /// Tags a dependency. A tag may be given as a name or as a [`Tag`] with
    /// attributes. Tagging the same dependency twice with the same tag name
    /// returns [`InjectError::DuplicateTag`].
    pub fn register_dependency(
        &self,
        id: impl Into<DependencyId>,
        tag: impl Into<Tag>,
    ) -> InjectResult<()> {
        self.register(id, [tag.into()])
    }

    /// Tags a dependency with several tags at once. If any of the tags is
    /// already attached to the dependency, then none of them are registered.
    pub fn register<T, I>(
        &self,
        id: impl Into<DependencyId>,
        tags: I,
    ) -> InjectResult<()>
    where
        T: Into<Tag>,
        I: IntoIterator<Item = T>,
    {
        let id = id.into();
        let tags: Vec<Tag> = tags.into_iter().map(Into::into).collect();

        let mut registered = self.tags.write();
        for (index, tag) in tags.iter().enumerate() {
            let already_tagged = registered.get(tag.name()).is_some_and(|entries| {
                entries.iter().any(|(tagged, _)| tagged == &id)
            });
            let repeated = tags[..index]
                .iter()
                .any(|previous| previous.name() == tag.name());
            if already_tagged || repeated {
                return Err(InjectError::DuplicateTag {
                    id,
                    tag: tag.name().to_owned(),
                });
            }
        }

        for tag in tags {
            debug!(%id, tag = tag.name(), "tagging dependency");
            registered
                .entry(tag.name().to_owned())
                .or_default()
                .push((id.clone(), tag));
        }

        Ok(())
    }
}

impl Provider for TagProvider {
    fn resolve(
        &self,
        id: &DependencyId,
        container: &Container,
    ) -> ProvideResult {
        let Some(tagged) = id.downcast_ref::<Tagged>() else {
            return Ok(None);
        };

        let entries = self
            .tags
            .read()
            .get(tagged.name())
            .cloned()
            .unwrap_or_default();

        // Each dependency decides for itself whether it is a singleton, so
        // the view is never cached
        Ok(Some(Instance::new(
            Svc::new(TaggedDependencies::new(container.clone(), entries)),
            false,
        )))
    }
}

impl Debug for TagProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.tags.read().iter().map(|(name, entries)| {
                let ids: Vec<_> = entries.iter().map(|(id, _)| id.clone()).collect();
                (name.clone(), ids)
            }))
            .finish()
    }
}

/// The dependencies matching a tag, along with their tags. Dependencies are
/// resolved through the container lazily and in order, and each one is
/// resolved at most once per view. This is thread-safe.
pub struct TaggedDependencies {
    container: Container,
    dependencies: Vec<DependencyId>,
    tags: Vec<Tag>,
    instances: Mutex<Vec<DynSvc>>,
}

impl TaggedDependencies {
    fn new(container: Container, entries: Vec<(DependencyId, Tag)>) -> Self {
        let (dependencies, tags) = entries.into_iter().unzip();
        TaggedDependencies {
            container,
            dependencies,
            tags,
            instances: Mutex::new(Vec::new()),
        }
    }

    /// Gets the number of tagged dependencies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Returns whether no dependency has the tag.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Gets the tagged dependencies without resolving them.
    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyId> {
        self.dependencies.iter()
    }

    /// Gets the tags, in the same order as the dependencies. This does not
    /// resolve the dependencies.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Gets the resolved value of the dependency at `index`, resolving it
    /// and every dependency before it if needed. Returns `None` if the index
    /// is out of bounds.
    pub fn get(&self, index: usize) -> Option<InjectResult<DynSvc>> {
        if index >= self.len() {
            return None;
        }

        let mut instances = self.instances.lock();
        while instances.len() <= index {
            let id = &self.dependencies[instances.len()];
            match self.container.provide(id) {
                Ok(instance) => instances.push(instance),
                Err(error) => return Some(Err(error)),
            }
        }

        Some(Ok(instances[index].clone()))
    }

    /// Lazily resolves the tagged dependencies, in order.
    pub fn instances(&self) -> TaggedInstances<'_> {
        TaggedInstances {
            view: self,
            index: 0,
        }
    }
}

impl Debug for TaggedDependencies {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedDependencies")
            .field("dependencies", &self.dependencies)
            .field("tags", &self.tags)
            .field("resolved", &self.instances.lock().len())
            .finish()
    }
}

/// An iterator over the resolved values of a [`TaggedDependencies`] view.
pub struct TaggedInstances<'a> {
    view: &'a TaggedDependencies,
    index: usize,
}

impl Iterator for TaggedInstances<'_> {
    type Item = InjectResult<DynSvc>;

    fn next(&mut self) -> Option<Self::Item> {
        let instance = self.view.get(self.index)?;
        self.index += 1;
        Some(instance)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.view.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}
