use crate::ServiceInfo;
use downcast_rs::{impl_downcast, DowncastSync};
use std::{
    any::{Any, TypeId},
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

/// A value which can be used as the raw key of a [`DependencyId`]. This is
/// implemented automatically for all hashable, comparable values.
pub trait Key: DowncastSync + Debug {
    /// Compares this key to another type-erased key.
    fn dyn_eq(&self, other: &dyn Key) -> bool;

    /// Feeds this key into a type-erased hasher.
    fn dyn_hash(&self, state: &mut dyn Hasher);
}

impl_downcast!(sync Key);

impl<T> Key for T
where
    T: Any + Debug + Eq + Hash + Send + Sync,
{
    fn dyn_eq(&self, other: &dyn Key) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

/// An opaque identifier naming a dependency.
///
/// Any hashable, comparable value may be used as an identifier. Identifiers
/// are compared by their raw value, so an identifier built with
/// [`DependencyId::new()`] is equal to one converted with [`From`] from the
/// same value. String slices are normalized to [`String`] so that both forms
/// name the same dependency.
///
/// ```
/// use dependency_container::{DependencyId, ServiceInfo};
///
/// struct Foo;
///
/// assert_eq!(DependencyId::new(String::from("conf:a")), "conf:a");
/// assert_eq!(DependencyId::of::<Foo>(), DependencyId::from(ServiceInfo::of::<Foo>()));
/// assert_ne!(DependencyId::new(1u32), DependencyId::new(1u64));
/// ```
#[derive(Clone)]
pub struct DependencyId {
    key: Arc<dyn Key>,
}

impl DependencyId {
    /// Creates an identifier wrapping the given raw value.
    #[must_use]
    pub fn new<K: Key>(key: K) -> Self {
        let key: Box<dyn Key> = Box::new(key);
        let key = match key.downcast::<DependencyId>() {
            Ok(id) => return *id,
            Err(key) => key,
        };
        match key.downcast::<&'static str>() {
            Ok(key) => DependencyId {
                key: Arc::new(String::from(*key)),
            },
            Err(key) => DependencyId { key: key.into() },
        }
    }

    /// Creates an identifier naming the given type.
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        DependencyId::new(ServiceInfo::of::<T>())
    }

    /// Borrows the raw value as a concrete type, if it is one.
    #[must_use]
    pub fn downcast_ref<K: Key>(&self) -> Option<&K> {
        self.key.as_ref().downcast_ref()
    }

    /// Borrows the raw value as a string, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.downcast_ref::<String>().map(String::as_str)
    }
}

impl PartialEq for DependencyId {
    fn eq(&self, other: &Self) -> bool {
        self.key.dyn_eq(other.key.as_ref())
    }
}

impl Eq for DependencyId {}

impl PartialEq<str> for DependencyId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for DependencyId {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<DependencyId> for str {
    fn eq(&self, other: &DependencyId) -> bool {
        other == self
    }
}

impl PartialEq<DependencyId> for &str {
    fn eq(&self, other: &DependencyId) -> bool {
        other == *self
    }
}

impl Hash for DependencyId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.dyn_hash(state);
    }
}

impl Debug for DependencyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.key, f)
    }
}

impl Display for DependencyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.downcast_ref::<ServiceInfo>() {
            Some(info) => f.write_str(info.name()),
            None => Debug::fmt(&self.key, f),
        }
    }
}

impl From<&str> for DependencyId {
    fn from(key: &str) -> Self {
        DependencyId::new(key.to_owned())
    }
}

impl From<String> for DependencyId {
    fn from(key: String) -> Self {
        DependencyId::new(key)
    }
}

impl From<&String> for DependencyId {
    fn from(key: &String) -> Self {
        DependencyId::new(key.clone())
    }
}

impl From<ServiceInfo> for DependencyId {
    fn from(info: ServiceInfo) -> Self {
        DependencyId::new(info)
    }
}

impl From<&DependencyId> for DependencyId {
    fn from(id: &DependencyId) -> Self {
        id.clone()
    }
}
