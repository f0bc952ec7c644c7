#![allow(clippy::used_underscore_binding)]

use crate::DependencyId;
use derive_more::Display;
use std::{
    any::{Any, TypeId},
    error::Error,
};

/// A reference-counted pointer holding a service.
pub type Svc<T> = std::sync::Arc<T>;

/// A reference-counted service pointer holding an instance of `dyn Any`.
pub type DynSvc = Svc<dyn Any + Send + Sync>;

/// Implemented automatically on types that are capable of being a service.
pub trait Service: Any + Send + Sync {}
impl<T: ?Sized + Any + Send + Sync> Service for T {}

/// A boxed error returned by providers, resource getters and lazy calls.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A result from attempting to resolve a dependency.
pub type InjectResult<T> = Result<T, InjectError>;

/// Type information about a service. Used as a dependency identifier when
/// services are keyed by their type.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    /// Creates a [`ServiceInfo`] for the given type.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this service.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the type name of this service.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// An error that has occurred while registering or resolving a dependency.
#[derive(Debug, Display)]
#[non_exhaustive]
pub enum InjectError {
    /// No provider could supply the requested dependency.
    #[display(fmt = "{} has no provider", id)]
    MissingProvider {
        /// The dependency that was requested.
        id: DependencyId,
    },

    /// The dependency is already being resolved further up the current call
    /// chain.
    #[display(
        fmt = "a cycle was detected during resolution of {} [{}]",
        id,
        "fmt_cycle(cycle)"
    )]
    CycleDetected {
        /// The dependency that was requested a second time.
        id: DependencyId,

        /// The chain of dependencies being resolved when the cycle was
        /// detected, ending with the repeated dependency.
        cycle: Vec<DependencyId>,
    },

    /// A provider failed while supplying the dependency.
    #[display(fmt = "an error occurred during instantiation of {}", id)]
    InstantiationFailed {
        /// The dependency that was requested.
        id: DependencyId,

        /// The error raised by the provider.
        inner: BoxError,
    },

    /// The resolved value does not have the requested type.
    #[display(fmt = "the value provided for {} is not a {}", id, expected)]
    InvalidProvider {
        /// The dependency that was requested.
        id: DependencyId,

        /// The type name that was expected.
        expected: &'static str,
    },

    /// Another getter is already registered in the namespace with the same
    /// priority.
    #[display(
        fmt = "a getter with priority {} is already registered for namespace {:?}",
        priority,
        namespace
    )]
    GetterPriorityConflict {
        /// The namespace of the getter.
        namespace: String,

        /// The conflicting priority.
        priority: f64,
    },

    /// The namespace is empty or contains characters other than word
    /// characters.
    #[display(fmt = "{:?} is not a valid namespace", namespace)]
    InvalidNamespace {
        /// The rejected namespace.
        namespace: String,
    },

    /// The priority is NaN.
    #[display(fmt = "{} is not a valid priority", priority)]
    InvalidPriority {
        /// The rejected priority.
        priority: f64,
    },

    /// The dependency has already been registered with this tag.
    #[display(fmt = "{} is already tagged with {:?}", id, tag)]
    DuplicateTag {
        /// The dependency being tagged.
        id: DependencyId,

        /// The name of the tag.
        tag: String,
    },
}

impl InjectError {
    /// Returns `true` if this is a [`InjectError::MissingProvider`] error for
    /// exactly the given dependency.
    #[must_use]
    pub fn is_missing(&self, dependency: &DependencyId) -> bool {
        matches!(self, InjectError::MissingProvider { id } if id == dependency)
    }
}

impl Error for InjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InjectError::InstantiationFailed { inner, .. } => {
                Some(inner.as_ref())
            }
            _ => None,
        }
    }
}

fn fmt_cycle(cycle: &[DependencyId]) -> String {
    let mut joined = String::new();
    for item in cycle {
        if !joined.is_empty() {
            joined.push_str(" -> ");
        }
        joined.push_str(&item.to_string());
    }
    joined
}
