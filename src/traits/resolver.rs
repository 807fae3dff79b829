//! Locator traits for typed resolution.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::factory::{FactoryArgs, Producer};
use crate::key::ExportKey;
use crate::registration::{AnyArc, ByObject, ByValue, Unerase};
use crate::request::LocateRequest;

/// Object-safe resolution over type-erased instances.
///
/// Implemented by `InjectionScope` (each call starts a fresh
/// `InjectionContext`) and by `ActivationContext` (calls continue the
/// resolution in progress). Most callers want [`Locator`] instead.
pub trait LocatorCore {
    /// The instance of the best surviving candidate, or `None` when no
    /// candidate survives.
    ///
    /// Sized contracts come back as `Arc<T>`, `dyn Trait` contracts as
    /// `Arc<Arc<dyn Trait>>`.
    fn locate_any(&self, request: &LocateRequest) -> DiResult<Option<AnyArc>>;

    /// Instances of every surviving candidate, best first.
    fn locate_all_any(&self, request: &LocateRequest) -> DiResult<Vec<AnyArc>>;
}

/// Typed resolution built on [`LocatorCore`].
///
/// # Examples
///
/// ```
/// use ferrous_scope::{ExportStrategy, InjectionScope, Locator};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let scope = InjectionScope::new();
/// scope.register(ExportStrategy::instance(42usize).build());
/// scope.register(
///     ExportStrategy::instance(ConsoleLogger)
///         .export_as::<dyn Logger, _>(|l| l as Arc<dyn Logger>)
///         .build(),
/// );
///
/// assert_eq!(*scope.locate::<usize>().unwrap(), 42);
/// assert_eq!(scope.locate_trait::<dyn Logger>().unwrap().log("up"), "LOG: up");
/// assert!(scope.try_locate::<u8>().unwrap().is_none());
/// ```
pub trait Locator: LocatorCore {
    /// Locate `T`, failing with `LocateFailed` when nothing matches.
    fn locate<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.locate_with(&LocateRequest::of::<T>())
    }

    fn locate_keyed<T: Send + Sync + 'static>(&self, key: impl Into<ExportKey>) -> DiResult<Arc<T>> {
        self.locate_with(&LocateRequest::of::<T>().keyed(key))
    }

    /// Locate with an explicit request (key, filter); the request's
    /// contract must store a `T`.
    fn locate_with<T: Send + Sync + 'static>(&self, request: &LocateRequest) -> DiResult<Arc<T>> {
        let instance = require(self.locate_any(request)?, request)?;
        <ByValue as Unerase<T>>::unerase(instance)
    }

    /// Like [`Locator::locate`], returning `None` wherever `locate` would
    /// fail with `LocateFailed`, a missing required dependency further down
    /// included. Cycles and failing factories still propagate.
    fn try_locate<T: Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        self.try_locate_with(&LocateRequest::of::<T>())
    }

    fn try_locate_with<T: Send + Sync + 'static>(
        &self,
        request: &LocateRequest,
    ) -> DiResult<Option<Arc<T>>> {
        absent_when_missing(self.locate_any(request))?
            .map(<ByValue as Unerase<T>>::unerase)
            .transpose()
    }

    fn locate_all<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.locate_all_with(&LocateRequest::of::<T>())
    }

    fn locate_all_with<T: Send + Sync + 'static>(
        &self,
        request: &LocateRequest,
    ) -> DiResult<Vec<Arc<T>>> {
        self.locate_all_any(request)?
            .into_iter()
            .map(<ByValue as Unerase<T>>::unerase)
            .collect()
    }

    /// Locate a trait object exported with `export_as::<dyn T>`.
    fn locate_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.locate_trait_with(&LocateRequest::of::<T>())
    }

    fn locate_trait_keyed<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: impl Into<ExportKey>,
    ) -> DiResult<Arc<T>> {
        self.locate_trait_with(&LocateRequest::of::<T>().keyed(key))
    }

    fn locate_trait_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        request: &LocateRequest,
    ) -> DiResult<Arc<T>> {
        let instance = require(self.locate_any(request)?, request)?;
        <ByObject as Unerase<T>>::unerase(instance)
    }

    fn try_locate_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        absent_when_missing(self.locate_any(&LocateRequest::of::<T>()))?
            .map(<ByObject as Unerase<T>>::unerase)
            .transpose()
    }

    fn locate_all_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.locate_all_any(&LocateRequest::of::<T>())?
            .into_iter()
            .map(<ByObject as Unerase<T>>::unerase)
            .collect()
    }

    /// Locate the export named `name`, stored as its activation type `T`.
    fn locate_named<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        self.locate_with(&LocateRequest::named(name))
    }

    /// A factory producing `T` from `Args`, synthesized when no strategy
    /// is registered for it.
    fn locate_producer<Args: FactoryArgs, T: Send + Sync + 'static>(
        &self,
    ) -> DiResult<Arc<Producer<Args, T>>> {
        self.locate_with(&Producer::<Args, T>::request::<ByValue>())
    }

    fn locate_producer_trait<Args: FactoryArgs, T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> DiResult<Arc<Producer<Args, T>>> {
        self.locate_with(&Producer::<Args, T>::request::<ByObject>())
    }
}

impl<L: LocatorCore + ?Sized> Locator for L {}

fn absent_when_missing(located: DiResult<Option<AnyArc>>) -> DiResult<Option<AnyArc>> {
    match located {
        Err(error) if error.is_locate_failed() => Ok(None),
        other => other,
    }
}

fn require(instance: Option<AnyArc>, request: &LocateRequest) -> DiResult<AnyArc> {
    instance.ok_or_else(|| DiError::LocateFailed {
        contract: request.contract().clone(),
        key: request.key().cloned(),
    })
}
