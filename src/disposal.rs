//! Disposal tracking for instances owned by a scope.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DiError, DiResult, DisposalFailure};
use crate::traits::Dispose;

struct Tracked {
    name: &'static str,
    instance: Arc<dyn Dispose>,
}

#[derive(Default)]
struct Entries {
    order: Vec<Tracked>,
    seen: HashSet<usize>,
}

/// Tracks disposal-capable instances created during a scope's lifetime.
///
/// Instances are kept in insertion order and disposed most-recent first.
/// An instance is tracked at most once (by address). Disposing twice is a
/// no-op.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{DisposalScope, Dispose, DisposeResult};
/// use std::sync::{Arc, Mutex};
///
/// struct Step(&'static str, Arc<Mutex<Vec<&'static str>>>);
///
/// impl Dispose for Step {
///     fn dispose(&self) -> DisposeResult {
///         self.1.lock().unwrap().push(self.0);
///         Ok(())
///     }
/// }
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let scope = DisposalScope::new();
/// scope.add(Arc::new(Step("a", log.clone())));
/// scope.add(Arc::new(Step("b", log.clone())));
///
/// scope.dispose().unwrap();
/// assert_eq!(*log.lock().unwrap(), vec!["b", "a"]);
/// ```
#[derive(Default)]
pub struct DisposalScope {
    entries: Mutex<Entries>,
    disposed: AtomicBool,
}

impl DisposalScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `instance`; returns false when it was already tracked.
    ///
    /// When the scope has already been disposed the instance is disposed
    /// immediately instead of leaking.
    pub fn add<T: Dispose>(&self, instance: Arc<T>) -> bool {
        self.add_dyn(std::any::type_name::<T>(), instance)
    }

    pub(crate) fn add_dyn(&self, name: &'static str, instance: Arc<dyn Dispose>) -> bool {
        let address = Arc::as_ptr(&instance) as *const () as usize;

        {
            let mut entries = self.entries.lock();
            if !self.disposed.load(Ordering::Acquire) {
                if !entries.seen.insert(address) {
                    return false;
                }
                entries.order.push(Tracked { name, instance });
                return true;
            }
        }

        tracing::warn!(instance = name, "disposal scope already disposed; disposing late arrival");
        if let Some(failure) = dispose_one(&Tracked { name, instance }) {
            tracing::error!(instance = name, error = %failure.message, "late disposal failed");
        }
        false
    }

    /// Number of tracked instances.
    pub fn len(&self) -> usize {
        self.entries.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Dispose every tracked instance in reverse insertion order.
    ///
    /// All instances are attempted; failures are returned together as
    /// `DiError::DisposalAggregate`.
    pub fn dispose(&self) -> DiResult<()> {
        let failures = self.dispose_collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DiError::DisposalAggregate(failures))
        }
    }

    pub(crate) fn dispose_collect(&self) -> Vec<DisposalFailure> {
        let drained = {
            let mut entries = self.entries.lock();
            if self.disposed.swap(true, Ordering::AcqRel) {
                return Vec::new();
            }
            entries.seen.clear();
            std::mem::take(&mut entries.order)
        };

        let mut failures = Vec::new();
        for tracked in drained.iter().rev() {
            if let Some(failure) = dispose_one(tracked) {
                tracing::debug!(instance = tracked.name, error = %failure.message, "disposal failed");
                failures.push(failure);
            }
        }
        failures
    }
}

impl std::fmt::Debug for DisposalScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposalScope")
            .field("tracked", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn dispose_one(tracked: &Tracked) -> Option<DisposalFailure> {
    match catch_unwind(AssertUnwindSafe(|| tracked.instance.dispose())) {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(DisposalFailure {
            instance: tracked.name,
            message: e.to_string(),
        }),
        Err(payload) => Some(DisposalFailure {
            instance: tracked.name,
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
