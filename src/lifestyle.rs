//! Lifestyles: the caching policy wrapped around a strategy's activation.
//!
//! A lifestyle receives a [`LifestyleContext`] and decides whether to hand
//! back a cached instance or to run the activation. The four built-ins
//! cover the usual cases:
//!
//! - **Singleton**: one instance per strategy, owned by the scope the
//!   strategy is registered in
//! - **PerScope**: one instance per requesting scope
//! - **WeakSingleton**: shared while anyone holds it, recreated afterwards
//! - **Transient**: a new instance on every locate
//!
//! # Examples
//!
//! ```rust
//! use ferrous_scope::{ExportStrategy, InjectionScope, Locator};
//! use std::sync::Arc;
//!
//! struct Database;
//! struct Repository;
//! struct RequestModel;
//!
//! let root = InjectionScope::new();
//! root.register(ExportStrategy::construct(|_| Ok(Database)).singleton().build());
//! root.register(ExportStrategy::construct(|_| Ok(Repository)).per_scope().build());
//! root.register(ExportStrategy::construct(|_| Ok(RequestModel)).build());
//!
//! let first = root.create_child_scope();
//! let second = root.create_child_scope();
//!
//! // Singleton: same instance across scopes
//! let db1 = first.locate::<Database>().unwrap();
//! let db2 = second.locate::<Database>().unwrap();
//! assert!(Arc::ptr_eq(&db1, &db2));
//!
//! // PerScope: same within a scope, different across scopes
//! let repo1a = first.locate::<Repository>().unwrap();
//! let repo1b = first.locate::<Repository>().unwrap();
//! let repo2 = second.locate::<Repository>().unwrap();
//! assert!(Arc::ptr_eq(&repo1a, &repo1b));
//! assert!(!Arc::ptr_eq(&repo1a, &repo2));
//!
//! // Transient: always different
//! let m1 = first.locate::<RequestModel>().unwrap();
//! let m2 = first.locate::<RequestModel>().unwrap();
//! assert!(!Arc::ptr_eq(&m1, &m2));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::disposal::DisposalScope;
use crate::error::DiResult;
use crate::provider::{InjectionContext, InjectionScope};
use crate::registration::AnyArc;
use crate::strategy::ExportStrategy;

/// Caching policy for a strategy's instances.
///
/// Implementations must be safe to call concurrently. Each instance of a
/// lifestyle belongs to exactly one strategy, so per-strategy state can
/// live in `self`.
pub trait Lifestyle: Send + Sync + 'static {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Produce the instance for this locate, activating if needed.
    fn locate(&self, cx: &mut LifestyleContext<'_>) -> DiResult<AnyArc>;
}

/// What a lifestyle sees of the locate it serves.
pub struct LifestyleContext<'a> {
    pub(crate) strategy: &'a ExportStrategy,
    pub(crate) owning_scope: &'a InjectionScope,
    pub(crate) context: &'a mut InjectionContext,
    pub(crate) activation: &'a mut dyn FnMut(&mut InjectionContext) -> DiResult<AnyArc>,
}

impl<'a> LifestyleContext<'a> {
    pub fn strategy(&self) -> &ExportStrategy {
        self.strategy
    }

    /// Scope the strategy is registered in.
    pub fn owning_scope(&self) -> &InjectionScope {
        self.owning_scope
    }

    /// Scope the locate was issued against.
    pub fn requesting_scope(&self) -> &InjectionScope {
        self.context.requesting_scope()
    }

    pub fn context(&self) -> &InjectionContext {
        &*self.context
    }

    /// Activate as-is: nested locates and disposal tracking use whatever
    /// the current context says.
    pub fn activate(&mut self) -> DiResult<AnyArc> {
        (self.activation)(&mut *self.context)
    }

    /// Activate on behalf of the owning scope; the instance is disposed
    /// with that scope.
    pub fn activate_owned(&mut self) -> DiResult<AnyArc> {
        let scope = self.owning_scope.clone();
        let disposal = Some(scope.disposal_scope().clone());
        self.activate_with(scope, disposal)
    }

    /// Activate for the requesting scope; the instance is disposed with it.
    pub fn activate_in_requesting_scope(&mut self) -> DiResult<AnyArc> {
        let scope = self.requesting_scope().clone();
        let disposal = Some(scope.disposal_scope().clone());
        self.activate_with(scope, disposal)
    }

    /// Activate without disposal tracking.
    pub fn activate_untracked(&mut self) -> DiResult<AnyArc> {
        let scope = self.requesting_scope().clone();
        self.activate_with(scope, None)
    }

    fn activate_with(
        &mut self,
        scope: InjectionScope,
        disposal: Option<Arc<DisposalScope>>,
    ) -> DiResult<AnyArc> {
        let previous_scope = self.context.replace_requesting_scope(scope);
        let previous_disposal = self.context.replace_disposal_scope(disposal);
        let result = (self.activation)(&mut *self.context);
        self.context.replace_requesting_scope(previous_scope);
        self.context.replace_disposal_scope(previous_disposal);
        result
    }
}

/// Built-in lifestyles, for configuration and builder shorthands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum LifestyleKind {
    Singleton,
    PerScope,
    WeakSingleton,
    #[default]
    Transient,
}

impl LifestyleKind {
    /// Fresh lifestyle instance of this kind.
    pub fn create(self) -> Box<dyn Lifestyle> {
        match self {
            LifestyleKind::Singleton => Box::new(SingletonLifestyle::default()),
            LifestyleKind::PerScope => Box::new(PerScopeLifestyle),
            LifestyleKind::WeakSingleton => Box::new(WeakSingletonLifestyle::default()),
            LifestyleKind::Transient => Box::new(TransientLifestyle),
        }
    }
}

/// At most one instance, activated on first use.
///
/// Concurrent first locates activate exactly once; the losers wait for
/// the winner. A failed activation caches nothing, so the next locate
/// retries.
#[derive(Default)]
pub struct SingletonLifestyle {
    cell: OnceCell<AnyArc>,
}

impl Lifestyle for SingletonLifestyle {
    fn name(&self) -> &'static str {
        "Singleton"
    }

    fn locate(&self, cx: &mut LifestyleContext<'_>) -> DiResult<AnyArc> {
        if let Some(instance) = self.cell.get() {
            return Ok(instance.clone());
        }
        self.cell.get_or_try_init(|| cx.activate_owned()).cloned()
    }
}

/// One instance per requesting scope.
///
/// The cache lives in the scope, so it is released when the scope is
/// disposed.
#[derive(Default)]
pub struct PerScopeLifestyle;

impl Lifestyle for PerScopeLifestyle {
    fn name(&self) -> &'static str {
        "PerScope"
    }

    fn locate(&self, cx: &mut LifestyleContext<'_>) -> DiResult<AnyArc> {
        let slot = cx.requesting_scope().per_scope_slot(cx.strategy().id());
        if let Some(instance) = slot.get() {
            return Ok(instance.clone());
        }
        slot.get_or_try_init(|| cx.activate_in_requesting_scope()).cloned()
    }
}

/// Shared while some caller still holds the instance.
///
/// The lifestyle keeps only a weak reference; once every strong handle is
/// gone the next locate activates a new instance. Never tracked for
/// disposal.
#[derive(Default)]
pub struct WeakSingletonLifestyle {
    slot: Mutex<Option<Weak<dyn Any + Send + Sync>>>,
}

impl Lifestyle for WeakSingletonLifestyle {
    fn name(&self) -> &'static str {
        "WeakSingleton"
    }

    fn locate(&self, cx: &mut LifestyleContext<'_>) -> DiResult<AnyArc> {
        let mut slot = self.slot.lock();
        if let Some(live) = slot.as_ref().and_then(Weak::upgrade) {
            return Ok(live);
        }
        let fresh = cx.activate_untracked()?;
        *slot = Some(Arc::downgrade(&fresh));
        Ok(fresh)
    }
}

/// A new instance on every locate.
#[derive(Default)]
pub struct TransientLifestyle;

impl Lifestyle for TransientLifestyle {
    fn name(&self) -> &'static str {
        "Transient"
    }

    fn locate(&self, cx: &mut LifestyleContext<'_>) -> DiResult<AnyArc> {
        cx.activate()
    }
}

impl fmt::Debug for dyn Lifestyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
