//! The scope tree.
//!
//! An [`InjectionScope`] owns a set of export strategies, a parent link and
//! a [`DisposalScope`]. Locates walk from the requesting scope to the root;
//! disposal cascades from a scope to its children first.

mod context;
mod resolve;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

pub use context::{ActivationContext, InjectionContext, TargetInfo, TargetKind};

use crate::config::ContainerConfig;
use crate::disposal::DisposalScope;
use crate::error::{DiError, DiResult, DisposalFailure};
use crate::key::Contract;
use crate::plan::ActivationPlanCache;
use crate::registration::{AnyArc, HashState, Registry};
use crate::request::{LocateRequest, SecondarySynthesizer};
use crate::strategy::{ExportStrategy, StrategyId};
use crate::traits::LocatorCore;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by every scope of one tree.
pub(crate) struct ScopeTree {
    config: ContainerConfig,
    /// Bumped on every registration anywhere in the tree
    generation: AtomicU64,
    /// Registration order across the tree
    sequence: AtomicU64,
    /// Synthesized generic factory strategies, one per contract
    secondary: DashMap<Contract, Arc<ExportStrategy>, HashState>,
}

impl ScopeTree {
    fn new(config: ContainerConfig) -> Self {
        Self {
            config,
            generation: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
            secondary: DashMap::with_hasher(HashState::default()),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn secondary_strategy(
        &self,
        contract: &Contract,
        synthesize: SecondarySynthesizer,
    ) -> Arc<ExportStrategy> {
        if let Some(existing) = self.secondary.get(contract) {
            return existing.value().clone();
        }
        self.secondary
            .entry(contract.clone())
            .or_insert_with(|| {
                tracing::debug!(contract = %contract, "synthesizing generic factory strategy");
                Arc::new(synthesize())
            })
            .value()
            .clone()
    }
}

pub(crate) struct ScopeInner {
    id: u64,
    name: Arc<str>,
    tree: Arc<ScopeTree>,
    parent: Option<InjectionScope>,
    children: Mutex<Vec<Weak<ScopeInner>>>,
    registry: ArcSwap<Registry>,
    write_lock: Mutex<()>,
    plans: ActivationPlanCache,
    per_scope: Mutex<HashMap<StrategyId, Arc<OnceCell<AnyArc>>, HashState>>,
    disposal: Arc<DisposalScope>,
    disposed: AtomicBool,
}

impl ScopeInner {
    fn dispose_subtree(&self) -> Vec<DisposalFailure> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }
        tracing::debug!(scope = %self.name, "disposing scope");

        let children = std::mem::take(&mut *self.children.lock());
        let mut failures = Vec::new();
        for child in children.iter().rev() {
            if let Some(child) = child.upgrade() {
                failures.extend(child.dispose_subtree());
            }
        }

        failures.extend(self.disposal.dispose_collect());
        self.per_scope.lock().clear();
        self.plans.clear();
        failures
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if self.disposed.load(Ordering::Acquire) || !self.tree.config.dispose_on_drop {
            return;
        }
        tracing::warn!(scope = %self.name, "scope dropped without dispose; disposing now");
        for failure in self.dispose_subtree() {
            tracing::error!(
                scope = %self.name,
                instance = failure.instance,
                error = %failure.message,
                "disposal failed while dropping scope"
            );
        }
    }
}

/// A node in the scope tree; cheap to clone.
///
/// Children keep their parent alive, parents only hold weak links to
/// children. A scope's own registrations are preferred over its
/// ancestors' at equal priority, and both stay visible to `locate_all`.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{ExportStrategy, InjectionScope, Locator};
///
/// let root = InjectionScope::new();
/// root.register(ExportStrategy::instance(String::from("root")).build());
///
/// let child = root.create_child_scope_named("request");
/// child.register(ExportStrategy::instance(String::from("child")).build());
///
/// assert_eq!(child.locate::<String>().unwrap().as_str(), "child");
/// assert_eq!(root.locate::<String>().unwrap().as_str(), "root");
/// assert_eq!(child.locate_all::<String>().unwrap().len(), 2);
/// assert_eq!(child.name(), "request");
/// ```
#[derive(Clone)]
pub struct InjectionScope {
    inner: Arc<ScopeInner>,
}

/// Non-owning handle to a scope.
#[derive(Clone)]
pub struct WeakScope {
    inner: Weak<ScopeInner>,
}

impl WeakScope {
    pub fn upgrade(&self) -> Option<InjectionScope> {
        self.inner.upgrade().map(|inner| InjectionScope { inner })
    }
}

impl fmt::Debug for WeakScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakScope")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl InjectionScope {
    /// Root scope with the default configuration.
    pub fn new() -> Self {
        Self::root(ContainerConfig::default())
    }

    /// Root scope of a new tree.
    pub fn root(config: ContainerConfig) -> Self {
        let scope = Self::create(Arc::new(ScopeTree::new(config)), None, Arc::from("root"));
        tracing::debug!(
            environment = ?scope.config().environment,
            max_depth = scope.config().max_depth,
            "created root scope"
        );
        scope
    }

    fn create(tree: Arc<ScopeTree>, parent: Option<InjectionScope>, name: Arc<str>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
                name,
                tree,
                parent,
                children: Mutex::new(Vec::new()),
                registry: ArcSwap::from_pointee(Registry::default()),
                write_lock: Mutex::new(()),
                plans: ActivationPlanCache::new(),
                per_scope: Mutex::new(HashMap::with_hasher(HashState::default())),
                disposal: Arc::new(DisposalScope::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn create_child_scope(&self) -> InjectionScope {
        let name = format!("{}/{}", self.name(), self.inner.children.lock().len());
        self.create_child_scope_named(name)
    }

    pub fn create_child_scope_named(&self, name: impl Into<Arc<str>>) -> InjectionScope {
        let child = Self::create(self.inner.tree.clone(), Some(self.clone()), name.into());

        let mut children = self.inner.children.lock();
        children.retain(|c| c.strong_count() > 0);
        children.push(Arc::downgrade(&child.inner));
        drop(children);

        tracing::debug!(parent = %self.name(), scope = %child.name(), "created child scope");
        child
    }

    pub fn register(&self, strategy: ExportStrategy) {
        self.register_batch(std::iter::once(strategy));
    }

    /// Publish a batch of strategies in one registry snapshot.
    ///
    /// Concurrent locates keep the snapshot they started with; plans cached
    /// anywhere in the tree are re-derived on their next use.
    pub fn register_batch<I>(&self, strategies: I)
    where
        I: IntoIterator<Item = ExportStrategy>,
    {
        let strategies: Vec<Arc<ExportStrategy>> = strategies.into_iter().map(Arc::new).collect();
        if strategies.is_empty() {
            return;
        }
        if self.is_disposed() {
            tracing::warn!(scope = %self.name(), count = strategies.len(), "ignoring registration on disposed scope");
            return;
        }

        let tree = &self.inner.tree;
        let _writer = self.inner.write_lock.lock();
        let mut next = (**self.inner.registry.load()).clone();
        for strategy in strategies {
            let sequence = tree.sequence.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(
                scope = %self.name(),
                activation_type = %strategy.activation_type(),
                key = ?strategy.key(),
                priority = strategy.priority(),
                lifestyle = strategy.lifestyle_name(),
                "registered export strategy"
            );
            next.insert(strategy, sequence);
        }
        self.inner.registry.store(Arc::new(next));
        tree.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn parent(&self) -> Option<&InjectionScope> {
        self.inner.parent.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.tree.config
    }

    /// Tracks container-owned instances created for this scope.
    pub fn disposal_scope(&self) -> &Arc<DisposalScope> {
        &self.inner.disposal
    }

    pub fn plan_cache(&self) -> &ActivationPlanCache {
        &self.inner.plans
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// True when both handles refer to the same scope.
    pub fn same_scope(&self, other: &InjectionScope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakScope {
        WeakScope {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Dispose child scopes (most recent first), then this scope's own
    /// instances in reverse creation order.
    ///
    /// Every instance is attempted; all failures of the subtree come back
    /// together. Disposing twice is a no-op.
    pub fn dispose(&self) -> DiResult<()> {
        let failures = self.inner.dispose_subtree();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DiError::DisposalAggregate(failures))
        }
    }

    /// Every strategy exported under `contract` here and in ancestors,
    /// nearest scope first, most recent registration first within a scope.
    pub fn find_strategies(&self, contract: &Contract) -> Vec<Arc<ExportStrategy>> {
        let mut found = Vec::new();
        let mut current = Some(self);
        while let Some(scope) = current {
            let registry = scope.inner.registry.load();
            found.extend(
                registry
                    .entries(contract)
                    .iter()
                    .rev()
                    .map(|entry| entry.strategy.clone()),
            );
            current = scope.parent();
        }
        found
    }

    pub(crate) fn registry(&self) -> Arc<Registry> {
        self.inner.registry.load_full()
    }

    pub(crate) fn tree(&self) -> &ScopeTree {
        &self.inner.tree
    }

    /// The `depth`-th ancestor, `0` being this scope.
    pub(crate) fn ancestor(&self, depth: usize) -> Option<&InjectionScope> {
        let mut scope = self;
        for _ in 0..depth {
            scope = scope.parent()?;
        }
        Some(scope)
    }

    pub(crate) fn per_scope_slot(&self, strategy: StrategyId) -> Arc<OnceCell<AnyArc>> {
        self.inner
            .per_scope
            .lock()
            .entry(strategy)
            .or_default()
            .clone()
    }

    pub(crate) fn ensure_live(&self) -> DiResult<()> {
        if self.is_disposed() {
            return Err(DiError::ScopeDisposed(self.name().to_string()));
        }
        Ok(())
    }
}

impl Default for InjectionScope {
    fn default() -> Self {
        Self::new()
    }
}

impl LocatorCore for InjectionScope {
    fn locate_any(&self, request: &LocateRequest) -> DiResult<Option<AnyArc>> {
        let mut context = InjectionContext::new(self);
        self.locate_with_context(request, &mut context)
    }

    fn locate_all_any(&self, request: &LocateRequest) -> DiResult<Vec<AnyArc>> {
        let mut context = InjectionContext::new(self);
        self.locate_all_with_context(request, &mut context)
    }
}

impl fmt::Debug for InjectionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionScope")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("registrations", &self.inner.registry.load().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
