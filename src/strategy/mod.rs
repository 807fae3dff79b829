//! Export strategies.
//!
//! An [`ExportStrategy`] is one registration: which contracts it satisfies,
//! how an instance is produced, the lifestyle that decides reuse, and the
//! rules (key, priority, environment, conditions, metadata) that decide
//! whether it is eligible for a given request.

mod builder;
mod dependency;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;

pub use builder::ExportStrategyBuilder;
pub use dependency::{ActivationArgs, Dependency, PropertyImport};

use crate::config::ExportEnvironment;
use crate::error::{BoxError, DiResult};
use crate::key::{Contract, ExportKey};
use crate::lifestyle::Lifestyle;
use crate::metadata::ExportMetadata;
use crate::plan::ActivationPlan;
use crate::provider::{ActivationContext, InjectionContext};
use crate::registration::AnyArc;
use crate::traits::Dispose;

static NEXT_STRATEGY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a built strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrategyId(u64);

impl StrategyId {
    pub(crate) fn next() -> Self {
        StrategyId(NEXT_STRATEGY_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        StrategyId(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Predicate deciding, per locate, whether a strategy may be used.
pub type Condition = Arc<dyn Fn(&InjectionContext, &ExportStrategy) -> bool + Send + Sync>;

pub(crate) type Projection = Arc<dyn Fn(AnyArc) -> DiResult<AnyArc> + Send + Sync>;
pub(crate) type DisposeHook = fn(&AnyArc) -> Option<Arc<dyn Dispose>>;
pub(crate) type Constructor =
    Arc<dyn Fn(&ActivationArgs<'_>) -> Result<AnyArc, BoxError> + Send + Sync>;
pub(crate) type Delegate =
    Arc<dyn Fn(&ActivationContext<'_>) -> Result<AnyArc, BoxError> + Send + Sync>;

fn erase_constructor<F>(f: F) -> Constructor
where
    F: Fn(&ActivationArgs<'_>) -> Result<AnyArc, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn erase_delegate<F>(f: F) -> Delegate
where
    F: Fn(&ActivationContext<'_>) -> Result<AnyArc, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// How the primary instance comes into being.
#[derive(Clone)]
pub(crate) enum Activator {
    /// Constructor fed with resolved dependencies
    Construct(Constructor),
    /// Factory that locates what it needs itself
    Delegate(Delegate),
    /// Pre-built instance
    Instance(AnyArc),
}

/// One contract a strategy is exported under.
#[derive(Clone)]
pub(crate) struct ExportContract {
    pub(crate) contract: Contract,
    /// Maps the primary instance to this contract's stored form
    pub(crate) projection: Option<Projection>,
}

/// A registration: recipe, lifestyle and eligibility rules for one
/// activation type.
///
/// Built with [`ExportStrategy::construct`], [`ExportStrategy::factory`] or
/// [`ExportStrategy::instance`] and registered on an `InjectionScope`.
/// Strategies are immutable once built.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{Dependency, ExportStrategy, InjectionScope, LifestyleKind, Locator};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct FixedClock(u64);
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 { self.0 }
/// }
///
/// struct Scheduler {
///     clock: Arc<dyn Clock>,
/// }
///
/// let scope = InjectionScope::new();
/// scope.register(
///     ExportStrategy::instance(FixedClock(42))
///         .export_as::<dyn Clock, _>(|c| c as Arc<dyn Clock>)
///         .build(),
/// );
/// scope.register(
///     ExportStrategy::construct(|args| Ok(Scheduler { clock: args.get_trait::<dyn Clock>(0)? }))
///         .depends_on(Dependency::on::<dyn Clock>())
///         .lifestyle_kind(LifestyleKind::Singleton)
///         .build(),
/// );
///
/// let scheduler = scope.locate::<Scheduler>().unwrap();
/// assert_eq!(scheduler.clock.now(), 42);
/// ```
pub struct ExportStrategy {
    pub(crate) id: StrategyId,
    pub(crate) activation_type: Contract,
    pub(crate) exports: Vec<ExportContract>,
    pub(crate) key: Option<ExportKey>,
    pub(crate) priority: i32,
    pub(crate) environment: ExportEnvironment,
    pub(crate) externally_owned: bool,
    pub(crate) metadata: ExportMetadata,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) properties: Vec<PropertyImport>,
    pub(crate) activator: Activator,
    pub(crate) lifestyle: Box<dyn Lifestyle>,
    pub(crate) dispose_hook: Option<DisposeHook>,
    plan: OnceCell<Arc<ActivationPlan>>,
}

impl ExportStrategy {
    /// Strategy whose instances are built from resolved dependencies.
    ///
    /// Declare dependencies with [`ExportStrategyBuilder::depends_on`]; the
    /// constructor reads them back by index.
    pub fn construct<T, F>(constructor: F) -> ExportStrategyBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationArgs<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let erased = erase_constructor(move |args| Ok(Arc::new(constructor(args)?) as AnyArc));
        ExportStrategyBuilder::new(Activator::Construct(erased))
    }

    /// Strategy whose instances come from a factory that locates its own
    /// dependencies through the `ActivationContext`.
    pub fn factory<T, F>(factory: F) -> ExportStrategyBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let erased = erase_delegate(move |cx| Ok(Arc::new(factory(cx)?) as AnyArc));
        ExportStrategyBuilder::new(Activator::Delegate(erased))
    }

    /// Strategy that always provides `value`.
    ///
    /// Instances are externally owned by default: the container never
    /// disposes a value it did not create.
    pub fn instance<T: Send + Sync + 'static>(value: T) -> ExportStrategyBuilder<T> {
        Self::shared(Arc::new(value))
    }

    /// Like [`ExportStrategy::instance`] for an already shared value.
    pub fn shared<T: Send + Sync + 'static>(value: Arc<T>) -> ExportStrategyBuilder<T> {
        ExportStrategyBuilder::new(Activator::Instance(value as AnyArc)).externally_owned()
    }

    pub(crate) fn assemble(parts: builder::Parts) -> Self {
        Self {
            id: StrategyId::next(),
            activation_type: parts.activation_type,
            exports: parts.exports,
            key: parts.key,
            priority: parts.priority,
            environment: parts.environment,
            externally_owned: parts.externally_owned,
            metadata: parts.metadata,
            conditions: parts.conditions,
            dependencies: parts.dependencies,
            properties: parts.properties,
            activator: parts.activator,
            lifestyle: parts.lifestyle,
            dispose_hook: parts.dispose_hook,
            plan: OnceCell::new(),
        }
    }

    pub fn id(&self) -> StrategyId {
        self.id
    }

    /// Concrete type the strategy produces.
    pub fn activation_type(&self) -> &Contract {
        &self.activation_type
    }

    /// Contracts this strategy satisfies, the activation type first.
    pub fn export_contracts(&self) -> impl Iterator<Item = &Contract> + '_ {
        self.exports.iter().map(|e| &e.contract)
    }

    pub fn is_exported_as(&self, contract: &Contract) -> bool {
        self.export_index(contract).is_some()
    }

    pub fn key(&self) -> Option<&ExportKey> {
        self.key.as_ref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn environment(&self) -> ExportEnvironment {
        self.environment
    }

    pub fn is_externally_owned(&self) -> bool {
        self.externally_owned
    }

    pub fn metadata(&self) -> &ExportMetadata {
        &self.metadata
    }

    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// True when every condition admits this strategy for `context`.
    pub fn meets_conditions(&self, context: &InjectionContext) -> bool {
        self.conditions.iter().all(|condition| condition(context, self))
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn properties(&self) -> &[PropertyImport] {
        &self.properties
    }

    pub fn lifestyle_name(&self) -> &'static str {
        self.lifestyle.name()
    }

    pub(crate) fn export_index(&self, contract: &Contract) -> Option<usize> {
        self.exports.iter().position(|e| &e.contract == contract)
    }

    /// Compiled once per strategy, on first activation.
    pub(crate) fn activation_plan(&self) -> Arc<ActivationPlan> {
        self.plan
            .get_or_init(|| Arc::new(ActivationPlan::derive(self)))
            .clone()
    }

    /// Maps a primary instance to the stored form of export `index`.
    pub(crate) fn project(&self, index: usize, primary: AnyArc) -> DiResult<AnyArc> {
        match self.exports.get(index).and_then(|e| e.projection.as_ref()) {
            Some(projection) => projection(primary),
            None => Ok(primary),
        }
    }

    /// Disposal handle for an instance this strategy created, when the
    /// container owns it.
    pub(crate) fn disposal_handle(&self, instance: &AnyArc) -> Option<Arc<dyn Dispose>> {
        if self.externally_owned {
            return None;
        }
        self.dispose_hook.and_then(|hook| hook(instance))
    }
}

impl fmt::Debug for ExportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportStrategy")
            .field("id", &self.id)
            .field("activation_type", &self.activation_type)
            .field("exports", &self.export_contracts().collect::<Vec<_>>())
            .field("key", &self.key)
            .field("priority", &self.priority)
            .field("lifestyle", &self.lifestyle.name())
            .field("environment", &self.environment)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}
