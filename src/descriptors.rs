//! Export descriptors for introspection and diagnostics.

use crate::config::ExportEnvironment;
use crate::key::{Contract, ExportKey};
use crate::metadata::ExportMetadata;
use crate::provider::InjectionScope;
use crate::strategy::{ExportStrategy, StrategyId};

/// Snapshot of one registered strategy, as seen from a scope.
///
/// # Use Cases
///
/// - **Debugging**: what is registered where, with which lifestyle
/// - **Health checks**: assert a configuration at startup
///
/// # Examples
///
/// ```rust
/// use ferrous_scope::{ExportStrategy, InjectionScope};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {}
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {}
///
/// struct Database;
///
/// let root = InjectionScope::new();
/// root.register(ExportStrategy::construct(|_| Ok(Database)).singleton().build());
/// let child = root.create_child_scope();
/// child.register(
///     ExportStrategy::instance(ConsoleLogger)
///         .export_as::<dyn Logger, _>(|l| l as Arc<dyn Logger>)
///         .keyed("console")
///         .build(),
/// );
///
/// let descriptors = child.export_descriptors();
/// assert_eq!(descriptors.len(), 2);
///
/// let logger = &descriptors[0];
/// assert_eq!(logger.depth, 0);
/// assert_eq!(logger.exports.len(), 2);
/// assert!(logger.externally_owned);
///
/// let database = &descriptors[1];
/// assert_eq!(database.depth, 1);
/// assert_eq!(database.lifestyle, "Singleton");
/// assert!(database.type_name().contains("Database"));
/// ```
#[derive(Debug, Clone)]
pub struct ExportDescriptor {
    pub id: StrategyId,
    /// Concrete type the strategy produces
    pub activation_type: Contract,
    /// Every contract it is exported under, the activation type first
    pub exports: Vec<Contract>,
    pub key: Option<ExportKey>,
    pub priority: i32,
    pub lifestyle: &'static str,
    pub environment: ExportEnvironment,
    pub externally_owned: bool,
    pub has_conditions: bool,
    pub dependencies: usize,
    pub metadata: ExportMetadata,
    /// Distance from the scope that produced the descriptor; 0 = own
    pub depth: usize,
}

impl ExportDescriptor {
    fn new(strategy: &ExportStrategy, depth: usize) -> Self {
        Self {
            id: strategy.id(),
            activation_type: strategy.activation_type().clone(),
            exports: strategy.export_contracts().cloned().collect(),
            key: strategy.key().cloned(),
            priority: strategy.priority(),
            lifestyle: strategy.lifestyle_name(),
            environment: strategy.environment(),
            externally_owned: strategy.is_externally_owned(),
            has_conditions: strategy.has_conditions(),
            dependencies: strategy.dependencies().len() + strategy.properties().len(),
            metadata: strategy.metadata().clone(),
            depth,
        }
    }

    pub fn type_name(&self) -> &str {
        self.activation_type.display_name()
    }

    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }

    /// True if the strategy was registered on the describing scope itself.
    pub fn is_local(&self) -> bool {
        self.depth == 0
    }
}

impl InjectionScope {
    /// Describe every strategy visible from this scope, nearest scope
    /// first and most recent registration first within a scope.
    pub fn export_descriptors(&self) -> Vec<ExportDescriptor> {
        let mut descriptors = Vec::new();
        let mut current = Some(self);
        let mut depth = 0;
        while let Some(scope) = current {
            let registry = scope.registry();
            descriptors.extend(
                registry
                    .strategies()
                    .iter()
                    .rev()
                    .map(|strategy| ExportDescriptor::new(strategy, depth)),
            );
            current = scope.parent();
            depth += 1;
        }
        descriptors
    }

    /// Multi-line dump of the scope chain and its registrations.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let mut current = Some(self);
        let mut depth = 0;
        while let Some(scope) = current {
            let _ = writeln!(
                out,
                "{}scope '{}' (cached plans: {}, tracked: {})",
                "  ".repeat(depth),
                scope.name(),
                scope.plan_cache().len(),
                scope.disposal_scope().len()
            );
            for strategy in scope.registry().strategies().iter().rev() {
                let descriptor = ExportDescriptor::new(strategy, depth);
                let exports: Vec<String> = descriptor.exports.iter().map(|c| c.to_string()).collect();
                let _ = writeln!(
                    out,
                    "{}  - {} [{}] priority={} key={} exports=[{}]",
                    "  ".repeat(depth),
                    descriptor.type_name(),
                    descriptor.lifestyle,
                    descriptor.priority,
                    descriptor
                        .key
                        .as_ref()
                        .map_or_else(|| String::from("-"), |k| k.to_string()),
                    exports.join(", ")
                );
            }
            current = scope.parent();
            depth += 1;
        }
        out
    }
}
