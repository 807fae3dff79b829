//! Export collection for assembling registrations before building a root
//! scope.
//!
//! `ExportCollection` only gathers strategies; every resolution rule lives
//! in the scope it builds.

use std::sync::Arc;

use crate::config::ContainerConfig;
use crate::error::BoxError;
use crate::lifestyle::LifestyleKind;
use crate::provider::{ActivationContext, InjectionScope};
use crate::strategy::ExportStrategy;

pub mod module_system;
pub use module_system::*;

pub struct ExportCollection {
    strategies: Vec<ExportStrategy>,
    config: ContainerConfig,
}

impl ExportCollection {
    /// Creates an empty collection with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            strategies: Vec::new(),
            config,
        }
    }

    /// Adds a fully configured strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_scope::{ExportCollection, ExportStrategy, Locator};
    /// let mut exports = ExportCollection::new();
    /// exports.add(ExportStrategy::instance(8080u16).keyed("http").build());
    ///
    /// let scope = exports.build();
    /// assert_eq!(*scope.locate_keyed::<u16>("http").unwrap(), 8080);
    /// ```
    pub fn add(&mut self, strategy: ExportStrategy) -> &mut Self {
        self.strategies.push(strategy);
        self
    }

    /// Registers a pre-built value shared by every locate.
    ///
    /// The value is externally owned and never disposed by the container.
    ///
    /// ```rust
    /// # use ferrous_scope::{ExportCollection, Locator};
    /// struct Config {
    ///     database_url: String,
    /// }
    ///
    /// let mut exports = ExportCollection::new();
    /// exports.add_instance(Config {
    ///     database_url: "postgres://localhost".to_string(),
    /// });
    /// let scope = exports.build();
    /// assert_eq!(scope.locate::<Config>().unwrap().database_url, "postgres://localhost");
    /// ```
    pub fn add_instance<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.add(ExportStrategy::instance(value).build())
    }

    /// Registers an existing trait object under `dyn I`.
    ///
    /// ```rust
    /// # use ferrous_scope::{ExportCollection, Locator};
    /// # use std::sync::Arc;
    /// trait Logger: Send + Sync {
    ///     fn prefix(&self) -> &str;
    /// }
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn prefix(&self) -> &str { "file" }
    /// }
    ///
    /// let mut exports = ExportCollection::new();
    /// exports.add_trait_instance::<dyn Logger>(Arc::new(FileLogger));
    /// let scope = exports.build();
    /// assert_eq!(scope.locate_trait::<dyn Logger>().unwrap().prefix(), "file");
    /// ```
    pub fn add_trait_instance<I>(&mut self, value: Arc<I>) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.add(
            ExportStrategy::instance(value)
                .export_as::<I, _>(|outer: Arc<Arc<I>>| (*outer).clone())
                .build(),
        )
    }

    /// Registers a factory whose single instance is shared tree-wide.
    ///
    /// ```rust
    /// # use ferrous_scope::{ExportCollection, Locator};
    /// # use std::sync::Arc;
    /// struct Database { url: String }
    /// struct UserService { db: Arc<Database> }
    ///
    /// let mut exports = ExportCollection::new();
    /// exports.add_instance(Database { url: "postgres://localhost".to_string() });
    /// exports.add_singleton_factory(|cx| Ok(UserService { db: cx.locate::<Database>()? }));
    ///
    /// let scope = exports.build();
    /// let a = scope.locate::<UserService>().unwrap();
    /// let b = scope.create_child_scope().locate::<UserService>().unwrap();
    /// assert!(Arc::ptr_eq(&a, &b));
    /// ```
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_factory(LifestyleKind::Singleton, factory)
    }

    /// Registers a factory with one instance per requesting scope.
    pub fn add_per_scope_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_factory(LifestyleKind::PerScope, factory)
    }

    /// Registers a factory invoked on every locate.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_factory(LifestyleKind::Transient, factory)
    }

    /// Registers a factory whose instance is reused while something else
    /// keeps it alive.
    pub fn add_weak_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_factory(LifestyleKind::WeakSingleton, factory)
    }

    fn add_factory<T, F>(&mut self, kind: LifestyleKind, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add(ExportStrategy::factory(factory).lifestyle_kind(kind).build())
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Strategies collected so far, in registration order.
    pub fn strategies(&self) -> impl Iterator<Item = &ExportStrategy> + '_ {
        self.strategies.iter()
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Builds a root scope holding every collected strategy.
    pub fn build(self) -> InjectionScope {
        let scope = InjectionScope::root(self.config);
        tracing::debug!(count = self.strategies.len(), "building root scope from collection");
        scope.register_batch(self.strategies);
        scope
    }

    /// Registers every collected strategy on an existing scope, typically a
    /// child scope that overrides its parent.
    pub fn register_into(self, scope: &InjectionScope) {
        scope.register_batch(self.strategies);
    }
}

impl Default for ExportCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExportCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportCollection")
            .field("strategies", &self.strategies.len())
            .field("config", &self.config)
            .finish()
    }
}
