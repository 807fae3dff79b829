//! # ferrous-scope
//!
//! In-process dependency resolution built around a tree of scopes.
//!
//! ## Features
//!
//! - **Export strategies**: constructors with declared dependencies,
//!   delegate factories, or pre-built instances, exported under concrete
//!   types, `dyn Trait` contracts and names
//! - **Lifestyles**: Transient, Singleton, PerScope and WeakSingleton, plus
//!   caller-supplied policies
//! - **Scope tree**: child scopes shadow their parents and dispose
//!   children first
//! - **Selection rules**: keys, priorities, environments, conditions and
//!   metadata filters
//! - **Cached activation plans**: dependency graphs are derived once per
//!   request shape and cycle-checked while derived
//! - **Generic producers**: `Producer<(A, B), T>` factories of up to five
//!   arguments without registration
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_scope::{Dependency, ExportCollection, ExportStrategy, Locator};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut exports = ExportCollection::new();
//! exports.add_instance(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! exports.add(
//!     ExportStrategy::construct(|args| Ok(UserService { db: args.get::<Database>(0)? }))
//!         .depends_on(Dependency::on::<Database>())
//!         .build(),
//! );
//!
//! let scope = exports.build();
//! let users = scope.locate::<UserService>().unwrap();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Trait Contracts
//!
//! ```rust
//! use ferrous_scope::{ExportStrategy, InjectionScope, Locator};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("[LOG] {}", message)
//!     }
//! }
//!
//! let scope = InjectionScope::new();
//! scope.register(
//!     ExportStrategy::construct(|_| Ok(ConsoleLogger))
//!         .export_as::<dyn Logger, _>(|l| l as Arc<dyn Logger>)
//!         .singleton()
//!         .build(),
//! );
//!
//! let logger = scope.locate_trait::<dyn Logger>().unwrap();
//! assert_eq!(logger.log("Hello"), "[LOG] Hello");
//! ```
//!
//! ## Scopes and Disposal
//!
//! ```rust
//! use ferrous_scope::{Dispose, DisposeResult, ExportStrategy, InjectionScope, Locator};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Connection {
//!     closed: AtomicBool,
//! }
//!
//! impl Dispose for Connection {
//!     fn dispose(&self) -> DisposeResult {
//!         self.closed.store(true, Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! let root = InjectionScope::new();
//! root.register(
//!     ExportStrategy::construct(|_| Ok(Connection::default()))
//!         .per_scope()
//!         .disposable()
//!         .build(),
//! );
//!
//! let request = root.create_child_scope();
//! let connection = request.locate::<Connection>().unwrap();
//! request.dispose().unwrap();
//! assert!(connection.closed.load(Ordering::SeqCst));
//! ```

pub mod collection;
pub mod config;
pub mod descriptors;
pub mod disposal;
pub mod error;
pub mod factory;
pub mod key;
pub mod lifestyle;
pub mod metadata;
pub mod plan;
pub mod provider;
pub mod request;
pub mod strategy;
pub mod traits;
pub mod validation;

mod internal;
mod registration;

pub use collection::{ExportCollection, ExportCollectionExt, ExportCollectionModuleExt, ExportModule};
pub use config::{ContainerConfig, ExecutionMode, ExportEnvironment};
pub use descriptors::ExportDescriptor;
pub use disposal::DisposalScope;
pub use error::{BoxError, DiError, DiResult, DisposalFailure};
pub use factory::{FactoryArgs, Producer};
pub use key::{Contract, ExportKey};
pub use lifestyle::{
    Lifestyle, LifestyleContext, LifestyleKind, PerScopeLifestyle, SingletonLifestyle,
    TransientLifestyle, WeakSingletonLifestyle,
};
pub use metadata::{ExportMetadata, ExportMetadataBuilder, MetadataValue};
pub use plan::{ActivationPlan, ActivationPlanCache};
pub use provider::{
    ActivationContext, InjectionContext, InjectionScope, TargetInfo, TargetKind, WeakScope,
};
pub use registration::AnyArc;
pub use request::{ExportFilter, LocateRequest};
pub use strategy::{
    ActivationArgs, Condition, Dependency, ExportStrategy, ExportStrategyBuilder, PropertyImport,
    StrategyId,
};
pub use traits::{Dispose, DisposeResult, Locator, LocatorCore};
pub use validation::{ValidationIssue, ValidationReport};
