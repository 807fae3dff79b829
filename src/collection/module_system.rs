//! Export modules for grouping registrations.
//!
//! A module bundles the strategies of one subsystem so applications can
//! compose them without knowing their internals.

use crate::{DiResult, ExportCollection};

/// A reusable group of registrations.
///
/// # Example
///
/// ```rust
/// use ferrous_scope::{
///     Dependency, DiResult, ExportCollection, ExportCollectionExt, ExportModule, ExportStrategy,
///     Locator,
/// };
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct UserConfig;
///
/// struct UserService {
///     config: Arc<UserConfig>,
/// }
///
/// struct UserModule;
///
/// impl ExportModule for UserModule {
///     fn register_exports(self, exports: &mut ExportCollection) -> DiResult<()> {
///         exports.add_instance(UserConfig::default());
///         exports.add(
///             ExportStrategy::construct(|args| Ok(UserService { config: args.get::<UserConfig>(0)? }))
///                 .depends_on(Dependency::on::<UserConfig>())
///                 .per_scope()
///                 .build(),
///         );
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let scope = ExportCollection::new().add_module(UserModule)?.build();
/// let request = scope.create_child_scope();
/// assert!(request.locate::<UserService>().is_ok());
/// # Ok(())
/// # }
/// ```
pub trait ExportModule {
    fn register_exports(self, exports: &mut ExportCollection) -> DiResult<()>;
}

/// Chaining form of module registration that consumes the collection.
pub trait ExportCollectionExt {
    fn add_module<M: ExportModule>(self, module: M) -> DiResult<Self>
    where
        Self: Sized;
}

impl ExportCollectionExt for ExportCollection {
    fn add_module<M: ExportModule>(mut self, module: M) -> DiResult<Self> {
        module.register_exports(&mut self)?;
        Ok(self)
    }
}

/// In-place form, matching the `&mut Self` style of `ExportCollection`.
pub trait ExportCollectionModuleExt {
    fn add_module_mut<M: ExportModule>(&mut self, module: M) -> DiResult<&mut Self>;
}

impl ExportCollectionModuleExt for ExportCollection {
    fn add_module_mut<M: ExportModule>(&mut self, module: M) -> DiResult<&mut Self> {
        module.register_exports(self)?;
        Ok(self)
    }
}
