//! Constructor dependencies, property imports and the arguments handed to
//! constructors.

use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::factory::{FactoryArgs, Producer};
use crate::key::{Contract, ExportKey};
use crate::registration::{AnyArc, ByObject, ByValue, Unerase};
use crate::request::{ExportFilter, LocateRequest};

/// One value an export needs before (or right after) it is constructed.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{Dependency, ExportFilter};
///
/// let primary = Dependency::on::<String>().keyed("primary");
/// assert!(primary.is_required());
///
/// let audit = Dependency::on::<u32>()
///     .filtered(ExportFilter::metadata("audit", true))
///     .optional();
/// assert!(!audit.is_required());
/// ```
#[derive(Clone)]
pub struct Dependency {
    pub(crate) request: LocateRequest,
    pub(crate) required: bool,
    pub(crate) lazy: bool,
    pub(crate) contextual: bool,
    pub(crate) name: Option<Arc<str>>,
}

impl Dependency {
    /// Depends on the contract `T` (a sized type or `dyn Trait`).
    pub fn on<T: ?Sized + 'static>() -> Self {
        Self::from_request(LocateRequest::of::<T>())
    }

    /// Depends on whatever is exported under `name`.
    pub fn on_name(name: impl Into<Arc<str>>) -> Self {
        Self::from_request(LocateRequest::named(name))
    }

    /// Depends on a `Producer<Args, T>` instead of a `T`.
    ///
    /// Producers resolve lazily, so they never take part in cycle checks.
    pub fn producer<Args: FactoryArgs, T: Send + Sync + 'static>() -> Self {
        let mut dependency = Self::from_request(Producer::<Args, T>::request::<ByValue>());
        dependency.lazy = true;
        dependency
    }

    /// Like [`Dependency::producer`] for a `dyn Trait` product.
    pub fn producer_trait<Args: FactoryArgs, T: ?Sized + Send + Sync + 'static>() -> Self {
        let mut dependency = Self::from_request(Producer::<Args, T>::request::<ByObject>());
        dependency.lazy = true;
        dependency
    }

    pub fn from_request(request: LocateRequest) -> Self {
        Self {
            request,
            required: true,
            lazy: false,
            contextual: false,
            name: None,
        }
    }

    pub fn keyed(mut self, key: impl Into<ExportKey>) -> Self {
        self.request.key = Some(key.into());
        self
    }

    pub fn filtered(mut self, filter: ExportFilter) -> Self {
        self.request.filter = Some(filter);
        self
    }

    /// Resolve to `None` instead of failing when nothing matches.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Target name reported to conditions through `TargetInfo`.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Supplied by the resolution context (producer arguments) rather
    /// than by a registration; skipped by `validate`.
    pub fn contextual(mut self) -> Self {
        self.contextual = true;
        self
    }

    pub fn contract(&self) -> &Contract {
        &self.request.contract
    }

    pub fn key(&self) -> Option<&ExportKey> {
        self.request.key.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn is_contextual(&self) -> bool {
        self.contextual
    }

    pub(crate) fn missing(&self) -> DiError {
        DiError::LocateFailed {
            contract: self.request.contract.clone(),
            key: self.request.key.clone(),
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("contract", &self.request.contract)
            .field("key", &self.request.key)
            .field("required", &self.required)
            .field("lazy", &self.lazy)
            .finish()
    }
}

pub(crate) type Setter = Arc<dyn Fn(&AnyArc, AnyArc) -> DiResult<()> + Send + Sync>;

/// A value injected into an already constructed instance.
///
/// Setters receive `&T`, so the target field needs interior mutability
/// (`OnceCell`, `Mutex`, ...). Imports marked `after_construction` run once
/// the instance has left its own activation, which lets two exports refer
/// to each other without a cycle error.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{ExportStrategy, InjectionScope, Locator, PropertyImport};
/// use once_cell::sync::OnceCell;
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Greeter {
///     greeting: OnceCell<Arc<String>>,
/// }
///
/// let scope = InjectionScope::new();
/// scope.register(ExportStrategy::instance(String::from("hello")).build());
/// scope.register(
///     ExportStrategy::construct(|_| Ok(Greeter::default()))
///         .property(PropertyImport::new("greeting", |g: &Greeter, s: Arc<String>| {
///             let _ = g.greeting.set(s);
///         }))
///         .build(),
/// );
///
/// let greeter = scope.locate::<Greeter>().unwrap();
/// assert_eq!(greeter.greeting.get().unwrap().as_str(), "hello");
/// ```
#[derive(Clone)]
pub struct PropertyImport {
    pub(crate) name: Arc<str>,
    pub(crate) dependency: Dependency,
    pub(crate) after_construction: bool,
    pub(crate) setter: Setter,
}

impl PropertyImport {
    pub fn new<T, D, F>(name: impl Into<Arc<str>>, set: F) -> Self
    where
        T: Send + Sync + 'static,
        D: Send + Sync + 'static,
        F: Fn(&T, Arc<D>) + Send + Sync + 'static,
    {
        Self::with_unerase::<T, D, ByValue, F>(name.into(), set)
    }

    /// Import a `dyn Trait` value.
    pub fn new_trait<T, D, F>(name: impl Into<Arc<str>>, set: F) -> Self
    where
        T: Send + Sync + 'static,
        D: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<D>) + Send + Sync + 'static,
    {
        Self::with_unerase::<T, D, ByObject, F>(name.into(), set)
    }

    fn with_unerase<T, D, M, F>(name: Arc<str>, set: F) -> Self
    where
        T: Send + Sync + 'static,
        D: ?Sized + Send + Sync + 'static,
        M: Unerase<D>,
        F: Fn(&T, Arc<D>) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |target: &AnyArc, value: AnyArc| {
            let target = (**target)
                .downcast_ref::<T>()
                .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))?;
            set(target, M::unerase(value)?);
            Ok(())
        });

        Self {
            dependency: Dependency::on::<D>().named(name.clone()),
            name,
            after_construction: false,
            setter,
        }
    }

    /// Inject once the instance has been fully activated.
    pub fn after_construction(mut self) -> Self {
        self.after_construction = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.dependency = self.dependency.optional();
        self
    }

    pub fn keyed(mut self, key: impl Into<ExportKey>) -> Self {
        self.dependency = self.dependency.keyed(key);
        self
    }

    pub fn filtered(mut self, filter: ExportFilter) -> Self {
        self.dependency = self.dependency.filtered(filter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    pub fn is_after_construction(&self) -> bool {
        self.after_construction
    }
}

impl fmt::Debug for PropertyImport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyImport")
            .field("name", &self.name)
            .field("dependency", &self.dependency)
            .field("after_construction", &self.after_construction)
            .finish()
    }
}

/// Resolved constructor dependencies, indexed in declaration order.
///
/// Optional dependencies that resolved to nothing read back as `None`
/// through [`ActivationArgs::optional`]; [`ActivationArgs::get`] on such a
/// slot fails with `LocateFailed`.
pub struct ActivationArgs<'a> {
    pub(crate) slots: &'a [Option<AnyArc>],
    pub(crate) dependencies: &'a [Dependency],
}

impl<'a> ActivationArgs<'a> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get<D: Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<D>> {
        <ByValue as Unerase<D>>::unerase(self.required(index)?)
    }

    pub fn get_trait<D: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<D>> {
        <ByObject as Unerase<D>>::unerase(self.required(index)?)
    }

    pub fn optional<D: Send + Sync + 'static>(&self, index: usize) -> DiResult<Option<Arc<D>>> {
        self.slot(index)?.cloned().map(<ByValue as Unerase<D>>::unerase).transpose()
    }

    pub fn optional_trait<D: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> DiResult<Option<Arc<D>>> {
        self.slot(index)?.cloned().map(<ByObject as Unerase<D>>::unerase).transpose()
    }

    fn slot(&self, index: usize) -> DiResult<Option<&AnyArc>> {
        self.slots
            .get(index)
            .map(Option::as_ref)
            .ok_or(DiError::TypeMismatch("dependency index out of range"))
    }

    fn required(&self, index: usize) -> DiResult<AnyArc> {
        match self.slot(index)? {
            Some(value) => Ok(value.clone()),
            None => Err(self
                .dependencies
                .get(index)
                .map(Dependency::missing)
                .unwrap_or(DiError::TypeMismatch("dependency index out of range"))),
        }
    }
}
