//! Locate requests and export filters.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::key::{Contract, ExportKey};
use crate::metadata::MetadataValue;
use crate::strategy::ExportStrategy;

/// Builds the fallback strategy for a contract no registration covers.
pub(crate) type SecondarySynthesizer = fn() -> ExportStrategy;

/// Predicate narrowing the strategies a request may select.
///
/// Filters are compared by identity when caching request plans, so reuse
/// one `ExportFilter` value for repeated requests rather than building a
/// new one each time.
#[derive(Clone)]
pub struct ExportFilter {
    predicate: Arc<dyn Fn(&ExportStrategy) -> bool + Send + Sync>,
}

impl ExportFilter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&ExportStrategy) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Admits strategies whose metadata maps `key` to `value`.
    pub fn metadata(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        let key = key.into();
        let value = value.into();
        Self::new(move |strategy| strategy.metadata().get(&key) == Some(&value))
    }

    /// Rejects strategies whose activation type is `T`.
    pub fn excluding<T: ?Sized + 'static>() -> Self {
        let excluded = Contract::of::<T>();
        Self::new(move |strategy| strategy.activation_type() != &excluded)
    }

    pub fn allows(&self, strategy: &ExportStrategy) -> bool {
        (self.predicate)(strategy)
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.predicate) as *const () as usize
    }

    pub(crate) fn downgrade(&self) -> WeakFilter {
        WeakFilter(Arc::downgrade(&self.predicate))
    }
}

/// Non-owning handle to an [`ExportFilter`].
///
/// Holding it keeps the predicate's allocation, so no other filter can
/// take over its identity while the handle lives.
pub(crate) struct WeakFilter(Weak<dyn Fn(&ExportStrategy) -> bool + Send + Sync>);

impl WeakFilter {
    /// False once every `ExportFilter` clone is gone.
    pub(crate) fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for ExportFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExportFilter({:#x})", self.identity())
    }
}

/// Everything a single locate needs besides the context it runs in.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{ExportStrategy, InjectionScope, LocateRequest, Locator};
///
/// let scope = InjectionScope::new();
/// scope.register(ExportStrategy::instance(String::from("primary")).build());
/// scope.register(ExportStrategy::instance(String::from("replica")).keyed("replica").build());
///
/// let request = LocateRequest::of::<String>().keyed("replica");
/// let value = scope.locate_with::<String>(&request).unwrap();
/// assert_eq!(value.as_str(), "replica");
/// ```
#[derive(Clone)]
pub struct LocateRequest {
    pub(crate) contract: Contract,
    pub(crate) key: Option<ExportKey>,
    pub(crate) filter: Option<ExportFilter>,
    pub(crate) secondary: Option<SecondarySynthesizer>,
}

impl LocateRequest {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::for_contract(Contract::of::<T>())
    }

    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::for_contract(Contract::named(name))
    }

    pub fn for_contract(contract: Contract) -> Self {
        Self {
            contract,
            key: None,
            filter: None,
            secondary: None,
        }
    }

    pub fn keyed(mut self, key: impl Into<ExportKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn filtered(mut self, filter: ExportFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub(crate) fn with_secondary(mut self, synthesizer: SecondarySynthesizer) -> Self {
        self.secondary = Some(synthesizer);
        self
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn key(&self) -> Option<&ExportKey> {
        self.key.as_ref()
    }

    pub fn filter(&self) -> Option<&ExportFilter> {
        self.filter.as_ref()
    }
}

impl fmt::Debug for LocateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocateRequest")
            .field("contract", &self.contract)
            .field("key", &self.key)
            .field("filter", &self.filter)
            .field("secondary", &self.secondary.is_some())
            .finish()
    }
}
