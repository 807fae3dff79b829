//! Fluent construction of export strategies.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::ExportEnvironment;
use crate::key::{Contract, ExportKey};
use crate::lifestyle::{Lifestyle, LifestyleKind};
use crate::metadata::{ExportMetadata, MetadataValue};
use crate::provider::InjectionContext;
use crate::registration::{AnyArc, ByValue, Unerase};
use crate::traits::Dispose;

use super::{
    Activator, Condition, Dependency, DisposeHook, ExportContract, ExportStrategy, Projection,
    PropertyImport,
};

/// Everything an `ExportStrategy` is assembled from.
pub(crate) struct Parts {
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
}

/// Builder returned by [`ExportStrategy::construct`],
/// [`ExportStrategy::factory`] and [`ExportStrategy::instance`].
///
/// Defaults: exported as `T` only, unkeyed, priority 0, any environment,
/// transient, owned by the container, no conditions.
pub struct ExportStrategyBuilder<T> {
    parts: Parts,
    metadata: Vec<(String, MetadataValue)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ExportStrategyBuilder<T> {
    pub(crate) fn new(activator: Activator) -> Self {
        Self {
            parts: Parts {
                activation_type: Contract::of::<T>(),
                exports: vec![ExportContract {
                    contract: Contract::of::<T>(),
                    projection: None,
                }],
                key: None,
                priority: 0,
                environment: ExportEnvironment::Any,
                externally_owned: false,
                metadata: ExportMetadata::empty(),
                conditions: Vec::new(),
                dependencies: Vec::new(),
                properties: Vec::new(),
                activator,
                lifestyle: LifestyleKind::Transient.create(),
                dispose_hook: None,
            },
            metadata: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Append a constructor dependency; constructors read them back by
    /// position through `ActivationArgs`.
    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.parts.dependencies.push(dependency);
        self
    }

    /// Also export under the contract `I`, usually a `dyn Trait`.
    ///
    /// `project` maps the shared instance to the exported form; it runs on
    /// every locate of `I`, the underlying instance is still governed by
    /// the lifestyle.
    pub fn export_as<I, F>(mut self, project: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let projection: Projection = Arc::new(move |primary: AnyArc| {
            let concrete = <ByValue as Unerase<T>>::unerase(primary)?;
            Ok(Arc::new(project(concrete)) as AnyArc)
        });
        self.push_export(Contract::of::<I>(), Some(projection));
        self
    }

    /// Also export under a string name; locate it with `locate_named::<T>`.
    pub fn export_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.push_export(Contract::named(name), None);
        self
    }

    pub fn keyed(mut self, key: impl Into<ExportKey>) -> Self {
        self.parts.key = Some(key.into());
        self
    }

    /// Higher priorities are preferred; the default is 0.
    pub fn priority(mut self, priority: i32) -> Self {
        self.parts.priority = priority;
        self
    }

    pub fn environment(mut self, environment: ExportEnvironment) -> Self {
        self.parts.environment = environment;
        self
    }

    /// Add a condition; every condition must hold for the strategy to be
    /// selected.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&InjectionContext, &ExportStrategy) -> bool + Send + Sync + 'static,
    {
        self.parts.conditions.push(Arc::new(condition));
        self
    }

    /// Only eligible while being injected into an instance of `X`.
    pub fn when_injected_into<X: ?Sized + 'static>(self) -> Self {
        let target = Contract::of::<X>();
        self.when(move |context, _| {
            context
                .target()
                .is_some_and(|info| info.activation_type() == &target)
        })
    }

    /// The container never disposes instances of this strategy.
    pub fn externally_owned(mut self) -> Self {
        self.parts.externally_owned = true;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    pub fn lifestyle<L: Lifestyle>(mut self, lifestyle: L) -> Self {
        self.parts.lifestyle = Box::new(lifestyle);
        self
    }

    pub fn lifestyle_kind(mut self, kind: LifestyleKind) -> Self {
        self.parts.lifestyle = kind.create();
        self
    }

    pub fn singleton(self) -> Self {
        self.lifestyle_kind(LifestyleKind::Singleton)
    }

    pub fn per_scope(self) -> Self {
        self.lifestyle_kind(LifestyleKind::PerScope)
    }

    pub fn weak_singleton(self) -> Self {
        self.lifestyle_kind(LifestyleKind::WeakSingleton)
    }

    pub fn transient(self) -> Self {
        self.lifestyle_kind(LifestyleKind::Transient)
    }

    pub fn property(mut self, property: PropertyImport) -> Self {
        self.parts.properties.push(property);
        self
    }

    pub fn build(mut self) -> ExportStrategy {
        if !self.metadata.is_empty() {
            let mut metadata = ExportMetadata::builder();
            for (key, value) in self.metadata.drain(..) {
                metadata.insert(key, value);
            }
            self.parts.metadata = metadata.build();
        }
        ExportStrategy::assemble(self.parts)
    }

    fn push_export(&mut self, contract: Contract, projection: Option<Projection>) {
        let export = ExportContract {
            contract,
            projection,
        };
        match self
            .parts
            .exports
            .iter()
            .position(|e| e.contract == export.contract)
        {
            Some(existing) => self.parts.exports[existing] = export,
            None => self.parts.exports.push(export),
        }
    }
}

impl<T: Dispose> ExportStrategyBuilder<T> {
    /// Track created instances for disposal.
    ///
    /// Ignored for externally owned strategies.
    pub fn disposable(mut self) -> Self {
        self.parts.dispose_hook = Some(dispose_handle::<T>);
        self
    }
}

fn dispose_handle<T: Dispose>(instance: &AnyArc) -> Option<Arc<dyn Dispose>> {
    instance
        .clone()
        .downcast::<T>()
        .ok()
        .map(|typed| typed as Arc<dyn Dispose>)
}
