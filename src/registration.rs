//! Type-erased storage and the per-scope export registry.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::Contract;
use crate::strategy::ExportStrategy;

/// Type-erased instance as stored and passed around by the container.
///
/// Sized exports are stored as `Arc<T>`; `dyn Trait` exports as
/// `Arc<Arc<dyn Trait>>`.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

#[cfg(feature = "ahash")]
pub(crate) type HashState = ahash::RandomState;
#[cfg(not(feature = "ahash"))]
pub(crate) type HashState = std::collections::hash_map::RandomState;

/// Recovers a typed `Arc` from an `AnyArc`.
pub(crate) trait Unerase<T: ?Sized> {
    fn unerase(any: AnyArc) -> DiResult<Arc<T>>;
}

/// Sized values stored as `Arc<T>`.
pub(crate) struct ByValue;

/// Trait objects stored as `Arc<Arc<dyn Trait>>`.
pub(crate) struct ByObject;

impl<T: Send + Sync + 'static> Unerase<T> for ByValue {
    #[inline]
    fn unerase(any: AnyArc) -> DiResult<Arc<T>> {
        any.downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(type_name::<T>()))
    }
}

impl<T: ?Sized + Send + Sync + 'static> Unerase<T> for ByObject {
    #[inline]
    fn unerase(any: AnyArc) -> DiResult<Arc<T>> {
        any.downcast::<Arc<T>>()
            .map(|outer| (*outer).clone())
            .map_err(|_| DiError::TypeMismatch(type_name::<T>()))
    }
}

/// One export contract of one registered strategy.
#[derive(Clone)]
pub(crate) struct RegistryEntry {
    pub(crate) strategy: Arc<ExportStrategy>,
    /// Index into the strategy's export contracts
    pub(crate) export: usize,
    /// Tree-wide registration order, larger is more recent
    pub(crate) sequence: u64,
}

/// Immutable snapshot of a scope's registrations.
///
/// Scopes publish a new snapshot per registration batch; readers keep
/// whichever snapshot they loaded.
#[derive(Clone, Default)]
pub(crate) struct Registry {
    by_contract: HashMap<Contract, Vec<RegistryEntry>, HashState>,
    strategies: Vec<Arc<ExportStrategy>>,
}

impl Registry {
    pub(crate) fn insert(&mut self, strategy: Arc<ExportStrategy>, sequence: u64) {
        for (export, contract) in strategy.export_contracts().enumerate() {
            self.by_contract
                .entry(contract.clone())
                .or_default()
                .push(RegistryEntry {
                    strategy: strategy.clone(),
                    export,
                    sequence,
                });
        }
        self.strategies.push(strategy);
    }

    /// Entries exported under `contract`, in registration order.
    #[inline]
    pub(crate) fn entries(&self, contract: &Contract) -> &[RegistryEntry] {
        self.by_contract
            .get(contract)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every strategy registered in this scope, in registration order.
    pub(crate) fn strategies(&self) -> &[Arc<ExportStrategy>] {
        &self.strategies
    }

    pub(crate) fn len(&self) -> usize {
        self.strategies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {}
    struct Square;
    impl Shape for Square {}

    #[test]
    fn unerase_by_value_rejects_other_types() {
        let any: AnyArc = Arc::new(5u32);
        assert!(<ByValue as Unerase<u32>>::unerase(any.clone()).is_ok());
        assert!(matches!(
            <ByValue as Unerase<u64>>::unerase(any),
            Err(DiError::TypeMismatch(_))
        ));
    }

    #[test]
    fn unerase_by_object_unwraps_the_inner_arc() {
        let object: Arc<dyn Shape> = Arc::new(Square);
        let any: AnyArc = Arc::new(object.clone());
        let back = <ByObject as Unerase<dyn Shape>>::unerase(any).unwrap();
        assert!(Arc::ptr_eq(&back, &object));
    }

    #[test]
    fn registry_indexes_every_export_contract() {
        let strategy = Arc::new(
            ExportStrategy::construct(|_| Ok(Square))
                .export_as::<dyn Shape, _>(|s| s as Arc<dyn Shape>)
                .export_name("square")
                .build(),
        );

        let mut registry = Registry::default();
        registry.insert(strategy, 1);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entries(&Contract::of::<Square>()).len(), 1);
        assert_eq!(registry.entries(&Contract::of::<dyn Shape>())[0].export, 1);
        assert_eq!(registry.entries(&Contract::named("square"))[0].export, 2);
        assert!(registry.entries(&Contract::of::<u8>()).is_empty());
    }
}
