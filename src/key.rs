//! Contract and export-key types.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of what a caller asks for.
///
/// A contract is either a Rust type (concrete or `dyn Trait`) or an export
/// name. Type contracts compare by `TypeId` only; the type name is carried
/// for diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_scope::Contract;
///
/// trait Logger: Send + Sync {}
///
/// let concrete = Contract::of::<String>();
/// let object = Contract::of::<dyn Logger>();
/// let named = Contract::named("primary-db");
///
/// assert_eq!(concrete.display_name(), "alloc::string::String");
/// assert!(object.display_name().contains("Logger"));
/// assert_eq!(named.display_name(), "primary-db");
/// assert_ne!(concrete, object);
/// ```
#[derive(Debug, Clone)]
pub enum Contract {
    /// A Rust type, sized or `dyn Trait`
    Type(TypeId, &'static str),
    /// An export name
    Named(Arc<str>),
}

impl Contract {
    /// Contract for the type `T`.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Contract::Type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Contract for an export name.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Contract::Named(name.into())
    }

    /// Human-readable type name or export name.
    pub fn display_name(&self) -> &str {
        match self {
            Contract::Type(_, name) => name,
            Contract::Named(name) => name,
        }
    }

    /// Type name for type contracts, a placeholder for names.
    pub(crate) fn static_name(&self) -> &'static str {
        match self {
            Contract::Type(_, name) => name,
            Contract::Named(_) => "<named export>",
        }
    }

    /// The `TypeId` for type contracts.
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Contract::Type(id, _) => Some(*id),
            Contract::Named(_) => None,
        }
    }
}

impl PartialEq for Contract {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Contract::Type(a, _), Contract::Type(b, _)) => a == b,
            (Contract::Named(a), Contract::Named(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Contract {}

impl Hash for Contract {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Contract::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Contract::Named(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contract::Type(_, name) => f.write_str(name),
            Contract::Named(name) => write!(f, "'{}'", name),
        }
    }
}

/// Key distinguishing several exports of one contract.
///
/// ```rust
/// use ferrous_scope::ExportKey;
///
/// assert_eq!(ExportKey::from("primary"), ExportKey::from(String::from("primary")));
/// assert_ne!(ExportKey::from(1), ExportKey::from("1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExportKey {
    Str(Arc<str>),
    Int(i64),
}

impl fmt::Display for ExportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportKey::Str(s) => write!(f, "\"{}\"", s),
            ExportKey::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for ExportKey {
    fn from(value: &str) -> Self {
        ExportKey::Str(Arc::from(value))
    }
}

impl From<String> for ExportKey {
    fn from(value: String) -> Self {
        ExportKey::Str(Arc::from(value))
    }
}

impl From<i64> for ExportKey {
    fn from(value: i64) -> Self {
        ExportKey::Int(value)
    }
}

impl From<i32> for ExportKey {
    fn from(value: i32) -> Self {
        ExportKey::Int(i64::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    trait Marker {}

    #[test]
    fn type_contracts_ignore_name_for_equality() {
        let a = Contract::Type(TypeId::of::<u8>(), "u8");
        let b = Contract::Type(TypeId::of::<u8>(), "renamed");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn named_and_type_contracts_never_collide() {
        let named = Contract::named("u8");
        let typed = Contract::of::<u8>();
        assert_ne!(named, typed);
        assert_eq!(named.type_id(), None);
        assert_eq!(typed.type_id(), Some(TypeId::of::<u8>()));
    }

    #[test]
    fn trait_object_contracts_are_distinct_from_impls() {
        struct Impl;
        impl Marker for Impl {}
        assert_ne!(Contract::of::<dyn Marker>(), Contract::of::<Impl>());
    }

    #[test]
    fn display_quotes_names_and_keys() {
        assert_eq!(Contract::named("db").to_string(), "'db'");
        assert_eq!(ExportKey::from("db").to_string(), "\"db\"");
        assert_eq!(ExportKey::from(7).to_string(), "7");
    }
}
