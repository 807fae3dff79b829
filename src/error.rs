//! Error types for the injection engine.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::key::{Contract, ExportKey};
use crate::validation::ValidationIssue;

/// Boxed error returned by constructors, factories and disposers.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Injection errors
///
/// Represents the failure modes of locating, activating and disposing
/// exports.
///
/// # Examples
///
/// ```rust
/// use ferrous_scope::{DiError, InjectionScope, Locator};
///
/// let scope = InjectionScope::new();
/// match scope.locate::<String>() {
///     Err(DiError::LocateFailed { contract, key }) => {
///         assert_eq!(contract.display_name(), "alloc::string::String");
///         assert!(key.is_none());
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// No candidate survived filtering
    #[error("No export satisfies {contract}{}", display_key(.key))]
    LocateFailed {
        contract: Contract,
        key: Option<ExportKey>,
    },
    /// Dependency cycle, first and last entries name the repeated contract
    #[error("Circular dependency: {}", display_path(.0))]
    CircularDependency(Vec<Contract>),
    /// The selected strategy failed to construct its instance
    #[error("Activation of {contract} failed: {cause}")]
    ActivationFailed {
        contract: Contract,
        cause: Arc<dyn StdError + Send + Sync + 'static>,
    },
    /// One or more instances failed to dispose
    #[error("{} instance(s) failed to dispose: {}", .0.len(), display_failures(.0))]
    DisposalAggregate(Vec<DisposalFailure>),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Maximum resolution depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// The scope was already disposed
    #[error("Scope '{0}' has been disposed")]
    ScopeDisposed(String),
    /// Eager validation found problems
    #[error("Validation failed with {} issue(s)", .0.len())]
    Validation(Vec<ValidationIssue>),
}

impl DiError {
    /// Wraps a factory failure with contract context.
    ///
    /// Failures that are already `DiError`s (a nested locate that failed)
    /// pass through untouched so callers still see the original cause.
    pub(crate) fn activation(contract: &Contract, cause: BoxError) -> Self {
        match cause.downcast::<DiError>() {
            Ok(inner) => *inner,
            Err(other) => DiError::ActivationFailed {
                contract: contract.clone(),
                cause: Arc::from(other),
            },
        }
    }

    /// True for `LocateFailed`.
    pub fn is_locate_failed(&self) -> bool {
        matches!(self, DiError::LocateFailed { .. })
    }
}

/// A single disposal failure collected by a `DisposalScope`.
#[derive(Debug, Clone)]
pub struct DisposalFailure {
    /// Type name of the instance that failed
    pub instance: &'static str,
    /// Rendered failure (error message or panic payload)
    pub message: String,
}

impl fmt::Display for DisposalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.instance, self.message)
    }
}

fn display_key(key: &Option<ExportKey>) -> String {
    match key {
        Some(key) => format!(" (key {})", key),
        None => String::new(),
    }
}

fn display_path(path: &[Contract]) -> String {
    path.iter()
        .map(|c| c.display_name().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn display_failures(failures: &[DisposalFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for injection operations
///
/// ```rust
/// use ferrous_scope::{DiResult, DiError, Contract};
///
/// fn lookup() -> DiResult<u32> {
///     Err(DiError::LocateFailed { contract: Contract::of::<u32>(), key: None })
/// }
///
/// assert!(lookup().unwrap_err().is_locate_failed());
/// ```
pub type DiResult<T> = Result<T, DiError>;
