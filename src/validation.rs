//! Eager validation of the registrations visible from a scope.
//!
//! Locating is lazy: a missing dependency or a cycle only surfaces when
//! something asks for it. [`InjectionScope::validate`] walks every visible
//! strategy up front and reports what a locate would later trip over.
//!
//! # Rules
//!
//! - **Missing dependency**: error. A required, non-lazy dependency with no
//!   eligible candidate. Dependencies marked `contextual` are expected to
//!   arrive through the `InjectionContext` and are skipped.
//! - **Circular dependency**: error. Found by the same static walk a locate
//!   performs; each cycle is reported once.
//! - **Singleton captures per-scope**: warning. A singleton activates its
//!   dependencies in its owning scope, so it pins that scope's per-scope
//!   instance for its whole lifetime.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{Contract, ExportKey};
use crate::provider::InjectionScope;
use crate::strategy::{Dependency, ExportStrategy};

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    MissingDependency {
        strategy: Contract,
        dependency: Contract,
        key: Option<ExportKey>,
    },
    CircularDependency {
        cycle: Vec<Contract>,
    },
    SingletonCapturesPerScope {
        singleton: Contract,
        per_scope: Contract,
    },
}

impl ValidationIssue {
    pub fn is_error(&self) -> bool {
        !matches!(self, ValidationIssue::SingletonCapturesPerScope { .. })
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingDependency {
                strategy,
                dependency,
                key: Some(key),
            } => write!(f, "{} requires {} [{}], which is not exported", strategy, dependency, key),
            ValidationIssue::MissingDependency {
                strategy,
                dependency,
                key: None,
            } => write!(f, "{} requires {}, which is not exported", strategy, dependency),
            ValidationIssue::CircularDependency { cycle } => {
                let names: Vec<String> = cycle.iter().map(|c| c.to_string()).collect();
                write!(f, "circular dependency: {}", names.join(" -> "))
            }
            ValidationIssue::SingletonCapturesPerScope {
                singleton,
                per_scope,
            } => write!(f, "singleton {} captures per-scope {}", singleton, per_scope),
        }
    }
}

/// Everything [`InjectionScope::validate`] found.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
    strategies: usize,
}

impl ValidationReport {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.issues.iter().filter(|i| !i.is_error())
    }

    /// True when no errors were found; warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Number of strategies inspected.
    pub fn strategies_checked(&self) -> usize {
        self.strategies
    }

    /// `Err(DiError::Validation)` carrying the errors, if any.
    pub fn into_result(self) -> DiResult<()> {
        let errors: Vec<ValidationIssue> = self.issues.into_iter().filter(|i| i.is_error()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DiError::Validation(errors))
        }
    }
}

impl InjectionScope {
    /// Check every strategy visible from this scope.
    ///
    /// ```
    /// use ferrous_scope::{Dependency, ExportStrategy, InjectionScope};
    ///
    /// struct Service;
    ///
    /// let scope = InjectionScope::new();
    /// scope.register(
    ///     ExportStrategy::construct(|_| Ok(Service))
    ///         .depends_on(Dependency::on::<String>())
    ///         .build(),
    /// );
    ///
    /// let report = scope.validate();
    /// assert!(!report.is_ok());
    /// assert!(report.into_result().is_err());
    /// ```
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        let mut seen_cycles = HashSet::new();

        for strategy in self.visible_strategies() {
            report.strategies += 1;
            for dependency in strategy
                .dependencies()
                .iter()
                .chain(strategy.properties().iter().map(|p| p.dependency()))
            {
                if dependency.is_lazy() || dependency.is_contextual() {
                    continue;
                }
                self.check_dependency(&strategy, dependency, &mut report, &mut seen_cycles);
            }
        }

        tracing::debug!(
            scope = %self.name(),
            strategies = report.strategies,
            issues = report.issues.len(),
            "validated scope"
        );
        report
    }

    fn check_dependency(
        &self,
        strategy: &ExportStrategy,
        dependency: &Dependency,
        report: &mut ValidationReport,
        seen_cycles: &mut HashSet<Vec<String>>,
    ) {
        match self.request_plan(&dependency.request) {
            Ok(plan) => match plan.candidates.first() {
                None if dependency.is_required() => {
                    report.issues.push(ValidationIssue::MissingDependency {
                        strategy: strategy.activation_type().clone(),
                        dependency: dependency.contract().clone(),
                        key: dependency.key().cloned(),
                    });
                }
                Some(selected)
                    if strategy.lifestyle_name() == "Singleton"
                        && selected.strategy.lifestyle_name() == "PerScope" =>
                {
                    report.issues.push(ValidationIssue::SingletonCapturesPerScope {
                        singleton: strategy.activation_type().clone(),
                        per_scope: selected.strategy.activation_type().clone(),
                    });
                }
                _ => {}
            },
            Err(DiError::CircularDependency(cycle)) => {
                let mut signature: Vec<String> = cycle.iter().map(|c| c.to_string()).collect();
                signature.sort();
                signature.dedup();
                if seen_cycles.insert(signature) {
                    report.issues.push(ValidationIssue::CircularDependency { cycle });
                }
            }
            Err(other) => {
                tracing::debug!(
                    activation_type = %strategy.activation_type(),
                    error = %other,
                    "dependency could not be planned"
                );
            }
        }
    }

    /// Every strategy registered here or in an ancestor, nearest scope
    /// first.
    fn visible_strategies(&self) -> Vec<Arc<ExportStrategy>> {
        let mut strategies = Vec::new();
        let mut current = Some(self);
        while let Some(scope) = current {
            strategies.extend(scope.registry().strategies().iter().cloned());
            current = scope.parent();
        }
        strategies
    }
}
