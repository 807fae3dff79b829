//! Candidate selection, request plans and activation.

use std::sync::Arc;

use crate::config::ExecutionMode;
use crate::disposal::DisposalScope;
use crate::error::DiResult;
use crate::internal::ResolutionPath;
use crate::lifestyle::LifestyleContext;
use crate::plan::{Candidate, PlanKey, RequestPlan};
use crate::registration::{AnyArc, RegistryEntry};
use crate::request::LocateRequest;
use crate::strategy::{Dependency, ExportStrategy};

use super::{InjectionContext, InjectionScope};

/// An instance produced by this locate, with the scopes it was produced
/// under.
struct Fresh {
    instance: AnyArc,
    scope: InjectionScope,
    disposal: Option<Arc<DisposalScope>>,
}

impl InjectionScope {
    /// Locate through an explicit context.
    ///
    /// Returns `Ok(None)` when no candidate survives filtering and
    /// conditions. Contextual exports in `context` satisfy unkeyed
    /// requests before any registration is consulted.
    pub fn locate_with_context(
        &self,
        request: &LocateRequest,
        context: &mut InjectionContext,
    ) -> DiResult<Option<AnyArc>> {
        self.ensure_live()?;

        if request.key.is_none() {
            if let Some(instance) = context.find_export(&request.contract) {
                tracing::trace!(contract = %request.contract, "satisfied by contextual export");
                return Ok(Some(instance));
            }
        }

        let plan = self.request_plan(request)?;
        for candidate in &plan.candidates {
            if self.admits(candidate, context) {
                return self.activate(candidate, request, context).map(Some);
            }
        }

        tracing::trace!(contract = %request.contract, key = ?request.key, "no candidate matched");
        Ok(None)
    }

    /// Every admitted candidate, in selection order.
    ///
    /// Contextual exports are not included. A candidate whose required
    /// dependencies cannot be located is left out; any other failure
    /// aborts the whole call.
    pub fn locate_all_with_context(
        &self,
        request: &LocateRequest,
        context: &mut InjectionContext,
    ) -> DiResult<Vec<AnyArc>> {
        self.ensure_live()?;

        let plan = self.request_plan(request)?;
        let mut instances = Vec::with_capacity(plan.candidates.len());
        for candidate in &plan.candidates {
            if !self.admits(candidate, context) {
                continue;
            }
            match self.activate(candidate, request, context) {
                Ok(instance) => instances.push(instance),
                Err(error) if error.is_locate_failed() => {
                    tracing::trace!(
                        activation_type = %candidate.strategy.activation_type(),
                        error = %error,
                        "skipped candidate with unresolvable dependency"
                    );
                }
                Err(error) => return Err(error),
            }
        }
        Ok(instances)
    }

    pub(crate) fn request_plan(&self, request: &LocateRequest) -> DiResult<Arc<RequestPlan>> {
        let key = PlanKey::new(request);
        if let Some(plan) = self.plan_cache().get(&key, self.tree().generation()) {
            return Ok(plan);
        }
        self.derive_request_plan(request, &mut ResolutionPath::default())
    }

    /// Build (or reuse) the plan for `request`, walking the static
    /// dependency graph of its selectable candidate for cycles.
    fn derive_request_plan(
        &self,
        request: &LocateRequest,
        walk: &mut ResolutionPath,
    ) -> DiResult<Arc<RequestPlan>> {
        let key = PlanKey::new(request);
        // Read before the registries so a concurrent registration can only
        // make this entry stale, never wrongly fresh.
        let generation = self.tree().generation();
        if let Some(plan) = self.plan_cache().get(&key, generation) {
            return Ok(plan);
        }

        walk.enter(&request.contract, request.key.as_ref(), self.config().max_depth)?;
        let candidates = self.collect_candidates(request);
        let verified = self.verify_candidates(&candidates, walk);
        walk.leave(&request.contract);
        verified?;

        tracing::debug!(
            scope = %self.name(),
            contract = %request.contract,
            key = ?request.key,
            candidates = candidates.len(),
            "derived request plan"
        );
        let plan = RequestPlan::new(generation, candidates, request.filter.as_ref());
        Ok(self.plan_cache().publish(key, plan))
    }

    fn verify_candidates(&self, candidates: &[Candidate], walk: &mut ResolutionPath) -> DiResult<()> {
        // Conditional candidates are checked at runtime; the first
        // unconditional one is what an unconstrained locate selects.
        let Some(selectable) = candidates.iter().find(|c| !c.strategy.has_conditions()) else {
            return Ok(());
        };

        walk.bind(selectable.strategy.id())?;
        for dependency in eager_dependencies(&selectable.strategy) {
            self.derive_request_plan(&dependency.request, walk)?;
        }
        walk.unbind();
        Ok(())
    }

    fn collect_candidates(&self, request: &LocateRequest) -> Vec<Candidate> {
        let mode = self.config().environment;
        let mut candidates = Vec::new();

        let mut current = Some(self);
        let mut depth = 0;
        while let Some(scope) = current {
            let registry = scope.registry();
            for entry in registry.entries(&request.contract) {
                if eligible(entry, request, mode) {
                    candidates.push(Candidate {
                        strategy: entry.strategy.clone(),
                        export: entry.export,
                        depth,
                        sequence: entry.sequence,
                        plan: entry.strategy.activation_plan(),
                    });
                }
            }
            current = scope.parent();
            depth += 1;
        }

        if let Some(synthesize) = request.secondary {
            let strategy = self.tree().secondary_strategy(&request.contract, synthesize);
            candidates.push(Candidate {
                export: strategy.export_index(&request.contract).unwrap_or(0),
                depth: 0,
                sequence: 0,
                plan: strategy.activation_plan(),
                strategy,
            });
        }

        candidates.sort_by(|a, b| {
            b.strategy
                .priority()
                .cmp(&a.strategy.priority())
                .then(a.depth.cmp(&b.depth))
                .then(b.sequence.cmp(&a.sequence))
        });
        candidates
    }

    fn admits(&self, candidate: &Candidate, context: &InjectionContext) -> bool {
        let strategy = &candidate.strategy;
        if strategy.has_conditions() && !strategy.meets_conditions(context) {
            tracing::trace!(
                activation_type = %strategy.activation_type(),
                "condition rejected candidate"
            );
            return false;
        }
        true
    }

    fn activate(
        &self,
        candidate: &Candidate,
        request: &LocateRequest,
        context: &mut InjectionContext,
    ) -> DiResult<AnyArc> {
        let strategy = &candidate.strategy;
        let owning = self.ancestor(candidate.depth).unwrap_or(self);

        context
            .path
            .enter(&request.contract, request.key.as_ref(), self.config().max_depth)?;
        let outcome = match context.path.bind(strategy.id()) {
            Ok(()) => run_lifestyle(candidate, owning, request, context),
            Err(cycle) => Err(cycle),
        };
        context.path.leave(&request.contract);
        let (primary, fresh) = outcome?;

        if let Some(fresh) = fresh {
            if candidate.plan.has_deferred() {
                complete(candidate, fresh, context)?;
            }
        }

        strategy.project(candidate.export, primary)
    }
}

fn eligible(entry: &RegistryEntry, request: &LocateRequest, mode: ExecutionMode) -> bool {
    let strategy = &entry.strategy;
    if !strategy.environment().admits(mode) {
        tracing::trace!(
            activation_type = %strategy.activation_type(),
            environment = ?strategy.environment(),
            "environment excludes candidate"
        );
        return false;
    }
    if strategy.key() != request.key.as_ref() {
        tracing::trace!(
            activation_type = %strategy.activation_type(),
            key = ?strategy.key(),
            "key mismatch"
        );
        return false;
    }
    if let Some(filter) = &request.filter {
        if !filter.allows(strategy) {
            tracing::trace!(activation_type = %strategy.activation_type(), "filter rejected candidate");
            return false;
        }
    }
    true
}

/// Dependencies resolved while the instance is being built: constructor
/// arguments and before-construction properties, minus lazy ones.
fn eager_dependencies(strategy: &ExportStrategy) -> impl Iterator<Item = &Dependency> + '_ {
    strategy
        .dependencies
        .iter()
        .chain(
            strategy
                .properties
                .iter()
                .filter(|p| !p.after_construction)
                .map(|p| &p.dependency),
        )
        .filter(|d| !d.lazy)
}

fn run_lifestyle(
    candidate: &Candidate,
    owning: &InjectionScope,
    request: &LocateRequest,
    context: &mut InjectionContext,
) -> DiResult<(AnyArc, Option<Fresh>)> {
    let strategy = &*candidate.strategy;
    let plan = &candidate.plan;
    let mut fresh = None;

    let primary = {
        let mut activation = |context: &mut InjectionContext| -> DiResult<AnyArc> {
            let instance = plan.execute(strategy, request, context)?;
            track_disposal(strategy, &instance, context);
            tracing::debug!(
                activation_type = %strategy.activation_type(),
                lifestyle = strategy.lifestyle_name(),
                scope = %context.requesting_scope().name(),
                "activated instance"
            );
            fresh = Some(Fresh {
                instance: instance.clone(),
                scope: context.requesting_scope().clone(),
                disposal: context.disposal_scope().cloned(),
            });
            Ok(instance)
        };
        let mut cx = LifestyleContext {
            strategy,
            owning_scope: owning,
            context: &mut *context,
            activation: &mut activation,
        };
        strategy.lifestyle.locate(&mut cx)
    };

    primary.map(|instance| (instance, fresh))
}

fn track_disposal(strategy: &ExportStrategy, instance: &AnyArc, context: &InjectionContext) {
    let Some(disposal) = context.disposal_scope() else {
        return;
    };
    if let Some(handle) = strategy.disposal_handle(instance) {
        disposal.add_dyn(strategy.activation_type().static_name(), handle);
    }
}

/// Apply after-construction properties under the scopes the instance was
/// created with.
fn complete(candidate: &Candidate, fresh: Fresh, context: &mut InjectionContext) -> DiResult<()> {
    let previous_scope = context.replace_requesting_scope(fresh.scope);
    let previous_disposal = context.replace_disposal_scope(fresh.disposal);
    let result = candidate
        .plan
        .execute_deferred(&candidate.strategy, &fresh.instance, context);
    context.replace_requesting_scope(previous_scope);
    context.replace_disposal_scope(previous_disposal);
    result
}
