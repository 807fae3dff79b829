//! Activation plans and the per-scope request plan cache.
//!
//! An [`ActivationPlan`] is a small tagged-variant program derived once per
//! strategy: fetch each dependency into a slot, run the activator, then
//! inject properties. A [`RequestPlan`] is the ordered list of candidate
//! strategies for one (contract, key, filter) request, cached per scope in
//! the [`ActivationPlanCache`].

use std::sync::Arc;

use dashmap::DashMap;
use smallvec::{smallvec, SmallVec};

use crate::error::{BoxError, DiError, DiResult};
use crate::key::{Contract, ExportKey};
use crate::provider::{ActivationContext, InjectionContext, TargetInfo, TargetKind};
use crate::registration::{AnyArc, HashState};
use crate::request::{ExportFilter, LocateRequest, WeakFilter};
use crate::strategy::{ActivationArgs, Activator, Dependency, ExportStrategy};

/// Where a fetched dependency is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    Constructor(usize),
    Property(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlanStep {
    /// Resolve a dependency into `slot`
    Fetch { source: Source, slot: usize },
    /// Call the constructor with slots `0..arity`
    Construct { arity: usize },
    /// Call the delegate factory
    Invoke,
    /// Hand out the pre-built instance
    Provide,
    /// Pass the value in `slot` to a property setter
    Inject { property: usize, slot: usize },
}

/// Compiled activation of one strategy.
#[derive(Debug, Clone)]
pub struct ActivationPlan {
    pub(crate) steps: Vec<PlanStep>,
    /// After-construction property steps
    pub(crate) deferred: Vec<PlanStep>,
    pub(crate) slots: usize,
}

type Slots = SmallVec<[Option<AnyArc>; 8]>;

impl ActivationPlan {
    pub(crate) fn derive(strategy: &ExportStrategy) -> Self {
        let mut steps = Vec::new();
        let mut deferred = Vec::new();
        let mut slot = 0;

        match &strategy.activator {
            Activator::Construct(_) => {
                for index in 0..strategy.dependencies.len() {
                    steps.push(PlanStep::Fetch {
                        source: Source::Constructor(index),
                        slot,
                    });
                    slot += 1;
                }
                steps.push(PlanStep::Construct { arity: slot });
            }
            Activator::Delegate(_) => steps.push(PlanStep::Invoke),
            Activator::Instance(_) => steps.push(PlanStep::Provide),
        }

        for (index, property) in strategy.properties.iter().enumerate() {
            let target = if property.after_construction {
                &mut deferred
            } else {
                &mut steps
            };
            target.push(PlanStep::Fetch {
                source: Source::Property(index),
                slot,
            });
            target.push(PlanStep::Inject {
                property: index,
                slot,
            });
            slot += 1;
        }

        tracing::debug!(
            activation_type = %strategy.activation_type(),
            steps = steps.len(),
            deferred = deferred.len(),
            "derived activation plan"
        );

        Self {
            steps,
            deferred,
            slots: slot,
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps.len() + self.deferred.len()
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Run the immediate steps and return the primary instance.
    pub(crate) fn execute(
        &self,
        strategy: &ExportStrategy,
        request: &LocateRequest,
        context: &mut InjectionContext,
    ) -> DiResult<AnyArc> {
        let mut slots: Slots = smallvec![None; self.slots];
        let mut instance: Option<AnyArc> = None;

        for step in &self.steps {
            match step {
                PlanStep::Fetch { source, slot } => {
                    slots[*slot] = fetch(strategy, *source, context)?;
                }
                PlanStep::Construct { arity } => {
                    let Activator::Construct(constructor) = &strategy.activator else {
                        return Err(malformed(strategy));
                    };
                    let args = ActivationArgs {
                        slots: &slots[..*arity],
                        dependencies: &strategy.dependencies,
                    };
                    let _activating = context.path.activating();
                    instance = Some(
                        constructor(&args)
                            .map_err(|e| DiError::activation(strategy.activation_type(), e))?,
                    );
                }
                PlanStep::Invoke => {
                    let Activator::Delegate(delegate) = &strategy.activator else {
                        return Err(malformed(strategy));
                    };
                    let _activating = context.path.activating();
                    let cx = ActivationContext::new(strategy, request, context);
                    instance = Some(
                        delegate(&cx)
                            .map_err(|e| DiError::activation(strategy.activation_type(), e))?,
                    );
                }
                PlanStep::Provide => {
                    let Activator::Instance(value) = &strategy.activator else {
                        return Err(malformed(strategy));
                    };
                    instance = Some(value.clone());
                }
                PlanStep::Inject { property, slot } => {
                    let target = instance.as_ref().ok_or_else(|| malformed(strategy))?;
                    inject(strategy, *property, target, slots[*slot].take())?;
                }
            }
        }

        instance.ok_or_else(|| malformed(strategy))
    }

    /// Run the after-construction steps against a published instance.
    pub(crate) fn execute_deferred(
        &self,
        strategy: &ExportStrategy,
        instance: &AnyArc,
        context: &mut InjectionContext,
    ) -> DiResult<()> {
        let mut slots: Slots = smallvec![None; self.slots];
        for step in &self.deferred {
            match step {
                PlanStep::Fetch { source, slot } => {
                    slots[*slot] = fetch(strategy, *source, context)?;
                }
                PlanStep::Inject { property, slot } => {
                    inject(strategy, *property, instance, slots[*slot].take())?;
                }
                _ => return Err(malformed(strategy)),
            }
        }
        Ok(())
    }
}

fn fetch(
    strategy: &ExportStrategy,
    source: Source,
    context: &mut InjectionContext,
) -> DiResult<Option<AnyArc>> {
    let (dependency, kind, name): (&Dependency, TargetKind, _) = match source {
        Source::Constructor(index) => {
            let dependency = &strategy.dependencies[index];
            (dependency, TargetKind::Constructor, dependency.name.clone())
        }
        Source::Property(index) => {
            let property = &strategy.properties[index];
            (
                &property.dependency,
                TargetKind::Property,
                Some(property.name.clone()),
            )
        }
    };

    let target = TargetInfo::new(
        strategy.activation_type().clone(),
        dependency.contract().clone(),
        kind,
    )
    .with_name(name);

    let previous = context.replace_target(Some(target));
    let scope = context.requesting_scope().clone();
    let resolved = scope.locate_with_context(&dependency.request, context);
    context.replace_target(previous);

    match resolved? {
        Some(value) => Ok(Some(value)),
        None if dependency.required => Err(dependency.missing()),
        None => Ok(None),
    }
}

fn inject(
    strategy: &ExportStrategy,
    property: usize,
    target: &AnyArc,
    value: Option<AnyArc>,
) -> DiResult<()> {
    match value {
        Some(value) => (strategy.properties[property].setter)(target, value),
        None => Ok(()),
    }
}

fn malformed(strategy: &ExportStrategy) -> DiError {
    let cause: BoxError = "activation plan does not match its activator".into();
    DiError::activation(strategy.activation_type(), cause)
}

/// One selectable strategy for a request, pre-filtered by environment,
/// key and filter.
#[derive(Clone)]
pub(crate) struct Candidate {
    pub(crate) strategy: Arc<ExportStrategy>,
    /// Export index of the requested contract within the strategy
    pub(crate) export: usize,
    /// Distance from the requesting scope to the owning scope
    pub(crate) depth: usize,
    pub(crate) sequence: u64,
    pub(crate) plan: Arc<ActivationPlan>,
}

/// Ordered candidates for one request shape.
pub(crate) struct RequestPlan {
    pub(crate) generation: u64,
    pub(crate) candidates: Vec<Candidate>,
    filter: Option<WeakFilter>,
}

impl RequestPlan {
    pub(crate) fn new(generation: u64, candidates: Vec<Candidate>, filter: Option<&ExportFilter>) -> Self {
        Self {
            generation,
            candidates,
            filter: filter.map(ExportFilter::downgrade),
        }
    }

    /// False when the filter this plan was derived for has been dropped;
    /// no request can reach the entry any more.
    fn is_reachable(&self) -> bool {
        self.filter.as_ref().map_or(true, WeakFilter::is_live)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PlanKey {
    contract: Contract,
    key: Option<ExportKey>,
    filter: usize,
}

impl PlanKey {
    pub(crate) fn new(request: &LocateRequest) -> Self {
        Self {
            contract: request.contract.clone(),
            key: request.key.clone(),
            filter: request.filter.as_ref().map_or(0, ExportFilter::identity),
        }
    }
}

/// Request plans memoized per scope.
///
/// Entries are immutable; a registration anywhere in the tree bumps the
/// generation and stale entries are re-derived on next use. Racing
/// derivations of the same key are harmless, the last one published wins.
#[derive(Default)]
pub struct ActivationPlanCache {
    entries: DashMap<PlanKey, Arc<RequestPlan>, HashState>,
}

impl ActivationPlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: &PlanKey, generation: u64) -> Option<Arc<RequestPlan>> {
        self.entries
            .get(key)
            .filter(|entry| entry.generation == generation)
            .map(|entry| entry.value().clone())
    }

    pub(crate) fn publish(&self, key: PlanKey, plan: RequestPlan) -> Arc<RequestPlan> {
        if plan.filter.is_some() {
            self.entries.retain(|_, entry| entry.is_reachable());
        }
        let plan = Arc::new(plan);
        self.entries.insert(key, plan.clone());
        plan
    }

    /// Number of cached request plans, stale ones included. Plans for
    /// dropped filters are evicted whenever a filtered plan is published.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for ActivationPlanCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationPlanCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::PropertyImport;

    struct Engine;
    struct Car;

    #[test]
    fn constructor_plan_fetches_then_constructs() {
        let strategy = ExportStrategy::construct(|_| Ok(Car))
            .depends_on(Dependency::on::<Engine>())
            .depends_on(Dependency::on::<u32>().optional())
            .build();

        let plan = ActivationPlan::derive(&strategy);
        assert_eq!(
            plan.steps,
            vec![
                PlanStep::Fetch { source: Source::Constructor(0), slot: 0 },
                PlanStep::Fetch { source: Source::Constructor(1), slot: 1 },
                PlanStep::Construct { arity: 2 },
            ]
        );
        assert!(!plan.has_deferred());
    }

    #[test]
    fn after_construction_properties_are_deferred() {
        let strategy = ExportStrategy::construct(|_| Ok(Car))
            .property(PropertyImport::new("engine", |_: &Car, _: Arc<Engine>| {}))
            .property(PropertyImport::new("owner", |_: &Car, _: Arc<String>| {}).after_construction())
            .build();

        let plan = ActivationPlan::derive(&strategy);
        assert_eq!(
            plan.steps,
            vec![
                PlanStep::Construct { arity: 0 },
                PlanStep::Fetch { source: Source::Property(0), slot: 0 },
                PlanStep::Inject { property: 0, slot: 0 },
            ]
        );
        assert_eq!(
            plan.deferred,
            vec![
                PlanStep::Fetch { source: Source::Property(1), slot: 1 },
                PlanStep::Inject { property: 1, slot: 1 },
            ]
        );
        assert_eq!(plan.slots, 2);
    }

    #[test]
    fn instance_plan_only_provides() {
        let strategy = ExportStrategy::instance(Engine).build();
        let plan = ActivationPlan::derive(&strategy);
        assert_eq!(plan.steps, vec![PlanStep::Provide]);
        assert_eq!(plan.step_count(), 1);
    }

    #[test]
    fn plan_keys_distinguish_filters_by_identity() {
        let filter = ExportFilter::metadata("tier", "gold");
        let plain = PlanKey::new(&LocateRequest::of::<Car>());
        let filtered = PlanKey::new(&LocateRequest::of::<Car>().filtered(filter.clone()));
        let same = PlanKey::new(&LocateRequest::of::<Car>().filtered(filter));
        let other = PlanKey::new(
            &LocateRequest::of::<Car>().filtered(ExportFilter::metadata("tier", "gold")),
        );

        assert_ne!(plain, filtered);
        assert_eq!(filtered, same);
        assert_ne!(filtered, other);
    }

    #[test]
    fn plans_for_dropped_filters_are_evicted() {
        let cache = ActivationPlanCache::new();
        let kept = ExportFilter::metadata("tier", "gold");
        let kept_key = PlanKey::new(&LocateRequest::of::<Car>().filtered(kept.clone()));
        cache.publish(kept_key.clone(), RequestPlan::new(1, Vec::new(), Some(&kept)));
        cache.publish(PlanKey::new(&LocateRequest::of::<Car>()), RequestPlan::new(1, Vec::new(), None));

        for _ in 0..10 {
            let transient = ExportFilter::metadata("tier", "silver");
            let key = PlanKey::new(&LocateRequest::of::<Car>().filtered(transient.clone()));
            cache.publish(key, RequestPlan::new(1, Vec::new(), Some(&transient)));
        }

        // The last transient plan waits for the next filtered publish
        assert_eq!(cache.len(), 3);
        assert!(cache.get(&kept_key, 1).is_some());
    }

    #[test]
    fn stale_generations_miss() {
        let cache = ActivationPlanCache::new();
        let key = PlanKey::new(&LocateRequest::of::<Car>());
        cache.publish(key.clone(), RequestPlan::new(3, Vec::new(), None));

        assert!(cache.get(&key, 3).is_some());
        assert!(cache.get(&key, 4).is_none());
        assert_eq!(cache.len(), 1);
    }
}
