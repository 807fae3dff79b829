//! Per-resolution state and the context handed to delegate factories.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::sync::Arc;

use crate::disposal::DisposalScope;
use crate::error::DiResult;
use crate::internal::ResolutionPath;
use crate::key::Contract;
use crate::registration::AnyArc;
use crate::request::LocateRequest;
use crate::strategy::ExportStrategy;
use crate::traits::LocatorCore;

use super::InjectionScope;

/// What kind of member a dependency is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Constructor,
    Property,
    /// A nested locate issued by a delegate factory
    Factory,
}

/// Who is asking: the member currently being filled.
#[derive(Debug, Clone)]
pub struct TargetInfo {
    activation_type: Contract,
    contract: Contract,
    name: Option<Arc<str>>,
    kind: TargetKind,
}

impl TargetInfo {
    pub fn new(activation_type: Contract, contract: Contract, kind: TargetKind) -> Self {
        Self {
            activation_type,
            contract,
            name: None,
            kind,
        }
    }

    pub fn with_name(mut self, name: Option<Arc<str>>) -> Self {
        self.name = name;
        self
    }

    /// Type of the instance being activated.
    pub fn activation_type(&self) -> &Contract {
        &self.activation_type
    }

    /// Contract of the member being filled.
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }
}

/// Mutable state threaded through one resolution call.
///
/// Created per top-level locate. Nested locates made while activating
/// dependencies share it, so contextual exports pushed here are visible to
/// every unkeyed locate below and the resolution path spans the whole call.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{Dependency, ExportStrategy, InjectionContext, InjectionScope, LocateRequest};
/// use std::sync::Arc;
///
/// struct Request(u32);
/// struct Handler(Arc<Request>);
///
/// let scope = InjectionScope::new();
/// scope.register(
///     ExportStrategy::construct(|args| Ok(Handler(args.get::<Request>(0)?)))
///         .depends_on(Dependency::on::<Request>())
///         .build(),
/// );
///
/// let mut context = InjectionContext::new(&scope);
/// context.export(Request(7));
///
/// let handler = scope
///     .locate_with_context(&LocateRequest::of::<Handler>(), &mut context)
///     .unwrap()
///     .unwrap()
///     .downcast::<Handler>()
///     .unwrap();
/// assert_eq!(handler.0 .0, 7);
/// ```
#[derive(Clone)]
pub struct InjectionContext {
    requesting_scope: InjectionScope,
    disposal_scope: Option<Arc<DisposalScope>>,
    target: Option<TargetInfo>,
    exports: Vec<(Contract, AnyArc)>,
    pub(crate) path: ResolutionPath,
}

impl InjectionContext {
    /// Context rooted at `scope`, disposing into that scope.
    pub fn new(scope: &InjectionScope) -> Self {
        Self {
            requesting_scope: scope.clone(),
            disposal_scope: Some(scope.disposal_scope().clone()),
            target: None,
            exports: Vec::new(),
            path: ResolutionPath::default(),
        }
    }

    pub fn requesting_scope(&self) -> &InjectionScope {
        &self.requesting_scope
    }

    /// Where created instances are tracked; `None` means untracked.
    pub fn disposal_scope(&self) -> Option<&Arc<DisposalScope>> {
        self.disposal_scope.as_ref()
    }

    pub fn target(&self) -> Option<&TargetInfo> {
        self.target.as_ref()
    }

    pub fn set_requesting_scope(&mut self, scope: InjectionScope) {
        self.requesting_scope = scope;
    }

    /// Borrow another disposal scope, or pass `None` to stop tracking.
    pub fn set_disposal_scope(&mut self, disposal: Option<Arc<DisposalScope>>) {
        self.disposal_scope = disposal;
    }

    /// Make `value` resolvable as `T` for unkeyed locates in this context.
    pub fn export<T: Send + Sync + 'static>(&mut self, value: T) {
        self.export_arc(Arc::new(value));
    }

    pub fn export_arc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.exports.push((Contract::of::<T>(), value as AnyArc));
    }

    /// Make a trait object resolvable as `dyn T`.
    pub fn export_trait<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.exports.push((Contract::of::<T>(), Arc::new(value) as AnyArc));
    }

    /// Push an already erased instance; it must be stored the way the
    /// contract expects (`Arc<T>` or `Arc<Arc<dyn T>>`).
    pub fn export_any(&mut self, contract: Contract, instance: AnyArc) {
        self.exports.push((contract, instance));
    }

    /// Shallow copy for a nested resolution that must not leak overrides
    /// back: same scopes and target, no contextual exports, empty path.
    pub fn clone_nested(&self) -> Self {
        Self {
            requesting_scope: self.requesting_scope.clone(),
            disposal_scope: self.disposal_scope.clone(),
            target: self.target.clone(),
            exports: Vec::new(),
            path: ResolutionPath::default(),
        }
    }

    /// Most recently pushed contextual export for `contract`.
    pub(crate) fn find_export(&self, contract: &Contract) -> Option<AnyArc> {
        self.exports
            .iter()
            .rev()
            .find(|(c, _)| c == contract)
            .map(|(_, instance)| instance.clone())
    }

    pub(crate) fn replace_requesting_scope(&mut self, scope: InjectionScope) -> InjectionScope {
        std::mem::replace(&mut self.requesting_scope, scope)
    }

    pub(crate) fn replace_disposal_scope(
        &mut self,
        disposal: Option<Arc<DisposalScope>>,
    ) -> Option<Arc<DisposalScope>> {
        std::mem::replace(&mut self.disposal_scope, disposal)
    }

    pub(crate) fn replace_target(&mut self, target: Option<TargetInfo>) -> Option<TargetInfo> {
        std::mem::replace(&mut self.target, target)
    }
}

impl fmt::Debug for InjectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionContext")
            .field("requesting_scope", &self.requesting_scope.name())
            .field("tracked", &self.disposal_scope.is_some())
            .field("target", &self.target)
            .field("exports", &self.exports.len())
            .field("depth", &self.path.depth())
            .finish()
    }
}

/// Handed to delegate factories; locates through the ongoing resolution.
///
/// Locates made here share the caller's resolution path, so a delegate
/// that asks for its own contract fails with `CircularDependency` instead
/// of recursing.
pub struct ActivationContext<'a> {
    strategy: &'a ExportStrategy,
    request: &'a LocateRequest,
    context: RefCell<&'a mut InjectionContext>,
}

impl<'a> ActivationContext<'a> {
    pub(crate) fn new(
        strategy: &'a ExportStrategy,
        request: &'a LocateRequest,
        context: &'a mut InjectionContext,
    ) -> Self {
        Self {
            strategy,
            request,
            context: RefCell::new(context),
        }
    }

    /// Strategy being activated.
    pub fn strategy(&self) -> &ExportStrategy {
        self.strategy
    }

    /// Request that selected the strategy.
    pub fn request(&self) -> &LocateRequest {
        self.request
    }

    pub fn context(&self) -> Ref<'_, InjectionContext> {
        Ref::map(self.context.borrow(), |context| &**context)
    }

    pub fn requesting_scope(&self) -> InjectionScope {
        self.context.borrow().requesting_scope().clone()
    }

    fn with_factory_target<R>(
        &self,
        request: &LocateRequest,
        locate: impl FnOnce(&InjectionScope, &mut InjectionContext) -> R,
    ) -> R {
        let mut guard = self.context.borrow_mut();
        let context: &mut InjectionContext = &mut **guard;
        let target = TargetInfo::new(
            self.strategy.activation_type().clone(),
            request.contract.clone(),
            TargetKind::Factory,
        );
        let previous = context.replace_target(Some(target));
        let scope = context.requesting_scope().clone();
        let result = locate(&scope, context);
        context.replace_target(previous);
        result
    }
}

impl LocatorCore for ActivationContext<'_> {
    fn locate_any(&self, request: &LocateRequest) -> DiResult<Option<AnyArc>> {
        self.with_factory_target(request, |scope, context| {
            scope.locate_with_context(request, context)
        })
    }

    fn locate_all_any(&self, request: &LocateRequest) -> DiResult<Vec<AnyArc>> {
        self.with_factory_target(request, |scope, context| {
            scope.locate_all_with_context(request, context)
        })
    }
}

impl fmt::Debug for ActivationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationContext")
            .field("strategy", &self.strategy.activation_type())
            .field("request", &self.request)
            .finish()
    }
}
