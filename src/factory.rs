//! Generic producers: factories of `T` taking up to five arguments.
//!
//! Asking for `Producer<Args, T>` never needs a registration. When no
//! strategy exports that contract, the scope tree synthesizes one (once per
//! contract) that hands out a producer bound to the requesting scope. Each
//! call to [`Producer::invoke`] is an independent resolution of `T` in
//! which the arguments are contextual exports: they satisfy unkeyed locates
//! of their types and shadow registrations for that one call only.
//!
//! ```
//! use ferrous_scope::{Dependency, ExportStrategy, InjectionScope, Locator};
//!
//! struct Greeting(String);
//!
//! let scope = InjectionScope::new();
//! scope.register(
//!     ExportStrategy::construct(|args| Ok(Greeting(format!("hello {}", args.get::<String>(0)?))))
//!         .depends_on(Dependency::on::<String>())
//!         .build(),
//! );
//!
//! let greet = scope.locate_producer::<(String,), Greeting>().unwrap();
//! assert_eq!(greet.invoke((String::from("ann"),)).unwrap().0, "hello ann");
//! assert_eq!(greet.invoke((String::from("bob"),)).unwrap().0, "hello bob");
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::disposal::DisposalScope;
use crate::error::{DiError, DiResult};
use crate::internal::ResolutionPath;
use crate::key::Contract;
use crate::provider::{ActivationContext, InjectionContext, TargetInfo, WeakScope};
use crate::registration::{AnyArc, Unerase};
use crate::request::LocateRequest;
use crate::strategy::ExportStrategy;

/// Argument tuples a [`Producer`] accepts: `()` up to five elements.
pub trait FactoryArgs: Send + 'static {
    const ARITY: usize;

    /// Push every element as a contextual export, in order. Two elements
    /// of the same type: the later one wins.
    fn export_into(self, context: &mut InjectionContext);
}

macro_rules! impl_factory_args {
    ($arity:expr; $($arg:ident),*) => {
        impl<$($arg: Send + Sync + 'static),*> FactoryArgs for ($($arg,)*) {
            const ARITY: usize = $arity;

            #[allow(non_snake_case, unused_variables)]
            fn export_into(self, context: &mut InjectionContext) {
                let ($($arg,)*) = self;
                $(context.export($arg);)*
            }
        }
    };
}

impl_factory_args!(0;);
impl_factory_args!(1; A);
impl_factory_args!(2; A, B);
impl_factory_args!(3; A, B, C);
impl_factory_args!(4; A, B, C, D);
impl_factory_args!(5; A, B, C, D, E);

/// Produces a fresh resolution of `T` per call.
///
/// Holds only weak links to the scope and disposal scope it was created
/// for; once the scope is gone, invoking fails with `ScopeDisposed`.
pub struct Producer<Args, T: ?Sized> {
    scope: WeakScope,
    disposal: Option<Weak<DisposalScope>>,
    target: Option<TargetInfo>,
    request: LocateRequest,
    cast: fn(AnyArc) -> DiResult<Arc<T>>,
    _marker: PhantomData<fn(Args) -> Arc<T>>,
}

impl<Args, T> Producer<Args, T>
where
    Args: FactoryArgs,
    T: ?Sized + Send + Sync + 'static,
{
    pub fn invoke(&self, args: Args) -> DiResult<Arc<T>> {
        let scope = self
            .scope
            .upgrade()
            .ok_or_else(|| DiError::ScopeDisposed(String::from("<dropped scope>")))?;

        let mut context = InjectionContext::new(&scope);
        // Called from inside an activator: stay on its path so recursion
        // through producers is still caught.
        context.path = ResolutionPath::inherited();
        context.set_disposal_scope(self.disposal.as_ref().and_then(Weak::upgrade));
        context.replace_target(self.target.clone());
        args.export_into(&mut context);

        match scope.locate_with_context(&self.request, &mut context)? {
            Some(instance) => (self.cast)(instance),
            None => Err(DiError::LocateFailed {
                contract: self.request.contract.clone(),
                key: self.request.key.clone(),
            }),
        }
    }

    /// Contract the producer resolves.
    pub fn produces(&self) -> &Contract {
        &self.request.contract
    }

    pub fn arity(&self) -> usize {
        Args::ARITY
    }

    /// Request for this producer type, carrying its synthesizer.
    pub(crate) fn request<M: Unerase<T>>() -> LocateRequest {
        LocateRequest::of::<Self>().with_secondary(producer_strategy::<Args, T, M>)
    }
}

impl<T: ?Sized + Send + Sync + 'static> Producer<(), T> {
    pub fn get(&self) -> DiResult<Arc<T>> {
        self.invoke(())
    }
}

impl<Args, T: ?Sized> fmt::Debug for Producer<Args, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("produces", &self.request.contract)
            .field("key", &self.request.key)
            .field("scope", &self.scope)
            .finish()
    }
}

/// The strategy synthesized for `Producer<Args, T>`: transient, externally
/// owned, below any user registration of the same contract.
fn producer_strategy<Args, T, M>() -> ExportStrategy
where
    Args: FactoryArgs,
    T: ?Sized + Send + Sync + 'static,
    M: Unerase<T>,
{
    ExportStrategy::factory(|cx: &ActivationContext<'_>| {
        let context = cx.context();
        let outer = cx.request();
        let request = LocateRequest {
            contract: Contract::of::<T>(),
            key: outer.key.clone(),
            filter: outer.filter.clone(),
            secondary: None,
        };
        Ok(Producer::<Args, T> {
            scope: context.requesting_scope().downgrade(),
            disposal: context.disposal_scope().map(Arc::downgrade),
            target: context.target().cloned(),
            request,
            cast: <M as Unerase<T>>::unerase,
            _marker: PhantomData,
        })
    })
    .priority(-1)
    .externally_owned()
    .build()
}
