use ferrous_scope::{
    ContainerConfig, Contract, Dependency, DiError, ExportStrategy, InjectionScope, Locator,
    PropertyImport,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;

struct A;
struct B;
struct C;
struct D;

fn expect_cycle<T: std::fmt::Debug>(result: Result<T, DiError>) -> Vec<Contract> {
    match result {
        Err(DiError::CircularDependency(cycle)) => cycle,
        other => panic!("expected CircularDependency, got {:?}", other),
    }
}

#[test]
fn test_two_node_cycle_detected() {
    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|_| Ok(A))
            .depends_on(Dependency::on::<B>())
            .build(),
    );
    scope.register(
        ExportStrategy::construct(|_| Ok(B))
            .depends_on(Dependency::on::<A>())
            .build(),
    );

    let cycle = expect_cycle(scope.locate::<A>().map(|_| ()));
    assert_eq!(
        cycle,
        vec![Contract::of::<A>(), Contract::of::<B>(), Contract::of::<A>()]
    );
    // Still reported on the second attempt
    assert!(matches!(scope.locate::<A>(), Err(DiError::CircularDependency(_))));
    assert!(matches!(scope.locate::<B>(), Err(DiError::CircularDependency(_))));
}

#[test]
fn test_self_dependency_detected() {
    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|_| Ok(A))
            .depends_on(Dependency::on::<A>())
            .build(),
    );

    let cycle = expect_cycle(scope.locate::<A>().map(|_| ()));
    assert_eq!(cycle, vec![Contract::of::<A>(), Contract::of::<A>()]);
}

#[test]
fn test_cycle_through_trait_contract() {
    trait Handler: Send + Sync {}
    struct Pipeline;
    impl Handler for Pipeline {}

    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|_| Ok(Pipeline))
            .export_as::<dyn Handler, _>(|p| p as Arc<dyn Handler>)
            .depends_on(Dependency::on::<dyn Handler>())
            .build(),
    );

    let cycle = expect_cycle(scope.locate::<Pipeline>().map(|_| ()));
    assert_eq!(cycle.first(), Some(&Contract::of::<Pipeline>()));
}

#[test]
fn test_delegate_locating_itself_is_a_cycle() {
    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::factory(|cx| {
            cx.locate::<A>()?;
            Ok(A)
        })
        .build(),
    );

    let cycle = expect_cycle(scope.locate::<A>().map(|_| ()));
    assert_eq!(cycle, vec![Contract::of::<A>(), Contract::of::<A>()]);
}

#[test]
fn test_singleton_delegate_cycle_does_not_deadlock() {
    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::factory(|cx| {
            cx.locate::<B>()?;
            Ok(A)
        })
        .singleton()
        .build(),
    );
    scope.register(
        ExportStrategy::factory(|cx| {
            cx.locate::<A>()?;
            Ok(B)
        })
        .singleton()
        .build(),
    );

    let cycle = expect_cycle(scope.locate::<A>().map(|_| ()));
    assert_eq!(
        cycle,
        vec![Contract::of::<A>(), Contract::of::<B>(), Contract::of::<A>()]
    );
}

#[test]
fn test_after_construction_property_breaks_cycle() {
    struct Parent {
        child: OnceCell<Arc<Child>>,
    }
    struct Child {
        parent: Arc<Parent>,
    }

    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|_| Ok(Parent { child: OnceCell::new() }))
            .property(
                PropertyImport::new("child", |p: &Parent, c: Arc<Child>| {
                    let _ = p.child.set(c);
                })
                .after_construction(),
            )
            .singleton()
            .build(),
    );
    scope.register(
        ExportStrategy::construct(|args| Ok(Child { parent: args.get::<Parent>(0)? }))
            .depends_on(Dependency::on::<Parent>())
            .build(),
    );

    let parent = scope.locate::<Parent>().unwrap();
    let child = parent.child.get().unwrap();
    assert!(Arc::ptr_eq(&child.parent, &parent));
}

#[test]
fn test_eager_property_cycle_detected() {
    struct Parent {
        child: OnceCell<Arc<Child>>,
    }
    struct Child;

    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|_| Ok(Parent { child: OnceCell::new() }))
            .property(PropertyImport::new("child", |p: &Parent, c: Arc<Child>| {
                let _ = p.child.set(c);
            }))
            .build(),
    );
    scope.register(
        ExportStrategy::construct(|_| Ok(Child))
            .depends_on(Dependency::on::<Parent>())
            .build(),
    );

    assert!(matches!(scope.locate::<Parent>(), Err(DiError::CircularDependency(_))));
}

#[test]
fn test_producer_dependency_does_not_form_a_cycle() {
    struct Node {
        next: Arc<ferrous_scope::Producer<(), Node>>,
    }

    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|args| {
            Ok(Node { next: args.get::<ferrous_scope::Producer<(), Node>>(0)? })
        })
        .depends_on(Dependency::producer::<(), Node>())
        .build(),
    );

    let node = scope.locate::<Node>().unwrap();
    let next = node.next.get().unwrap();
    assert!(!Arc::ptr_eq(&node, &next));
}

#[test]
fn test_depth_limit_enforced() {
    let scope = InjectionScope::root(ContainerConfig::default().with_max_depth(3));
    scope.register(
        ExportStrategy::construct(|_| Ok(A))
            .depends_on(Dependency::on::<B>())
            .build(),
    );
    scope.register(
        ExportStrategy::construct(|_| Ok(B))
            .depends_on(Dependency::on::<C>())
            .build(),
    );
    scope.register(
        ExportStrategy::construct(|_| Ok(C))
            .depends_on(Dependency::on::<D>())
            .build(),
    );
    scope.register(ExportStrategy::construct(|_| Ok(D)).build());

    assert!(matches!(scope.locate::<A>(), Err(DiError::DepthExceeded(3))));
    // Shorter chains still fit
    assert!(scope.locate::<B>().is_ok());
}

#[test]
fn test_cycle_error_message_names_the_path() {
    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|_| Ok(A))
            .depends_on(Dependency::on::<B>())
            .build(),
    );
    scope.register(
        ExportStrategy::construct(|_| Ok(B))
            .depends_on(Dependency::on::<A>())
            .build(),
    );

    let message = scope.locate::<A>().map(|_| ()).unwrap_err().to_string();
    assert!(message.starts_with("Circular dependency:"));
    assert!(message.contains(" -> "));
}

#[test]
fn test_keyed_chain_of_one_contract_is_not_a_cycle() {
    struct Svc {
        layer: &'static str,
        inner: Option<Arc<Svc>>,
    }

    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|_| Ok(Svc { layer: "inner", inner: None }))
            .keyed("inner")
            .build(),
    );
    scope.register(
        ExportStrategy::construct(|args| {
            Ok(Svc {
                layer: "outer",
                inner: Some(args.get::<Svc>(0)?),
            })
        })
        .depends_on(Dependency::on::<Svc>().keyed("inner"))
        .keyed("outer")
        .build(),
    );

    let outer = scope.locate_keyed::<Svc>("outer").unwrap();
    assert_eq!(outer.layer, "outer");
    assert_eq!(outer.inner.as_ref().unwrap().layer, "inner");
}

#[test]
fn test_keyed_self_dependency_is_still_a_cycle() {
    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|_| Ok(A))
            .depends_on(Dependency::on::<A>().keyed("a"))
            .keyed("a")
            .build(),
    );

    match scope.locate_keyed::<A>("a") {
        Err(DiError::CircularDependency(cycle)) => {
            assert_eq!(cycle, vec![Contract::of::<A>(), Contract::of::<A>()]);
        }
        other => panic!("expected cycle, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_producer_invoked_by_its_own_activator_is_a_cycle() {
    struct Loop;

    for singleton in [false, true] {
        let scope = InjectionScope::new();
        let builder = ExportStrategy::factory(|cx| {
            cx.locate_producer::<(), Loop>()?.get()?;
            Ok(Loop)
        });
        let builder = if singleton { builder.singleton() } else { builder };
        scope.register(builder.build());

        match scope.locate::<Loop>() {
            Err(DiError::CircularDependency(cycle)) => {
                assert_eq!(cycle, vec![Contract::of::<Loop>(), Contract::of::<Loop>()]);
            }
            other => panic!("expected cycle, got {:?}", other.map(|_| ())),
        }
    }
}

#[test]
fn test_depth_limit_spans_producer_invocations() {
    let scope = InjectionScope::root(ContainerConfig::default().with_max_depth(3));
    scope.register(
        ExportStrategy::factory(|cx| {
            cx.locate_producer::<(), B>()?.get()?;
            Ok(A)
        })
        .build(),
    );
    scope.register(
        ExportStrategy::factory(|cx| {
            cx.locate_producer::<(), C>()?.get()?;
            Ok(B)
        })
        .build(),
    );
    scope.register(
        ExportStrategy::factory(|cx| {
            cx.locate_producer::<(), D>()?.get()?;
            Ok(C)
        })
        .build(),
    );
    scope.register(ExportStrategy::construct(|_| Ok(D)).build());

    assert!(matches!(scope.locate::<A>(), Err(DiError::DepthExceeded(_))));
    // Invoked from the outside, the same producer starts a fresh path
    let make_c = scope.locate_producer::<(), C>().unwrap();
    assert!(make_c.get().is_ok());
}
