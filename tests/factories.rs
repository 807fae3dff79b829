use ferrous_scope::{Dependency, DiError, ExportStrategy, InjectionScope, Locator, Producer};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
struct Endpoint {
    host: String,
    port: u16,
}

fn endpoint_scope() -> InjectionScope {
    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|args| {
            Ok(Endpoint {
                host: args.get::<String>(0)?.to_string(),
                port: *args.get::<u16>(1)?,
            })
        })
        .depends_on(Dependency::on::<String>())
        .depends_on(Dependency::on::<u16>())
        .build(),
    );
    scope
}

#[test]
fn test_producer_passes_arguments() {
    let scope = endpoint_scope();
    let connect = scope.locate_producer::<(String, u16), Endpoint>().unwrap();

    let a = connect.invoke((String::from("db.local"), 5432)).unwrap();
    let b = connect.invoke((String::from("cache.local"), 6379)).unwrap();

    assert_eq!(*a, Endpoint { host: "db.local".into(), port: 5432 });
    assert_eq!(*b, Endpoint { host: "cache.local".into(), port: 6379 });
    assert_eq!(connect.arity(), 2);
}

#[test]
fn test_arguments_do_not_leak_into_the_scope() {
    let scope = endpoint_scope();
    let connect = scope.locate_producer::<(String, u16), Endpoint>().unwrap();
    connect.invoke((String::from("db.local"), 5432)).unwrap();

    assert!(scope.try_locate::<String>().unwrap().is_none());
    assert!(matches!(
        scope.locate::<Endpoint>(),
        Err(DiError::LocateFailed { .. })
    ));
}

#[test]
fn test_producer_arities_up_to_five() {
    #[derive(Debug, PartialEq)]
    struct Mix(u8, u16, u32, u64, bool);

    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|args| {
            Ok(Mix(
                *args.get::<u8>(0)?,
                *args.get::<u16>(1)?,
                *args.get::<u32>(2)?,
                *args.get::<u64>(3)?,
                *args.get::<bool>(4)?,
            ))
        })
        .depends_on(Dependency::on::<u8>())
        .depends_on(Dependency::on::<u16>())
        .depends_on(Dependency::on::<u32>())
        .depends_on(Dependency::on::<u64>())
        .depends_on(Dependency::on::<bool>())
        .build(),
    );
    scope.register(ExportStrategy::instance(0u32).build());
    scope.register(ExportStrategy::instance(0u64).build());
    scope.register(ExportStrategy::instance(false).build());

    let three = scope.locate_producer::<(u8, u16, u32), Mix>().unwrap();
    assert_eq!(*three.invoke((1, 2, 3)).unwrap(), Mix(1, 2, 3, 0, false));

    let four = scope.locate_producer::<(u8, u16, u32, u64), Mix>().unwrap();
    assert_eq!(*four.invoke((1, 2, 3, 4)).unwrap(), Mix(1, 2, 3, 4, false));

    let five = scope.locate_producer::<(u8, u16, u32, u64, bool), Mix>().unwrap();
    assert_eq!(*five.invoke((1, 2, 3, 4, true)).unwrap(), Mix(1, 2, 3, 4, true));
    assert_eq!(five.arity(), 5);
}

#[test]
fn test_repeated_argument_type_uses_the_last() {
    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|args| Ok(args.get::<u8>(0)?.to_string()))
            .depends_on(Dependency::on::<u8>())
            .build(),
    );

    let make = scope.locate_producer::<(u8, u8), String>().unwrap();
    assert_eq!(make.invoke((1, 2)).unwrap().as_str(), "2");
}

#[test]
fn test_producer_as_dependency() {
    struct Pool {
        connect: Arc<Producer<(String, u16), Endpoint>>,
    }

    let scope = endpoint_scope();
    scope.register(
        ExportStrategy::construct(|args| {
            Ok(Pool { connect: args.get::<Producer<(String, u16), Endpoint>>(0)? })
        })
        .depends_on(Dependency::producer::<(String, u16), Endpoint>())
        .singleton()
        .build(),
    );

    let pool = scope.locate::<Pool>().unwrap();
    let endpoint = pool.connect.invoke((String::from("replica"), 1)).unwrap();
    assert_eq!(endpoint.host, "replica");
}

#[test]
fn test_producer_resolves_in_the_scope_it_was_located_from() {
    struct Unit;

    let root = InjectionScope::new();
    root.register(ExportStrategy::construct(|_| Ok(Unit)).per_scope().build());

    let child = root.create_child_scope();
    let make = child.locate_producer::<(), Unit>().unwrap();

    let from_producer = make.get().unwrap();
    let from_child = child.locate::<Unit>().unwrap();
    let from_root = root.locate::<Unit>().unwrap();

    assert!(Arc::ptr_eq(&from_producer, &from_child));
    assert!(!Arc::ptr_eq(&from_producer, &from_root));
}

#[test]
fn test_producer_sees_child_registrations() {
    let root = InjectionScope::new();
    root.register(ExportStrategy::instance(String::from("root")).build());
    let child = root.create_child_scope();
    child.register(ExportStrategy::instance(String::from("child")).build());

    assert_eq!(child.locate_producer::<(), String>().unwrap().get().unwrap().as_str(), "child");
    assert_eq!(root.locate_producer::<(), String>().unwrap().get().unwrap().as_str(), "root");
}

#[test]
fn test_keyed_producer_dependency_forwards_the_key() {
    struct Client {
        url: Arc<Producer<(), String>>,
    }

    let scope = InjectionScope::new();
    scope.register(ExportStrategy::instance(String::from("default")).build());
    scope.register(ExportStrategy::instance(String::from("primary")).keyed("primary").build());
    scope.register(
        ExportStrategy::construct(|args| Ok(Client { url: args.get::<Producer<(), String>>(0)? }))
            .depends_on(Dependency::producer::<(), String>().keyed("primary"))
            .build(),
    );

    let client = scope.locate::<Client>().unwrap();
    assert_eq!(client.url.get().unwrap().as_str(), "primary");
    assert_eq!(client.url.produces(), &ferrous_scope::Contract::of::<String>());
}

#[test]
fn test_trait_producer() {
    trait Shape: Send + Sync {
        fn area(&self) -> u32;
    }
    struct Square(u32);
    impl Shape for Square {
        fn area(&self) -> u32 {
            self.0 * self.0
        }
    }

    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|args| Ok(Square(*args.get::<u32>(0)?)))
            .depends_on(Dependency::on::<u32>())
            .export_as::<dyn Shape, _>(|s| s as Arc<dyn Shape>)
            .build(),
    );

    let make = scope.locate_producer_trait::<(u32,), dyn Shape>().unwrap();
    assert_eq!(make.invoke((3,)).unwrap().area(), 9);
    assert_eq!(make.invoke((4,)).unwrap().area(), 16);
}

#[test]
fn test_producer_invoked_from_many_threads() {
    let scope = endpoint_scope();
    let connect = scope.locate_producer::<(String, u16), Endpoint>().unwrap();

    std::thread::scope(|s| {
        for port in 0..8u16 {
            let connect = connect.clone();
            s.spawn(move || {
                let endpoint = connect.invoke((format!("host-{}", port), port)).unwrap();
                assert_eq!(endpoint.port, port);
                assert_eq!(endpoint.host, format!("host-{}", port));
            });
        }
    });
}
