use ferrous_scope::{
    ContainerConfig, Dependency, ExecutionMode, ExportEnvironment, ExportStrategy, InjectionScope,
    Locator, TargetKind,
};
use std::sync::Arc;

trait Logger: Send + Sync {
    fn target(&self) -> &'static str;
}

struct FileLogger;
struct AuditLogger;

impl Logger for FileLogger {
    fn target(&self) -> &'static str {
        "file"
    }
}
impl Logger for AuditLogger {
    fn target(&self) -> &'static str {
        "audit"
    }
}

struct Billing {
    logger: Arc<dyn Logger>,
}
struct Catalog {
    logger: Arc<dyn Logger>,
}

fn logger_scope() -> InjectionScope {
    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::construct(|_| Ok(FileLogger))
            .export_as::<dyn Logger, _>(|l| l as Arc<dyn Logger>)
            .build(),
    );
    scope.register(
        ExportStrategy::construct(|_| Ok(AuditLogger))
            .export_as::<dyn Logger, _>(|l| l as Arc<dyn Logger>)
            .when_injected_into::<Billing>()
            .build(),
    );
    scope.register(
        ExportStrategy::construct(|args| Ok(Billing { logger: args.get_trait::<dyn Logger>(0)? }))
            .depends_on(Dependency::on::<dyn Logger>())
            .build(),
    );
    scope.register(
        ExportStrategy::construct(|args| Ok(Catalog { logger: args.get_trait::<dyn Logger>(0)? }))
            .depends_on(Dependency::on::<dyn Logger>())
            .build(),
    );
    scope
}

#[test]
fn test_when_injected_into_selects_by_consumer() {
    let scope = logger_scope();

    assert_eq!(scope.locate::<Billing>().unwrap().logger.target(), "audit");
    assert_eq!(scope.locate::<Catalog>().unwrap().logger.target(), "file");
    // A direct locate has no injection target
    assert_eq!(scope.locate_trait::<dyn Logger>().unwrap().target(), "file");
}

#[test]
fn test_conditional_candidates_skipped_by_locate_all_when_rejected() {
    let scope = logger_scope();
    let all = scope.locate_all_trait::<dyn Logger>().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].target(), "file");
}

#[test]
fn test_condition_on_requesting_scope() {
    let root = InjectionScope::new();
    root.register(ExportStrategy::instance(String::from("guest")).build());
    root.register(
        ExportStrategy::instance(String::from("admin"))
            .when(|context, _| context.requesting_scope().name() == "admin")
            .build(),
    );

    let admin = root.create_child_scope_named("admin");
    let guest = root.create_child_scope_named("guest");

    assert_eq!(admin.locate::<String>().unwrap().as_str(), "admin");
    assert_eq!(guest.locate::<String>().unwrap().as_str(), "guest");
    assert_eq!(root.locate::<String>().unwrap().as_str(), "guest");
}

#[test]
fn test_condition_on_target_name() {
    struct Page {
        title: Arc<String>,
        footer: Arc<String>,
    }

    let scope = InjectionScope::new();
    scope.register(ExportStrategy::instance(String::from("(c) 2024")).build());
    scope.register(
        ExportStrategy::instance(String::from("Welcome"))
            .when(|context, _| {
                context
                    .target()
                    .is_some_and(|t| t.kind() == TargetKind::Constructor && t.name() == Some("title"))
            })
            .build(),
    );
    scope.register(
        ExportStrategy::construct(|args| {
            Ok(Page {
                title: args.get::<String>(0)?,
                footer: args.get::<String>(1)?,
            })
        })
        .depends_on(Dependency::on::<String>().named("title"))
        .depends_on(Dependency::on::<String>().named("footer"))
        .build(),
    );

    let page = scope.locate::<Page>().unwrap();
    assert_eq!(page.title.as_str(), "Welcome");
    assert_eq!(page.footer.as_str(), "(c) 2024");
}

#[test]
fn test_all_conditions_must_hold() {
    let scope = InjectionScope::new();
    scope.register(ExportStrategy::instance(0u8).build());
    scope.register(
        ExportStrategy::instance(1u8)
            .when(|_, _| true)
            .when(|_, _| false)
            .build(),
    );

    assert_eq!(*scope.locate::<u8>().unwrap(), 0);
}

#[test]
fn test_condition_sees_the_strategy() {
    let scope = InjectionScope::new();
    scope.register(
        ExportStrategy::instance(7u8)
            .metadata("enabled", true)
            .when(|_, strategy| strategy.metadata().matches("enabled", true))
            .build(),
    );
    scope.register(
        ExportStrategy::instance(9u8)
            .metadata("enabled", false)
            .when(|_, strategy| strategy.metadata().matches("enabled", true))
            .build(),
    );

    assert_eq!(*scope.locate::<u8>().unwrap(), 7);
}

#[test]
fn test_environment_restricts_strategies() {
    struct Clock(&'static str);

    let register = |scope: &InjectionScope| {
        scope.register(
            ExportStrategy::construct(|_| Ok(Clock("system")))
                .environment(ExportEnvironment::RunTime)
                .build(),
        );
        scope.register(
            ExportStrategy::construct(|_| Ok(Clock("fake")))
                .environment(ExportEnvironment::UnitTest)
                .build(),
        );
        scope.register(
            ExportStrategy::construct(|_| Ok(Clock("preview")))
                .environment(ExportEnvironment::DesignTime)
                .build(),
        );
    };

    let runtime = InjectionScope::new();
    register(&runtime);
    assert_eq!(runtime.locate::<Clock>().unwrap().0, "system");
    assert_eq!(runtime.locate_all::<Clock>().unwrap().len(), 1);

    let testing = InjectionScope::root(ContainerConfig::default().with_environment(ExecutionMode::UnitTest));
    register(&testing);
    assert_eq!(testing.locate::<Clock>().unwrap().0, "fake");

    let design =
        InjectionScope::root(ContainerConfig::default().with_environment(ExecutionMode::DesignTime));
    register(&design);
    assert_eq!(design.locate::<Clock>().unwrap().0, "preview");
}

#[test]
fn test_any_environment_is_always_eligible() {
    let scope =
        InjectionScope::root(ContainerConfig::default().with_environment(ExecutionMode::DesignTime));
    scope.register(ExportStrategy::instance(1u16).build());
    scope.register(ExportStrategy::instance(2u16).environment(ExportEnvironment::RunTime).build());

    assert_eq!(*scope.locate::<u16>().unwrap(), 1);
}
