use ferrous_scope::{ContainerConfig, ExecutionMode, InjectionScope};
use serial_test::serial;
use std::env;

const VARS: [&str; 3] = [
    "FERROUS_SCOPE_ENVIRONMENT",
    "FERROUS_SCOPE_MAX_DEPTH",
    "FERROUS_SCOPE_DISPOSE_ON_DROP",
];

fn clear_vars() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_vars();
    assert_eq!(ContainerConfig::from_env(), ContainerConfig::default());
}

#[test]
#[serial]
fn test_from_env_reads_every_variable() {
    clear_vars();
    env::set_var("FERROUS_SCOPE_ENVIRONMENT", "unit-test");
    env::set_var("FERROUS_SCOPE_MAX_DEPTH", "32");
    env::set_var("FERROUS_SCOPE_DISPOSE_ON_DROP", "off");

    let config = ContainerConfig::from_env();
    clear_vars();

    assert_eq!(config.environment, ExecutionMode::UnitTest);
    assert_eq!(config.max_depth, 32);
    assert!(!config.dispose_on_drop);
}

#[test]
#[serial]
fn test_from_env_ignores_bad_values() {
    clear_vars();
    env::set_var("FERROUS_SCOPE_ENVIRONMENT", "staging");
    env::set_var("FERROUS_SCOPE_MAX_DEPTH", "deep");
    env::set_var("FERROUS_SCOPE_DISPOSE_ON_DROP", "maybe");

    let config = ContainerConfig::from_env();
    clear_vars();

    assert_eq!(config, ContainerConfig::default());
}

#[test]
fn test_config_is_shared_by_the_tree() {
    let root = InjectionScope::root(
        ContainerConfig::default()
            .with_environment(ExecutionMode::DesignTime)
            .with_max_depth(16),
    );
    let child = root.create_child_scope().create_child_scope();

    assert_eq!(child.config().environment, ExecutionMode::DesignTime);
    assert_eq!(child.config().max_depth, 16);
}

#[cfg(feature = "config")]
#[test]
fn test_config_deserializes_with_defaults() {
    let config: ContainerConfig =
        serde_json::from_str(r#"{ "environment": "unit_test", "max_depth": 12 }"#).unwrap();

    assert_eq!(config.environment, ExecutionMode::UnitTest);
    assert_eq!(config.max_depth, 12);
    assert!(config.dispose_on_drop);

    let round = serde_json::to_value(&config).unwrap();
    assert_eq!(round["environment"], "unit_test");
}

#[cfg(feature = "config")]
#[test]
fn test_lifestyle_kind_deserializes() {
    use ferrous_scope::LifestyleKind;

    let kinds: Vec<LifestyleKind> =
        serde_json::from_str(r#"["singleton", "per_scope", "weak_singleton", "transient"]"#).unwrap();
    assert_eq!(
        kinds,
        vec![
            LifestyleKind::Singleton,
            LifestyleKind::PerScope,
            LifestyleKind::WeakSingleton,
            LifestyleKind::Transient,
        ]
    );
}
