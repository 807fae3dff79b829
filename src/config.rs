//! Container configuration.
//!
//! A `ContainerConfig` is fixed when the root scope is created and shared by
//! every scope in the tree. It can be built in code, read from the process
//! environment, or deserialized when the `config` feature is enabled.

use std::env;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "FERROUS_SCOPE_";

/// Execution mode the container runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum ExecutionMode {
    #[default]
    RunTime,
    DesignTime,
    UnitTest,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "runtime" => Ok(ExecutionMode::RunTime),
            "designtime" => Ok(ExecutionMode::DesignTime),
            "unittest" => Ok(ExecutionMode::UnitTest),
            other => Err(format!("unknown execution mode '{}'", other)),
        }
    }
}

/// Execution modes an export strategy is eligible under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum ExportEnvironment {
    #[default]
    Any,
    RunTime,
    DesignTime,
    UnitTest,
}

impl ExportEnvironment {
    /// True when a strategy with this environment may be used under `mode`.
    pub fn admits(self, mode: ExecutionMode) -> bool {
        match self {
            ExportEnvironment::Any => true,
            ExportEnvironment::RunTime => mode == ExecutionMode::RunTime,
            ExportEnvironment::DesignTime => mode == ExecutionMode::DesignTime,
            ExportEnvironment::UnitTest => mode == ExecutionMode::UnitTest,
        }
    }
}

/// Settings shared by a scope tree.
///
/// # Examples
///
/// ```rust
/// use ferrous_scope::{ContainerConfig, ExecutionMode, InjectionScope};
///
/// let config = ContainerConfig::default()
///     .with_environment(ExecutionMode::UnitTest)
///     .with_max_depth(64);
///
/// let scope = InjectionScope::root(config);
/// assert_eq!(scope.config().environment, ExecutionMode::UnitTest);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    /// Mode matched against each strategy's `ExportEnvironment`
    pub environment: ExecutionMode,
    /// Maximum nesting of resolutions before `DepthExceeded`
    pub max_depth: usize,
    /// Dispose a scope when its last handle is dropped
    pub dispose_on_drop: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            environment: ExecutionMode::RunTime,
            max_depth: 1024,
            dispose_on_drop: true,
        }
    }
}

impl ContainerConfig {
    pub fn with_environment(mut self, environment: ExecutionMode) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn with_dispose_on_drop(mut self, dispose_on_drop: bool) -> Self {
        self.dispose_on_drop = dispose_on_drop;
        self
    }

    /// Reads `FERROUS_SCOPE_ENVIRONMENT`, `FERROUS_SCOPE_MAX_DEPTH` and
    /// `FERROUS_SCOPE_DISPOSE_ON_DROP` over the defaults.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(raw) = read_var("ENVIRONMENT") {
            match raw.parse::<ExecutionMode>() {
                Ok(mode) => config.environment = mode,
                Err(e) => tracing::warn!(value = %raw, "ignoring {}ENVIRONMENT: {}", ENV_PREFIX, e),
            }
        }

        if let Some(raw) = read_var("MAX_DEPTH") {
            match raw.parse::<usize>() {
                Ok(depth) => config = config.with_max_depth(depth),
                Err(e) => tracing::warn!(value = %raw, "ignoring {}MAX_DEPTH: {}", ENV_PREFIX, e),
            }
        }

        if let Some(raw) = read_var("DISPOSE_ON_DROP") {
            match parse_bool(&raw) {
                Some(flag) => config.dispose_on_drop = flag,
                None => tracing::warn!(value = %raw, "ignoring {}DISPOSE_ON_DROP", ENV_PREFIX),
            }
        }

        config
    }
}

fn read_var(suffix: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, suffix)).ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
