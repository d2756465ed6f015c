//! Per-scope configuration.
//!
//! A [`ScopeConfigurator`] maps an [`InstrumentationScope`] to a configuration
//! value, such as the [`LoggerConfig`] deciding whether a logger is enabled.
//! It consults an ordered list of conditions and the first matching one wins:
//!
//! ```
//! use opentelemetry::InstrumentationScope;
//! use opentelemetry_log_pipeline::logs::{LoggerConfig, ScopeMatcher};
//!
//! # fn main() -> Result<(), opentelemetry_log_pipeline::error::ConfigError> {
//! let configurator = LoggerConfig::configurator_builder()
//!     .add_condition(ScopeMatcher::name_equals("payments"), LoggerConfig::enabled())
//!     .add_condition(ScopeMatcher::name_matches_glob("io.noisy.*")?, LoggerConfig::disabled())
//!     .build();
//!
//! let scope = InstrumentationScope::builder("io.noisy.http").build();
//! assert!(!configurator.resolve(&scope).is_enabled());
//! # Ok(())
//! # }
//! ```
use crate::error::ConfigError;
use opentelemetry::InstrumentationScope;
use regex::Regex;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Resolves a configuration value of type `T` for an instrumentation scope.
///
/// Built with [`ScopeConfiguratorBuilder`]. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct ScopeConfigurator<T> {
    inner: Arc<ConfiguratorInner<T>>,
}

#[derive(Debug)]
struct ConfiguratorInner<T> {
    base: Option<ScopeConfigurator<T>>,
    conditions: Vec<Condition<T>>,
    default: Option<T>,
}

#[derive(Debug)]
struct Condition<T> {
    matcher: ScopeMatcher,
    config: T,
}

impl<T: Clone> ScopeConfigurator<T> {
    /// Create a builder with no conditions and no default.
    pub fn builder() -> ScopeConfiguratorBuilder<T> {
        ScopeConfiguratorBuilder {
            base: None,
            conditions: Vec::new(),
            default: None,
        }
    }

    /// Create a builder extending this configurator. The conditions of the new
    /// builder are consulted only when this configurator yields no value.
    pub fn to_builder(&self) -> ScopeConfiguratorBuilder<T> {
        ScopeConfiguratorBuilder {
            base: Some(self.clone()),
            conditions: Vec::new(),
            default: None,
        }
    }

    /// Returns the value configured for `scope`, or `None` if neither a
    /// condition nor a default applies.
    pub fn apply(&self, scope: &InstrumentationScope) -> Option<T> {
        let inner = &self.inner;
        if let Some(config) = inner.base.as_ref().and_then(|base| base.apply(scope)) {
            return Some(config);
        }
        inner
            .conditions
            .iter()
            .find(|condition| condition.matcher.matches(scope))
            .map(|condition| condition.config.clone())
            .or_else(|| inner.default.clone())
    }
}

impl<T: Clone + Default> ScopeConfigurator<T> {
    /// Returns the value configured for `scope`, falling back to
    /// `T::default()`.
    pub fn resolve(&self, scope: &InstrumentationScope) -> T {
        self.apply(scope).unwrap_or_default()
    }
}

impl<T: Clone> Default for ScopeConfigurator<T> {
    fn default() -> Self {
        ScopeConfigurator::builder().build()
    }
}

/// A builder for [`ScopeConfigurator`].
#[derive(Debug)]
pub struct ScopeConfiguratorBuilder<T> {
    base: Option<ScopeConfigurator<T>>,
    conditions: Vec<Condition<T>>,
    default: Option<T>,
}

impl<T: Clone> ScopeConfiguratorBuilder<T> {
    /// Set the value used when no condition matches.
    pub fn set_default(mut self, config: T) -> Self {
        self.default = Some(config);
        self
    }

    /// Append a condition. Conditions are evaluated in the order they were
    /// added.
    pub fn add_condition(mut self, matcher: ScopeMatcher, config: T) -> Self {
        self.conditions.push(Condition { matcher, config });
        self
    }

    /// Build the configurator.
    pub fn build(self) -> ScopeConfigurator<T> {
        ScopeConfigurator {
            inner: Arc::new(ConfiguratorInner {
                base: self.base,
                conditions: self.conditions,
                default: self.default,
            }),
        }
    }
}

/// A predicate over instrumentation scopes.
#[derive(Clone)]
pub struct ScopeMatcher {
    kind: MatcherKind,
}

#[derive(Clone)]
enum MatcherKind {
    NameEquals(String),
    NameGlob(GlobPattern),
    Custom(Arc<dyn Fn(&InstrumentationScope) -> bool + Send + Sync>),
}

impl ScopeMatcher {
    /// Matches scopes whose name equals `name`, ignoring case.
    pub fn name_equals(name: impl Into<String>) -> Self {
        ScopeMatcher {
            kind: MatcherKind::NameEquals(name.into()),
        }
    }

    /// Matches scopes whose name matches the glob `pattern`: `*` matches any
    /// run of characters and `?` exactly one character. A pattern without
    /// wildcards is compared ignoring case.
    pub fn name_matches_glob(pattern: &str) -> Result<Self, ConfigError> {
        Ok(ScopeMatcher {
            kind: MatcherKind::NameGlob(GlobPattern::new(pattern)?),
        })
    }

    /// Matches scopes for which `predicate` returns `true`.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&InstrumentationScope) -> bool + Send + Sync + 'static,
    {
        ScopeMatcher {
            kind: MatcherKind::Custom(Arc::new(predicate)),
        }
    }

    /// Returns `true` if `scope` matches.
    pub fn matches(&self, scope: &InstrumentationScope) -> bool {
        match &self.kind {
            MatcherKind::NameEquals(name) => eq_ignore_case(name, scope.name()),
            MatcherKind::NameGlob(glob) => glob.matches(scope.name()),
            MatcherKind::Custom(predicate) => predicate(scope),
        }
    }
}

impl Debug for ScopeMatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MatcherKind::NameEquals(name) => f.debug_tuple("NameEquals").field(name).finish(),
            MatcherKind::NameGlob(glob) => f.debug_tuple("NameGlob").field(glob).finish(),
            MatcherKind::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[derive(Clone, Debug)]
enum GlobPattern {
    MatchAll,
    Exact(String),
    Regex(Regex),
}

impl GlobPattern {
    fn new(pattern: &str) -> Result<Self, ConfigError> {
        if pattern == "*" {
            return Ok(GlobPattern::MatchAll);
        }
        if !pattern.contains(['*', '?']) {
            return Ok(GlobPattern::Exact(pattern.to_string()));
        }

        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push_str("^(?:");
        let mut literal_start = None;
        for (idx, c) in pattern.char_indices() {
            if c == '*' || c == '?' {
                if let Some(start) = literal_start.take() {
                    expr.push_str(&regex::escape(&pattern[start..idx]));
                }
                expr.push_str(if c == '*' { ".*" } else { "." });
            } else if literal_start.is_none() {
                literal_start = Some(idx);
            }
        }
        if let Some(start) = literal_start {
            expr.push_str(&regex::escape(&pattern[start..]));
        }
        expr.push_str(")$");

        Regex::new(&expr)
            .map(GlobPattern::Regex)
            .map_err(|err| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            })
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            GlobPattern::MatchAll => true,
            GlobPattern::Exact(expected) => eq_ignore_case(expected, name),
            GlobPattern::Regex(regex) => regex.is_match(name),
        }
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Configuration of a logger, resolved once per instrumentation scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerConfig {
    enabled: bool,
}

impl LoggerConfig {
    /// A logger that emits records.
    pub const fn enabled() -> Self {
        LoggerConfig { enabled: true }
    }

    /// A logger whose records are discarded at `emit()`.
    pub const fn disabled() -> Self {
        LoggerConfig { enabled: false }
    }

    /// Returns `true` if the logger emits records.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Create a [`ScopeConfiguratorBuilder`] for logger configurations.
    pub fn configurator_builder() -> ScopeConfiguratorBuilder<LoggerConfig> {
        ScopeConfigurator::builder()
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig::enabled()
    }
}
