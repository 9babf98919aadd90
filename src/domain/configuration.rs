// Persistence service configuration domain model
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Strategy names that are always available without being declared.
pub const BUILTIN_STRATEGIES: [&str; 3] = ["everyChange", "everyUpdate", "restoreOnStartup"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StrategyKind {
    EveryChange,
    EveryUpdate,
    RestoreOnStartup,
    Cron { expression: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceStrategy {
    pub name: String,
    #[serde(flatten)]
    pub kind: StrategyKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterKind {
    /// Only persist when the value moved by more than `value`.
    Threshold {
        value: f64,
        #[serde(default)]
        relative: bool,
        #[serde(default)]
        unit: Option<String>,
    },
    /// Only persist if at least `value` units of time passed.
    Time { value: u64, unit: TimeUnit },
    Equals { values: Vec<String> },
    NotEquals { values: Vec<String> },
    Include { lower: f64, upper: f64 },
    Exclude { lower: f64, upper: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    S,
    M,
    H,
    D,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceFilter {
    pub name: String,
    #[serde(flatten)]
    pub kind: FilterKind,
}

/// Which items are persisted with which strategies and filters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistenceItemConfiguration {
    pub items: Vec<String>,
    #[serde(default)]
    pub strategies: Vec<String>,
    #[serde(default)]
    pub filters: Vec<String>,
}

/// Configuration of a single persistence service. Opaque to the registries;
/// only its `service_id` is interpreted there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceServiceConfiguration {
    pub service_id: String,
    #[serde(default)]
    pub configs: Vec<PersistenceItemConfiguration>,
    #[serde(default)]
    pub default_strategies: Vec<String>,
    #[serde(default)]
    pub strategies: Vec<PersistenceStrategy>,
    #[serde(default)]
    pub filters: Vec<PersistenceFilter>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl PersistenceServiceConfiguration {
    pub fn builder(service_id: impl Into<String>) -> PersistenceServiceConfigurationBuilder {
        PersistenceServiceConfigurationBuilder::default().with_service_id(service_id)
    }
}

/// All constraints a configuration violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationErrors(pub Vec<String>);

impl fmt::Display for ConfigurationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("; "))
    }
}

impl std::error::Error for ConfigurationErrors {}

/// Accumulates configuration parts; nothing is checked until [`build`].
///
/// [`build`]: PersistenceServiceConfigurationBuilder::build
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceServiceConfigurationBuilder {
    #[serde(default, alias = "service_id")]
    service_id: Option<String>,
    #[serde(default)]
    configs: Vec<PersistenceItemConfiguration>,
    #[serde(default, alias = "default_strategies")]
    default_strategies: Vec<String>,
    #[serde(default)]
    strategies: Vec<PersistenceStrategy>,
    #[serde(default)]
    filters: Vec<PersistenceFilter>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

impl PersistenceServiceConfigurationBuilder {
    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    pub fn with_config(mut self, config: PersistenceItemConfiguration) -> Self {
        self.configs.push(config);
        self
    }

    pub fn with_default_strategy(mut self, name: impl Into<String>) -> Self {
        self.default_strategies.push(name.into());
        self
    }

    pub fn with_strategy(mut self, strategy: PersistenceStrategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with_filter(mut self, filter: PersistenceFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_alias(mut self, item: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases.insert(item.into(), alias.into());
        self
    }

    pub fn service_id(&self) -> Option<&str> {
        self.service_id.as_deref()
    }

    pub fn build(self) -> Result<PersistenceServiceConfiguration, ConfigurationErrors> {
        let mut errors = Vec::new();

        let service_id = self.service_id.unwrap_or_default();
        if service_id.is_empty() {
            errors.push("missing service id".to_string());
        } else if !service_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(format!("service id '{}' must be alphanumeric", service_id));
        }

        let mut strategy_names: HashSet<&str> = BUILTIN_STRATEGIES.into_iter().collect();
        for strategy in &self.strategies {
            if strategy.name.is_empty() {
                errors.push("strategy without name".to_string());
            } else if !strategy_names.insert(strategy.name.as_str()) {
                errors.push(format!("duplicate strategy '{}'", strategy.name));
            }
            if let StrategyKind::Cron { expression } = &strategy.kind {
                if expression.trim().is_empty() {
                    errors.push(format!("cron strategy '{}' has no expression", strategy.name));
                }
            }
        }

        let mut filter_names = HashSet::new();
        for filter in &self.filters {
            if filter.name.is_empty() {
                errors.push("filter without name".to_string());
            } else if !filter_names.insert(filter.name.as_str()) {
                errors.push(format!("duplicate filter '{}'", filter.name));
            }
            match &filter.kind {
                FilterKind::Time { value: 0, .. } => {
                    errors.push(format!("time filter '{}' must be positive", filter.name));
                }
                FilterKind::Threshold { value, .. } if *value < 0.0 => {
                    errors.push(format!("threshold filter '{}' must not be negative", filter.name));
                }
                FilterKind::Include { lower, upper } | FilterKind::Exclude { lower, upper }
                    if lower > upper =>
                {
                    errors.push(format!(
                        "range filter '{}' has lower bound above upper bound",
                        filter.name
                    ));
                }
                _ => {}
            }
        }

        for name in &self.default_strategies {
            if !strategy_names.contains(name.as_str()) {
                errors.push(format!("unknown default strategy '{}'", name));
            }
        }

        for (index, config) in self.configs.iter().enumerate() {
            if config.items.is_empty() || config.items.iter().any(|i| i.trim().is_empty()) {
                errors.push(format!("item configuration {} has missing items", index));
            }
            for name in &config.strategies {
                if !strategy_names.contains(name.as_str()) {
                    errors.push(format!("unknown strategy '{}' in item configuration {}", name, index));
                }
            }
            for name in &config.filters {
                if !filter_names.contains(name.as_str()) {
                    errors.push(format!("unknown filter '{}' in item configuration {}", name, index));
                }
            }
        }

        for (item, alias) in &self.aliases {
            if alias.trim().is_empty() {
                errors.push(format!("empty alias for item '{}'", item));
            }
        }

        if !errors.is_empty() {
            return Err(ConfigurationErrors(errors));
        }

        Ok(PersistenceServiceConfiguration {
            service_id,
            configs: self.configs,
            default_strategies: self.default_strategies,
            strategies: self.strategies,
            filters: self.filters,
            aliases: self.aliases,
        })
    }
}

impl From<PersistenceServiceConfiguration> for PersistenceServiceConfigurationBuilder {
    fn from(c: PersistenceServiceConfiguration) -> Self {
        Self {
            service_id: Some(c.service_id),
            configs: c.configs,
            default_strategies: c.default_strategies,
            strategies: c.strategies,
            filters: c.filters,
            aliases: c.aliases,
        }
    }
}
