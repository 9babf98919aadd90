use crate::domain::configuration::{PersistenceServiceConfiguration, PersistenceServiceConfigurationBuilder};
use crate::domain::state::ItemType;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub default_service: Option<String>,
    /// Fixed UTC offset such as `+01:00`; UTC when unset
    #[serde(default)]
    pub time_zone: Option<String>,
    /// JSON file holding managed configurations; kept in memory when unset
    #[serde(default)]
    pub managed_storage: Option<PathBuf>,
    #[serde(default)]
    pub services: Vec<ServiceSettings>,
    #[serde(default)]
    pub items: Vec<ItemSettings>,
    #[serde(default)]
    pub configurations: Vec<PersistenceServiceConfigurationBuilder>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceSettings {
    pub id: String,
    pub label: Option<String>,
    #[serde(default)]
    pub kind: BackendKind,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ItemSettings {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

impl Settings {
    /// Validate the statically provisioned configurations, reporting every
    /// problem of every entry.
    pub fn static_configurations(&self) -> anyhow::Result<Vec<PersistenceServiceConfiguration>> {
        let mut configurations = Vec::new();
        let mut problems = Vec::new();
        for (index, builder) in self.configurations.iter().enumerate() {
            let name = builder
                .service_id()
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", index));
            match builder.clone().build() {
                Ok(configuration) => configurations.push(configuration),
                Err(errors) => problems.push(format!("{}: {}", name, errors)),
            }
        }
        if !problems.is_empty() {
            anyhow::bail!("Invalid persistence configurations: {}", problems.join(", "));
        }
        Ok(configurations)
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from("config/persistence")
}

/// Load settings from `path` (optional) and `PERSISTENCE__*` environment variables.
pub fn load_settings_from(path: &str) -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(config::Environment::with_prefix("PERSISTENCE").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
