// JSON file storage for managed configurations
use crate::application::configuration_registry::ConfigurationStore;
use crate::domain::configuration::PersistenceServiceConfiguration;
use crate::domain::error::PersistenceResult;
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct JsonFileConfigurationStore {
    path: PathBuf,
}

impl JsonFileConfigurationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigurationStore for JsonFileConfigurationStore {
    async fn load(&self) -> PersistenceResult<Vec<PersistenceServiceConfiguration>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No managed configuration file at {}", self.path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, configurations: &[PersistenceServiceConfiguration]) -> PersistenceResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(configurations)?;

        // Write next to the target and rename so readers never see a partial file
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}
