// Read-only configuration provider for statically provisioned configurations
use crate::application::configuration_registry::PersistenceServiceConfigurationProvider;
use crate::domain::configuration::PersistenceServiceConfiguration;
use async_trait::async_trait;

pub struct StaticConfigurationProvider {
    configurations: Vec<PersistenceServiceConfiguration>,
}

impl StaticConfigurationProvider {
    pub const NAME: &'static str = "static";

    pub fn new(configurations: Vec<PersistenceServiceConfiguration>) -> Self {
        Self { configurations }
    }
}

#[async_trait]
impl PersistenceServiceConfigurationProvider for StaticConfigurationProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn get_all(&self) -> Vec<PersistenceServiceConfiguration> {
        self.configurations.clone()
    }
}
