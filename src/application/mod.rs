// Application layer - Capability traits, registries and use cases
pub mod configuration_registry;
pub mod history_service;
pub mod item_registry;
pub mod management_service;
pub mod persistence_service;
pub mod service_registry;
pub mod time_zone;

#[cfg(test)]
pub(crate) mod test_support;
