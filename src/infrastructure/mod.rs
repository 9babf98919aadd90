// Infrastructure layer - Settings and concrete adapters
pub mod config;
pub mod item_registry;
pub mod json_store;
pub mod memory_service;
pub mod static_provider;
pub mod time_zone;
