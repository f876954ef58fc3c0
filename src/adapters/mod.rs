pub mod authz_server;
pub mod config_providers;
pub mod discovery_server;
pub mod discovery_store;

/// Re-export commonly used types from adapters
pub use config_providers::FileConfigProvider;
pub use discovery_store::DiscoveryStore;
