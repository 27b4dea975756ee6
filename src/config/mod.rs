//! Configuration for reaching the appliance and naming defaults.
//!
//! Loaded from a TOML file, then overridden by the `NS_IP`, `NS_USERNAME`
//! and `NS_PASSWORD` environment variables.

mod credentials;
mod loader;
mod types;

pub use credentials::{Credentials, SecureString};
pub use loader::{ConfigError, ENV_ENDPOINT, ENV_PASSWORD, ENV_USERNAME};
pub use types::{ApplianceConfig, Config, Defaults};
