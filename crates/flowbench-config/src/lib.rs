//! Configuration system for flowbench.
//!
//! Provides a JSON `config.json` document with:
//! - Engine connection settings (`n8n_api.base_url`, `n8n_api.api_key`)
//! - Debug capture flags (`debug.*`)
//! - External executable and polling knobs (`cli.*`, `polling.*`)
//!
//! The first config file found wins; `N8N_API_URL` and `N8N_API_KEY` override
//! the connection settings afterwards. The resolved [`FlowbenchConfig`] is
//! built once at startup and handed to every component.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigOptions, ConfigSource, LoadedConfig, load_config, load_config_file, save_config,
    user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
