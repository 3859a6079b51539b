//! Config file discovery.
//!
//! Resolution order (first file found wins):
//! 1. Explicit path (`--config`)
//! 2. `./config.json`
//! 3. `<base_dir>/config.json`
//! 4. `$FLOWBENCH_CONFIG_DIR/config.json`, else the platform config dir
//! 5. Built-in defaults
//!
//! Environment overrides are applied on top of whichever layer was chosen.

use std::path::{Path, PathBuf};

use crate::{ConfigError, FlowbenchConfig, Result};

/// Config filename, both project-local and in the user config directory.
const CONFIG_FILE: &str = "config.json";

/// Application name for platform directory resolution.
const APP_NAME: &str = "flowbench";

/// Environment variable to override the user config directory.
const CONFIG_DIR_ENV: &str = "FLOWBENCH_CONFIG_DIR";

/// Where to look for configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Explicit file; a failure to read or parse it is an error.
    pub explicit: Option<PathBuf>,
    /// Workbench base directory (holds `workflows/`).
    pub base_dir: Option<PathBuf>,
    /// Overrides `FLOWBENCH_CONFIG_DIR` and the platform default.
    pub config_dir: Option<PathBuf>,
    /// Skip `N8N_API_URL` / `N8N_API_KEY`.
    pub ignore_env: bool,
}

/// A candidate config location.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub loaded: bool,
}

/// Result of config discovery.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: FlowbenchConfig,
    /// Candidates in the order they were checked.
    pub sources: Vec<ConfigSource>,
    /// Environment variables that overrode file values.
    pub env_overrides: Vec<&'static str>,
    /// Non-fatal problems (unparseable discovered files).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// The file the config came from, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.sources
            .iter()
            .find(|s| s.loaded)
            .map(|s| s.path.as_path())
    }
}

/// Discover, load and resolve configuration.
pub fn load_config(options: &ConfigOptions) -> Result<LoadedConfig> {
    let mut sources = Vec::new();
    let mut warnings = Vec::new();
    let mut config = None;

    if let Some(path) = &options.explicit {
        config = Some(load_config_file(path)?);
        sources.push(ConfigSource {
            path: path.clone(),
            loaded: true,
        });
    } else {
        for path in candidate_paths(options) {
            if config.is_some() || !path.is_file() {
                sources.push(ConfigSource { path, loaded: false });
                continue;
            }
            match load_config_file(&path) {
                Ok(loaded) => {
                    tracing::debug!(path = %path.display(), "loaded config file");
                    config = Some(loaded);
                    sources.push(ConfigSource { path, loaded: true });
                }
                Err(e) => {
                    warnings.push(format!("Failed to load {}: {}", path.display(), e));
                    sources.push(ConfigSource { path, loaded: false });
                }
            }
        }
    }

    let mut config = config.unwrap_or_default();
    let env_overrides = if options.ignore_env {
        Vec::new()
    } else {
        config.apply_env_overrides()
    };

    Ok(LoadedConfig {
        config,
        sources,
        env_overrides,
        warnings,
    })
}

fn candidate_paths(options: &ConfigOptions) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(base) = &options.base_dir {
        let path = base.join(CONFIG_FILE);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    let user = match &options.config_dir {
        Some(dir) => Some(dir.join(CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user {
        paths.push(path);
    }
    paths
}

/// Load config from a specific file path (no discovery, no env overrides).
pub fn load_config_file(path: &Path) -> Result<FlowbenchConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    FlowbenchConfig::from_json(&contents)
}

/// Save configuration as pretty JSON, creating parent directories.
pub fn save_config(config: &FlowbenchConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_json()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// User config file path (`<config dir>/config.json`).
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(CONFIG_FILE))
}

/// User config directory.
///
/// Checks `FLOWBENCH_CONFIG_DIR` first, then the platform default
/// (`~/.config/flowbench` on Linux).
pub fn user_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn isolated(base: &Path, user: &Path) -> ConfigOptions {
        ConfigOptions {
            explicit: None,
            base_dir: Some(base.to_path_buf()),
            config_dir: Some(user.to_path_buf()),
            ignore_env: true,
        }
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "n8n_api": { "base_url": "http://h:9" } }"#).unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.n8n_api.base_url, "http://h:9");
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_explicit_path_error_is_fatal() {
        let options = ConfigOptions {
            explicit: Some(PathBuf::from("/nonexistent/config.json")),
            ignore_env: true,
            ..Default::default()
        };
        assert!(load_config(&options).is_err());
    }

    #[test]
    fn test_base_dir_config_is_used() {
        let base = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        fs::write(
            base.path().join("config.json"),
            r#"{ "n8n_api": { "base_url": "http://base:1" } }"#,
        )
        .unwrap();

        let loaded = load_config(&isolated(base.path(), user.path())).unwrap();
        assert_eq!(loaded.config.n8n_api.base_url, "http://base:1");
        assert_eq!(loaded.loaded_from(), Some(base.path().join("config.json").as_path()));
    }

    #[test]
    fn test_first_found_wins_over_user_dir() {
        let base = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        fs::write(
            base.path().join("config.json"),
            r#"{ "n8n_api": { "base_url": "http://base:1" } }"#,
        )
        .unwrap();
        fs::write(
            user.path().join("config.json"),
            r#"{ "n8n_api": { "base_url": "http://user:1", "api_key": "k" } }"#,
        )
        .unwrap();

        let loaded = load_config(&isolated(base.path(), user.path())).unwrap();
        assert_eq!(loaded.config.n8n_api.base_url, "http://base:1");
        assert_eq!(loaded.config.n8n_api.api_key, "");
    }

    #[test]
    fn test_unparseable_discovered_file_warns_and_falls_through() {
        let base = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        fs::write(base.path().join("config.json"), "{{").unwrap();
        fs::write(
            user.path().join("config.json"),
            r#"{ "n8n_api": { "base_url": "http://user:1" } }"#,
        )
        .unwrap();

        let loaded = load_config(&isolated(base.path(), user.path())).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.config.n8n_api.base_url, "http://user:1");
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let base = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        let loaded = load_config(&isolated(base.path(), user.path())).unwrap();
        assert_eq!(loaded.config, FlowbenchConfig::default());
        assert!(loaded.loaded_from().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = FlowbenchConfig::new();
        config.n8n_api.api_key = "abc".into();

        save_config(&config, &path).unwrap();
        assert_eq!(load_config_file(&path).unwrap(), config);
    }
}
