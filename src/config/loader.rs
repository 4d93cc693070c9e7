//! Configuration File Loading
//!
//! Finds and loads session configuration from the usual locations, with TOML
//! and JSON support and a fallback to defaults.

use super::SessionConfig;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name used under the config roots
const APP_DIR: &str = "pwsh-bridge";

/// Base file name, without extension
const CONFIG_STEM: &str = "config";

/// Configuration file loader
pub struct ConfigLoader {
    /// Directories searched for configuration files
    search_paths: Vec<PathBuf>,
    /// Formats tried in each directory, in order
    supported_formats: Vec<ConfigFormat>,
    /// Path of the file that was loaded, if any
    current_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Some(ConfigFormat::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Fall back to defaults when no file exists
    pub create_default: bool,
    /// Validate the configuration after loading
    pub validate: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            create_default: true,
            validate: true,
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            search_paths: Self::get_search_paths(),
            supported_formats: vec![ConfigFormat::Toml, ConfigFormat::Json],
            current_path: None,
        }
    }

    /// Load configuration with default options
    pub fn load() -> Result<SessionConfig> {
        Self::new().load_with_options(LoadOptions::default())
    }

    /// Search the configured paths
    pub fn load_with_options(&mut self, options: LoadOptions) -> Result<SessionConfig> {
        let config = match self.find_and_load_config()? {
            Some((path, config)) => {
                info!("Loaded configuration from {}", path.display());
                self.current_path = Some(path);
                config
            }
            None if options.create_default => {
                debug!("No configuration file found, using defaults");
                SessionConfig::default()
            }
            None => return Err(Error::ConfigNotFound),
        };

        if options.validate {
            validate_config(&config)?;
        }
        Ok(config)
    }

    /// Load an explicit file; the format comes from its extension
    pub fn load_from_path(path: &Path) -> Result<SessionConfig> {
        if !path.exists() {
            return Err(Error::ConfigLoadFailed {
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }
        let format = ConfigFormat::from_path(path).ok_or_else(|| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: "expected a .toml or .json file".to_string(),
        })?;
        let config = load_config_file(path, format)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration; the format comes from the extension, TOML otherwise
    pub fn save_to_path(config: &SessionConfig, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = match ConfigFormat::from_path(path) {
            Some(ConfigFormat::Json) => serde_json::to_string_pretty(config)?,
            _ => toml::to_string_pretty(config).map_err(|e| Error::ConfigLoadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?,
        };

        fs::write(path, content)?;
        Ok(())
    }

    fn find_and_load_config(&self) -> Result<Option<(PathBuf, SessionConfig)>> {
        for dir in &self.search_paths {
            for format in &self.supported_formats {
                let config_path = dir.join(CONFIG_STEM).with_extension(format.extension());
                if !config_path.exists() {
                    continue;
                }

                match load_config_file(&config_path, *format) {
                    Ok(config) => return Ok(Some((config_path, config))),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", config_path.display(), e);
                        continue;
                    }
                }
            }
        }

        Ok(None)
    }

    /// Default search directories, most specific last
    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_config).join(APP_DIR));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let dir = config_dir.join(APP_DIR);
            if !paths.contains(&dir) {
                paths.push(dir);
            }
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(format!(".{}", APP_DIR)));
        }

        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join(format!(".{}", APP_DIR)));
        }

        paths
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.push(path);
    }

    /// Replace all search paths with a single directory
    pub fn set_search_path(&mut self, path: PathBuf) {
        self.search_paths = vec![path];
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn load_config_file(path: &Path, format: ConfigFormat) -> Result<SessionConfig> {
    let content = fs::read_to_string(path)?;

    let parsed = match format {
        ConfigFormat::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|reason| Error::ConfigParseFailed {
        format: format.label().to_string(),
        reason,
    })
}

/// Check values that would make a session unusable
pub fn validate_config(config: &SessionConfig) -> Result<()> {
    if config.timeouts.startup_ms == 0 {
        return Err(Error::ConfigValidationFailed {
            field: "timeouts.startup_ms".to_string(),
            reason: "Startup timeout must be greater than 0".to_string(),
        });
    }

    if let Some(shell) = config
        .additional_shells
        .iter()
        .find(|shell| shell.trim().is_empty())
    {
        return Err(Error::ConfigValidationFailed {
            field: "additional_shells".to_string(),
            reason: format!("Shell name cannot be empty ({:?})", shell),
        });
    }

    if let Some(dir) = &config.working_directory {
        if !dir.is_dir() {
            return Err(Error::ConfigValidationFailed {
                field: "working_directory".to_string(),
                reason: format!("{} is not a directory", dir.display()),
            });
        }
    }

    for path in config.libraries.keys() {
        crate::ffi::library_name(path).map_err(|e| Error::ConfigValidationFailed {
            field: format!("libraries.{}", path),
            reason: e.to_string(),
        })?;
    }

    Ok(())
}
