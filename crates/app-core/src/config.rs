//! A thread-safe, auto-reloading configuration layer.
//!
//! Values come from an optional YAML file overlaid by environment variables
//! (`APP__SERVER__ADDRESS` maps to `server.address`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, mpsc};
use std::thread;
use std::time::Duration;

use config::{Config as RawConfig, Environment, File};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::de::DeserializeOwned;
use thiserror::Error;

const ENV_SEPARATOR: &str = "__";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load or parse configuration")]
    Load(#[from] config::ConfigError),

    #[error("Failed to initialize file watcher")]
    Watch(#[from] notify::Error),

    #[error("Configuration lock was poisoned, indicating a panic in another thread")]
    LockPoisoned,
}

#[derive(Debug)]
pub struct Config {
    inner: Arc<RwLock<RawConfig>>,
    // Dropping the watcher stops the reload thread.
    _watcher: Option<RecommendedWatcher>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    #[cfg(test)]
    pub fn builder_test() -> test_utils::TestConfigBuilder {
        test_utils::TestConfigBuilder::new()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let guard = self.inner.read().map_err(|_| ConfigError::LockPoisoned)?;
        guard.get(key).map_err(ConfigError::from)
    }

    /// Like [`Config::get`], but a missing key yields `None` instead of an error.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::Load(config::ConfigError::NotFound(_))) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.get_opt(key)?.unwrap_or(default))
    }
}

#[derive(Debug, Clone)]
struct Sources {
    file: Option<(PathBuf, bool)>,
    env_prefix: Option<String>,
    env_override: Option<HashMap<String, String>>,
}

impl Sources {
    fn load(&self) -> Result<RawConfig, config::ConfigError> {
        let mut builder = RawConfig::builder();

        if let Some((path, required)) = &self.file {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }

        if let Some(prefix) = &self.env_prefix {
            let env = Environment::with_prefix(prefix)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(self.env_override.clone());
            builder = builder.add_source(env);
        }

        builder.build()
    }
}

pub struct ConfigBuilder {
    sources: Sources,
    watch: bool,
    watch_interval: Duration,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            sources: Sources { file: None, env_prefix: None, env_override: None },
            watch: false,
            watch_interval: Duration::from_secs(2),
        }
    }
}

impl ConfigBuilder {
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.sources.file = Some((path.as_ref().to_path_buf(), true));
        self
    }

    /// Reads the file when present; a missing file is not an error.
    pub fn optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.sources.file = Some((path.as_ref().to_path_buf(), false));
        self
    }

    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.sources.env_prefix = Some(prefix.to_string());
        self
    }

    pub fn watch(mut self) -> Self {
        self.watch = true;
        self
    }

    pub fn watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }

    #[cfg(test)]
    fn env_override(mut self, vars: HashMap<String, String>) -> Self {
        self.sources.env_override = Some(vars);
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let raw_config = self.sources.load()?;
        let config_arc = Arc::new(RwLock::new(raw_config));
        let mut watcher = None;

        let watched_path = match &self.sources.file {
            Some((path, _)) if self.watch && path.exists() => Some(path.clone()),
            _ => None,
        };

        if let Some(path) = watched_path {
            let sources = self.sources.clone();
            let config_clone = Arc::clone(&config_arc);
            let (tx, rx) = mpsc::channel();

            let mut w = RecommendedWatcher::new(tx, notify::Config::default().with_poll_interval(self.watch_interval))?;
            w.watch(&path, RecursiveMode::NonRecursive)?;

            thread::spawn(move || {
                tracing::info!("Watching configuration file for changes: {}", path.to_string_lossy());
                while let Ok(event_result) = rx.recv() {
                    match event_result {
                        Ok(Event { kind: notify::EventKind::Modify(_), .. }) => {
                            tracing::info!("Configuration file changed. Reloading...");
                            match sources.load() {
                                Ok(new_config) => {
                                    if let Ok(mut guard) = config_clone.write() {
                                        *guard = new_config;
                                        tracing::info!("Configuration reloaded successfully.");
                                    } else {
                                        tracing::error!("Failed to acquire write lock for reloading config.");
                                    }
                                },
                                Err(e) => {
                                    tracing::error!("Failed to reload configuration file: {}", e);
                                },
                            }
                        },
                        Err(e) => tracing::error!("File watcher error: {:?}", e),
                        _ => {},
                    }
                }
            });
            watcher = Some(w);
        }

        Ok(Config { inner: config_arc, _watcher: watcher })
    }
}
