//! Backend selection from configuration.
//!
//! ```
//! use fstore_core::config::{BackendKind, PreferencesConfig};
//! use fstore_core::persist::PreferenceBackend;
//!
//! let config = PreferencesConfig::from_json_str(r#"{ "namespace": "app" }"#)?;
//! assert_eq!(config.backend, BackendKind::Memory);
//!
//! let prefs = config.open()?;
//! prefs.set("theme", "dark".to_string().into())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BackendError, ConfigError};
use crate::persist::{FilePreferences, MemoryPreferences, Namespaced, PreferenceBackend};

pub const ENV_BACKEND: &str = "FSTORE_PREFS_BACKEND";
pub const ENV_PATH: &str = "FSTORE_PREFS_PATH";
pub const ENV_NAMESPACE: &str = "FSTORE_PREFS_NAMESPACE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Memory,
    File,
}

impl BackendKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    pub backend: BackendKind,
    /// Document location for [`BackendKind::File`].
    pub path: Option<PathBuf>,
    /// Key prefix applied with [`Namespaced`]; empty means none.
    pub namespace: Option<String>,
}

impl PreferencesConfig {
    #[must_use]
    pub fn memory() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::File,
            path: Some(path.into()),
            namespace: None,
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    #[cfg(feature = "config")]
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Read a config file, choosing the parser by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Self::from_json_str(&content),
            #[cfg(feature = "config")]
            Some("toml") => Self::from_toml_str(&content),
            _ => Err(ConfigError::UnsupportedFormat(extension)),
        }
    }

    /// Apply `FSTORE_PREFS_*` environment overrides.
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_from(|var| std::env::var(var).ok())
    }

    fn merge_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_BACKEND) {
            self.backend = BackendKind::parse(&value).ok_or(ConfigError::Env {
                var: ENV_BACKEND,
                value,
            })?;
        }
        if let Some(path) = lookup(ENV_PATH) {
            self.path = Some(PathBuf::from(path));
        }
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            self.namespace = Some(namespace);
        }
        Ok(())
    }

    /// Build the configured backend.
    pub fn open(&self) -> Result<Arc<dyn PreferenceBackend>, BackendError> {
        let base: Arc<dyn PreferenceBackend> = match self.backend {
            BackendKind::Memory => Arc::new(MemoryPreferences::new()),
            BackendKind::File => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| BackendError::unavailable("file backend requires a path"))?;
                Arc::new(FilePreferences::open(path)?)
            }
        };
        debug!(
            message = "prefs.open",
            backend = ?self.backend,
            namespace = self.namespace.as_deref().unwrap_or("")
        );

        Ok(match self.namespace.as_deref() {
            Some(namespace) if !namespace.is_empty() => {
                Arc::new(Namespaced::new(namespace, base))
            }
            _ => base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::PreferenceValue;
    use std::collections::HashMap;

    #[test]
    fn defaults_to_unscoped_memory() {
        let config = PreferencesConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PreferencesConfig::memory());
        let prefs = config.open().unwrap();
        prefs.set("k", PreferenceValue::Int(1)).unwrap();
        assert_eq!(prefs.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn file_backend_requires_path() {
        let config = PreferencesConfig {
            backend: BackendKind::File,
            ..PreferencesConfig::default()
        };
        assert!(matches!(
            config.open(),
            Err(BackendError::Unavailable { .. })
        ));
    }

    #[test]
    fn namespaced_file_backend_scopes_keys_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let prefs = PreferencesConfig::file(&path)
            .with_namespace("editor")
            .open()
            .unwrap();
        prefs.set("font", PreferenceValue::Text("mono".into())).unwrap();

        let raw = FilePreferences::open(&path).unwrap();
        assert!(raw.contains_key("editor.font").unwrap());
    }

    #[test]
    fn load_picks_parser_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("prefs.json");
        std::fs::write(&json, r#"{ "backend": "file", "path": "/tmp/p.json" }"#).unwrap();
        let config = PreferencesConfig::load(&json).unwrap();
        assert_eq!(config.backend, BackendKind::File);
        assert_eq!(config.path, Some(PathBuf::from("/tmp/p.json")));

        let ini = dir.path().join("prefs.ini");
        std::fs::write(&ini, "backend=file").unwrap();
        assert!(matches!(
            PreferencesConfig::load(&ini),
            Err(ConfigError::UnsupportedFormat(Some(ext))) if ext == "ini"
        ));
    }

    #[test]
    fn unknown_backend_is_a_parse_error() {
        assert!(matches!(
            PreferencesConfig::from_json_str(r#"{ "backend": "registry" }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_config_parses() {
        let config = PreferencesConfig::from_toml_str(
            "backend = \"file\"\npath = \"state/prefs.json\"\nnamespace = \"app\"\n",
        )
        .unwrap();
        assert_eq!(
            config,
            PreferencesConfig::file("state/prefs.json").with_namespace("app")
        );
    }

    #[test]
    fn env_overrides_apply_and_validate() {
        let vars: HashMap<&str, &str> = [(ENV_BACKEND, "FILE"), (ENV_PATH, "/var/prefs.json")]
            .into_iter()
            .collect();
        let mut config = PreferencesConfig::memory();
        config
            .merge_from(|var| vars.get(var).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(config, PreferencesConfig::file("/var/prefs.json"));

        let err = PreferencesConfig::memory()
            .merge_from(|var| (var == ENV_BACKEND).then(|| "cloud".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_BACKEND, .. }));
    }
}
