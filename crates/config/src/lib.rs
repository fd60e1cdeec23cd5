//! Configuration loading, validation, and management for CuraLink.
//!
//! Loads configuration from `~/.curalink/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.curalink/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default generation provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Flow invocation settings
    #[serde(default)]
    pub flows: FlowsConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Key-value storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Departments, doctors, and intake specialties
    #[serde(default)]
    pub directory: DirectoryConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("providers", &self.providers)
            .field("flows", &self.flows)
            .field("gateway", &self.gateway)
            .field("storage", &self.storage)
            .field("directory", &self.directory)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowsConfig {
    /// Upper bound on a single generation call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Providers tried in order when the default one fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            fallback: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Browser origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Requests per minute per client; 0 disables limiting
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,
}

fn default_port() -> u16 {
    42680
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}
fn default_rate_limit() -> usize {
    120
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: default_allowed_origins(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `memory` or `file`
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// JSON file for the `file` backend (default: `~/.curalink/store.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_storage_backend() -> String {
    "file".into()
}

impl StorageConfig {
    /// Resolved path of the file backend.
    pub fn file_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("store.json"))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
        }
    }
}

/// A doctor listed in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorEntry {
    pub name: String,
    pub specialty: String,
}

impl DoctorEntry {
    pub fn new(name: impl Into<String>, specialty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specialty: specialty.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Departments offered; also the specialties a recommendation may pick
    #[serde(default = "default_departments")]
    pub departments: Vec<String>,

    /// Doctors the recommendation flow may suggest
    #[serde(default = "default_doctors")]
    pub doctors: Vec<DoctorEntry>,

    /// Specialties selectable on the consultation intake form
    #[serde(default = "default_intake_specialties")]
    pub intake_specialties: Vec<String>,
}

fn default_departments() -> Vec<String> {
    ["Cardiology", "Gastroenterology", "General Medicine"]
        .map(String::from)
        .to_vec()
}

fn default_doctors() -> Vec<DoctorEntry> {
    vec![
        DoctorEntry::new("Dr. Emily Carter", "Cardiology"),
        DoctorEntry::new("Dr. Johnathan Lee", "Gastroenterology"),
        DoctorEntry::new("Dr. Sarah Green", "General Medicine"),
    ]
}

fn default_intake_specialties() -> Vec<String> {
    [
        "General Medicine",
        "Pediatrics",
        "Cardiology",
        "Dermatology",
        "Neurology",
        "Orthopedics",
        "Psychiatry",
        "Endocrinology",
        "Gastroenterology",
        "Other",
    ]
    .map(String::from)
    .to_vec()
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            departments: default_departments(),
            doctors: default_doctors(),
            intake_specialties: default_intake_specialties(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.curalink/config.toml).
    ///
    /// Also checks environment variables:
    /// - `CURALINK_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `CURALINK_PROVIDER`
    /// - `CURALINK_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("CURALINK_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("CURALINK_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("CURALINK_MODEL") {
            self.default_model = model;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".curalink")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.flows.temperature) {
            return Err(ConfigError::ValidationError(
                "flows.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.flows.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "flows.timeout_secs must be greater than 0".into(),
            ));
        }
        if !matches!(self.storage.backend.as_str(), "memory" | "file") {
            return Err(ConfigError::ValidationError(format!(
                "storage.backend must be 'memory' or 'file', got '{}'",
                self.storage.backend
            )));
        }
        if self.directory.departments.is_empty() {
            return Err(ConfigError::ValidationError(
                "directory.departments must not be empty".into(),
            ));
        }
        if self.directory.intake_specialties.is_empty() {
            return Err(ConfigError::ValidationError(
                "directory.intake_specialties must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            providers: HashMap::new(),
            flows: FlowsConfig::default(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
            directory: DirectoryConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.flows.timeout_secs, 30);
        assert_eq!(config.storage.backend, "file");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_directory_matches_recommendation_doctors() {
        let directory = DirectoryConfig::default();
        assert_eq!(directory.departments.len(), 3);
        assert!(
            directory
                .doctors
                .contains(&DoctorEntry::new("Dr. Sarah Green", "General Medicine"))
        );
        assert_eq!(directory.intake_specialties.len(), 10);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.directory.doctors, config.directory.doctors);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.flows.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_storage_backend_rejected() {
        let mut config = AppConfig::default();
        config.storage.backend = "sqlite".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage.backend"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");
    }

    #[test]
    fn load_from_file_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_model = "gpt-4o"

[flows]
timeout_secs = 5

[storage]
backend = "memory"

[[directory.doctors]]
name = "Dr. Ada Lin"
specialty = "Neurology"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.flows.timeout_secs, 5);
        assert!((config.flows.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.directory.doctors.len(), 1);
        assert_eq!(config.directory.departments.len(), 3);
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "flows = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env(|name| match name {
            "OPENAI_API_KEY" => Some("sk-env".into()),
            "CURALINK_MODEL" => Some("gpt-4.1".into()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.default_model, "gpt-4.1");
        assert_eq!(config.default_provider, "openai");
    }

    #[test]
    fn explicit_key_wins_over_env() {
        let mut config = AppConfig {
            api_key: Some("sk-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(|_| Some("sk-env".into()));
        assert_eq!(config.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn debug_redacts_keys() {
        let mut config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-other".into()),
                ..ProviderConfig::default()
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("sk-other"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("42680"));
    }
}
