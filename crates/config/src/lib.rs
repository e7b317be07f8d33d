//! Configuration loading, validation, and management for Rulecraft.
//!
//! Loads configuration from `~/.rulecraft/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! Besides the service settings, the file carries the offline data the
//! assistant runs on: contacts, feeds, configured and discoverable devices,
//! stored user context, and extra channel schemas.

use rulecraft_core::in_memory::AddressEntry;
use rulecraft_core::{
    ChannelSchema, ChannelType, DiscoveredDevice, FeedHandle, InstalledDevice, Type, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.rulecraft/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Semantic parsing service
    #[serde(default)]
    pub parser: ParserConfig,

    /// Device discovery
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Dialog behaviour
    #[serde(default)]
    pub session: SessionConfig,

    /// Address book entries
    #[serde(default)]
    pub contacts: Vec<AddressEntry>,

    /// Messaging feeds the user can post to
    #[serde(default)]
    pub feeds: Vec<FeedHandle>,

    /// Devices already set up
    #[serde(default)]
    pub devices: Vec<InstalledDevice>,

    /// Devices discovery can find
    #[serde(default)]
    pub discoverable: Vec<DiscoveredDevice>,

    /// Stored user context (`$context.<key>`)
    #[serde(default)]
    pub context: Vec<ContextEntry>,

    /// Channel schemas, in addition to the builtin ones
    #[serde(default)]
    pub schemas: Vec<ChannelSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Base URL of the parsing service
    #[serde(default = "default_parser_url")]
    pub url: String,

    #[serde(default = "default_locale")]
    pub locale: String,

    /// Maximum candidates per query
    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default = "default_parser_timeout")]
    pub timeout_secs: u64,
}

fn default_parser_url() -> String {
    "http://127.0.0.1:8400".into()
}
fn default_locale() -> String {
    "en_US".into()
}
fn default_limit() -> usize {
    20
}
fn default_parser_timeout() -> u64 {
    30
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            url: default_parser_url(),
            locale: default_locale(),
            limit: default_limit(),
            timeout_secs: default_parser_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How long one search may run
    #[serde(default = "default_discovery_timeout")]
    pub timeout_secs: u64,
}

fn default_discovery_timeout() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_discovery_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Ask for confirmation before handing back a program
    #[serde(default = "default_true")]
    pub confirm_programs: bool,

    /// Capacity of the dialog event bus
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confirm_programs: true,
            event_capacity: default_event_capacity(),
        }
    }
}

/// One stored user-context value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Key without the `$context.` prefix, e.g. `location.home`
    pub key: String,
    pub value: Value,
}

impl AppConfig {
    /// Load configuration from the default path (~/.rulecraft/config.toml).
    ///
    /// Environment variables override the file:
    /// - `RULECRAFT_PARSER_URL`
    /// - `RULECRAFT_LOCALE`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
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
        tracing::debug!(
            path = %path.display(),
            schemas = config.schemas.len(),
            contacts = config.contacts.len(),
            "Loaded config"
        );
        Ok(config)
    }

    /// Apply overrides, looking each variable up with `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("RULECRAFT_PARSER_URL") {
            self.parser.url = url;
        }
        if let Some(locale) = lookup("RULECRAFT_LOCALE") {
            self.parser.locale = locale;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".rulecraft")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.parser.url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "parser.url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.parser.locale.trim().is_empty() {
            return Err(ConfigError::ValidationError("parser.locale must not be empty".into()));
        }
        if self.parser.limit == 0 {
            return Err(ConfigError::ValidationError("parser.limit must be > 0".into()));
        }
        if self.discovery.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "discovery.timeout_secs must be > 0".into(),
            ));
        }

        for contact in &self.contacts {
            if contact.email.is_none() && contact.phone.is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "contact '{}' has neither an email nor a phone number",
                    contact.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for schema in &self.schemas {
            if !seen.insert((&schema.kind, &schema.channel, schema.channel_type)) {
                return Err(ConfigError::ValidationError(format!(
                    "schema {}.{} ({}) is declared twice",
                    schema.kind, schema.channel, schema.channel_type
                )));
            }
            let mut names = HashSet::new();
            for slot in &schema.slots {
                if !names.insert(&slot.name) {
                    return Err(ConfigError::ValidationError(format!(
                        "schema {}.{} has two slots named '{}'",
                        schema.kind, schema.channel, slot.name
                    )));
                }
                // Action slots are always asked for; required ones everywhere.
                let asked = slot.required || schema.channel_type == ChannelType::Action;
                if asked && !askable(&slot.ty) {
                    return Err(ConfigError::ValidationError(format!(
                        "slot '{}' of {}.{} has type {}, which cannot be asked for",
                        slot.name, schema.kind, schema.channel, slot.ty
                    )));
                }
            }
        }

        Ok(())
    }

    /// Configured schemas, with slot labels derived from names where the
    /// file leaves them out.
    pub fn channel_schemas(&self) -> Vec<ChannelSchema> {
        let mut schemas = self.schemas.clone();
        for slot in schemas.iter_mut().flat_map(|s| s.slots.iter_mut()) {
            if slot.canonical.is_empty() {
                slot.canonical = slot.name.replace('_', " ");
            }
        }
        schemas
    }

    /// Stored context values by key.
    pub fn context_values(&self) -> HashMap<String, Value> {
        self.context
            .iter()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery.timeout_secs)
    }

    pub fn parser_timeout(&self) -> Duration {
        Duration::from_secs(self.parser.timeout_secs)
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Whether the dialog can put a question for a slot of type `ty`.
fn askable(ty: &Type) -> bool {
    match ty {
        Type::Any | Type::Array(_) | Type::Enum(None) => false,
        Type::Enum(Some(entries)) => !entries.is_empty(),
        _ => true,
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

impl From<ConfigError> for rulecraft_core::Error {
    fn from(e: ConfigError) -> Self {
        rulecraft_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[parser]
url = "https://parser.example.com"

[session]
confirm_programs = false

[[contacts]]
name = "Bob Smith"
email = "bob@example.com"

[[feeds]]
id = "f1"
name = "Family"

[[devices]]
id = "lamp-1"
kind = "com.example.lamp"
name = "Desk Lamp"

[[discoverable]]
id = "scale-1"
kind = "com.example.scale"
name = "Kitchen Scale"

[[context]]
key = "location.home"
value = { type = "Location", value = { latitude = 37.4, longitude = -122.1, display = "Home" } }

[[schemas]]
kind = "com.example.lamp"
channel = "set_power"
channel_type = "action"
confirmation = "turn $power the lamp"
slots = [
    { name = "power", type = "Enum(on,off)", required = true },
    { name = "fade_time", type = "Measure(s)" },
]
"#;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.parser.locale, "en_US");
        assert_eq!(config.discovery_timeout(), Duration::from_secs(60));
        assert!(config.session.confirm_programs);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn sample_sections_parse() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.parser.url, "https://parser.example.com");
        assert_eq!(config.parser.limit, 20);
        assert!(!config.session.confirm_programs);
        assert_eq!(config.contacts[0].email.as_deref(), Some("bob@example.com"));
        assert_eq!(config.discoverable[0].description, "");

        let schemas = config.channel_schemas();
        assert_eq!(schemas[0].channel_type, ChannelType::Action);
        assert_eq!(schemas[0].slots[0].ty, Type::Enum(Some(vec!["on".into(), "off".into()])));
        assert_eq!(schemas[0].slots[1].ty, Type::Measure("ms".into()));
        assert_eq!(schemas[0].slots[1].canonical, "fade time");

        let context = config.context_values();
        assert!(matches!(context.get("location.home"), Some(Value::Location(_))));
    }

    #[test]
    fn invalid_values_rejected() {
        let bad_url = AppConfig {
            parser: ParserConfig {
                url: "parser.local".into(),
                ..ParserConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(bad_url.validate().is_err());

        let no_timeout = AppConfig {
            discovery: DiscoveryConfig {
                enabled: true,
                timeout_secs: 0,
            },
            ..AppConfig::default()
        };
        assert!(no_timeout.validate().is_err());

        let mut duplicated: AppConfig = toml::from_str(SAMPLE).unwrap();
        duplicated.schemas.push(duplicated.schemas[0].clone());
        let err = duplicated.validate().unwrap_err();
        assert!(err.to_string().contains("declared twice"));

        let mut unreachable: AppConfig = toml::from_str(SAMPLE).unwrap();
        unreachable.contacts[0].email = None;
        assert!(unreachable.validate().is_err());
    }

    #[test]
    fn unaskable_slots_rejected() {
        let with_slot = |channel_type: &str, slot: &str| {
            let source = format!(
                "[[schemas]]\nkind = \"k\"\nchannel = \"c\"\nchannel_type = \"{channel_type}\"\nslots = [{slot}]\n"
            );
            toml::from_str::<AppConfig>(&source).unwrap()
        };

        for slot in [
            r#"{ name = "x", type = "Any" }"#,
            r#"{ name = "x", type = "Array(String)" }"#,
            r#"{ name = "x", type = "Enum()" }"#,
            r#"{ name = "x", type = "Enum" }"#,
        ] {
            let err = with_slot("action", slot).validate().unwrap_err();
            assert!(err.to_string().contains("cannot be asked for"), "{slot}: {err}");
        }

        let required = with_slot("trigger", r#"{ name = "x", type = "Any", required = true }"#);
        assert!(required.validate().is_err());

        // optional trigger outputs are never asked for
        let optional = with_slot("trigger", r#"{ name = "x", type = "Array(String)" }"#);
        assert!(optional.validate().is_ok());
        let askable = with_slot("action", r#"{ name = "x", type = "Enum(a,b)" }"#);
        assert!(askable.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "RULECRAFT_PARSER_URL" => Some("https://other.example.com".into()),
            "RULECRAFT_LOCALE" => Some("it_IT".into()),
            _ => None,
        });
        assert_eq!(config.parser.url, "https://other.example.com");
        assert_eq!(config.parser.locale, "it_IT");
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.devices[0].name, "Desk Lamp");

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        broken.write_all(b"[parser\nurl = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(broken.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("en_US"));
        assert!(toml_str.contains("confirm_programs = true"));
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }
}
