//! Configuration sources and SMTP settings.
//!
//! Keys are flat, `:`-separated paths such as `Smtp:SmtpServer`, compared
//! without regard to case. Sources are read on every send, so a change made
//! through [`MemoryConfig::set`] is seen by the next call.

use crate::environment::Environment;
use crate::error::{ConfigError, Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

/// Configuration keys read by [`SmtpSettings::load`].
pub mod keys {
    /// SMTP server host name.
    pub const SMTP_SERVER: &str = "Smtp:SmtpServer";
    /// SMTP server port.
    pub const PORT: &str = "Smtp:Port";
    /// SMTP user name.
    pub const USERNAME: &str = "Smtp:Username";
    /// SMTP password.
    pub const PASSWORD: &str = "Smtp:Password";
    /// Sender address.
    pub const EMAIL_FROM_ADDRESS: &str = "Smtp:EmailFromAddress";
    /// Deployment environment name.
    pub const ENVIRONMENT: &str = "Smtp:Environment";
}

/// Read-only key/value configuration.
pub trait ConfigSource: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

fn normalize_key(key: &str) -> String {
    key.to_ascii_lowercase()
}

/// In-memory configuration, safe to update while other tasks read it.
#[derive(Debug, Default)]
pub struct MemoryConfig {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, replacing any previous one.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize_key(key), value.into());
    }

    /// Removes a value.
    pub fn remove(&self, key: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&normalize_key(key));
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryConfig
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|(k, v)| (normalize_key(k.as_ref()), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }
}

impl ConfigSource for MemoryConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_key(key))
            .cloned()
    }
}

/// Configuration loaded from an `appsettings.json`-style document.
///
/// Nested objects flatten to `Section:Key`, array elements to
/// `Section:0`, `Section:1`, ... Scalars are stored as their text form and
/// `null` values are skipped.
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    values: HashMap<String, String>,
}

impl JsonConfig {
    /// Loads and flattens a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not JSON, or its root
    /// is not an object.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parses and flattens a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or its root is not an object.
    pub fn from_json(text: &str) -> std::result::Result<Self, ConfigError> {
        let root: Value = serde_json::from_str(text)?;
        if !root.is_object() {
            return Err(ConfigError::NotAnObject);
        }

        let mut values = HashMap::new();
        flatten(&root, None, &mut values);
        Ok(Self { values })
    }
}

fn flatten(value: &Value, prefix: Option<&str>, out: &mut HashMap<String, String>) {
    let join = |segment: &str| match prefix {
        Some(prefix) => format!("{prefix}:{segment}"),
        None => segment.to_string(),
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(child, Some(&join(key)), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(child, Some(&join(&index.to_string())), out);
            }
        }
        Value::Null => {}
        Value::String(text) => {
            if let Some(prefix) = prefix {
                out.insert(normalize_key(prefix), text.clone());
            }
        }
        Value::Bool(_) | Value::Number(_) => {
            if let Some(prefix) = prefix {
                out.insert(normalize_key(prefix), value.to_string());
            }
        }
    }
}

impl ConfigSource for JsonConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(&normalize_key(key)).cloned()
    }
}

/// Configuration from environment variables.
///
/// `Smtp:Port` is looked up as `Smtp__Port`, after the optional prefix
/// (`MAILBRIDGE_Smtp__Port` with prefix `MAILBRIDGE_`). Variables are
/// captured when the source is created.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    values: HashMap<String, String>,
}

impl EnvConfig {
    /// Captures the process environment without a prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vars(std::env::vars(), "")
    }

    /// Captures the process environment, keeping only variables that start
    /// with `prefix`.
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        Self::from_vars(std::env::vars(), prefix)
    }

    /// Builds the source from explicit name/value pairs.
    #[must_use]
    pub fn from_vars<I>(vars: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let values = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix(prefix)?.replace("__", ":");
                (!key.is_empty()).then(|| (normalize_key(&key), value))
            })
            .collect();
        Self { values }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(&normalize_key(key)).cloned()
    }
}

/// Ordered stack of sources; later sources override earlier ones.
#[derive(Default)]
pub struct LayeredConfig {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl LayeredConfig {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a source on top of the stack.
    #[must_use]
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl fmt::Debug for LayeredConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredConfig")
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl ConfigSource for LayeredConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.sources.iter().rev().find_map(|source| source.get(key))
    }
}

/// Snapshot of the SMTP settings taken at the start of a send.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    /// Server host name.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Sender address.
    pub from_address: String,
    /// Deployment environment.
    pub environment: Environment,
}

impl SmtpSettings {
    /// Reads the settings from `source`.
    ///
    /// Missing strings read as empty. The port defaults to
    /// [`mailbridge_smtp::DEFAULT_PORT`] when missing, zero, or unparseable.
    #[must_use]
    pub fn load<C: ConfigSource + ?Sized>(source: &C) -> Self {
        let text = |key: &str| source.get(key).unwrap_or_default();

        Self {
            server: text(keys::SMTP_SERVER),
            port: parse_port(source.get(keys::PORT).as_deref()),
            username: text(keys::USERNAME),
            password: text(keys::PASSWORD),
            from_address: text(keys::EMAIL_FROM_ADDRESS),
            environment: Environment::resolve(source.get(keys::ENVIRONMENT).as_deref()),
        }
    }

    /// Checks that every field needed to send is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the server, username, password or
    /// sender address is empty.
    pub fn validate(&self) -> Result<()> {
        if self.server.is_empty()
            || self.username.is_empty()
            || self.password.is_empty()
            || self.from_address.is_empty()
        {
            return Err(Error::Configuration);
        }
        Ok(())
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_address", &self.from_address)
            .field("environment", &self.environment)
            .finish()
    }
}

fn parse_port(raw: Option<&str>) -> u16 {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return mailbridge_smtp::DEFAULT_PORT;
    };

    match raw.parse::<u16>() {
        Ok(0) => mailbridge_smtp::DEFAULT_PORT,
        Ok(port) => port,
        Err(e) => {
            warn!(value = raw, error = %e, "Ignoring invalid SMTP port");
            mailbridge_smtp::DEFAULT_PORT
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> MemoryConfig {
        [
            (keys::SMTP_SERVER, "webmail.bob.com"),
            (keys::PORT, "20"),
            (keys::USERNAME, "John"),
            (keys::PASSWORD, "1234Password"),
            (keys::EMAIL_FROM_ADDRESS, "noreply@bob.com"),
            (keys::ENVIRONMENT, "Production"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_load_reads_every_field() {
        let settings = SmtpSettings::load(&base());
        assert_eq!(settings.server, "webmail.bob.com");
        assert_eq!(settings.port, 20);
        assert_eq!(settings.username, "John");
        assert_eq!(settings.password, "1234Password");
        assert_eq!(settings.from_address, "noreply@bob.com");
        assert_eq!(settings.environment, Environment::Production);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_port_defaults() {
        assert_eq!(parse_port(None), 25);
        assert_eq!(parse_port(Some("")), 25);
        assert_eq!(parse_port(Some("0")), 25);
        assert_eq!(parse_port(Some("not-a-port")), 25);
        assert_eq!(parse_port(Some("70000")), 25);
        assert_eq!(parse_port(Some(" 587 ")), 587);
    }

    #[test]
    fn test_validate_rejects_each_blank_field() {
        for key in [
            keys::SMTP_SERVER,
            keys::USERNAME,
            keys::PASSWORD,
            keys::EMAIL_FROM_ADDRESS,
        ] {
            let config = base();
            config.set(key, "");
            let err = SmtpSettings::load(&config).validate().unwrap_err();
            assert!(matches!(err, Error::Configuration), "{key}");
        }
    }

    #[test]
    fn test_missing_keys_read_as_empty() {
        let settings = SmtpSettings::load(&MemoryConfig::new());
        assert!(settings.server.is_empty());
        assert_eq!(settings.port, 25);
        assert_eq!(settings.environment, Environment::LocalDev);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", SmtpSettings::load(&base()));
        assert!(!rendered.contains("1234Password"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_memory_config_is_case_insensitive_and_mutable() {
        let config = MemoryConfig::new();
        config.set("Smtp:SmtpServer", "a.example.com");
        assert_eq!(config.get("smtp:smtpserver").as_deref(), Some("a.example.com"));

        config.set("SMTP:SMTPSERVER", "b.example.com");
        assert_eq!(config.get(keys::SMTP_SERVER).as_deref(), Some("b.example.com"));

        config.remove(keys::SMTP_SERVER);
        assert_eq!(config.get(keys::SMTP_SERVER), None);
    }

    #[test]
    fn test_json_config_flattens_sections() {
        let config = JsonConfig::from_json(
            r#"{
                "Smtp": {
                    "SmtpServer": "webmail.bob.com",
                    "Port": 2525,
                    "Environment": "Test",
                    "Unused": null
                },
                "Logging": { "Targets": ["console", "file"], "Verbose": true }
            }"#,
        )
        .unwrap();

        assert_eq!(config.get(keys::SMTP_SERVER).as_deref(), Some("webmail.bob.com"));
        assert_eq!(config.get(keys::PORT).as_deref(), Some("2525"));
        assert_eq!(config.get("Logging:Targets:1").as_deref(), Some("file"));
        assert_eq!(config.get("Logging:Verbose").as_deref(), Some("true"));
        assert_eq!(config.get("Smtp:Unused"), None);

        let settings = SmtpSettings::load(&config);
        assert_eq!(settings.port, 2525);
        assert_eq!(settings.environment, Environment::Test);
    }

    #[test]
    fn test_json_config_errors() {
        assert!(matches!(
            JsonConfig::from_json("[1, 2]"),
            Err(ConfigError::NotAnObject)
        ));
        assert!(matches!(
            JsonConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            JsonConfig::load("/nonexistent/mailbridge/appsettings.json"),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_env_config_maps_double_underscore() {
        let vars = vec![
            ("MAILBRIDGE_Smtp__SmtpServer".to_string(), "env.bob.com".to_string()),
            ("MAILBRIDGE_Smtp__Port".to_string(), "587".to_string()),
            ("Smtp__Username".to_string(), "ignored".to_string()),
            ("MAILBRIDGE_".to_string(), "empty".to_string()),
        ];
        let config = EnvConfig::from_vars(vars, "MAILBRIDGE_");

        assert_eq!(config.get(keys::SMTP_SERVER).as_deref(), Some("env.bob.com"));
        assert_eq!(config.get(keys::PORT).as_deref(), Some("587"));
        assert_eq!(config.get(keys::USERNAME), None);
    }

    #[test]
    fn test_layered_config_later_sources_win() {
        let file = JsonConfig::from_json(
            r#"{ "Smtp": { "SmtpServer": "file.bob.com", "Username": "John" } }"#,
        )
        .unwrap();
        let env = EnvConfig::from_vars(
            vec![("Smtp__SmtpServer".to_string(), "env.bob.com".to_string())],
            "",
        );
        let config = LayeredConfig::new().with_source(file).with_source(env);

        assert_eq!(config.get(keys::SMTP_SERVER).as_deref(), Some("env.bob.com"));
        assert_eq!(config.get(keys::USERNAME).as_deref(), Some("John"));
        assert_eq!(config.get(keys::PASSWORD), None);
    }

    #[test]
    fn test_shared_source_through_arc() {
        let shared = Arc::new(base());
        let layered = LayeredConfig::new().with_source(Arc::clone(&shared));
        shared.set(keys::USERNAME, "Jane");
        assert_eq!(layered.get(keys::USERNAME).as_deref(), Some("Jane"));
    }
}
