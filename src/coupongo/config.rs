use crate::error::{CouponError, Result};
use directories::BaseDirs;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_FILENAME: &str = ".coupongo.json";
/// Overrides the config file location (used by tests and scripted setups).
pub const CONFIG_PATH_ENV: &str = "COUPONGO_CONFIG";
pub const DEFAULT_ENVIRONMENT: &str = "test";
pub const DEFAULT_CURRENCY: &str = "usd";

const CONFIG_FILE_MODE: u32 = 0o600;
const MIN_API_KEY_LEN: usize = 20;

/// How command results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    List,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::List => "list",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "list" => Ok(OutputFormat::List),
            other => Err(format!(
                "invalid output format: {} (must be table, json, or list)",
                other
            )),
        }
    }
}

// Older config files may carry an empty string here.
impl<'de> Deserialize<'de> for OutputFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Ok(OutputFormat::default());
        }
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A named Stripe account profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub stripe_api_key: String,

    #[serde(default = "default_currency")]
    pub default_currency: String,

    #[serde(default)]
    pub output_format: OutputFormat,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_environment_name() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            default_currency: default_currency(),
            output_format: OutputFormat::default(),
        }
    }
}

impl Environment {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            stripe_api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.stripe_api_key.is_empty()
    }

    pub fn masked_api_key(&self) -> String {
        mask_api_key(&self.stripe_api_key)
    }

    fn fill_defaults(&mut self) {
        let currency = self.default_currency.trim().to_ascii_lowercase();
        self.default_currency = if currency.is_empty() {
            default_currency()
        } else {
            currency
        };
    }
}

/// The on-disk configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_environment_name")]
    pub current_environment: String,

    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,
}

impl Default for Config {
    fn default() -> Self {
        let mut environments = BTreeMap::new();
        environments.insert(default_environment_name(), Environment::default());
        Self {
            current_environment: default_environment_name(),
            environments,
        }
    }
}

impl Config {
    /// Restores the at-least-one-environment invariant after deserializing.
    fn normalize(&mut self) {
        if self.current_environment.trim().is_empty() {
            self.current_environment = default_environment_name();
        }
        if self.environments.is_empty() {
            self.environments
                .insert(default_environment_name(), Environment::default());
        }
        for env in self.environments.values_mut() {
            env.fill_defaults();
        }
    }

    /// Copy of the config with every API key masked, safe to print.
    pub fn masked(&self) -> Config {
        let environments = self
            .environments
            .iter()
            .map(|(name, env)| {
                let mut env = env.clone();
                env.stripe_api_key = env.masked_api_key();
                (name.clone(), env)
            })
            .collect();
        Config {
            current_environment: self.current_environment.clone(),
            environments,
        }
    }
}

/// Owns the loaded [`Config`] and writes it back after every mutation.
///
/// There is no locking: two processes mutating the same file race and the
/// last write wins.
#[derive(Debug)]
pub struct ConfigStore {
    config: Config,
    path: PathBuf,
}

impl ConfigStore {
    /// Load config from `path`, creating (and saving) the default config if
    /// the file does not exist yet.
    pub fn load<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            let store = Self {
                config: Config::default(),
                path,
            };
            store.save()?;
            tracing::debug!(path = %store.path.display(), "created default configuration");
            return Ok(store);
        }

        let content = fs::read_to_string(&path).map_err(|e| not_loaded(&path, e))?;
        let mut config: Config = serde_json::from_str(&content).map_err(|e| not_loaded(&path, e))?;
        config.normalize();

        tracing::debug!(
            path = %path.display(),
            environments = config.environments.len(),
            "loaded configuration"
        );
        Ok(Self { config, path })
    }

    /// Write the config as pretty JSON, readable by the owner only.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(&self.config)?;
        write_private(&self.path, content.as_bytes())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_environment_name(&self) -> &str {
        &self.config.current_environment
    }

    pub fn environment(&self, name: &str) -> Result<&Environment> {
        self.config
            .environments
            .get(name)
            .ok_or_else(|| CouponError::EnvironmentNotFound(name.to_string()))
    }

    pub fn current_environment(&self) -> Result<&Environment> {
        self.environment(self.current_environment_name())
    }

    /// Resolve an explicit environment name, or the current one when `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<(String, &Environment)> {
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => self.current_environment_name().to_string(),
        };
        let env = self.environment(&name)?;
        Ok((name, env))
    }

    pub fn environment_names(&self) -> Vec<String> {
        self.config.environments.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.config.environments.contains_key(name)
    }

    pub fn set_current_environment(&mut self, name: &str) -> Result<()> {
        self.environment(name)?;
        self.config.current_environment = name.to_string();
        self.save()
    }

    /// Insert (or replace) an environment. A non-empty key must pass
    /// [`validate_api_key`]; blank currency and format fall back to defaults.
    pub fn add_environment(&mut self, name: &str, mut env: Environment) -> Result<()> {
        validate_environment_name(name)?;

        if env.has_api_key() {
            validate_api_key(&env.stripe_api_key)?;
        }
        env.fill_defaults();
        env.default_currency = validate_currency(&env.default_currency)?;

        self.config.environments.insert(name.to_string(), env);
        self.save()
    }

    pub fn remove_environment(&mut self, name: &str) -> Result<()> {
        self.environment(name)?;

        if self.config.environments.len() == 1 {
            return Err(CouponError::validation(
                "cannot remove the last environment",
            ));
        }

        self.config.environments.remove(name);

        if self.config.current_environment == name {
            if let Some(first) = self.config.environments.keys().next() {
                self.config.current_environment = first.clone();
            }
        }

        self.save()
    }

    pub fn update_environment_api_key(&mut self, name: &str, api_key: &str) -> Result<()> {
        self.environment(name)?;
        validate_api_key(api_key)?;

        if let Some(env) = self.config.environments.get_mut(name) {
            env.stripe_api_key = api_key.to_string();
        }
        self.save()
    }

    /// Drop every environment and restore the single default one.
    pub fn reset(&mut self) -> Result<()> {
        self.config = Config::default();
        self.save()
    }
}

/// Config file location: `$COUPONGO_CONFIG`, else `~/.coupongo.json`.
pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(CONFIG_FILENAME))
        .ok_or_else(|| CouponError::ConfigNotLoaded {
            path: PathBuf::from(CONFIG_FILENAME),
            reason: "could not determine home directory".to_string(),
        })
}

/// Stripe secret (`sk_`) or restricted (`rk_`) keys only.
pub fn validate_api_key(api_key: &str) -> Result<()> {
    if api_key.is_empty() {
        return Err(CouponError::InvalidApiKeyFormat(
            "key cannot be empty".to_string(),
        ));
    }

    if !api_key.starts_with("sk_") && !api_key.starts_with("rk_") {
        return Err(CouponError::InvalidApiKeyFormat(
            "key must start with 'sk_' or 'rk_'".to_string(),
        ));
    }

    if api_key.len() < MIN_API_KEY_LEN {
        return Err(CouponError::InvalidApiKeyFormat("key too short".to_string()));
    }

    Ok(())
}

/// `sk_****abcd` style rendering of a key for display.
pub fn mask_api_key(api_key: &str) -> String {
    if api_key.is_empty() {
        return "Not set".to_string();
    }

    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 10 {
        return "****".to_string();
    }

    let prefix: String = chars[..3].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", prefix, suffix)
}

/// Three ASCII letters, returned lowercased.
pub fn validate_currency(currency: &str) -> Result<String> {
    let currency = currency.trim();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CouponError::validation(format!(
            "currency should be 3 letters (e.g., usd, eur), got '{}'",
            currency
        )));
    }
    Ok(currency.to_ascii_lowercase())
}

pub fn validate_environment_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CouponError::validation("environment name cannot be empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(CouponError::validation(
            "environment name cannot contain spaces",
        ));
    }
    Ok(())
}

fn not_loaded(path: &Path, err: impl fmt::Display) -> CouponError {
    CouponError::ConfigNotLoaded {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(CONFIG_FILE_MODE)
        .open(path)?;
    // mode() is only honoured when the file is created; narrow an existing
    // file before the key lands in it
    file.set_permissions(fs::Permissions::from_mode(CONFIG_FILE_MODE))?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LIVE_KEY: &str = "sk_live_1234567890abcdefghij";
    const TEST_KEY: &str = "sk_test_abcdefghij1234567890";

    fn temp_store() -> (TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(dir.path().join("config.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn load_missing_file_creates_default() {
        let (dir, store) = temp_store();

        assert!(dir.path().join("config.json").exists());
        assert_eq!(store.current_environment_name(), "test");
        assert_eq!(store.environment_names(), vec!["test".to_string()]);

        let env = store.current_environment().unwrap();
        assert_eq!(env.default_currency, "usd");
        assert_eq!(env.output_format, OutputFormat::Table);
        assert!(!env.has_api_key());
    }

    #[test]
    fn save_then_load_round_trips() {
        let (dir, mut store) = temp_store();
        store
            .add_environment("production", Environment::with_api_key(LIVE_KEY))
            .unwrap();
        store
            .add_environment(
                "eu",
                Environment {
                    stripe_api_key: TEST_KEY.to_string(),
                    default_currency: "EUR".to_string(),
                    output_format: OutputFormat::List,
                },
            )
            .unwrap();
        store.set_current_environment("eu").unwrap();

        let loaded = ConfigStore::load(dir.path().join("config.json")).unwrap();
        assert_eq!(loaded.config(), store.config());
        assert_eq!(loaded.current_environment_name(), "eu");
        assert_eq!(loaded.environment("eu").unwrap().default_currency, "eur");
    }

    #[test]
    fn removing_down_to_last_environment() {
        let (_dir, mut store) = temp_store();
        for name in ["a", "b", "c"] {
            store
                .add_environment(name, Environment::with_api_key(TEST_KEY))
                .unwrap();
        }

        for name in ["a", "b", "c"] {
            store.remove_environment(name).unwrap();
        }

        let err = store.remove_environment("test").unwrap_err();
        assert!(matches!(err, CouponError::Validation(_)));
        assert_eq!(store.environment_names(), vec!["test".to_string()]);
    }

    #[test]
    fn removing_current_environment_reassigns_current() {
        let (_dir, mut store) = temp_store();
        store
            .add_environment("staging", Environment::with_api_key(TEST_KEY))
            .unwrap();
        store.set_current_environment("staging").unwrap();

        store.remove_environment("staging").unwrap();
        assert_eq!(store.current_environment_name(), "test");
    }

    #[test]
    fn removing_unknown_environment_fails() {
        let (_dir, mut store) = temp_store();
        let err = store.remove_environment("nope").unwrap_err();
        assert!(matches!(err, CouponError::EnvironmentNotFound(name) if name == "nope"));
    }

    #[test]
    fn set_current_requires_existing_environment() {
        let (_dir, mut store) = temp_store();
        let err = store.set_current_environment("production").unwrap_err();
        assert!(matches!(err, CouponError::EnvironmentNotFound(_)));
        assert_eq!(store.current_environment_name(), "test");
    }

    #[test]
    fn add_environment_validates_name_and_key() {
        let (_dir, mut store) = temp_store();

        let err = store
            .add_environment("", Environment::default())
            .unwrap_err();
        assert!(matches!(err, CouponError::Validation(_)));

        let err = store
            .add_environment("prod", Environment::with_api_key("pk_live_1234567890abcdef"))
            .unwrap_err();
        assert!(matches!(err, CouponError::InvalidApiKeyFormat(_)));

        // Empty keys are allowed and prompted for later.
        store.add_environment("dev", Environment::default()).unwrap();
        assert!(store.contains("dev"));
    }

    #[test]
    fn add_environment_fills_defaults() {
        let (_dir, mut store) = temp_store();
        store
            .add_environment(
                "dev",
                Environment {
                    stripe_api_key: String::new(),
                    default_currency: " ".to_string(),
                    output_format: OutputFormat::Json,
                },
            )
            .unwrap();
        let env = store.environment("dev").unwrap();
        assert_eq!(env.default_currency, "usd");
        assert_eq!(env.output_format, OutputFormat::Json);
    }

    #[test]
    fn update_api_key_validates_and_persists() {
        let (dir, mut store) = temp_store();

        let err = store.update_environment_api_key("test", "abc").unwrap_err();
        assert!(matches!(err, CouponError::InvalidApiKeyFormat(_)));

        let err = store
            .update_environment_api_key("missing", TEST_KEY)
            .unwrap_err();
        assert!(matches!(err, CouponError::EnvironmentNotFound(_)));

        store.update_environment_api_key("test", TEST_KEY).unwrap();
        let loaded = ConfigStore::load(dir.path().join("config.json")).unwrap();
        assert_eq!(loaded.environment("test").unwrap().stripe_api_key, TEST_KEY);
    }

    #[test]
    fn reset_restores_single_default() {
        let (_dir, mut store) = temp_store();
        store
            .add_environment("production", Environment::with_api_key(LIVE_KEY))
            .unwrap();
        store.set_current_environment("production").unwrap();

        store.reset().unwrap();
        assert_eq!(store.config(), &Config::default());
    }

    #[test]
    fn resolve_prefers_explicit_name() {
        let (_dir, mut store) = temp_store();
        store
            .add_environment("production", Environment::with_api_key(LIVE_KEY))
            .unwrap();

        let (name, env) = store.resolve(Some("production")).unwrap();
        assert_eq!(name, "production");
        assert_eq!(env.stripe_api_key, LIVE_KEY);

        let (name, _) = store.resolve(None).unwrap();
        assert_eq!(name, "test");

        assert!(store.resolve(Some("ghost")).is_err());
    }

    #[test]
    fn load_normalizes_sparse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"current_environment": "", "environments": {"dev": {"stripe_api_key": "", "default_currency": "", "output_format": ""}}}"#,
        )
        .unwrap();

        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.current_environment_name(), "test");
        let dev = store.environment("dev").unwrap();
        assert_eq!(dev.default_currency, "usd");
        assert_eq!(dev.output_format, OutputFormat::Table);
    }

    #[test]
    fn load_with_no_environments_restores_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"current_environment": "test", "environments": {}}"#).unwrap();

        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.environment_names(), vec!["test".to_string()]);
    }

    #[test]
    fn load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ConfigStore::load(&path).unwrap_err();
        assert!(matches!(err, CouponError::ConfigNotLoaded { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, mut store) = temp_store();
        store.update_environment_api_key("test", TEST_KEY).unwrap();

        let mode = fs::metadata(dir.path().join("config.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn save_narrows_existing_world_readable_file() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, mut store) = temp_store();
        let path = dir.path().join("config.json");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        store.update_environment_api_key("test", TEST_KEY).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(fs::read_to_string(&path).unwrap().contains(TEST_KEY));
    }

    #[test]
    fn api_key_validator() {
        assert!(validate_api_key(TEST_KEY).is_ok());
        assert!(validate_api_key("rk_test_abcdefghij1234567").is_ok());

        for bad in ["abc", "", "sk_short", "pk_test_abcdefghij1234567890"] {
            assert!(
                matches!(validate_api_key(bad), Err(CouponError::InvalidApiKeyFormat(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn masks_api_keys() {
        assert_eq!(mask_api_key(""), "Not set");
        assert_eq!(mask_api_key("sk_123"), "****");
        assert_eq!(mask_api_key(TEST_KEY), "sk_****7890");
    }

    #[test]
    fn masked_config_hides_keys() {
        let (_dir, mut store) = temp_store();
        store.update_environment_api_key("test", TEST_KEY).unwrap();

        let masked = store.config().masked();
        assert_eq!(masked.environments["test"].stripe_api_key, "sk_****7890");
        assert_eq!(store.environment("test").unwrap().stripe_api_key, TEST_KEY);
    }

    #[test]
    fn currency_validation() {
        assert_eq!(validate_currency("EUR").unwrap(), "eur");
        assert!(validate_currency("euro").is_err());
        assert!(validate_currency("u5d").is_err());
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("list".parse::<OutputFormat>().unwrap(), OutputFormat::List);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
