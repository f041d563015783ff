//! # JukeBox Configuration Module
//!
//! This module provides configuration management for JukeBox, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use jbxconfig::get_config;
//!
//! let config = get_config();
//! let port = config.get_http_port();
//! let autoplay = config.get_player_autoplay()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use jbxutils::guess_local_ip;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("jukebox.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load JukeBox configuration"));
}

const ENV_CONFIG_DIR: &str = "JUKEBOX_CONFIG";
const ENV_PREFIX: &str = "JUKEBOX_CONFIG__";
const CONFIG_DIR_NAME: &str = ".jukebox";

const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_AUTOPLAY: bool = true;
const DEFAULT_POLL_INTERVAL_MS: usize = 250;
const DEFAULT_MIXER_ENABLED: bool = true;
const DEFAULT_MIXER_CONTROL: &str = "PCM,0";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";
const DEFAULT_WEBDRIVER_HEADLESS: bool = true;
const DEFAULT_SPOTIFY_REDIRECT_URI: &str = "http://localhost:8080/api/v1/spotify/auth";

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n.as_u64().map(|v| v as usize).unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            let n = Number::from(size);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Macro to generate getter/setter for string values with default.
///
/// Empty strings are treated as "not configured" and yield the default.
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.is_empty() => Ok(s),
                _ => Ok($default.to_string()),
            }
        }

        pub fn $setter(&self, value: String) -> Result<()> {
            self.set_value($path, Value::String(value))
        }
    };
}

/// Configuration manager for JukeBox
///
/// Holds the merged YAML tree behind a mutex; every setter persists the
/// whole tree back to `config.yaml`.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        if Path::new(CONFIG_DIR_NAME).exists() {
            return CONFIG_DIR_NAME.to_string();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        CONFIG_DIR_NAME.to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!(
                "Config path {} is not a directory",
                path.display()
            ));
        }

        // Test d'écriture
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        Ok(())
    }

    /// Loads the configuration from the specified directory
    ///
    /// 1. Determines the configuration directory (`directory`, then
    ///    `$JUKEBOX_CONFIG`, then `./.jukebox`, then `~/.jukebox`)
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external `config.yaml` file if present
    /// 4. Applies `JUKEBOX_CONFIG__SECTION__KEY` environment overrides
    /// 5. Saves the merged configuration
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&config_dir))?;
        info!(config_dir = %config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path, "Loaded config file");
                let external_value: Value = serde_yaml::from_slice(&data)?;
                merge_yaml(&mut config_value, &lower_keys_value(external_value));
            }
            Err(_) => {
                info!(config_file = %path, "Config file not found, using default embedded config");
            }
        }
        let mut config_value = lower_keys_value(config_value);

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    fn data(&self) -> Result<MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }

    /// Returns the directory holding `config.yaml`
    pub fn config_dir(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = {
            let data = self.data()?;
            serde_yaml::to_string(&*data)?
        };
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// `path` is an array of keys (e.g., `&["host", "http_port"]`).
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.data()?;
            set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    /// Gets a configuration value at the specified path
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data()?;
        get_value_internal(&data, path)
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = convert_env_value(&value);
                if let Err(e) = set_value_internal(config, &key_path, yaml_value) {
                    tracing::warn!(env_var = %key, error = %e, "Ignoring config override");
                }
            }
        }
    }

    /// Récupère un répertoire géré par la configuration
    ///
    /// Le répertoire peut être absolu ou relatif au répertoire de configuration.
    /// Il est créé s'il n'existe pas.
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<String> {
        let dir_path = match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                self.set_value(path, Value::String(default.to_string()))?;
                default.to_string()
            }
        };

        let dir = Path::new(&dir_path);
        let absolute_path = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(dir)
        };

        if !absolute_path.exists() {
            fs::create_dir_all(&absolute_path)?;
            info!(directory = %absolute_path.display(), "Created managed directory");
        }

        Ok(absolute_path.to_string_lossy().to_string())
    }

    /// Directory where runtime data (tokens, ...) is stored
    pub fn get_data_dir(&self) -> Result<String> {
        self.get_managed_dir(&["paths", "data"], "data")
    }

    /// Gets the base URL for the HTTP server
    ///
    /// Falls back to the guessed local IP address when not configured.
    pub fn get_base_url(&self) -> String {
        match self.get_value(&["host", "base_url"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => guess_local_ip(),
        }
    }

    /// Gets the HTTP port from configuration (default 8080)
    pub fn get_http_port(&self) -> u16 {
        match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => n
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(DEFAULT_HTTP_PORT),
            Ok(Value::String(s)) => s.parse::<u16>().unwrap_or_else(|_| {
                tracing::warn!("Invalid HTTP port '{}', using default {}", s, DEFAULT_HTTP_PORT);
                DEFAULT_HTTP_PORT
            }),
            _ => DEFAULT_HTTP_PORT,
        }
    }

    pub fn set_http_port(&self, port: u16) -> Result<()> {
        self.set_value(&["host", "http_port"], Value::Number(Number::from(port)))
    }

    impl_usize_config!(
        get_log_cache_size,
        set_log_cache_size,
        &["host", "logger", "buffer_capacity"],
        DEFAULT_LOG_BUFFER_CAPACITY
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    impl_bool_config!(
        get_player_autoplay,
        set_player_autoplay,
        &["player", "autoplay"],
        DEFAULT_AUTOPLAY
    );

    impl_usize_config!(
        get_player_poll_interval_ms,
        set_player_poll_interval_ms,
        &["player", "poll_interval_ms"],
        DEFAULT_POLL_INTERVAL_MS
    );

    impl_bool_config!(
        get_mixer_enabled,
        set_mixer_enabled,
        &["mixer", "enabled"],
        DEFAULT_MIXER_ENABLED
    );

    impl_string_config!(
        get_mixer_control,
        set_mixer_control,
        &["mixer", "control"],
        DEFAULT_MIXER_CONTROL
    );

    impl_string_config!(
        get_webdriver_url,
        set_webdriver_url,
        &["youtube", "webdriver_url"],
        DEFAULT_WEBDRIVER_URL
    );

    impl_bool_config!(
        get_webdriver_headless,
        set_webdriver_headless,
        &["youtube", "headless"],
        DEFAULT_WEBDRIVER_HEADLESS
    );

    impl_string_config!(
        get_spotify_redirect_uri,
        set_spotify_redirect_uri,
        &["spotify", "redirect_uri"],
        DEFAULT_SPOTIFY_REDIRECT_URI
    );

    /// YouTube Data API key, `None` when search should fall back to slug parsing
    pub fn get_youtube_api_key(&self) -> Option<String> {
        optional_string(self.get_value(&["youtube", "api_key"]))
    }

    /// Spotify Connect device to play on, `None` to use the active device
    pub fn get_spotify_device_id(&self) -> Option<String> {
        optional_string(self.get_value(&["spotify", "device_id"]))
    }

    /// Returns `(client_id, client_secret)` for the Spotify application
    pub fn get_spotify_credentials(&self) -> Result<(String, String)> {
        let client_id = optional_string(self.get_value(&["spotify", "client_id"]))
            .ok_or_else(|| anyhow!("spotify.client_id is not configured"))?;
        let client_secret = optional_string(self.get_value(&["spotify", "client_secret"]))
            .ok_or_else(|| anyhow!("spotify.client_secret is not configured"))?;
        Ok((client_id, client_secret))
    }
}

fn optional_string(value: Result<Value>) -> Option<String> {
    match value {
        Ok(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((first, rest)) = path.split_first() else {
        *data = value;
        return Ok(());
    };
    let Value::Mapping(map) = data else {
        return Err(anyhow!("Current node is not a map"));
    };
    let key = Value::String(first.to_lowercase());
    if rest.is_empty() {
        map.insert(key, value);
        Ok(())
    } else {
        let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
        set_value_internal(entry, rest, value)
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        let Value::Mapping(map) = current else {
            return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
        };
        current = map
            .get(Value::String(key.to_lowercase()))
            .ok_or_else(|| anyhow!("Path {} does not exist", path[..=i].join(".")))?;
    }
    Ok(current.clone())
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (key, lower_keys_value(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

/// Returns the global configuration instance, lazily loaded on first access
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default value.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_in(dir: &tempfile::TempDir) -> Config {
        Config::load_config(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        assert_eq!(config.get_http_port(), 8080);
        assert!(config.get_player_autoplay().unwrap());
        assert_eq!(config.get_player_poll_interval_ms().unwrap(), 250);
        assert_eq!(config.get_mixer_control().unwrap(), "PCM,0");
        assert_eq!(config.get_youtube_api_key(), None);
        assert!(config.get_spotify_credentials().is_err());
        assert!(dir.path().join("config.yaml").exists());
    }

    #[test]
    fn test_external_file_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "Host:\n  HTTP_PORT: 9090\nplayer:\n  autoplay: false\n",
        )
        .unwrap();

        let config = load_in(&dir);
        assert_eq!(config.get_http_port(), 9090);
        assert!(!config.get_player_autoplay().unwrap());
        // Les clés absentes du fichier gardent leur valeur par défaut
        assert_eq!(config.get_log_cache_size().unwrap(), 1000);
    }

    #[test]
    fn test_setters_persist() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        config.set_player_poll_interval_ms(500).unwrap();
        config
            .set_value(&["spotify", "client_id"], Value::String("abc".into()))
            .unwrap();
        config
            .set_value(&["spotify", "client_secret"], Value::String("def".into()))
            .unwrap();

        let reloaded = load_in(&dir);
        assert_eq!(reloaded.get_player_poll_interval_ms().unwrap(), 500);
        assert_eq!(
            reloaded.get_spotify_credentials().unwrap(),
            ("abc".to_string(), "def".to_string())
        );
    }

    #[test]
    fn test_managed_dir_is_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        let data_dir = config.get_data_dir().unwrap();
        assert!(Path::new(&data_dir).starts_with(dir.path()));
        assert!(Path::new(&data_dir).is_dir());
    }

    #[test]
    fn test_env_value_conversion() {
        assert_eq!(convert_env_value("42"), Value::Number(Number::from(42)));
        assert_eq!(convert_env_value("true"), Value::Bool(true));
        assert_eq!(
            convert_env_value("PCM,0"),
            Value::String("PCM,0".to_string())
        );
    }

    #[test]
    fn test_set_value_internal_creates_intermediate_maps() {
        let mut root = Value::Mapping(Mapping::new());
        set_value_internal(&mut root, &["A", "b", "c"], Value::Bool(true)).unwrap();
        assert_eq!(
            get_value_internal(&root, &["a", "B", "c"]).unwrap(),
            Value::Bool(true)
        );
        assert!(get_value_internal(&root, &["a", "x"]).is_err());
    }
}
