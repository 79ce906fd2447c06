//! Loader for Prospector configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added, then `PROSPECTOR__`
//! prefixed environment variables win (`PROSPECTOR__GEMINI__MODEL` overrides
//! `gemini.model`). String values may reference other environment variables
//! as `$VAR` or `${VAR}`; unresolved references are left untouched. Every
//! section and key is optional, so an empty source set yields defaults.
//!
//! ```yaml
//! version: "1"
//! gemini:
//!   api_key: "${GEMINI_API_KEY}"
//!   model: gemini-2.5-flash
//! geolocation:
//!   provider: ip          # ip | fixed | none
//!   timeout_ms: 10000
//! logging:
//!   format: json
//! ```
use config::{Config, ConfigError, Environment, File, FileFormat};
use prospector_common::Coordinates;
use prospector_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const CONFIG_FILE_NAME: &str = "prospector.yaml";
const API_KEY_ENV_FALLBACKS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_IP_LOCATION_ENDPOINT: &str = "http://ip-api.com/json";
pub const DEFAULT_LOCATION_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProspectorConfig {
    pub version: Option<String>,
    pub gemini: GeminiSettings,
    pub geolocation: GeolocationSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl GeminiSettings {
    /// The configured key, else `GEMINI_API_KEY`, else `API_KEY`.
    ///
    /// Blank values and placeholders that survived expansion (`${...}`)
    /// count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .and_then(usable_secret)
            .or_else(|| {
                API_KEY_ENV_FALLBACKS
                    .iter()
                    .find_map(|name| std::env::var(name).ok().as_deref().and_then(usable_secret))
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn usable_secret(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains("${") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Where coordinates come from when the user opts in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationProvider {
    /// Approximate position from an IP geolocation service.
    #[default]
    Ip,
    /// Static coordinates from `latitude`/`longitude`.
    Fixed,
    /// No location support on this machine.
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeolocationSettings {
    pub provider: LocationProvider,
    pub endpoint: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timeout_ms: u64,
    /// Initial state of the "use my location" toggle.
    pub use_by_default: bool,
}

impl Default for GeolocationSettings {
    fn default() -> Self {
        Self {
            provider: LocationProvider::Ip,
            endpoint: DEFAULT_IP_LOCATION_ENDPOINT.to_string(),
            latitude: None,
            longitude: None,
            timeout_ms: DEFAULT_LOCATION_TIMEOUT_MS,
            use_by_default: true,
        }
    }
}

impl GeolocationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn fixed_coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub directory: Option<PathBuf>,
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            directory: None,
            filter: "info".to_string(),
        }
    }
}

/// `./prospector.yaml` if present, else `<config dir>/prospector/prospector.yaml` if present.
pub fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("prospector").join(CONFIG_FILE_NAME))
        .filter(|p| p.is_file())
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (files + env overrides).
pub struct ProspectorConfigLoader {
    files: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ProspectorConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ProspectorConfigLoader {
    /// Start with no files; `PROSPECTOR__` environment overrides are applied at load.
    ///
    /// ```
    /// use prospector_config::{ProspectorConfigLoader, DEFAULT_GEMINI_MODEL};
    ///
    /// let config = ProspectorConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
    /// assert_eq!(config.geolocation.timeout_ms, 10_000);
    /// ```
    pub fn new() -> Self {
        Self {
            files: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files = self
            .files
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files = self
            .files
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use prospector_config::{LocationProvider, ProspectorConfigLoader};
    ///
    /// let cfg = ProspectorConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// geolocation:
    ///   provider: fixed
    ///   latitude: 51.5
    ///   longitude: -0.12
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.geolocation.provider, LocationProvider::Fixed);
    /// assert!(cfg.geolocation.fixed_coordinates().is_some());
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.files = self.files.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and deserialize.
    pub fn load(self) -> Result<ProspectorConfig, ConfigError> {
        let cfg = self
            .files
            .add_source(
                Environment::with_prefix("PROSPECTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
