//! Configuration loading and resolution
//!
//! Every option is resolved once at process start in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`MATHMAP_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error; the service starts on defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default chat-completion endpoint
pub const DEFAULT_ENDPOINT_URL: &str = "https://api.deepseek.com/v1/chat/completions";

/// Default completion model
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Default Tesseract language hint (simplified Chinese + English)
pub const DEFAULT_LANGUAGE_HINT: &str = "chi_sim+eng";

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// `host:port` the HTTP server listens on
    pub bind_address: String,
    pub llm: LlmConfig,
    pub ocr: OcrConfig,
    pub auth: AuthConfig,
}

/// Language-model completion API settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub endpoint_url: String,
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// OCR engine settings
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract executable (bare name is looked up on PATH)
    pub tesseract_path: PathBuf,
    pub language_hint: String,
}

/// Bearer token settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Signing secret; `None` means a generated secret stored in the database
    pub jwt_secret: Option<String>,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            language_hint: DEFAULT_LANGUAGE_HINT.to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            access_token_ttl_secs: 5 * 60,
            refresh_token_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            llm: LlmConfig::default(),
            ocr: OcrConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// TOML file layout; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub llm: TomlLlmSection,
    pub ocr: TomlOcrSection,
    pub auth: TomlAuthSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlLlmSection {
    pub api_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlOcrSection {
    pub tesseract_path: Option<PathBuf>,
    pub language_hint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlAuthSection {
    pub jwt_secret: Option<String>,
    pub access_token_ttl_secs: Option<i64>,
    pub refresh_token_ttl_secs: Option<i64>,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub api_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub tesseract_path: Option<PathBuf>,
    pub language_hint: Option<String>,
    pub jwt_secret: Option<String>,
}

impl ConfigOverrides {
    /// Read `MATHMAP_*` environment variables
    ///
    /// Unparsable numeric values are ignored with a warning.
    pub fn from_env() -> Self {
        let timeout_secs = env_value("MATHMAP_LLM_TIMEOUT_SECS").and_then(|raw| {
            raw.parse::<u64>()
                .map_err(|e| warn!("Ignoring MATHMAP_LLM_TIMEOUT_SECS={}: {}", raw, e))
                .ok()
        });

        Self {
            config_file: env_value("MATHMAP_CONFIG").map(PathBuf::from),
            database_path: env_value("MATHMAP_DATABASE_PATH").map(PathBuf::from),
            bind_address: env_value("MATHMAP_BIND_ADDRESS"),
            api_key: env_value("MATHMAP_LLM_API_KEY"),
            endpoint_url: env_value("MATHMAP_LLM_ENDPOINT_URL"),
            timeout_secs,
            tesseract_path: env_value("MATHMAP_TESSERACT_PATH").map(PathBuf::from),
            language_hint: env_value("MATHMAP_OCR_LANGUAGE_HINT"),
            jwt_secret: env_value("MATHMAP_JWT_SECRET"),
        }
    }

    /// Field-wise merge: values in `self` win, gaps are filled from `lower`
    pub fn or(self, lower: ConfigOverrides) -> Self {
        Self {
            config_file: self.config_file.or(lower.config_file),
            database_path: self.database_path.or(lower.database_path),
            bind_address: self.bind_address.or(lower.bind_address),
            api_key: self.api_key.or(lower.api_key),
            endpoint_url: self.endpoint_url.or(lower.endpoint_url),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
            tesseract_path: self.tesseract_path.or(lower.tesseract_path),
            language_hint: self.language_hint.or(lower.language_hint),
            jwt_secret: self.jwt_secret.or(lower.jwt_secret),
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from command-line values, environment, TOML and defaults
    pub fn resolve(cli: ConfigOverrides) -> Result<Self> {
        let overrides = cli.or(ConfigOverrides::from_env());

        let toml_config = match locate_config_file(overrides.config_file.as_deref()) {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                load_toml_config(&path)?
            }
            None => {
                warn!("No config file found, using defaults");
                TomlConfig::default()
            }
        };

        let config = Self::merge(overrides, toml_config);
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides and TOML values on top of compiled defaults
    pub fn merge(overrides: ConfigOverrides, toml_config: TomlConfig) -> Self {
        let defaults = ServiceConfig::default();
        let TomlConfig {
            database_path,
            bind_address,
            llm,
            ocr,
            auth,
        } = toml_config;

        Self {
            database_path: overrides
                .database_path
                .or(database_path)
                .unwrap_or(defaults.database_path),
            bind_address: overrides
                .bind_address
                .or(bind_address)
                .unwrap_or(defaults.bind_address),
            llm: LlmConfig {
                api_key: overrides
                    .api_key
                    .or(llm.api_key)
                    .unwrap_or(defaults.llm.api_key),
                endpoint_url: overrides
                    .endpoint_url
                    .or(llm.endpoint_url)
                    .unwrap_or(defaults.llm.endpoint_url),
                model: llm.model.unwrap_or(defaults.llm.model),
                timeout_secs: overrides
                    .timeout_secs
                    .or(llm.timeout_secs)
                    .unwrap_or(defaults.llm.timeout_secs),
                temperature: llm.temperature.unwrap_or(defaults.llm.temperature),
                max_tokens: llm.max_tokens.unwrap_or(defaults.llm.max_tokens),
            },
            ocr: OcrConfig {
                tesseract_path: overrides
                    .tesseract_path
                    .or(ocr.tesseract_path)
                    .unwrap_or(defaults.ocr.tesseract_path),
                language_hint: overrides
                    .language_hint
                    .or(ocr.language_hint)
                    .unwrap_or(defaults.ocr.language_hint),
            },
            auth: AuthConfig {
                jwt_secret: overrides.jwt_secret.or(auth.jwt_secret),
                access_token_ttl_secs: auth
                    .access_token_ttl_secs
                    .unwrap_or(defaults.auth.access_token_ttl_secs),
                refresh_token_ttl_secs: auth
                    .refresh_token_ttl_secs
                    .unwrap_or(defaults.auth.refresh_token_ttl_secs),
            },
        }
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.llm.timeout_secs == 0 {
            return Err(Error::Config("llm.timeout_secs must be positive".to_string()));
        }
        if self.auth.access_token_ttl_secs <= 0 || self.auth.refresh_token_ttl_secs <= 0 {
            return Err(Error::Config("token lifetimes must be positive".to_string()));
        }
        if self.ocr.language_hint.trim().is_empty() {
            return Err(Error::Config("ocr.language_hint must not be empty".to_string()));
        }
        if self.llm.api_key.trim().is_empty() {
            warn!("No completion API key configured; OCR answers will be degraded");
        }
        Ok(())
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Find the config file: explicit path, then user config dir, then /etc
fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!("Config file not found: {}", path.display());
        return None;
    }

    let user_config = dirs::config_dir().map(|d| d.join("mathmap").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/mathmap/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mathmap"))
        .unwrap_or_else(|| PathBuf::from("./mathmap_data"))
        .join("mathmap.db")
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
