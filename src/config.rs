use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub access: AccessConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
    /// Read the session identity from headers set by a fronting identity proxy.
    #[serde(default)]
    pub trust_identity_headers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_mb: default_max_upload_mb(),
            trust_identity_headers: false,
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}
fn default_max_upload_mb() -> u64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            timeout_secs: default_generation_timeout(),
            temperature: None,
        }
    }
}

fn default_model() -> String {
    "gpt-5".to_string()
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_generation_timeout() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Minimum trimmed characters a PDF must yield to be summarized.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    /// Client-side cap on the persistence write.
    #[serde(default = "default_persist_timeout")]
    pub persist_timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            min_text_chars: default_min_text_chars(),
            persist_timeout_secs: default_persist_timeout(),
        }
    }
}

fn default_min_text_chars() -> usize {
    50
}
fn default_persist_timeout() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AccessConfig {
    /// Hex SHA-256 of the password required to upload. Unset means open.
    #[serde(default)]
    pub password_sha256: Option<String>,
}

impl Config {
    /// Configuration with defaults everywhere and the database under `./data`.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/rulesheet.sqlite"),
            },
            server: ServerConfig::default(),
            generation: GenerationConfig::default(),
            upload: UploadConfig::default(),
            access: AccessConfig::default(),
        }
    }

    /// Apply environment overrides, looking variables up through `var`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = var("OPENAI_MODEL").filter(|v| !v.trim().is_empty()) {
            self.generation.model = model.trim().to_string();
        }
        if let Some(mb) = var("MAX_FILE_SIZE_MB").filter(|v| !v.trim().is_empty()) {
            self.server.max_upload_mb = mb
                .trim()
                .parse()
                .with_context(|| format!("MAX_FILE_SIZE_MB is not a number: {}", mb))?;
        }
        if let Some(hash) = var("UPLOAD_PASSWORD_SHA256").filter(|v| !v.trim().is_empty()) {
            self.access.password_sha256 = Some(hash.trim().to_string());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.max_upload_mb == 0 {
            anyhow::bail!("server.max_upload_mb must be > 0");
        }
        if self.upload.min_text_chars == 0 {
            anyhow::bail!("upload.min_text_chars must be > 0");
        }
        if self.upload.persist_timeout_secs == 0 {
            anyhow::bail!("upload.persist_timeout_secs must be > 0");
        }
        if self.generation.model.trim().is_empty() {
            anyhow::bail!("generation.model must not be empty");
        }
        if let Some(ref hash) = self.access.password_sha256 {
            if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
                anyhow::bail!("access.password_sha256 must be a 64-character hex SHA-256 digest");
            }
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.apply_env(|name| std::env::var(name).ok())?;
    config.validate()?;

    Ok(config)
}

/// Load `path`, or fall back to [`Config::minimal`] plus environment
/// overrides when the file does not exist.
pub fn load_config_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        return load_config(path);
    }
    tracing::debug!(path = %path.display(), "config file not found, using defaults");
    let mut config = Config::minimal();
    config.apply_env(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}
