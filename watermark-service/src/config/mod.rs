use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

pub const DEFAULT_SCRATCH_DIR: &str = "tmp";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub scratch: ScratchConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScratchConfig {
    /// Root under which per-request directories are created. Relative paths resolve
    /// against the working directory.
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Upper bound on the whole multipart body.
    pub max_bytes: usize,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            dir: DEFAULT_SCRATCH_DIR.to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl WatermarkConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let default_max = DEFAULT_MAX_UPLOAD_BYTES.to_string();
        let max_bytes = get_env("MAX_UPLOAD_BYTES", Some(&default_max), is_prod)?;

        Ok(WatermarkConfig {
            common,
            scratch: ScratchConfig {
                dir: get_env("SCRATCH_DIR", Some(DEFAULT_SCRATCH_DIR), is_prod)?,
            },
            upload: UploadConfig {
                max_bytes: parse_max_bytes(&max_bytes)?,
            },
        })
    }
}

fn parse_max_bytes(raw: &str) -> Result<usize, AppError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::ConfigError(anyhow::anyhow!(
            "MAX_UPLOAD_BYTES must be a positive integer, got '{}'",
            raw
        ))),
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    if let Ok(val) = env::var(key) {
        return Ok(val);
    }
    match default {
        Some(def) if !is_prod => Ok(def.to_string()),
        Some(_) => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is required in production but not set",
            key
        ))),
        None => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is required but not set",
            key
        ))),
    }
}
