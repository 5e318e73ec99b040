use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct GreetingConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
}

impl GreetingConfig {
    pub fn load() -> Result<Self, AppError> {
        Ok(GreetingConfig {
            common: core_config::Config::load()?,
        })
    }
}
