use serde::Deserialize;

use crate::models::options::EngineSettings;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Cloudflare account ID
    pub cf_account_id: String,

    /// Cloudflare Workers AI API token
    pub cf_api_token: String,

    /// Path of the JSON state snapshot
    #[serde(default = "default_state_path")]
    pub state_path: String,

    /// Directory generated artifacts are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Maximum simultaneously in-flight generation calls (clamped to 1-10)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Retry ceiling for transient failures (clamped to 1-10)
    #[serde(default = "default_transient_retry_limit")]
    pub transient_retry_limit: u32,

    /// Retry ceiling for policy rejections (clamped to 0-5)
    #[serde(default = "default_policy_retry_limit")]
    pub policy_retry_limit: u32,
}

fn default_state_path() -> String {
    "variator_state.json".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_concurrency() -> usize {
    EngineSettings::default().concurrency
}

fn default_transient_retry_limit() -> u32 {
    EngineSettings::default().transient_retry_limit
}

fn default_policy_retry_limit() -> u32 {
    EngineSettings::default().policy_retry_limit
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Engine scalars with out-of-range values clamped, never rejected.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            concurrency: self.concurrency,
            transient_retry_limit: self.transient_retry_limit,
            policy_retry_limit: self.policy_retry_limit,
        }
        .clamped()
    }
}
