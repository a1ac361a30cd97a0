use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub gemini: GeminiConfig,
    pub live: LiveConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Hosted model endpoints. The API key is never stored in the config file;
/// it is read from the environment variable named by `api_key_env`.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub base_url: String,
    pub live_url: String,
    pub model: String,
    pub live_model: String,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    /// Microphone sample rate expected on the input side
    pub input_sample_rate: u32,
    /// Sample rate of audio streamed back by the model
    pub output_sample_rate: u32,
    /// Samples per outbound block (single channel)
    pub block_size: usize,
    /// Prebuilt voice used for spoken replies
    pub voice: String,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            block_size: 4096,
            voice: "Zephyr".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl GeminiConfig {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).with_context(|| {
            format!(
                "API key environment variable {} is not set",
                self.api_key_env
            )
        })
    }
}
