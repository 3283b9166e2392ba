use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Key value used when no real credential has been provided
pub const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_GROQ_API_KEY";

/// Main configuration structure for the assist service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub groq: GroqConfig,
    pub gateway: GatewayConfig,
    pub cache: CacheConfig,
    pub debounce: DebounceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    pub api_key: String,
    pub api_url: String,
    /// Model used for every mode-specific completion
    pub model: String,
    /// Model used by the legacy prompt generator
    pub generator_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub timeout_seconds: u64,
    /// Retries after the first attempt
    pub max_retries: u8,
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebounceConfig {
    pub delay_ms: u64,
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::debug!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("TYPINGMIND_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match Self::from_yaml(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::debug!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    pub fn from_yaml(contents: &str) -> crate::error::Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| crate::error::AssistError::Config(e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = env::var("GROQ_API_KEY") {
            self.groq.api_key = api_key;
        }
        if let Ok(url) = env::var("GROQ_API_URL") {
            self.groq.api_url = url;
        }
        if let Ok(model) = env::var("GROQ_MODEL") {
            self.groq.model = model;
        }
        if let Ok(model) = env::var("GROQ_GENERATOR_MODEL") {
            self.groq.generator_model = model;
        }

        if let Ok(timeout) = env::var("TYPINGMIND_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.gateway.timeout_seconds = secs;
            }
        }
        if let Ok(retries) = env::var("TYPINGMIND_MAX_RETRIES") {
            if let Ok(n) = retries.parse() {
                self.gateway.max_retries = n;
            }
        }

        if let Ok(ttl) = env::var("TYPINGMIND_CACHE_TTL_SECS") {
            if let Ok(secs) = ttl.parse() {
                self.cache.ttl_seconds = secs;
            }
        }
        if let Ok(delay) = env::var("TYPINGMIND_DEBOUNCE_MS") {
            if let Ok(ms) = delay.parse() {
                self.debounce.delay_ms = ms;
            }
        }
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.gateway.timeout_seconds == 0 {
            return Err("Gateway timeout cannot be 0 - using 1 second".into());
        }
        if self.cache.ttl_seconds == 0 {
            return Err("Cache TTL cannot be 0".into());
        }
        if self.cache.sweep_interval_seconds == 0 {
            return Err("Cache sweep interval cannot be 0 - using 1 second".into());
        }
        if self.groq.model.trim().is_empty() {
            return Err("Groq model cannot be empty".into());
        }
        if !self.has_credentials() {
            return Err(
                "GROQ_API_KEY is not set - every request will use local fallbacks".into(),
            );
        }
        Ok(())
    }

    /// Whether a real provider key is configured
    pub fn has_credentials(&self) -> bool {
        let key = self.groq.api_key.trim();
        !key.is_empty() && key != PLACEHOLDER_API_KEY
    }

    /// Request timeout; a configured 0 is raised to 1 second
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.timeout_seconds.max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    /// Sweeper period; a configured 0 is raised to 1 second
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache.sweep_interval_seconds.max(1))
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce.delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            groq: GroqConfig {
                api_key: env::var("GROQ_API_KEY").unwrap_or_else(|_| {
                    tracing::warn!("GROQ_API_KEY not set, using placeholder");
                    PLACEHOLDER_API_KEY.to_string()
                }),
                api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                model: "llama-3.3-70b-versatile".to_string(),
                generator_model: "llama-3.1-8b-instant".to_string(),
            },
            gateway: GatewayConfig {
                timeout_seconds: 30,
                max_retries: 2,
                initial_backoff_ms: 200,
            },
            cache: CacheConfig {
                ttl_seconds: 300,
                sweep_interval_seconds: 60,
            },
            debounce: DebounceConfig { delay_ms: 300 },
        }
    }
}
