//! Runtime configuration for chat-mock.
//!
//! Configuration can be loaded from a JSON file or constructed programmatically.
//! The reply candidate pool, default model name, streaming delay, and the
//! model catalog all live here so the emulator itself carries no global state.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-mock", about = "Mock OpenAI chat completions server")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file).
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Effective listen address: the `--listen` flag when given, otherwise
    /// the config file value.
    pub fn listen_addr(&self, config: &Config) -> String {
        self.listen
            .clone()
            .unwrap_or_else(|| config.server.listen.clone())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Mock response behavior.
    pub mock: MockConfig,

    /// Model catalog served on GET /v1/models.
    pub catalog: Vec<ModelEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            mock: MockConfig::default(),
            catalog: default_catalog(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Knobs for the response emulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    /// Model name reported when the request omits `model`.
    ///
    /// The upstream this mock imitates used both "gpt-35-turbo" and
    /// "gpt-3.5-turbo" depending on code path; we standardize on the latter.
    pub default_model: String,

    /// Candidate reply texts; one is picked uniformly at random per request.
    pub replies: Vec<String>,

    /// Delay between consecutive streamed content frames, in milliseconds.
    pub stream_delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-3.5-turbo".to_string(),
            replies: vec![
                "你好！有什么可以帮助你的吗？".to_string(),
                "你好！很高兴见到你。".to_string(),
                "Hello! How can I help you today?".to_string(),
                "嗨！我是 AI 助手，有什么我可以帮你的吗？".to_string(),
            ],
            stream_delay_ms: 50,
        }
    }
}

/// One entry in the static model catalog, returned verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    #[serde(default = "default_object_model")]
    pub object: String,
    pub created: u64,
    pub owned_by: String,
}

fn default_object_model() -> String {
    "model".to_string()
}

fn default_catalog() -> Vec<ModelEntry> {
    vec![
        ModelEntry {
            id: "gpt-5-nano".to_string(),
            object: "model".to_string(),
            created: 1_687_882_411,
            owned_by: "openai".to_string(),
        },
        ModelEntry {
            id: "gpt-3.5-turbo".to_string(),
            object: "model".to_string(),
            created: 1_677_610_602,
            owned_by: "openai".to_string(),
        },
    ]
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str(&data)?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };

        anyhow::ensure!(
            !config.mock.replies.is_empty(),
            "mock.replies must contain at least one candidate text"
        );

        Ok(config)
    }
}
