//! Server-level configuration (spec §6.4): transport + LLM endpoint
//! settings that sit outside `vantage_core::EngineConfig`'s closed set,
//! parsed from CLI flags with an env-var fallback the way the teacher's
//! `--data-dir` flag falls back to its default directory resolution.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use vantage_core::ports::default::HttpLlmConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "vantage-server", version, about = "Vantage query engine HTTP server")]
pub struct ServerArgs {
    /// Bind address for the HTTP/SSE API.
    #[arg(long, env = "VANTAGE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Bind port for the HTTP/SSE API.
    #[arg(long, env = "VANTAGE_PORT", default_value_t = 8420)]
    pub port: u16,

    /// Data directory for the relational/vector/lexical stores.
    #[arg(long, env = "VANTAGE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of an OpenAI-chat-completions-compatible LLM endpoint
    /// (spec §1: the LLM is always an externally injected capability).
    #[arg(long, env = "VANTAGE_LLM_BASE_URL", default_value = "http://127.0.0.1:11434/v1")]
    pub llm_base_url: String,

    /// Bearer token for the LLM endpoint, if required.
    #[arg(long, env = "VANTAGE_LLM_API_KEY")]
    pub llm_api_key: Option<String>,

    /// Model name passed in each LLM request body.
    #[arg(long, env = "VANTAGE_LLM_MODEL", default_value = "llama3")]
    pub llm_model: String,

    /// LLM request timeout in milliseconds.
    #[arg(long, env = "VANTAGE_LLM_TIMEOUT_MS", default_value_t = 30_000)]
    pub llm_timeout_ms: u64,

    /// Root directory watched at startup, if any (spec §6.1 `Watcher.*`).
    #[arg(long, env = "VANTAGE_WATCH_ROOT")]
    pub watch_root: Option<PathBuf>,
}

impl ServerArgs {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("dev", "vantage", "vantage")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".vantage"))
        })
    }

    pub fn llm_config(&self) -> HttpLlmConfig {
        HttpLlmConfig {
            base_url: self.llm_base_url.clone(),
            api_key: self.llm_api_key.clone(),
            model: self.llm_model.clone(),
            timeout: Duration::from_millis(self.llm_timeout_ms),
        }
    }
}
