use std::collections::HashMap;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{FerryError, Result};

pub const DEFAULT_MAX_HISTORY: usize = 100;
pub const DEFAULT_BACKFILL_LIMIT: usize = 50;
pub const DEFAULT_PRELOAD_SESSIONS: usize = 10;
/// Upper bound of the chat plugin's ignore budget.
pub const MAX_IGNORE_CAP: u32 = 50;

/// Top-level config (ferry.toml + FERRY_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FerryConfig {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub plugins: PluginsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    /// Platform identity of the bot account. Messages from this identity are
    /// never answered.
    #[serde(default)]
    pub self_id: String,
    /// Display name the bot uses for itself when no group alias is set.
    /// Falls back to `self_id`.
    #[serde(default)]
    pub self_name: Option<String>,
    /// Log outgoing texts instead of sending them.
    #[serde(default)]
    pub dry_run: bool,
    /// Prefix used to build public URLs for downloaded images.
    #[serde(default)]
    pub resource_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Capacity of every conversation window.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// How many stored messages to fetch when a window is empty.
    #[serde(default = "default_backfill_limit")]
    pub backfill_limit: usize,
    /// Number of recent conversations to backfill at startup.
    #[serde(default = "default_preload_sessions")]
    pub preload_sessions: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            backfill_limit: DEFAULT_BACKFILL_LIMIT,
            preload_sessions: DEFAULT_PRELOAD_SESSIONS,
        }
    }
}

/// Pacing applied before each outgoing text, so replies look typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_pacing_ms_per_char")]
    pub pacing_ms_per_char: u64,
    #[serde(default = "default_pacing_max_ms")]
    pub pacing_max_ms: u64,
    /// A conversation worker with nothing queued for this long exits; the
    /// next message starts a fresh one.
    #[serde(default = "default_worker_idle_secs")]
    pub worker_idle_secs: u64,
    /// Describe inbound images with the configured provider and store the
    /// description next to the image placeholder.
    #[serde(default)]
    pub describe_images: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pacing_ms_per_char: default_pacing_ms_per_char(),
            pacing_max_ms: default_pacing_max_ms(),
            worker_idle_secs: default_worker_idle_secs(),
            describe_images: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub openai: Option<OpenAiProviderConfig>,
    pub ollama: Option<OllamaConfig>,
    /// Additional OpenAI-compatible providers. Each entry can reference a
    /// well-known provider ID (e.g. "deepseek", "glm") or define a fully
    /// custom endpoint. Entries are tried in order after the primary slots.
    #[serde(default)]
    pub openai_compat: Vec<OpenAiCompatEntry>,
}

impl ProvidersConfig {
    pub fn is_empty(&self) -> bool {
        self.openai.is_none() && self.ollama.is_none() && self.openai_compat.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiProviderConfig {
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Model used for image description. Image description is disabled for
    /// this provider when unset.
    pub vision_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    pub model: String,
}

/// A single OpenAI-compatible provider entry.
///
/// For IDs unknown to the built-in registry, `base_url` is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCompatEntry {
    pub id: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub chat_path: Option<String>,
    pub model: Option<String>,
    pub vision_model: Option<String>,
}

/// Names accepted in plugin lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// Repeat what the crowd is repeating.
    Echo,
    /// Cadence-gated AI responder.
    Chat,
    /// Terminal no-op that ends the chain.
    Stop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    #[serde(default = "default_plugin_list")]
    pub default: Vec<PluginKind>,
    /// Per-conversation plugin lists, keyed by conversation id or display name.
    #[serde(default)]
    pub overrides: HashMap<String, Vec<PluginKind>>,
    #[serde(default)]
    pub echo: EchoConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            default: default_plugin_list(),
            overrides: HashMap::new(),
            echo: EchoConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl PluginsConfig {
    fn uses(&self, kind: PluginKind) -> bool {
        self.default.contains(&kind) || self.overrides.values().any(|l| l.contains(&kind))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoConfig {
    /// Minimum number of identical messages before echoing.
    #[serde(default = "default_repeat_count")]
    pub repeat_count: usize,
    /// How many recent records are inspected.
    #[serde(default = "default_context_length")]
    pub context_length: usize,
    /// Longest text (in characters) that will be echoed.
    #[serde(default = "default_echo_max_length")]
    pub max_length: usize,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            repeat_count: default_repeat_count(),
            context_length: default_context_length(),
            max_length: default_echo_max_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Messages that must go unanswered before the model is called again.
    /// Clamped to `[0, 50]`.
    #[serde(default = "default_max_ignore")]
    pub max_ignore: u32,
    /// Minimum seconds between two model invocations.
    #[serde(default = "default_frequency_secs")]
    pub frequency_secs: u64,
    /// How many recent records are rendered into the model input.
    #[serde(default = "default_context_length")]
    pub context_length: usize,
    /// Optional handlebars template for the system prompt.
    pub prompt_path: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_ignore: default_max_ignore(),
            frequency_secs: default_frequency_secs(),
            context_length: default_context_length(),
            prompt_path: None,
        }
    }
}

impl ChatConfig {
    pub fn clamped_max_ignore(&self) -> u32 {
        self.max_ignore.min(MAX_IGNORE_CAP)
    }
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}
fn default_backfill_limit() -> usize {
    DEFAULT_BACKFILL_LIMIT
}
fn default_preload_sessions() -> usize {
    DEFAULT_PRELOAD_SESSIONS
}
fn default_pacing_ms_per_char() -> u64 {
    100
}
fn default_pacing_max_ms() -> u64 {
    3_000
}
fn default_worker_idle_secs() -> u64 {
    600
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_chat_path() -> String {
    "/chat/completions".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.8
}
fn default_top_p() -> f32 {
    0.95
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_plugin_list() -> Vec<PluginKind> {
    vec![PluginKind::Echo, PluginKind::Chat]
}
fn default_repeat_count() -> usize {
    2
}
fn default_context_length() -> usize {
    10
}
fn default_echo_max_length() -> usize {
    20
}
fn default_max_ignore() -> u32 {
    5
}
fn default_frequency_secs() -> u64 {
    10
}

impl BotConfig {
    pub fn display_name(&self) -> &str {
        self.self_name.as_deref().unwrap_or(&self.self_id)
    }
}

impl FerryConfig {
    /// Load config from a TOML file with FERRY_* env var overrides.
    ///
    /// Path resolution: explicit argument, then `~/.ferry/ferry.toml`.
    /// Nested keys are separated by a double underscore in env vars, e.g.
    /// `FERRY_BOT__SELF_ID`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(path = %path, "loading config");

        let config: FerryConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("FERRY_").split("__"))
            .extract()
            .map_err(|e| FerryError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runtime cannot honour. Called by [`FerryConfig::load`].
    pub fn validate(&self) -> Result<()> {
        if self.bot.self_id.trim().is_empty() {
            return Err(FerryError::Config("bot.self_id is required".into()));
        }
        if self.history.max_history == 0 {
            return Err(FerryError::Config("history.max_history must be > 0".into()));
        }

        let echo = &self.plugins.echo;
        if echo.repeat_count <= 1 {
            return Err(FerryError::Config(
                "plugins.echo.repeat_count must be greater than 1".into(),
            ));
        }
        if echo.context_length <= echo.repeat_count {
            return Err(FerryError::Config(
                "plugins.echo.context_length must be greater than repeat_count".into(),
            ));
        }
        if echo.max_length == 0 {
            return Err(FerryError::Config(
                "plugins.echo.max_length must be greater than 0".into(),
            ));
        }

        if self.plugins.uses(PluginKind::Chat) && self.providers.is_empty() {
            return Err(FerryError::Config(
                "the chat plugin is enabled but no provider is configured".into(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.ferry/ferry.toml", home)
}
