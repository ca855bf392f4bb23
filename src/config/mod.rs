use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use anyhow::{Result, Context};
use tracing::{info, warn};

const DEFAULT_LLM_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_DRIVE_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&fields=id";
const DEFAULT_DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStrategy {
    /// Keep the first `char_limit` characters.
    Truncate,
    /// Summarize word chunks through the completion API.
    Remote,
}

impl FromStr for SummaryStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(SummaryStrategy::Truncate),
            "remote" => Ok(SummaryStrategy::Remote),
            other => Err(format!("unknown summary strategy '{}'", other)),
        }
    }
}

/// Output format of the log subscriber, read from `LOG_FORMAT` before the
/// configuration itself is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Settings for the remote chat completions endpoint.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub summary_model: String,
    pub system_prompt: String,
    pub max_output_tokens: u32,
    pub max_context_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout: Duration,
}

// Hand-written so the API key never reaches the logs.
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("summary_model", &self.summary_model)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_context_tokens", &self.max_context_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_LLM_API_URL.to_string(),
            api_key: None,
            model: "deepseek/deepseek-chat:free".to_string(),
            summary_model: "deepseek/deepseek-r1:free".to_string(),
            system_prompt: "You are a helpful AI assistant.".to_string(),
            max_output_tokens: 2000,
            max_context_tokens: 12000,
            temperature: 0.7,
            top_p: 0.9,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryConfig {
    pub strategy: SummaryStrategy,
    pub char_limit: usize,
    pub chunk_words: usize,
    pub max_chunks: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            strategy: SummaryStrategy::Truncate,
            char_limit: 2000,
            chunk_words: 2000,
            max_chunks: 6,
        }
    }
}

/// Cloud storage for the raw uploaded PDFs.
#[derive(Clone)]
pub struct ArchiveConfig {
    pub access_token: String,
    pub folder_id: Option<String>,
    pub upload_url: String,
    pub files_url: String,
    pub timeout: Duration,
}

impl fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field("access_token", &"<redacted>")
            .field("folder_id", &self.folder_id)
            .field("upload_url", &self.upload_url)
            .field("files_url", &self.files_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub server_host: String,
    pub server_port: u16,
    pub max_file_size_mb: usize,
    pub max_concurrent_requests: usize,
    pub request_timeout_seconds: u64,
    pub content_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub max_table_pages: usize,
    pub max_table_rows: usize,
    pub llm: LlmConfig,
    pub summary: SummaryConfig,
    pub archive: Option<ArchiveConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            server_host: "0.0.0.0".to_string(),
            server_port: 10000,
            max_file_size_mb: 10,
            max_concurrent_requests: 100,
            request_timeout_seconds: 60,
            content_dir: PathBuf::from("content"),
            upload_dir: PathBuf::from("uploads"),
            max_table_pages: 20,
            max_table_rows: 50,
            llm: LlmConfig::default(),
            summary: SummaryConfig::default(),
            archive: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        let defaults = Config::default();

        let environment = Self::parse_env_var("ENV", defaults.environment)
            .context("Failed to parse ENV")?;
        let request_timeout_seconds =
            Self::parse_env_var("REQUEST_TIMEOUT_SECONDS", defaults.request_timeout_seconds)
                .context("Failed to parse REQUEST_TIMEOUT_SECONDS")?;
        let timeout = Duration::from_secs(request_timeout_seconds);

        // Hosting platforms hand the port over in PORT.
        let server_port = Self::parse_env_var("SERVER_PORT", defaults.server_port)
            .context("Failed to parse SERVER_PORT")?;
        let server_port = Self::parse_env_var("PORT", server_port)
            .context("Failed to parse PORT")?;

        let llm = LlmConfig {
            api_url: Self::string_env_var("LLM_API_URL", &defaults.llm.api_url),
            api_key: Self::optional_env_var("LLM_API_KEY"),
            model: Self::string_env_var("LLM_MODEL", &defaults.llm.model),
            summary_model: Self::string_env_var("LLM_SUMMARY_MODEL", &defaults.llm.summary_model),
            system_prompt: Self::string_env_var("LLM_SYSTEM_PROMPT", &defaults.llm.system_prompt),
            max_output_tokens: Self::parse_env_var("LLM_MAX_OUTPUT_TOKENS", defaults.llm.max_output_tokens)
                .context("Failed to parse LLM_MAX_OUTPUT_TOKENS")?,
            max_context_tokens: Self::parse_env_var("LLM_MAX_CONTEXT_TOKENS", defaults.llm.max_context_tokens)
                .context("Failed to parse LLM_MAX_CONTEXT_TOKENS")?,
            temperature: Self::parse_env_var("LLM_TEMPERATURE", defaults.llm.temperature)
                .context("Failed to parse LLM_TEMPERATURE")?,
            top_p: Self::parse_env_var("LLM_TOP_P", defaults.llm.top_p)
                .context("Failed to parse LLM_TOP_P")?,
            timeout,
        };

        let summary = SummaryConfig {
            strategy: Self::parse_env_var("SUMMARY_STRATEGY", defaults.summary.strategy)
                .context("Failed to parse SUMMARY_STRATEGY")?,
            char_limit: Self::parse_env_var("SUMMARY_CHAR_LIMIT", defaults.summary.char_limit)
                .context("Failed to parse SUMMARY_CHAR_LIMIT")?,
            chunk_words: Self::parse_env_var("SUMMARY_CHUNK_WORDS", defaults.summary.chunk_words)
                .context("Failed to parse SUMMARY_CHUNK_WORDS")?,
            max_chunks: Self::parse_env_var("SUMMARY_MAX_CHUNKS", defaults.summary.max_chunks)
                .context("Failed to parse SUMMARY_MAX_CHUNKS")?,
        };

        let archive = match (environment, Self::optional_env_var("DRIVE_ACCESS_TOKEN")) {
            (Environment::Production, Some(access_token)) => Some(ArchiveConfig {
                access_token,
                folder_id: Self::optional_env_var("DRIVE_FOLDER_ID"),
                upload_url: Self::string_env_var("DRIVE_UPLOAD_URL", DEFAULT_DRIVE_UPLOAD_URL),
                files_url: Self::string_env_var("DRIVE_FILES_URL", DEFAULT_DRIVE_FILES_URL),
                timeout,
            }),
            (Environment::Production, None) => {
                info!("DRIVE_ACCESS_TOKEN not set, document archive disabled");
                None
            }
            (Environment::Development, _) => {
                info!("Development environment, document archive disabled");
                None
            }
        };

        let config = Config {
            environment,
            server_host: Self::string_env_var("SERVER_HOST", &defaults.server_host),
            server_port,
            max_file_size_mb: Self::parse_env_var("MAX_FILE_SIZE_MB", defaults.max_file_size_mb)
                .context("Failed to parse MAX_FILE_SIZE_MB")?,
            max_concurrent_requests: Self::parse_env_var("MAX_CONCURRENT_REQUESTS", defaults.max_concurrent_requests)
                .context("Failed to parse MAX_CONCURRENT_REQUESTS")?,
            request_timeout_seconds,
            content_dir: PathBuf::from(Self::string_env_var("CONTENT_DIR", "content")),
            upload_dir: PathBuf::from(Self::string_env_var("UPLOAD_DIR", "uploads")),
            max_table_pages: Self::parse_env_var("MAX_TABLE_PAGES", defaults.max_table_pages)
                .context("Failed to parse MAX_TABLE_PAGES")?,
            max_table_rows: Self::parse_env_var("MAX_TABLE_ROWS", defaults.max_table_rows)
                .context("Failed to parse MAX_TABLE_ROWS")?,
            llm,
            summary,
            archive,
        };

        config.validate()?;

        if config.llm.api_key.is_none() {
            warn!("No completion API key configured. Set LLM_API_KEY environment variable.");
        }

        info!("Configuration loaded successfully: {:?}", config);
        Ok(config)
    }

    fn parse_env_var<T>(var_name: &str, default: T) -> Result<T>
    where
        T: FromStr + Copy + fmt::Debug,
        T::Err: fmt::Display,
    {
        match env::var(var_name) {
            Ok(val) => match val.parse() {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {} (using default: {:?})", var_name, e, default);
                    Ok(default)
                }
            },
            Err(_) => {
                info!("{} not set, using default: {:?}", var_name, default);
                Ok(default)
            }
        }
    }

    fn string_env_var(var_name: &str, default: &str) -> String {
        env::var(var_name).unwrap_or_else(|_| {
            info!("{} not set, using default: {}", var_name, default);
            default.to_string()
        })
    }

    fn optional_env_var(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("SERVER_PORT must be greater than 0"));
        }
        if self.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(anyhow::anyhow!("MAX_CONCURRENT_REQUESTS must be greater than 0"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("REQUEST_TIMEOUT_SECONDS must be greater than 0"));
        }
        if self.max_table_pages == 0 {
            return Err(anyhow::anyhow!("MAX_TABLE_PAGES must be greater than 0"));
        }
        if self.max_table_rows == 0 {
            return Err(anyhow::anyhow!("MAX_TABLE_ROWS must be greater than 0"));
        }
        if self.summary.char_limit == 0 {
            return Err(anyhow::anyhow!("SUMMARY_CHAR_LIMIT must be greater than 0"));
        }
        if self.summary.chunk_words == 0 || self.summary.max_chunks == 0 {
            return Err(anyhow::anyhow!("SUMMARY_CHUNK_WORDS and SUMMARY_MAX_CHUNKS must be greater than 0"));
        }
        Ok(())
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
