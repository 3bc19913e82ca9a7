use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8100;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_AGENT_RUNTIME_URL: &str = "http://127.0.0.1:8200";
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 600;
const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub database_path: PathBuf,
    /// Base URL of the external agent runtime service
    pub agent_runtime_url: String,
    /// Base URL of the code-execution sandbox service, if one is deployed
    pub sandbox_url: Option<String>,
    /// Per-run execution timeout (None = unbounded)
    pub run_timeout: Option<Duration>,
    pub feedback: FeedbackConfig,
    pub cors_origins: Vec<String>,
}

/// Settings for forwarding run feedback to the external tracing service
#[derive(Debug, Clone, Default)]
pub struct FeedbackConfig {
    pub tracing_enabled: bool,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
}

impl FeedbackConfig {
    /// The feedback route is only mounted when tracing is on and there is somewhere to send it
    pub fn is_enabled(&self) -> bool {
        self.tracing_enabled && self.api_url.is_some()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            database_path: env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            agent_runtime_url: env::var("AGENT_RUNTIME_URL")
                .unwrap_or(defaults.agent_runtime_url),
            sandbox_url: non_empty_var("SANDBOX_URL"),
            run_timeout: env::var("RUN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(timeout_from_secs)
                .unwrap_or(defaults.run_timeout),
            feedback: FeedbackConfig {
                tracing_enabled: env::var("FEEDBACK_TRACING_ENABLED")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
                api_url: non_empty_var("FEEDBACK_API_URL"),
                api_key: non_empty_var("FEEDBACK_API_KEY"),
            },
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.cors_origins),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
            database_path: default_database_path(),
            agent_runtime_url: DEFAULT_AGENT_RUNTIME_URL.to_string(),
            sandbox_url: None,
            run_timeout: timeout_from_secs(DEFAULT_RUN_TIMEOUT_SECS),
            feedback: FeedbackConfig::default(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Standard data directory location, falling back to the working directory
fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("agent-runs"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agent-runs.db")
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
