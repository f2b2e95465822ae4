//! Startup configuration.
//!
//! Values come from three layers, lowest priority first: built-in defaults,
//! an optional TOML file named by `FLAIRWATCH_CONFIG`, and the process
//! environment (after loading `.env`). The file uses the lower-cased variable
//! names as keys.

use crate::ConfigError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE_VAR: &str = "FLAIRWATCH_CONFIG";

pub const DEFAULT_SUBREDDIT: &str = "soccer";
pub const DEFAULT_PROCESSED_POSTS_FILE: &str = "/app/posts/processed_posts.json";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_FLAIR_KEYWORD: &str = "media";
pub const DEFAULT_FETCH_LIMIT: u32 = 20;

/// Reddit refuses listings larger than this.
const MAX_FETCH_LIMIT: u32 = 100;

/// Deployment stage; selects which notification URL is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Prod,
    Stage,
}

impl Environment {
    /// Variable holding the notification URL for this stage.
    pub fn notify_url_var(&self) -> &'static str {
        match self {
            Environment::Prod => "APPRISE_URL_PROD",
            Environment::Stage => "APPRISE_URL_STAGE",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Prod => "prod",
            Environment::Stage => "stage",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" => Ok(Environment::Prod),
            "stage" => Ok(Environment::Stage),
            _ => Err(ConfigError::InvalidValue {
                field: "ENVIRONMENT".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

// Keeps the secret out of logs
impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub reddit: RedditCredentials,
    pub subreddit: String,
    pub notify_url: String,
    pub processed_posts_file: PathBuf,
    pub poll_interval: Duration,
    pub autosave_interval: Duration,
    /// Always lower-cased
    pub flair_keyword: String,
    pub fetch_limit: u32,
}

impl AppConfig {
    /// Load `.env`, the optional TOML file, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment file {}", path.display());
        }

        let file = match std::env::var(CONFIG_FILE_VAR) {
            Ok(path) if !path.trim().is_empty() => Some(ConfigFile::load(Path::new(path.trim()))?),
            _ => None,
        };

        Self::from_sources(file.as_ref(), |key| std::env::var(key).ok())
    }

    /// Build a configuration from an optional file and a variable lookup.
    ///
    /// `lookup` wins over the file; empty values count as unset.
    pub fn from_sources<F>(file: Option<&ConfigFile>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sources = Sources { file, lookup };

        let environment = match sources.get("ENVIRONMENT") {
            Some(value) => value.parse()?,
            None => Environment::Prod,
        };

        let reddit = RedditCredentials {
            client_id: sources.required("REDDIT_CLIENT_ID")?,
            client_secret: sources.required("REDDIT_CLIENT_SECRET")?,
            user_agent: sources.required("REDDIT_USER_AGENT")?,
        };
        let notify_url = sources.required(environment.notify_url_var())?;

        let subreddit = sources
            .get("SUBREDDIT_NAME")
            .unwrap_or_else(|| DEFAULT_SUBREDDIT.to_string());
        let subreddit = subreddit.trim_start_matches("r/").to_string();

        let processed_posts_file = PathBuf::from(
            sources
                .get("PROCESSED_POSTS_FILE")
                .unwrap_or_else(|| DEFAULT_PROCESSED_POSTS_FILE.to_string()),
        );

        let flair_keyword = sources
            .get("FLAIR_KEYWORD")
            .unwrap_or_else(|| DEFAULT_FLAIR_KEYWORD.to_string())
            .to_lowercase();

        let fetch_limit = sources.positive("FETCH_LIMIT", DEFAULT_FETCH_LIMIT as u64)?;
        if fetch_limit > MAX_FETCH_LIMIT as u64 {
            return Err(ConfigError::ValidationFailed {
                reason: format!("FETCH_LIMIT must be at most {}", MAX_FETCH_LIMIT),
            });
        }

        Ok(Self {
            environment,
            reddit,
            subreddit,
            notify_url,
            processed_posts_file,
            poll_interval: Duration::from_secs(
                sources.positive("POLL_INTERVAL", DEFAULT_POLL_INTERVAL_SECS)?,
            ),
            autosave_interval: Duration::from_secs(
                sources.positive("AUTOSAVE_INTERVAL", DEFAULT_AUTOSAVE_INTERVAL_SECS)?,
            ),
            flair_keyword,
            fetch_limit: fetch_limit as u32,
        })
    }
}

/// Parsed TOML configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    values: toml::Table,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::ValidationFailed {
                reason: format!("cannot read {}: {}", path.display(), e),
            },
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let values: toml::Table = toml::from_str(text)?;
        Ok(Self { values })
    }

    /// Scalar value for `key` (matched lower-cased), rendered as a string.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.values.get(&key.to_ascii_lowercase())? {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

struct Sources<'a, F> {
    file: Option<&'a ConfigFile>,
    lookup: F,
}

impl<F> Sources<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        let non_empty = |value: String| {
            let value = value.trim().to_string();
            (!value.is_empty()).then_some(value)
        };
        (self.lookup)(key)
            .and_then(non_empty)
            .or_else(|| self.file.and_then(|file| file.get(key)).and_then(non_empty))
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: key.to_string(),
            })
    }

    fn positive(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        match raw.parse::<u64>() {
            Ok(0) => Err(ConfigError::ValidationFailed {
                reason: format!("{} must be greater than zero", key),
            }),
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw,
            }),
        }
    }
}
