use crate::error::*;
use tracing::{error, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!(code = %self.error_code(), "CoreError: {}", self);
        match self {
            CoreError::RedditApi(e) => {
                e.log_error();
            }
            CoreError::Notify(e) => {
                e.log_error();
            }
            CoreError::Config(e) => {
                e.log_error();
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = %self.error_code(), "CoreError (warning): {}", self);
        match self {
            CoreError::RedditApi(e) => {
                e.log_warn();
            }
            CoreError::Notify(e) => {
                e.log_warn();
            }
            CoreError::Config(e) => {
                e.log_warn();
            }
            _ => {}
        }
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::RedditApi(e) => e.is_retryable(),
            CoreError::Notify(e) => e.is_retryable(),
            CoreError::Config(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            CoreError::Timeout { .. } => true,
            CoreError::Io(_) => true,
            CoreError::RequestFailed { status_code, .. } => {
                matches!(status_code, Some(429) | Some(500..=599))
            }
            CoreError::Serialization(_) | CoreError::Internal { .. } => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Notify(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::Timeout { .. } => {
                "The operation took too long to complete. Please try again.".to_string()
            }
            CoreError::Io(_) => "A file system operation failed.".to_string(),
            CoreError::RequestFailed { message, .. } => {
                format!("Request failed: {}", message)
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API".to_string(),
            CoreError::Notify(_) => "NOTIFY".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
            CoreError::RequestFailed { .. } => "REQUEST_FAILED".to_string(),
        }
    }
}

impl ErrorExt for RedditApiError {
    fn log_error(&self) -> &Self {
        error!(code = %self.error_code(), "Reddit API error details: {:?}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = %self.error_code(), "Reddit API error details: {:?}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            RedditApiError::RateLimitExceeded { .. } => true,
            RedditApiError::RequestTimeout => true,
            RedditApiError::ServerError { status_code } => *status_code >= 500,
            // A stale token is dropped by the client, so the next attempt re-authenticates
            RedditApiError::InvalidToken => true,
            RedditApiError::InvalidResponse { .. } => true,
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => {
                "Reddit authentication failed. Please check your credentials.".to_string()
            }
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            RedditApiError::Forbidden { resource } => format!(
                "Access denied to {}. You may not have permission to view this content.",
                resource
            ),
            RedditApiError::SubredditNotFound { subreddit } => {
                format!("Subreddit '{}' not found or is private.", subreddit)
            }
            RedditApiError::InvalidToken => {
                "Reddit authentication token is invalid. Please re-authenticate.".to_string()
            }
            RedditApiError::RequestTimeout => {
                "Request to Reddit timed out. Please try again.".to_string()
            }
            _ => "Reddit API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED".to_string(),
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT".to_string(),
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN".to_string(),
            RedditApiError::SubredditNotFound { .. } => "REDDIT_SUBREDDIT_NOT_FOUND".to_string(),
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN".to_string(),
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT".to_string(),
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE".to_string(),
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR".to_string(),
        }
    }
}

impl ErrorExt for NotifyError {
    fn log_error(&self) -> &Self {
        error!(code = %self.error_code(), "Notification error details: {:?}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = %self.error_code(), "Notification error details: {:?}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Rejected { status_code, .. } => {
                *status_code == 429 || *status_code >= 500
            }
            NotifyError::Desktop { .. } => true,
            NotifyError::UnsupportedScheme { .. } | NotifyError::InvalidTarget { .. } => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            NotifyError::UnsupportedScheme { scheme } => format!(
                "Notification URLs with scheme '{}' are not supported.",
                scheme
            ),
            NotifyError::InvalidTarget { .. } => {
                "The notification URL is malformed. Please check the settings.".to_string()
            }
            NotifyError::Rejected { service, .. } => {
                format!("{} refused the notification.", service)
            }
            NotifyError::Desktop { .. } => {
                "Could not show a desktop notification.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            NotifyError::UnsupportedScheme { .. } => "NOTIFY_UNSUPPORTED_SCHEME".to_string(),
            NotifyError::InvalidTarget { .. } => "NOTIFY_INVALID_TARGET".to_string(),
            NotifyError::Rejected { .. } => "NOTIFY_REJECTED".to_string(),
            NotifyError::Desktop { .. } => "NOTIFY_DESKTOP".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!(code = %self.error_code(), "Configuration error details: {:?}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = %self.error_code(), "Configuration error details: {:?}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false // Config errors are never retryable
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("Invalid value '{}' for configuration field '{}'.", value, field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is invalid: {}", reason)
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}
