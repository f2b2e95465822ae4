use flairwatch_core::{ConfigError, CoreError, ErrorExt, NotifyError, RedditApiError};

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let notify_error = CoreError::Notify(NotifyError::UnsupportedScheme {
        scheme: "mailto".to_string(),
    });
    assert_eq!(notify_error.error_code(), "NOTIFY");

    let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "REDDIT_CLIENT_ID".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    assert_eq!(
        RedditApiError::RateLimitExceeded { retry_after: 5 }.error_code(),
        "REDDIT_RATE_LIMIT"
    );
}

#[test]
fn test_retryable_errors() {
    let retryable_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert!(retryable_error.is_retryable());

    let server_error = CoreError::Notify(NotifyError::Rejected {
        service: "Apprise".to_string(),
        status_code: 502,
        message: "bad gateway".to_string(),
    });
    assert!(server_error.is_retryable());

    let client_error = CoreError::Notify(NotifyError::Rejected {
        service: "Apprise".to_string(),
        status_code: 400,
        message: "bad request".to_string(),
    });
    assert!(!client_error.is_retryable());

    let non_retryable_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "APPRISE_URL_PROD".to_string(),
    });
    assert!(!non_retryable_error.is_retryable());

    let auth_error = CoreError::RedditApi(RedditApiError::AuthenticationFailed {
        reason: "invalid_client".to_string(),
    });
    assert!(!auth_error.is_retryable());

    let io_error = CoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
    assert!(io_error.is_retryable());
}

#[test]
fn test_request_failed_retryability_follows_status() {
    let throttled = CoreError::RequestFailed {
        message: "slow down".to_string(),
        status_code: Some(429),
    };
    assert!(throttled.is_retryable());

    let missing = CoreError::RequestFailed {
        message: "gone".to_string(),
        status_code: Some(404),
    };
    assert!(!missing.is_retryable());
}

#[test]
fn test_user_friendly_messages() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    let message = reddit_error.user_friendly_message();
    assert!(message.contains("authentication token is invalid"));

    let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "REDDIT_USER_AGENT".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("REDDIT_USER_AGENT"));

    let notify_error = NotifyError::UnsupportedScheme {
        scheme: "mailto".to_string(),
    };
    assert!(notify_error.user_friendly_message().contains("mailto"));
}

#[test]
fn test_logging_helpers_return_self() {
    let error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert!(std::ptr::eq(error.log_error(), &error));
    assert!(std::ptr::eq(error.log_warn(), &error));
}

#[derive(Clone, Default)]
struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn captured_logs(f: impl FnOnce()) -> String {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = captured.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn test_warning_includes_inner_details() {
    let error = CoreError::Notify(NotifyError::Rejected {
        service: "Apprise API".to_string(),
        status_code: 404,
        message: "no such key".to_string(),
    });

    let logs = captured_logs(|| {
        error.log_warn();
    });

    assert!(logs.contains("WARN"));
    assert!(!logs.contains("ERROR"));
    assert!(logs.lines().any(|line| line.ends_with("code=NOTIFY")));
    assert!(logs.contains("code=NOTIFY_REJECTED"));
    assert!(logs.contains("no such key"));
}

#[test]
fn test_error_includes_inner_details() {
    let error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "REDDIT_CLIENT_ID".to_string(),
    });

    let logs = captured_logs(|| {
        error.log_error();
    });

    assert!(logs.contains("ERROR"));
    assert!(logs.contains("code=CONFIG_MISSING_ENV_VAR"));
    assert!(logs.contains("REDDIT_CLIENT_ID"));
}
