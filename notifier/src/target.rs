use flairwatch_core::NotifyError;
use url::Url;

/// Where notifications are delivered, decoded from a notification URL.
///
/// Supported forms:
///
/// * `http://…`, `https://…` – an Apprise API endpoint, used as given
/// * `apprise://{host}[:{port}][/{path}]/{key}`, `apprises://…` – the Apprise
///   API's own form, posted to `http[s]://{host}[:{port}][/{path}]/notify/{key}`
/// * `tgram://{bot_token}/{chat_id}` – Telegram Bot API
/// * `desktop://`, `dbus://` – a local desktop notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyTarget {
    AppriseApi { endpoint: Url },
    Telegram { bot_token: String, chat_id: String },
    Desktop,
}

impl NotifyTarget {
    pub fn parse(raw: &str) -> Result<Self, NotifyError> {
        let raw = raw.trim();
        let (scheme, rest) = raw.split_once("://").ok_or_else(|| NotifyError::InvalidTarget {
            reason: "missing scheme".to_string(),
        })?;

        match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Self::apprise(raw),
            "apprise" => Self::apprise_keyed("http", rest),
            "apprises" => Self::apprise_keyed("https", rest),
            "tgram" => Self::telegram(rest),
            "desktop" | "dbus" => Ok(NotifyTarget::Desktop),
            other => Err(NotifyError::UnsupportedScheme {
                scheme: other.to_string(),
            }),
        }
    }

    fn apprise(url: &str) -> Result<Self, NotifyError> {
        Ok(NotifyTarget::AppriseApi {
            endpoint: Self::endpoint(url)?,
        })
    }

    // The last path segment is the configuration key; anything before it is
    // a prefix the API server is mounted under.
    fn apprise_keyed(http_scheme: &str, rest: &str) -> Result<Self, NotifyError> {
        let mut endpoint = Self::endpoint(&format!("{}://{}", http_scheme, rest))?;

        let segments: Vec<String> = endpoint
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let (key, prefix) = segments.split_last().ok_or_else(|| NotifyError::InvalidTarget {
            reason: "expected apprise://{host}/{key}".to_string(),
        })?;

        let mut path = String::new();
        for segment in prefix {
            path.push('/');
            path.push_str(segment);
        }
        path.push_str("/notify/");
        path.push_str(key);

        endpoint.set_path(&path);
        endpoint.set_query(None);
        endpoint.set_fragment(None);
        Ok(NotifyTarget::AppriseApi { endpoint })
    }

    fn endpoint(url: &str) -> Result<Url, NotifyError> {
        // The parse error never echoes the URL, which may carry a key
        let endpoint = Url::parse(url).map_err(|e| NotifyError::InvalidTarget {
            reason: format!("bad Apprise API URL: {}", e),
        })?;
        if endpoint.host_str().map_or(true, str::is_empty) {
            return Err(NotifyError::InvalidTarget {
                reason: "Apprise API URL has no host".to_string(),
            });
        }
        Ok(endpoint)
    }

    // Bot tokens look like `123456:ABC-def`, which `Url` would read as a
    // host and port, so the path is split by hand.
    fn telegram(rest: &str) -> Result<Self, NotifyError> {
        let invalid = |reason: &str| NotifyError::InvalidTarget {
            reason: reason.to_string(),
        };

        let (bot_token, chat_id) = rest
            .trim_end_matches('/')
            .split_once('/')
            .ok_or_else(|| invalid("expected tgram://{bot_token}/{chat_id}"))?;

        if bot_token.is_empty() {
            return Err(invalid("Telegram bot token is empty"));
        }
        if chat_id.is_empty() || chat_id.contains('/') {
            return Err(invalid("expected exactly one Telegram chat id"));
        }

        Ok(NotifyTarget::Telegram {
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    /// Human readable description without credentials, for logs.
    pub fn describe(&self) -> String {
        match self {
            NotifyTarget::AppriseApi { endpoint } => match endpoint.port() {
                Some(port) => format!(
                    "Apprise API at {}:{}",
                    endpoint.host_str().unwrap_or_default(),
                    port
                ),
                None => format!("Apprise API at {}", endpoint.host_str().unwrap_or_default()),
            },
            NotifyTarget::Telegram { chat_id, .. } => format!("Telegram chat {}", chat_id),
            NotifyTarget::Desktop => "desktop notifications".to_string(),
        }
    }
}
