// Configuration for the record store client and webhook notifier

/// Configuration for [`RecordStoreClient`](crate::RecordStoreClient)
#[derive(Clone, Debug)]
pub struct RecordStoreConfig {
    /// Base URL of the record store API (e.g. "http://127.0.0.1:8090/api/collections")
    pub base_url: String,
    /// Bearer token sent with every request, if set
    pub api_token: Option<String>,
    /// Connection timeout in milliseconds (default: 5000)
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds (default: 30000)
    pub read_timeout_ms: u64,
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090/api/collections".to_string(),
            api_token: None,
            connect_timeout_ms: 5000,
            read_timeout_ms: 30000,
        }
    }
}

impl RecordStoreConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.api_token = Some(token.to_string());
        self
    }

    /// Set timeouts
    pub fn with_timeouts(mut self, connect_ms: u64, read_ms: u64) -> Self {
        self.connect_timeout_ms = connect_ms;
        self.read_timeout_ms = read_ms;
        self
    }
}

/// Configuration for [`WebhookNotifier`](crate::WebhookNotifier)
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// Endpoint receiving the JSON payload
    pub url: String,
    /// Display name attached to each message
    pub username: Option<String>,
    /// Request timeout in milliseconds (default: 10000)
    pub timeout_ms: u64,
}

impl WebhookConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            username: None,
            timeout_ms: 10000,
        }
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}
