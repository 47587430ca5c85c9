use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub completion_api_key: String,
    pub completion_base_url: String,
    pub completion_model: String,
    /// Upper bound on a single completion round-trip.
    pub completion_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub nav_max_attempts: u32,
    pub nav_retry_delay_ms: u64,
    /// Pause after a page reload in the access-denied recovery path.
    pub access_denied_settle_ms: u64,
    pub image_api_base_url: Option<String>,
    pub image_api_client_id: Option<String>,
    pub image_album_id: Option<String>,
    /// Safety bound on album pagination; not a semantic limit.
    pub image_max_pages: usize,
    pub image_max_retries: u32,
    pub image_backoff_base_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("completion_api_key", &"[redacted]")
            .field("completion_base_url", &self.completion_base_url)
            .field("completion_model", &self.completion_model)
            .field("completion_timeout_secs", &self.completion_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("nav_max_attempts", &self.nav_max_attempts)
            .field("nav_retry_delay_ms", &self.nav_retry_delay_ms)
            .field("access_denied_settle_ms", &self.access_denied_settle_ms)
            .field("image_api_base_url", &self.image_api_base_url)
            .field(
                "image_api_client_id",
                &self.image_api_client_id.as_ref().map(|_| "[redacted]"),
            )
            .field("image_album_id", &self.image_album_id)
            .field("image_max_pages", &self.image_max_pages)
            .field("image_max_retries", &self.image_max_retries)
            .field("image_backoff_base_ms", &self.image_backoff_base_ms)
            .finish()
    }
}
