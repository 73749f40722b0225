use std::time::Duration;

use crate::{cache_key::SerializedCacheKey, CacheKeyFn, Client, Result};

/// Configuration for [`Client`].
///
/// # Examples
/// ```no_run
/// # use std::time::Duration;
/// # use hyphen_toggle::ClientConfig;
/// let client = ClientConfig::from_public_key("public_YWNtZTpyZXN0")
///     .application("web")
///     .environment("production")
///     .horizon_urls(["https://toggle.internal.example.com"])
///     .cache_ttl(Duration::from_secs(60))
///     .to_client()
///     .expect("application and environment are set");
/// ```
pub struct ClientConfig<'a> {
    pub(crate) public_key: String,
    pub(crate) application: Option<String>,
    pub(crate) environment: Option<String>,
    pub(crate) horizon_urls: Vec<String>,
    pub(crate) cache_ttl: Duration,
    pub(crate) cache_capacity: u64,
    pub(crate) cache_key_fn: Box<dyn CacheKeyFn + Send + Sync + 'a>,
    pub(crate) enable_toggle_usage: bool,
    pub(crate) connect_timeout: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) telemetry_queue_capacity: usize,
    pub(crate) http_client: Option<reqwest::blocking::Client>,
}

impl<'a> ClientConfig<'a> {
    /// Default time-to-live of cached evaluation responses.
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

    /// Default maximum number of cached evaluation responses.
    pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

    /// Default timeout for establishing a connection to a horizon URL.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default timeout of a single request to a horizon URL.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default number of usage reports that may wait for delivery.
    pub const DEFAULT_TELEMETRY_QUEUE_CAPACITY: usize = 1024;

    /// Create a default configuration using the specified public key.
    ///
    /// Application and environment must be set before creating a client.
    ///
    /// ```
    /// # use hyphen_toggle::ClientConfig;
    /// ClientConfig::from_public_key("public-key");
    /// ```
    pub fn from_public_key(public_key: impl Into<String>) -> Self {
        ClientConfig {
            public_key: public_key.into(),
            application: None,
            environment: None,
            horizon_urls: Vec::new(),
            cache_ttl: ClientConfig::DEFAULT_CACHE_TTL,
            cache_capacity: ClientConfig::DEFAULT_CACHE_CAPACITY,
            cache_key_fn: Box::new(SerializedCacheKey),
            enable_toggle_usage: true,
            connect_timeout: ClientConfig::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: ClientConfig::DEFAULT_REQUEST_TIMEOUT,
            telemetry_queue_capacity: ClientConfig::DEFAULT_TELEMETRY_QUEUE_CAPACITY,
            http_client: None,
        }
    }

    /// Set application. Every evaluated context is scoped to it. Required.
    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    /// Set environment. Every evaluated context is scoped to it. Required.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Set additional base URLs of the toggle service.
    ///
    /// URLs are tried in the given order. The default URL derived from the public key is always
    /// tried last.
    pub fn horizon_urls<I, S>(mut self, horizon_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.horizon_urls = horizon_urls.into_iter().map(Into::into).collect();
        self
    }

    /// Set time-to-live of cached evaluation responses.
    ///
    /// Defaults to [`ClientConfig::DEFAULT_CACHE_TTL`]. `Duration::ZERO` disables caching.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set maximum number of cached evaluation responses. Least valuable entries are evicted first.
    ///
    /// Defaults to [`ClientConfig::DEFAULT_CACHE_CAPACITY`].
    pub fn cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set function that computes cache keys from enriched contexts.
    ///
    /// Defaults to the JSON serialization of the context.
    pub fn cache_key_fn(mut self, cache_key_fn: impl CacheKeyFn + Send + Sync + 'a) -> Self {
        self.cache_key_fn = Box::new(cache_key_fn);
        self
    }

    /// Enable or disable toggle usage reporting. Enabled by default.
    pub fn enable_toggle_usage(mut self, enable: bool) -> Self {
        self.enable_toggle_usage = enable;
        self
    }

    /// Set connect timeout of each request attempt.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set timeout of each request attempt.
    ///
    /// There is no overall deadline: if every horizon URL times out, evaluation takes up to the
    /// number of URLs times this timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set how many usage reports may wait for delivery before new ones are dropped.
    ///
    /// The capacity is at least 1; smaller values are raised to 1.
    pub fn telemetry_queue_capacity(mut self, capacity: usize) -> Self {
        self.telemetry_queue_capacity = capacity.max(1);
        self
    }

    /// Use a preconfigured HTTP client. Connect and request timeouts of this configuration are
    /// ignored in that case.
    pub fn http_client(mut self, http_client: reqwest::blocking::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Create a new [`Client`] using the specified configuration.
    ///
    /// # Errors
    ///
    /// See [`Client::new`].
    pub fn to_client(self) -> Result<Client<'a>> {
        Client::new(self)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ClientConfig;

    #[test]
    fn has_documented_defaults() {
        let config = ClientConfig::from_public_key("key");

        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.cache_capacity, 10_000);
        assert_eq!(config.telemetry_queue_capacity, 1024);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.enable_toggle_usage);
        assert!(config.horizon_urls.is_empty());
    }

    #[test]
    fn telemetry_queue_holds_at_least_one_report() {
        let config = ClientConfig::from_public_key("key").telemetry_queue_capacity(0);

        assert_eq!(config.telemetry_queue_capacity, 1);
    }

    #[test]
    fn keeps_horizon_url_order() {
        let config = ClientConfig::from_public_key("key").horizon_urls(["https://b", "https://a"]);

        assert_eq!(config.horizon_urls, vec!["https://b", "https://a"]);
    }
}
