use std::{collections::HashSet, sync::Arc, time::Duration};

use reqwest::Url;

use crate::{
    debug::{DebugCategory, DebugLogger, DebugSink, NoopDebugSink},
    executor::RetryPolicy,
    identity::{AnonymousUser, Identity, SessionIdProvider, UserIdProvider},
    models::Channel,
    Client, Error, Result,
};

/// Configuration for [`Client`].
///
/// # Examples
/// ```no_run
/// # use retail_ads::{ClientConfig, Channel, DebugCategory};
/// let client = ClientConfig::new("publisher-id", Channel::Site, || "session-id".to_owned())
///     .user_id_provider(|| Some("user-id".to_owned()))
///     .debug([DebugCategory::AdsLoad, DebugCategory::EventsAll])
///     .debug_sink(|label: &str, message: &str| println!("[{label}] {message}"))
///     .to_client()
///     .expect("valid configuration");
/// ```
pub struct ClientConfig {
    pub(crate) publisher_id: String,
    pub(crate) channel: Channel,
    pub(crate) brand: Option<String>,
    pub(crate) session_id_provider: Arc<dyn SessionIdProvider + Send + Sync>,
    pub(crate) user_id_provider: Arc<dyn UserIdProvider + Send + Sync>,
    pub(crate) timeout: Duration,
    pub(crate) max_retries: u32,
    pub(crate) retry_delay: Duration,
    pub(crate) debug: HashSet<DebugCategory>,
    pub(crate) debug_sink: Arc<dyn DebugSink + Send + Sync>,
    pub(crate) base_url: String,
    pub(crate) events_base_url: String,
}

impl ClientConfig {
    /// Default base URL for ad queries and conversions.
    pub const DEFAULT_BASE_URL: &'static str = "https://newtail-media.newtail.com.br";

    /// Default per-attempt timeout for ad queries.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

    /// Upper bound accepted for [`ClientConfig::timeout`].
    pub const MAX_TIMEOUT: Duration = Duration::from_millis(10_000);

    /// Default number of retries after the first attempt.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Default pause between retries.
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

    /// Create a configuration with defaults for everything except the publisher identity, channel
    /// and session.
    ///
    /// `session_id_provider` is called for every request.
    pub fn new(
        publisher_id: impl Into<String>,
        channel: Channel,
        session_id_provider: impl SessionIdProvider + Send + Sync + 'static,
    ) -> ClientConfig {
        ClientConfig {
            publisher_id: publisher_id.into(),
            channel,
            brand: None,
            session_id_provider: Arc::new(session_id_provider),
            user_id_provider: Arc::new(AnonymousUser),
            timeout: ClientConfig::DEFAULT_TIMEOUT,
            max_retries: ClientConfig::DEFAULT_MAX_RETRIES,
            retry_delay: ClientConfig::DEFAULT_RETRY_DELAY,
            debug: HashSet::new(),
            debug_sink: Arc::new(NoopDebugSink),
            base_url: ClientConfig::DEFAULT_BASE_URL.to_owned(),
            events_base_url: ClientConfig::DEFAULT_BASE_URL.to_owned(),
        }
    }

    /// Brand/site name. Required when the publisher runs several sites.
    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Set the provider of the logged-in user id, called for every request. Without one, users are
    /// anonymous unless [`Client::update_user_id`] is used.
    pub fn user_id_provider(
        mut self,
        user_id_provider: impl UserIdProvider + Send + Sync + 'static,
    ) -> Self {
        self.user_id_provider = Arc::new(user_id_provider);
        self
    }

    /// Per-attempt timeout for ad queries. Must be between 1 ms and
    /// [`ClientConfig::MAX_TIMEOUT`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries after the first attempt on 5xx responses and transport failures.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Pause before each retry.
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Enable debug record categories.
    pub fn debug(mut self, categories: impl IntoIterator<Item = DebugCategory>) -> Self {
        self.debug.extend(categories);
        self
    }

    /// Set the receiver of debug records.
    ///
    /// ```
    /// # use retail_ads::{ClientConfig, Channel};
    /// let config = ClientConfig::new("publisher-id", Channel::App, || "session".to_owned())
    ///     .debug_sink(|label: &str, message: &str| eprintln!("{label}: {message}"));
    /// ```
    pub fn debug_sink(mut self, debug_sink: impl DebugSink + Send + Sync + 'static) -> Self {
        self.debug_sink = Arc::new(debug_sink);
        self
    }

    /// Override base URL for ad queries. Clients should use the default setting in most cases.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override base URL for conversion events.
    pub fn events_base_url(mut self, events_base_url: impl Into<String>) -> Self {
        self.events_base_url = events_base_url.into();
        self
    }

    /// Validate the configuration and create a [`Client`].
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the publisher id is blank or the timeout is out of range.
    /// - [`Error::InvalidBaseUrl`] if a base URL cannot be parsed.
    /// - [`Error::Io`] if the event delivery runtime fails to start.
    pub fn to_client(self) -> Result<Client> {
        Client::new(self.validate()?)
    }

    pub(crate) fn validate(self) -> Result<Settings> {
        if self.publisher_id.trim().is_empty() {
            return Err(Error::validation("publisher id cannot be blank"));
        }
        if self.timeout < Duration::from_millis(1) {
            return Err(Error::validation("timeout must be at least 1ms"));
        }
        if self.timeout > ClientConfig::MAX_TIMEOUT {
            return Err(Error::validation(format!(
                "timeout cannot exceed {}ms",
                ClientConfig::MAX_TIMEOUT.as_millis()
            )));
        }

        let ads_url = endpoint(&self.base_url, &format!("v1/rma/{}", self.publisher_id))?;
        let conversion_url = endpoint(&self.events_base_url, "v1/beacon/conversion")?;

        Ok(Settings {
            publisher_id: self.publisher_id,
            channel: self.channel,
            brand: self.brand,
            timeout: self.timeout,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                delay: self.retry_delay,
            },
            ads_url,
            conversion_url,
            identity: Arc::new(Identity::new(
                self.session_id_provider,
                self.user_id_provider,
            )),
            debug: Arc::new(DebugLogger::new(self.debug, self.debug_sink)),
        })
    }
}

/// `base` joined with `path`, tolerating a trailing slash on `base`.
fn endpoint(base: &str, path: &str) -> Result<Url> {
    let base = Url::parse(&format!("{}/", base.trim_end_matches('/'))).map_err(Error::InvalidBaseUrl)?;
    base.join(path).map_err(Error::InvalidBaseUrl)
}

/// Validated configuration shared by the ads and events clients.
pub(crate) struct Settings {
    pub publisher_id: String,
    pub channel: Channel,
    pub brand: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub ads_url: Url,
    pub conversion_url: Url,
    pub identity: Arc<Identity>,
    pub debug: Arc<DebugLogger>,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ClientConfig;
    use crate::{models::Channel, Error};

    fn config() -> ClientConfig {
        ClientConfig::new("publisher", Channel::Site, || "session".to_owned())
    }

    #[test]
    fn applies_defaults() {
        let settings = config().validate().unwrap();

        assert_eq!(settings.timeout, Duration::from_millis(500));
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.retry.delay, Duration::from_millis(100));
        assert_eq!(
            settings.ads_url.as_str(),
            "https://newtail-media.newtail.com.br/v1/rma/publisher"
        );
        assert_eq!(
            settings.conversion_url.as_str(),
            "https://newtail-media.newtail.com.br/v1/beacon/conversion"
        );
    }

    #[test]
    fn rejects_blank_publisher_id() {
        let result = ClientConfig::new(" ", Channel::App, || "session".to_owned()).validate();

        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn bounds_timeout() {
        assert!(config().timeout(Duration::ZERO).validate().is_err());
        assert!(matches!(
            config().timeout(Duration::from_micros(500)).validate(),
            Err(Error::Validation { .. })
        ));
        assert!(config()
            .timeout(Duration::from_millis(10_001))
            .validate()
            .is_err());
        assert!(config().timeout(Duration::from_millis(1)).validate().is_ok());
        assert!(config()
            .timeout(Duration::from_millis(10_000))
            .validate()
            .is_ok());
    }

    #[test]
    fn rejects_invalid_base_url() {
        let result = config().base_url("not a url").validate();

        assert!(matches!(result, Err(Error::InvalidBaseUrl(_))));
    }

    #[test]
    fn joins_base_url_with_trailing_slash() {
        let settings = config()
            .base_url("http://127.0.0.1:1234/")
            .events_base_url("http://127.0.0.1:5678/prefix")
            .validate()
            .unwrap();

        assert_eq!(
            settings.ads_url.as_str(),
            "http://127.0.0.1:1234/v1/rma/publisher"
        );
        assert_eq!(
            settings.conversion_url.as_str(),
            "http://127.0.0.1:5678/prefix/v1/beacon/conversion"
        );
    }

    #[test]
    fn does_not_call_session_provider_during_validation() {
        let settings = ClientConfig::new("publisher", Channel::Site, || -> String {
            panic!("session provider must be called lazily")
        })
        .validate();

        assert!(settings.is_ok());
    }
}
