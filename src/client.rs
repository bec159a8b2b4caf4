use std::sync::Arc;

use crate::{ads::AdsClient, config::Settings, events::EventClient, Result};

/// A client for the retail ads API.
///
/// In order to create a client instance, first create [`ClientConfig`](crate::ClientConfig).
///
/// # Examples
/// ```no_run
/// # use retail_ads::{AdType, AdsQuery, Channel, ClientConfig, PlacementRequest};
/// let client = ClientConfig::new("publisher-id", Channel::Site, || "session-id".to_owned())
///     .to_client()?;
///
/// let query = AdsQuery::new().placement("home_top", PlacementRequest::new(4, [AdType::Product])?);
/// let ads = client.ads().get_home_ads(&query)?;
/// for ad in ads.all_ads() {
///     client.events().deliver_beacon(ad.impression_url(), Some("home_top"), |_| ());
/// }
/// # Ok::<(), retail_ads::Error>(())
/// ```
pub struct Client {
    settings: Arc<Settings>,
    ads: AdsClient,
    events: EventClient,
}

impl Client {
    pub(crate) fn new(settings: Settings) -> Result<Client> {
        let settings = Arc::new(settings);
        Ok(Client {
            ads: AdsClient::new(settings.clone())?,
            events: EventClient::new(settings.clone())?,
            settings,
        })
    }

    /// Ad queries. Calls block the current thread.
    pub fn ads(&self) -> &AdsClient {
        &self.ads
    }

    /// Event delivery. Calls return immediately.
    pub fn events(&self) -> &EventClient {
        &self.events
    }

    /// Set the logged-in user, e.g. after login. `None` drops the override so that the configured
    /// user id provider applies again.
    ///
    /// The new value is used by every subsequent ad query and by events whose delivery has not
    /// started yet.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`](crate::Error::Validation) if `user_id` is blank.
    pub fn update_user_id(&self, user_id: Option<&str>) -> Result<()> {
        self.settings
            .identity
            .update_user_id(user_id.map(str::to_owned))?;
        log::debug!(target: "retail_ads", anonymous = user_id.is_none(); "updated user id");
        Ok(())
    }

    /// User id sent with the next request, if any.
    pub fn current_user_id(&self) -> Option<String> {
        self.settings.identity.user_id()
    }

    /// Stop event delivery and release background resources. See [`EventClient::close`].
    ///
    /// Ad queries keep working after `close`.
    pub fn close(&self) {
        self.events.close();
    }
}
