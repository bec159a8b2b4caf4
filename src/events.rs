//! Fire-and-forget delivery of ad interaction and conversion events.
//!
//! Every delivery runs as an independent task on a small background runtime owned by
//! [`EventClient`]. Outcomes are reported through a completion callback and debug records only;
//! nothing here returns an error to the caller.
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use reqwest::{Method, StatusCode, Url};
use tokio::runtime::Runtime;

use crate::{
    config::Settings,
    debug::{DebugCategory, EVENTS_LABEL},
    executor::{RequestExecutor, RetryPolicy},
    models::{ConversionRequest, ConversionSource, EventRequest, Order},
    Result,
};

/// Outcome of a single delivery. `Err` carries the reason reported in debug records.
type Delivery = std::result::Result<(), &'static str>;

/// Query parameters of beacon URLs copied into debug records, with their record keys.
const TRACED_URL_PARAMS: [(&str, &str); 8] = [
    ("request_id", "requestId"),
    ("campaign_id", "campaignId"),
    ("ad_type", "adType"),
    ("pname", "pname"),
    ("context", "context"),
    ("channel", "channel"),
    ("ad_size", "adSize"),
    ("requested_at", "requestedAt"),
];

/// Sends impression, view, click and conversion events without blocking the caller.
///
/// Beacons succeed only when the server answers `202 Accepted`. Conversions succeed on any 2xx
/// status. Event requests are never retried and each attempt is bounded by
/// [`EventClient::TIMEOUT`].
pub struct EventClient {
    settings: Arc<Settings>,
    executor: Arc<RequestExecutor>,
    runtime: Mutex<Option<Runtime>>,
    closed: AtomicBool,
}

impl EventClient {
    /// Per-request timeout for event delivery.
    pub const TIMEOUT: Duration = Duration::from_secs(1);

    /// Must not be called from within an async runtime.
    pub(crate) fn new(settings: Arc<Settings>) -> Result<EventClient> {
        let executor = Arc::new(RequestExecutor::new(
            EventClient::TIMEOUT,
            RetryPolicy::NONE,
        )?);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("retail-ads-events")
            .build()?;

        Ok(EventClient {
            settings,
            executor,
            runtime: Mutex::new(Some(runtime)),
            closed: AtomicBool::new(false),
        })
    }

    /// Report an impression, view or click by posting to `event_url`, one of the URLs carried by
    /// an [`Ad`](crate::Ad).
    ///
    /// Returns immediately. `on_complete` is called from a background thread with `true` once the
    /// server accepted the event (status 202), or with `false` on any other outcome.
    pub fn deliver_beacon(
        &self,
        event_url: &str,
        placement: Option<&str>,
        on_complete: impl FnOnce(bool) + Send + 'static,
    ) {
        let category = beacon_category(event_url);
        let action = beacon_action(category);
        let placement = placement.map(str::to_owned);

        self.settings.debug.log(category, EVENTS_LABEL, || {
            beacon_record(action, "success", placement.as_deref(), event_url, None)
        });

        let send = {
            let settings = self.settings.clone();
            let executor = self.executor.clone();
            let event_url = event_url.to_owned();
            move || send_beacon(&settings, &executor, &event_url)
        };
        let on_failure = {
            let settings = self.settings.clone();
            let event_url = event_url.to_owned();
            move |reason: &str| {
                settings.debug.log(category, EVENTS_LABEL, || {
                    beacon_record(action, "error", placement.as_deref(), &event_url, Some(reason))
                })
            }
        };
        self.dispatch(send, on_failure, on_complete);
    }

    /// Report a conversion.
    ///
    /// Returns immediately. `on_complete` is called from a background thread with `true` if the
    /// server answered with a 2xx status, `false` otherwise.
    pub fn send_conversion(
        &self,
        conversion: ConversionRequest,
        on_complete: impl FnOnce(bool) + Send + 'static,
    ) {
        let order_id = conversion.order_id.clone();
        let user_id = conversion.user_id.clone();
        self.settings
            .debug
            .log(DebugCategory::EventsConversion, EVENTS_LABEL, || {
                format!(
                    "conversion success orderId={order_id} userId={user_id} items={}",
                    conversion.items.len()
                )
            });

        let send = {
            let settings = self.settings.clone();
            let executor = self.executor.clone();
            move || post_conversion(&settings, &executor, &conversion)
        };
        self.dispatch(
            send,
            self.conversion_failure(order_id, user_id),
            on_complete,
        );
    }

    /// Report a completed order as a conversion, hashing all customer data before it leaves the
    /// process.
    ///
    /// `user_id` defaults to the client's current user id. If neither is available the delivery
    /// fails immediately and `on_complete` receives `false`.
    pub fn deliver_order(
        &self,
        order: &Order,
        user_id: Option<&str>,
        on_complete: impl FnOnce(bool) + Send + 'static,
    ) {
        let order_id = order.order_id().to_owned();
        let Some(user_id) = user_id
            .filter(|user_id| !user_id.trim().is_empty())
            .map(str::to_owned)
            .or_else(|| self.settings.identity.user_id())
        else {
            self.settings
                .debug
                .log(DebugCategory::EventsConversion, EVENTS_LABEL, || {
                    format!("conversion error orderId={order_id} userId=null reason=missing_user_id")
                });
            complete(on_complete, false);
            return;
        };

        self.settings
            .debug
            .log(DebugCategory::EventsConversion, EVENTS_LABEL, || {
                format!(
                    "conversion success orderId={order_id} userId={user_id} items={}",
                    order.items().len()
                )
            });

        let send = {
            let settings = self.settings.clone();
            let executor = self.executor.clone();
            let order = order.clone();
            let user_id = user_id.clone();
            move || -> Delivery {
                let session_id = settings
                    .identity
                    .session_id()
                    .map_err(|_| "invalid_session_id")?;
                let conversion = ConversionRequest::from_order(
                    &order,
                    ConversionSource {
                        publisher_id: &settings.publisher_id,
                        user_id,
                        session_id,
                        channel: settings.channel,
                        brand: settings.brand.as_deref(),
                    },
                );
                post_conversion(&settings, &executor, &conversion)
            }
        };
        self.dispatch(send, self.conversion_failure(order_id, user_id), on_complete);
    }

    /// Stop accepting events and shut the background runtime down.
    ///
    /// In-flight deliveries get up to [`EventClient::TIMEOUT`] to finish. Events submitted after
    /// this call fail immediately. Calling `close` more than once has no further effect.
    ///
    /// Must not be called from within an async runtime.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let runtime = self
            .runtime
            .lock()
            .expect("thread holding event runtime lock should not panic")
            .take();
        if let Some(runtime) = runtime {
            log::debug!(target: "retail_ads", "shutting down event runtime");
            runtime.shutdown_timeout(EventClient::TIMEOUT);
        }
    }

    /// Whether [`EventClient::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn conversion_failure(
        &self,
        order_id: String,
        user_id: String,
    ) -> impl FnOnce(&str) + Send + 'static {
        let settings = self.settings.clone();
        move |reason: &str| {
            settings
                .debug
                .log(DebugCategory::EventsConversion, EVENTS_LABEL, || {
                    format!("conversion error orderId={order_id} userId={user_id} reason={reason}")
                })
        }
    }

    /// Run `send` as an isolated background task. A panic inside `send` fails only this delivery.
    ///
    /// Every call completes exactly once, including deliveries submitted concurrently with
    /// [`EventClient::close`] and tasks cancelled by the runtime shutdown.
    fn dispatch(
        &self,
        send: impl FnOnce() -> Delivery + Send + 'static,
        on_failure: impl FnOnce(&str) + Send + 'static,
        on_complete: impl FnOnce(bool) + Send + 'static,
    ) {
        let pending = PendingDelivery {
            on_failure: Some(on_failure),
            on_complete: Some(on_complete),
        };

        // Spawning under the lock keeps `close` from shutting the runtime down in between.
        let pending = {
            let runtime = self
                .runtime
                .lock()
                .expect("thread holding event runtime lock should not panic");
            match runtime.as_ref() {
                Some(runtime) => {
                    runtime.spawn(async move {
                        let delivery = match tokio::task::spawn_blocking(send).await {
                            Ok(delivery) => delivery,
                            Err(err) => {
                                log::warn!(target: "retail_ads", error:% = err; "event delivery task failed");
                                Err("task_failed")
                            }
                        };
                        pending.finish(delivery);
                    });
                    return;
                }
                None => pending,
            }
        };

        log::debug!(target: "retail_ads", "event client is closed, dropping event");
        pending.finish(Err("closed"));
    }
}

/// Callbacks of a submitted delivery. Dropping it unfinished reports a cancelled delivery.
struct PendingDelivery<F: FnOnce(&str), C: FnOnce(bool)> {
    on_failure: Option<F>,
    on_complete: Option<C>,
}

impl<F: FnOnce(&str), C: FnOnce(bool)> PendingDelivery<F, C> {
    fn finish(mut self, delivery: Delivery) {
        self.report(delivery);
    }

    fn report(&mut self, delivery: Delivery) {
        let Some(on_complete) = self.on_complete.take() else {
            return;
        };
        if let Err(reason) = delivery {
            log::debug!(target: "retail_ads", reason; "event delivery failed");
            if let Some(on_failure) = self.on_failure.take() {
                on_failure(reason);
            }
        }
        complete(on_complete, delivery.is_ok());
    }
}

impl<F: FnOnce(&str), C: FnOnce(bool)> Drop for PendingDelivery<F, C> {
    fn drop(&mut self) {
        self.report(Err("cancelled"));
    }
}

impl Drop for EventClient {
    fn drop(&mut self) {
        let runtime = match self.runtime.get_mut() {
            Ok(runtime) => runtime.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
    }
}

/// Invoke a user callback, discarding any panic it raises.
fn complete(on_complete: impl FnOnce(bool), success: bool) {
    if catch_unwind(AssertUnwindSafe(|| on_complete(success))).is_err() {
        log::warn!(target: "retail_ads", "event completion callback panicked");
    }
}

fn send_beacon(settings: &Settings, executor: &RequestExecutor, event_url: &str) -> Delivery {
    let url = Url::parse(event_url).map_err(|_| "invalid_url")?;
    let session_id = settings
        .identity
        .session_id()
        .map_err(|_| "invalid_session_id")?;
    let body = serde_json::to_string(&EventRequest {
        user_id: settings.identity.user_id(),
        session_id,
    })
    .map_err(|_| "serialization_error")?;

    match executor.execute(Method::POST, &url, Some(&body)) {
        Ok(response) if response.status == StatusCode::ACCEPTED => Ok(()),
        Ok(response) => {
            log::debug!(target: "retail_ads",
                url = event_url,
                status = response.status.as_u16();
                "beacon not accepted");
            Err("unexpected_status")
        }
        Err(err) => {
            log::debug!(target: "retail_ads", url = event_url, error:% = err; "beacon failed");
            Err("network_error")
        }
    }
}

fn post_conversion(
    settings: &Settings,
    executor: &RequestExecutor,
    conversion: &ConversionRequest,
) -> Delivery {
    let body = serde_json::to_string(conversion).map_err(|_| "serialization_error")?;
    executor
        .execute(Method::POST, &settings.conversion_url, Some(&body))
        .map(|_| ())
        .map_err(|err| {
            log::debug!(target: "retail_ads",
                order_id = conversion.order_id.as_str(),
                error:% = err;
                "conversion failed");
            "network_error"
        })
}

/// Event category inferred from the beacon URL path. Unrecognized or unparsable URLs count as
/// impressions.
fn beacon_category(event_url: &str) -> DebugCategory {
    let Ok(url) = Url::parse(event_url) else {
        return DebugCategory::EventsImpression;
    };
    let path = url.path();
    if path.contains("impression") {
        DebugCategory::EventsImpression
    } else if path.contains("view") {
        DebugCategory::EventsView
    } else if path.contains("click") {
        DebugCategory::EventsClick
    } else {
        DebugCategory::EventsImpression
    }
}

fn beacon_action(category: DebugCategory) -> &'static str {
    match category {
        DebugCategory::EventsView => "view",
        DebugCategory::EventsClick => "click",
        _ => "impression",
    }
}

fn beacon_record(
    action: &str,
    outcome: &str,
    placement: Option<&str>,
    event_url: &str,
    reason: Option<&str>,
) -> String {
    let mut parts = vec![format!("{action} {outcome}")];
    if let Some(placement) = placement {
        parts.push(format!("placement={placement}"));
    }
    parts.extend(traced_url_params(event_url));
    if let Some(reason) = reason {
        parts.push(format!("reason={reason}"));
    }
    parts.join(" ")
}

/// `key=value` pairs for the traced query parameters present in `event_url`.
fn traced_url_params(event_url: &str) -> Vec<String> {
    let Ok(url) = Url::parse(event_url) else {
        return Vec::new();
    };
    let pairs: Vec<_> = url.query_pairs().collect();

    TRACED_URL_PARAMS
        .iter()
        .filter_map(|(param, key)| {
            pairs
                .iter()
                .find(|(name, _)| name == param)
                .map(|(_, value)| format!("{key}={value}"))
        })
        .collect()
}
