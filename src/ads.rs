//! Synchronous ad queries.
use std::{fmt::Write as _, sync::Arc, time::Instant};

use indexmap::IndexMap;
use rand::Rng;
use reqwest::Method;

use crate::{
    config::Settings,
    debug::{DebugCategory, ADS_LOAD_LABEL},
    decoder::AdResponseDecoder,
    executor::{json_body, RequestExecutor},
    models::{AdType, AdsRequest, AdsResponse, Context, PlacementRequest, Segmentation},
    Error, Result,
};

/// Placements and targeting options of an ad query.
///
/// # Examples
/// ```
/// # use retail_ads::{AdType, AdsQuery, PlacementRequest};
/// let query = AdsQuery::new()
///     .placement("home_top", PlacementRequest::new(4, [AdType::Product]).unwrap())
///     .tags(["black-friday"])
///     .dedup_ads(true);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdsQuery {
    placements: IndexMap<String, PlacementRequest>,
    segmentation: Option<Vec<Segmentation>>,
    tags: Option<Vec<String>>,
    dedup_campaign_ads: bool,
    dedup_ads: bool,
}

impl AdsQuery {
    /// An empty query. Add at least one placement before sending it.
    pub fn new() -> AdsQuery {
        AdsQuery::default()
    }

    /// Add a named placement. A placement with the same name is replaced.
    pub fn placement(mut self, name: impl Into<String>, placement: PlacementRequest) -> AdsQuery {
        self.placements.insert(name.into(), placement);
        self
    }

    /// Audience targeting, e.g. gender or location.
    pub fn segmentation(mut self, segmentation: impl IntoIterator<Item = Segmentation>) -> AdsQuery {
        self.segmentation = Some(segmentation.into_iter().collect());
        self
    }

    /// Free-form tags contextualizing the query.
    pub fn tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> AdsQuery {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Return at most one ad per campaign.
    pub fn dedup_campaign_ads(mut self, dedup: bool) -> AdsQuery {
        self.dedup_campaign_ads = dedup;
        self
    }

    /// Never return the same ad in more than one placement.
    pub fn dedup_ads(mut self, dedup: bool) -> AdsQuery {
        self.dedup_ads = dedup;
        self
    }
}

/// Page-specific part of an ad query.
enum PageContext<'a> {
    Home,
    Search { term: &'a str },
    Category { category_name: &'a str },
    ProductPage { product_sku: &'a str },
}

/// Queries ads for the pages of a shop.
///
/// Calls block the current thread for up to `timeout × (max_retries + 1) + retry_delay ×
/// max_retries`.
pub struct AdsClient {
    settings: Arc<Settings>,
    executor: RequestExecutor,
    decoder: AdResponseDecoder,
}

impl AdsClient {
    pub(crate) fn new(settings: Arc<Settings>) -> Result<AdsClient> {
        let executor = RequestExecutor::new(settings.timeout, settings.retry)?;
        Ok(AdsClient {
            settings,
            executor,
            decoder: AdResponseDecoder,
        })
    }

    /// Get ads for the home page.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the session id is blank or `query` has no placements. No request
    ///   is made in this case.
    /// - Any HTTP or transport error from the ads endpoint, after retries.
    /// - [`Error::Decode`] if the response contains an unknown or incomplete ad.
    pub fn get_home_ads(&self, query: &AdsQuery) -> Result<AdsResponse> {
        self.query(PageContext::Home, query)
    }

    /// Get ads for a search results page.
    ///
    /// # Errors
    ///
    /// Same as [`AdsClient::get_home_ads`].
    pub fn get_search_ads(&self, term: &str, query: &AdsQuery) -> Result<AdsResponse> {
        self.query(PageContext::Search { term }, query)
    }

    /// Get ads for a category page. `category_name` is the full breadcrumb, e.g.
    /// `"Electronics > Smartphones"`.
    ///
    /// # Errors
    ///
    /// Same as [`AdsClient::get_home_ads`].
    pub fn get_category_ads(&self, category_name: &str, query: &AdsQuery) -> Result<AdsResponse> {
        self.query(PageContext::Category { category_name }, query)
    }

    /// Get ads for the page of the product identified by `product_sku`.
    ///
    /// # Errors
    ///
    /// Same as [`AdsClient::get_home_ads`].
    pub fn get_product_page_ads(&self, product_sku: &str, query: &AdsQuery) -> Result<AdsResponse> {
        self.query(PageContext::ProductPage { product_sku }, query)
    }

    fn query(&self, page: PageContext<'_>, query: &AdsQuery) -> Result<AdsResponse> {
        let request = self.build_request(page, query)?;
        let body = json_body(&request)?;
        let request_id = generate_request_id();
        let started = Instant::now();

        let result = self
            .executor
            .execute(Method::POST, &self.settings.ads_url, Some(&body))
            .and_then(|response| {
                let ads = self.decoder.decode(&response.body)?;
                Ok((response, ads))
            });
        let latency_ms = started.elapsed().as_millis();

        match result {
            Ok((response, ads)) => {
                self.settings.debug.log(DebugCategory::AdsLoad, ADS_LOAD_LABEL, || {
                    format!(
                        "ads_load success requestId={request_id} status={} latencyMs={latency_ms} count={} {} types={} returnedPlacements={} segmentation={} tagsCount={} dedupCampaign={} dedupAds={} responseSize={}",
                        response.status.as_u16(),
                        ads.len(),
                        request_summary(&request),
                        count_by_type(&ads),
                        ads.placement_names().collect::<Vec<_>>().join(","),
                        segmentation_keys(request.segmentation.as_deref()),
                        request.tags.as_ref().map_or(0, Vec::len),
                        request.dedup_campaign_ads,
                        request.dedup_ads,
                        response.body.len(),
                    )
                });
                Ok(ads)
            }
            Err(err) => {
                log::debug!(target: "retail_ads", request_id:% = request_id, error:% = err; "ad query failed");
                self.settings.debug.log(DebugCategory::AdsLoad, ADS_LOAD_LABEL, || {
                    format!(
                        "ads_load error requestId={request_id} status={} latencyMs={latency_ms} {} cause={}",
                        error_status(&err),
                        request_summary(&request),
                        err.to_string().chars().take(120).collect::<String>(),
                    )
                });
                Err(err)
            }
        }
    }

    fn build_request(&self, page: PageContext<'_>, query: &AdsQuery) -> Result<AdsRequest> {
        let session_id = self.settings.identity.session_id()?;
        if query.placements.is_empty() {
            return Err(Error::validation("at least one placement must be requested"));
        }

        let mut request = AdsRequest {
            session_id,
            user_id: self.settings.identity.user_id(),
            channel: self.settings.channel,
            context: Context::Home,
            placements: query.placements.clone(),
            term: None,
            category_name: None,
            product_sku: None,
            brand: self.settings.brand.clone(),
            segmentation: query.segmentation.clone(),
            tags: query.tags.clone(),
            dedup_campaign_ads: query.dedup_campaign_ads,
            dedup_ads: query.dedup_ads,
        };
        match page {
            PageContext::Home => {}
            PageContext::Search { term } => {
                request.context = Context::Search;
                request.term = Some(term.to_owned());
            }
            PageContext::Category { category_name } => {
                request.context = Context::Category;
                request.category_name = Some(category_name.to_owned());
            }
            PageContext::ProductPage { product_sku } => {
                request.context = Context::ProductPage;
                request.product_sku = Some(product_sku.to_owned());
            }
        }
        Ok(request)
    }
}

fn generate_request_id() -> String {
    format!(
        "req_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        rand::thread_rng().gen_range(0..1000)
    )
}

/// Fields shared by success and error records.
fn request_summary(request: &AdsRequest) -> String {
    format!(
        "context={} channel={} placements={} userId={} sessionId={}",
        request.context,
        request.channel,
        request.placements.len(),
        request.user_id.as_deref().unwrap_or("null"),
        request.session_id.chars().take(12).collect::<String>(),
    )
}

fn error_status(err: &Error) -> String {
    match err {
        Error::Decode(_) => "parse_error".to_owned(),
        _ => err.status().map_or(0, |status| status.as_u16()).to_string(),
    }
}

/// Ad counts per type in order of first appearance, e.g. `{product=2, banner=1}`.
fn count_by_type(ads: &AdsResponse) -> String {
    let mut counts: Vec<(AdType, usize)> = Vec::new();
    for ad in ads.all_ads() {
        match counts.iter_mut().find(|(ad_type, _)| *ad_type == ad.ad_type()) {
            Some((_, count)) => *count += 1,
            None => counts.push((ad.ad_type(), 1)),
        }
    }

    let mut out = String::from("{");
    for (i, (ad_type, count)) in counts.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{ad_type}={count}");
    }
    out.push('}');
    out
}

fn segmentation_keys(segmentation: Option<&[Segmentation]>) -> String {
    match segmentation {
        Some(segmentation) if !segmentation.is_empty() => segmentation
            .iter()
            .map(|s| s.key.as_str())
            .collect::<Vec<_>>()
            .join(","),
        _ => "none".to_owned(),
    }
}
