use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{models::AdType, Error, Result};

/// Channel the shopper is browsing through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Desktop website.
    Site,
    /// Mobile website.
    Msite,
    /// Native app.
    App,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Channel::Site => "site",
            Channel::Msite => "msite",
            Channel::App => "app",
        })
    }
}

/// Page context an ad query is made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Context {
    /// Home page.
    Home,
    /// Search results.
    Search,
    /// Category listing.
    Category,
    /// Product detail page.
    ProductPage,
    /// Brand landing page.
    BrandPage,
    /// In-store screens.
    DigitalSignage,
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Context::Home => "home",
            Context::Search => "search",
            Context::Category => "category",
            Context::ProductPage => "product_page",
            Context::BrandPage => "brand_page",
            Context::DigitalSignage => "digital_signage",
        })
    }
}

/// Media types a placement accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    /// Static image.
    Image,
    /// Video.
    Video,
}

/// Request for a single ad slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementRequest {
    quantity: u32,
    types: Vec<AdType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assets_type: Option<Vec<AssetType>>,
    allow_sku_duplications: bool,
}

impl PlacementRequest {
    /// Create a placement asking for `quantity` ads of the given `types`.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if `quantity` is zero or `types` is empty.
    pub fn new(quantity: u32, types: impl IntoIterator<Item = AdType>) -> Result<PlacementRequest> {
        if quantity == 0 {
            return Err(Error::validation("placement quantity must be greater than 0"));
        }
        let types: Vec<AdType> = types.into_iter().collect();
        if types.is_empty() {
            return Err(Error::validation("at least one ad type must be specified"));
        }

        Ok(PlacementRequest {
            quantity,
            types,
            size: None,
            assets_type: None,
            allow_sku_duplications: false,
        })
    }

    /// Expected creative size, e.g. `"desktop"` for banners or `"720p"` for videos.
    pub fn with_size(mut self, size: impl Into<String>) -> PlacementRequest {
        self.size = Some(size.into());
        self
    }

    /// Media types the slot accepts. Unset means any.
    pub fn with_assets_type(
        mut self,
        assets_type: impl IntoIterator<Item = AssetType>,
    ) -> PlacementRequest {
        self.assets_type = Some(assets_type.into_iter().collect());
        self
    }

    /// Allow the same SKU to appear more than once in this placement.
    pub fn allow_sku_duplications(mut self, allow: bool) -> PlacementRequest {
        self.allow_sku_duplications = allow;
        self
    }

    /// Maximum number of ads.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Accepted ad types.
    pub fn types(&self) -> &[AdType] {
        &self.types
    }
}

/// Targeting key with its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segmentation {
    /// Targeting key, e.g. `"gender"`.
    pub key: String,
    /// Values matched for `key`.
    pub values: Vec<String>,
}

/// Body of an ad query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdsRequest {
    /// Opaque session identifier.
    pub session_id: String,
    /// Logged-in user, if any.
    pub user_id: Option<String>,
    /// Channel the query comes from.
    pub channel: Channel,
    /// Page context.
    pub context: Context,
    /// Requested placements, in insertion order.
    pub placements: IndexMap<String, PlacementRequest>,
    /// Search term, for [`Context::Search`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    /// Category breadcrumb, for [`Context::Category`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    /// Product SKU, for [`Context::ProductPage`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_sku: Option<String>,
    /// Brand of a multi-brand publisher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Audience targeting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<Vec<Segmentation>>,
    /// Free-form context tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// At most one ad per campaign.
    pub dedup_campaign_ads: bool,
    /// No ad in more than one placement.
    pub dedup_ads: bool,
}
