use derive_more::From;
use serde::{Deserialize, Serialize};

/// Ad variant tag, as used in placement requests and in the `type` field of responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdType {
    /// [`ProductAd`].
    Product,
    /// [`BannerAd`].
    Banner,
    /// [`SponsoredBrandAd`].
    SponsoredBrand,
    /// [`DigitalSignageAd`].
    DigitalSignage,
}

impl AdType {
    /// Wire name of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            AdType::Product => "product",
            AdType::Banner => "banner",
            AdType::SponsoredBrand => "sponsored_brand",
            AdType::DigitalSignage => "digital_signage",
        }
    }

    /// Parse a discriminator value. Matching is case-insensitive.
    pub fn from_discriminator(value: &str) -> Option<AdType> {
        [
            AdType::Product,
            AdType::Banner,
            AdType::SponsoredBrand,
            AdType::DigitalSignage,
        ]
        .into_iter()
        .find(|ad_type| ad_type.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for AdType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every ad variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdEnvelope {
    /// Server-assigned ad identifier.
    pub ad_id: String,
    /// Beacon URL for clicks.
    pub click_url: String,
    /// Beacon URL for impressions.
    pub impression_url: String,
    /// Beacon URL for viewable impressions.
    pub view_url: String,
    /// Marketplace seller, if any.
    pub seller_id: Option<String>,
}

/// Sponsored product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductAd {
    /// Identifier and beacon URLs.
    pub envelope: AdEnvelope,
    /// SKU of the promoted product.
    pub product_sku: String,
}

/// Image or video banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerAd {
    /// Identifier and beacon URLs.
    pub envelope: AdEnvelope,
    /// Creative URL.
    pub media_url: String,
}

/// Brand creative together with the products it promotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsoredBrandAd {
    /// Identifier and beacon URLs.
    pub envelope: AdEnvelope,
    /// Creative URL.
    pub media_url: String,
    /// Promoted products, in server order.
    pub products: Vec<BrandProduct>,
}

/// Creative for in-store screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitalSignageAd {
    /// Identifier and beacon URLs.
    pub envelope: AdEnvelope,
    /// Creative URL.
    pub media_url: String,
    /// Display duration in seconds.
    pub duration: u32,
}

/// Product promoted by a [`SponsoredBrandAd`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandProduct {
    /// SKU of the promoted product.
    pub product_sku: String,
    /// Product image, if provided.
    pub media_url: Option<String>,
}

/// A decoded ad, one variant per [`AdType`].
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum Ad {
    /// Sponsored product.
    Product(ProductAd),
    /// Image or video banner.
    Banner(BannerAd),
    /// Brand creative with products.
    SponsoredBrand(SponsoredBrandAd),
    /// In-store screen creative.
    DigitalSignage(DigitalSignageAd),
}

impl Ad {
    /// Tag of this variant.
    pub fn ad_type(&self) -> AdType {
        match self {
            Ad::Product(_) => AdType::Product,
            Ad::Banner(_) => AdType::Banner,
            Ad::SponsoredBrand(_) => AdType::SponsoredBrand,
            Ad::DigitalSignage(_) => AdType::DigitalSignage,
        }
    }

    /// Fields shared by all variants.
    pub fn envelope(&self) -> &AdEnvelope {
        match self {
            Ad::Product(ad) => &ad.envelope,
            Ad::Banner(ad) => &ad.envelope,
            Ad::SponsoredBrand(ad) => &ad.envelope,
            Ad::DigitalSignage(ad) => &ad.envelope,
        }
    }

    /// Server-assigned ad identifier.
    pub fn ad_id(&self) -> &str {
        &self.envelope().ad_id
    }

    /// Beacon URL to report a click on this ad.
    pub fn click_url(&self) -> &str {
        &self.envelope().click_url
    }

    /// Beacon URL to report that this ad was rendered.
    pub fn impression_url(&self) -> &str {
        &self.envelope().impression_url
    }

    /// Beacon URL to report that this ad was actually seen.
    pub fn view_url(&self) -> &str {
        &self.envelope().view_url
    }

    /// Marketplace seller, if any.
    pub fn seller_id(&self) -> Option<&str> {
        self.envelope().seller_id.as_deref()
    }

    /// Media URL for media-bearing variants; `None` for product ads.
    pub fn media_url(&self) -> Option<&str> {
        match self {
            Ad::Product(_) => None,
            Ad::Banner(ad) => Some(&ad.media_url),
            Ad::SponsoredBrand(ad) => Some(&ad.media_url),
            Ad::DigitalSignage(ad) => Some(&ad.media_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AdType;

    #[test]
    fn parses_discriminator_case_insensitively() {
        assert_eq!(AdType::from_discriminator("banner"), Some(AdType::Banner));
        assert_eq!(
            AdType::from_discriminator("SPONSORED_BRAND"),
            Some(AdType::SponsoredBrand)
        );
        assert_eq!(AdType::from_discriminator("video"), None);
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&AdType::DigitalSignage).unwrap(),
            r#""digital_signage""#
        );
    }
}
