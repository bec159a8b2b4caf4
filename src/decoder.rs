//! Decoding of ad query responses.
//!
//! The response is a JSON object where every array value is a placement's list of ads and every
//! other value is metadata that is ignored. Each ad record is dispatched on its `type`
//! discriminator into the matching [`Ad`] variant.
use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::{
    error::DecodeError,
    models::{
        Ad, AdEnvelope, AdType, AdsResponse, BannerAd, BrandProduct, DigitalSignageAd, ProductAd,
        SponsoredBrandAd,
    },
};

/// Decodes raw ad query response bodies into [`AdsResponse`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AdResponseDecoder;

impl AdResponseDecoder {
    /// Decode a response body.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, a non-object body, an unknown `type`, or a missing required field.
    /// A single bad record fails the whole response.
    pub fn decode(&self, body: &str) -> Result<AdsResponse, DecodeError> {
        let value: Value = serde_json::from_str(body)?;
        self.decode_value(&value)
    }

    /// Decode an already-parsed response.
    pub fn decode_value(&self, value: &Value) -> Result<AdsResponse, DecodeError> {
        let Value::Object(root) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let placements = root
            .iter()
            .filter_map(|(name, value)| value.as_array().map(|records| (name, records)))
            .map(|(name, records)| {
                let ads = records
                    .iter()
                    .map(decode_ad)
                    .collect::<Result<Vec<_>, DecodeError>>()?;
                Ok::<_, DecodeError>((name.clone(), ads))
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        Ok(AdsResponse::new(placements))
    }
}

fn decode_ad(value: &Value) -> Result<Ad, DecodeError> {
    let Value::Object(record) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let discriminator = required_str(record, "type")?;
    let ad_type =
        AdType::from_discriminator(&discriminator).ok_or_else(|| DecodeError::UnknownAdType {
            ad_type: discriminator.into_owned(),
        })?;

    let envelope = AdEnvelope {
        ad_id: required_str(record, "ad_id")?.into_owned(),
        click_url: required_str(record, "click_url")?.into_owned(),
        impression_url: required_str(record, "impression_url")?.into_owned(),
        view_url: required_str(record, "view_url")?.into_owned(),
        seller_id: optional_str(record, "seller_id")?.map(Cow::into_owned),
    };

    let ad = match ad_type {
        AdType::Product => ProductAd {
            envelope,
            product_sku: required_str(record, "product_sku")?.into_owned(),
        }
        .into(),
        AdType::Banner => BannerAd {
            envelope,
            media_url: media_url(record)?,
        }
        .into(),
        AdType::SponsoredBrand => SponsoredBrandAd {
            envelope,
            media_url: media_url(record)?,
            products: brand_products(record)?,
        }
        .into(),
        AdType::DigitalSignage => DigitalSignageAd {
            envelope,
            media_url: media_url(record)?,
            duration: required_u32(record, "duration")?,
        }
        .into(),
    };
    Ok(ad)
}

/// `media_url` if present, otherwise the `url` of the first asset that has one.
fn media_url(record: &Map<String, Value>) -> Result<String, DecodeError> {
    if let Some(media_url) = optional_str(record, "media_url")? {
        return Ok(media_url.into_owned());
    }

    let first_asset_url = match record.get("assets") {
        None | Some(Value::Null) => None,
        Some(Value::Array(assets)) => assets
            .iter()
            .filter_map(|asset| asset.get("url").and_then(Value::as_str))
            .find(|url| !url.trim().is_empty()),
        Some(_) => {
            return Err(DecodeError::InvalidField {
                field: "assets".to_owned(),
                expected: "array",
            })
        }
    };

    first_asset_url
        .map(str::to_owned)
        .ok_or_else(|| DecodeError::missing("media_url"))
}

fn brand_products(record: &Map<String, Value>) -> Result<Vec<BrandProduct>, DecodeError> {
    let products = match record.get("products") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(products)) => products,
        Some(_) => {
            return Err(DecodeError::InvalidField {
                field: "products".to_owned(),
                expected: "array",
            })
        }
    };

    products
        .iter()
        .map(|product| {
            let Value::Object(product) = product else {
                return Err(DecodeError::NotAnObject);
            };
            Ok(BrandProduct {
                product_sku: required_str(product, "product_sku")
                    .map_err(|_| DecodeError::missing("products.product_sku"))?
                    .into_owned(),
                media_url: optional_str(product, "media_url")?.map(Cow::into_owned),
            })
        })
        .collect()
}

/// A string field that must be present and non-blank.
fn required_str<'a>(
    record: &'a Map<String, Value>,
    field: &str,
) -> Result<Cow<'a, str>, DecodeError> {
    optional_str(record, field)?.ok_or_else(|| DecodeError::missing(field))
}

/// A string field that may be absent or null. Blank strings count as absent. Numbers are accepted
/// in their JSON form, so numeric ids and SKUs decode as strings.
fn optional_str<'a>(
    record: &'a Map<String, Value>,
    field: &str,
) -> Result<Option<Cow<'a, str>>, DecodeError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if value.trim().is_empty() => Ok(None),
        Some(Value::String(value)) => Ok(Some(Cow::Borrowed(value))),
        Some(Value::Number(value)) => Ok(Some(Cow::Owned(value.to_string()))),
        Some(_) => Err(DecodeError::InvalidField {
            field: field.to_owned(),
            expected: "string",
        }),
    }
}

fn required_u32(record: &Map<String, Value>, field: &str) -> Result<u32, DecodeError> {
    match record.get(field) {
        None | Some(Value::Null) => Err(DecodeError::missing(field)),
        Some(value) => value
            .as_u64()
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| DecodeError::InvalidField {
                field: field.to_owned(),
                expected: "non-negative integer",
            }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::AdResponseDecoder;
    use crate::{
        error::DecodeError,
        models::{Ad, AdType, BrandProduct},
    };

    /// An ad record with all envelope fields plus `extra`.
    fn ad(ad_type: &str, id: &str, extra: Value) -> Value {
        let mut record = json!({
            "type": ad_type,
            "ad_id": id,
            "click_url": format!("https://e.test/click?ad={id}"),
            "impression_url": format!("https://e.test/impression?ad={id}"),
            "view_url": format!("https://e.test/view?ad={id}"),
        });
        if let (Value::Object(record), Value::Object(extra)) = (&mut record, extra) {
            record.extend(extra);
        }
        record
    }

    fn decode_single(record: Value) -> Result<Ad, DecodeError> {
        let response = AdResponseDecoder.decode_value(&json!({ "top": [record] }))?;
        Ok(response.placement("top")[0].clone())
    }

    #[test]
    fn decodes_every_variant() {
        let body = json!({
            "products": [ad("product", "p1", json!({ "product_sku": "sku-1", "seller_id": "seller" }))],
            "banners": [ad("banner", "b1", json!({ "media_url": "https://cdn.test/b1.png" }))],
            "brands": [ad("sponsored_brand", "s1", json!({
                "media_url": "https://cdn.test/s1.png",
                "products": [
                    { "product_sku": "sku-2", "media_url": null },
                    { "product_sku": "sku-3", "media_url": "https://cdn.test/3.png" }
                ]
            }))],
            "signage": [ad("digital_signage", "d1", json!({
                "media_url": "https://cdn.test/d1.mp4",
                "duration": 15
            }))]
        });

        let response = AdResponseDecoder.decode(&body.to_string()).unwrap();

        let types: Vec<AdType> = response.all_ads().iter().map(|ad| ad.ad_type()).collect();
        assert_eq!(
            types,
            vec![
                AdType::Product,
                AdType::Banner,
                AdType::SponsoredBrand,
                AdType::DigitalSignage
            ]
        );
        assert_eq!(response.placement("products")[0].seller_id(), Some("seller"));
        assert_eq!(
            response.placement("banners")[0].click_url(),
            "https://e.test/click?ad=b1"
        );

        let Ad::SponsoredBrand(brand) = &response.placement("brands")[0] else {
            panic!("expected a sponsored brand ad");
        };
        assert_eq!(
            brand.products,
            vec![
                BrandProduct {
                    product_sku: "sku-2".to_owned(),
                    media_url: None
                },
                BrandProduct {
                    product_sku: "sku-3".to_owned(),
                    media_url: Some("https://cdn.test/3.png".to_owned())
                },
            ]
        );

        let Ad::DigitalSignage(signage) = &response.placement("signage")[0] else {
            panic!("expected a digital signage ad");
        };
        assert_eq!(signage.duration, 15);
    }

    #[test]
    fn falls_back_to_first_asset_url() {
        let record = ad(
            "banner",
            "b1",
            json!({
                "assets": [
                    { "type": "image", "url": "https://cdn.test/first.png" },
                    { "type": "image", "url": "https://cdn.test/second.png" }
                ]
            }),
        );

        let ad = decode_single(record).unwrap();

        assert!(matches!(ad, Ad::Banner(_)));
        assert_eq!(ad.media_url(), Some("https://cdn.test/first.png"));
    }

    #[test]
    fn prefers_media_url_over_assets() {
        let record = ad(
            "banner",
            "b1",
            json!({
                "assets": [{ "url": "https://cdn.test/asset.png" }],
                "media_url": "https://cdn.test/direct.png"
            }),
        );

        let ad = decode_single(record).unwrap();

        assert_eq!(ad.media_url(), Some("https://cdn.test/direct.png"));
    }

    #[test]
    fn accepts_numeric_ids_and_skus() {
        let mut record = ad("product", "p1", json!({ "product_sku": 987654, "seller_id": 42 }));
        record["ad_id"] = json!(12345);

        let ad = decode_single(record).unwrap();

        let Ad::Product(product) = &ad else {
            panic!("expected a product ad");
        };
        assert_eq!(ad.ad_id(), "12345");
        assert_eq!(product.product_sku, "987654");
        assert_eq!(ad.seller_id(), Some("42"));
    }

    #[test]
    fn rejects_non_scalar_string_fields() {
        let record = ad("product", "p1", json!({ "product_sku": ["sku"] }));

        let err = decode_single(record).unwrap_err();

        assert!(matches!(err, DecodeError::InvalidField { field, .. } if field == "product_sku"));
    }

    #[test]
    fn rejects_unknown_type() {
        let record = ad("hologram", "h1", json!({ "media_url": "https://cdn.test/h.png" }));

        let err = decode_single(record).unwrap_err();

        assert!(matches!(err, DecodeError::UnknownAdType { ad_type } if ad_type == "hologram"));
    }

    #[test]
    fn names_missing_envelope_field() {
        let mut record = ad("product", "p1", json!({ "product_sku": "sku" }));
        record.as_object_mut().unwrap().remove("view_url");

        let err = decode_single(record).unwrap_err();

        assert!(matches!(err, DecodeError::MissingField { field } if field == "view_url"));
    }

    #[test]
    fn requires_variant_specific_fields() {
        let cases = [
            (ad("product", "p", json!({})), "product_sku"),
            (ad("banner", "b", json!({})), "media_url"),
            (ad("banner", "b", json!({ "assets": [] })), "media_url"),
            (
                ad("digital_signage", "d", json!({ "media_url": "https://cdn.test/d.mp4" })),
                "duration",
            ),
            (
                ad(
                    "sponsored_brand",
                    "s",
                    json!({
                        "media_url": "https://cdn.test/s.png",
                        "products": [{ "media_url": "https://cdn.test/p.png" }]
                    }),
                ),
                "products.product_sku",
            ),
        ];

        for (record, expected) in cases {
            let err = decode_single(record).unwrap_err();
            assert!(
                matches!(&err, DecodeError::MissingField { field } if field == expected),
                "expected missing {expected}, got {err:?}"
            );
        }
    }

    #[test]
    fn treats_blank_ad_id_as_missing() {
        let record = ad("product", " ", json!({ "product_sku": "sku" }));

        let err = decode_single(record).unwrap_err();

        assert!(matches!(err, DecodeError::MissingField { field } if field == "ad_id"));
    }

    #[test]
    fn rejects_mistyped_duration() {
        let record = ad(
            "digital_signage",
            "d",
            json!({ "media_url": "https://cdn.test/d.mp4", "duration": "15s" }),
        );

        let err = decode_single(record).unwrap_err();

        assert!(matches!(err, DecodeError::InvalidField { field, .. } if field == "duration"));
    }

    #[test]
    fn ignores_non_array_fields() {
        let body = json!({
            "request_id": "abc",
            "count": 1,
            "top": [ad("product", "p1", json!({ "product_sku": "sku" }))]
        });

        let response = AdResponseDecoder.decode_value(&body).unwrap();

        assert_eq!(response.placement_names().collect::<Vec<_>>(), vec!["top"]);
        assert_eq!(response.placement("top")[0].seller_id(), None);
    }

    #[test]
    fn preserves_response_order_of_placements() {
        let body = r#"{"zeta": [], "alpha": [], "mid": []}"#;

        let response = AdResponseDecoder.decode(body).unwrap();

        assert_eq!(
            response.placement_names().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mid"]
        );
    }

    #[test]
    fn rejects_malformed_bodies() {
        assert!(matches!(
            AdResponseDecoder.decode("not json"),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            AdResponseDecoder.decode("[]"),
            Err(DecodeError::NotAnObject)
        ));
    }
}
