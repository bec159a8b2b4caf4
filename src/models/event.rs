use serde::Serialize;

use crate::{
    hashing::{sha256_hex, sha256_hex_opt},
    models::{Channel, Order},
};

/// Body posted to impression, view and click beacon URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRequest {
    /// Logged-in user, if any.
    pub user_id: Option<String>,
    /// Session the event happened in.
    pub session_id: String,
}

/// Body posted to the conversion endpoint.
///
/// Personal data is only ever sent hashed. Absent optional fields are omitted from the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionRequest {
    /// Publisher the conversion is attributed to.
    pub publisher_id: String,
    /// User who placed the order.
    pub user_id: String,
    /// Session the order was placed in.
    pub session_id: String,
    /// Publisher order id.
    pub order_id: String,
    /// Order creation time, ISO 8601 UTC.
    pub created_at: String,
    /// Order lines.
    pub items: Vec<ConversionItem>,
    /// Channel the order was placed through.
    pub channel: Channel,
    /// Brand of a multi-brand publisher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// `F`, `M` or `O`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Customer state (UF).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uf: Option<String>,
    /// Customer city.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Whether the customer is a company.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_company: Option<bool>,
    /// SHA-256 of the customer email.
    pub email_hashed: String,
    /// SHA-256 of the customer phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_hashed: Option<String>,
    /// SHA-256 of the tax document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_id_hashed: Option<String>,
    /// SHA-256 of the first name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name_hashed: Option<String>,
    /// SHA-256 of the last name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name_hashed: Option<String>,
}

/// A line of a [`ConversionRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionItem {
    /// Purchased product.
    pub product_sku: String,
    /// Units purchased.
    pub quantity: u32,
    /// Unit price, not multiplied by quantity.
    pub price: f64,
    /// Marketplace seller, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<String>,
}

/// Publisher-level fields a conversion is attributed to.
pub(crate) struct ConversionSource<'a> {
    pub publisher_id: &'a str,
    pub user_id: String,
    pub session_id: String,
    pub channel: Channel,
    pub brand: Option<&'a str>,
}

impl ConversionRequest {
    /// Build a conversion from an order, hashing all customer data.
    pub(crate) fn from_order(order: &Order, source: ConversionSource<'_>) -> ConversionRequest {
        ConversionRequest {
            publisher_id: source.publisher_id.to_owned(),
            user_id: source.user_id,
            session_id: source.session_id,
            order_id: order.order_id().to_owned(),
            created_at: order.created_at().to_owned(),
            items: order
                .items()
                .iter()
                .map(|item| ConversionItem {
                    product_sku: item.product_sku().to_owned(),
                    quantity: item.quantity(),
                    price: item.price(),
                    seller_id: item.seller_id().map(str::to_owned),
                })
                .collect(),
            channel: source.channel,
            brand: source.brand.map(str::to_owned),
            gender: order.gender().map(str::to_owned),
            uf: order.state().map(str::to_owned),
            city: order.city().map(str::to_owned),
            is_company: order.is_company(),
            email_hashed: sha256_hex(order.customer_email()),
            phone_hashed: sha256_hex_opt(order.customer_phone()),
            social_id_hashed: sha256_hex_opt(order.customer_document()),
            first_name_hashed: sha256_hex_opt(order.customer_first_name()),
            last_name_hashed: sha256_hex_opt(order.customer_last_name()),
        }
    }
}
