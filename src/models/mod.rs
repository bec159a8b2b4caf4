//! Typed model of the ads API. Field names are snake_case both in Rust and on the wire.
mod ad;
mod event;
mod order;
mod request;
mod response;

pub use ad::{Ad, AdEnvelope, AdType, BannerAd, BrandProduct, DigitalSignageAd, ProductAd, SponsoredBrandAd};
pub use event::{ConversionItem, ConversionRequest, EventRequest};
pub(crate) use event::ConversionSource;
pub use order::{Order, OrderItem};
pub use request::{AdsRequest, AssetType, Channel, Context, PlacementRequest, Segmentation};
pub use response::AdsResponse;
