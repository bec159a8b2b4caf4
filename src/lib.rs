//! Rust client for retail media ads: query sponsored products, banners and other ad formats for
//! shop pages, and report impressions, views, clicks and conversions back to the ad server.
//!
//! # Overview
//!
//! The SDK revolves around a [`Client`] created from a [`ClientConfig`]. [`Client::ads`] returns
//! an [`AdsClient`] that queries ads for a page context (home, search, category or product page)
//! and decodes them into typed [`Ad`] variants grouped by placement in an [`AdsResponse`].
//! [`Client::events`] returns an [`EventClient`] that delivers interaction beacons and order
//! conversions in the background without blocking the caller.
//!
//! Session and user ids are supplied by the host application through [`SessionIdProvider`] and
//! [`UserIdProvider`] implementations (any `Fn` closure works), which are called for every
//! request.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. Ad queries return them to the caller; event
//! delivery never fails the caller and reports its outcome through a completion callback instead.
//!
//! Ads are advisory content: in production it is usually best to render the page without ads
//! when a query fails. The returned errors are still valuable for debugging.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for internal logging under
//! the `retail_ads` target.
//!
//! Independently of `log`, the SDK can emit human-readable debug records about ad loads and
//! event deliveries to a [`DebugSink`]. Records are enabled per [`DebugCategory`] and are not
//! even formatted when their category is disabled.
//!
//! # Examples
//!
//! An example can be found in the `demos/simple` directory of the crate repository.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod ads;
mod client;
mod config;
mod debug;
mod decoder;
mod error;
mod events;
mod executor;
mod hashing;
mod identity;
mod models;

pub use ads::{AdsClient, AdsQuery};
pub use client::Client;
pub use config::ClientConfig;
pub use debug::{DebugCategory, DebugLogger, DebugSink};
pub use decoder::AdResponseDecoder;
pub use error::{DecodeError, Error, Result};
pub use events::EventClient;
pub use executor::{HttpResponse, RequestExecutor, RetryPolicy};
pub use hashing::{sha256_hex, sha256_hex_opt};
pub use identity::{SessionIdProvider, UserIdProvider};
pub use models::{
    Ad, AdEnvelope, AdType, AdsRequest, AdsResponse, AssetType, BannerAd, BrandProduct, Channel,
    Context, ConversionItem, ConversionRequest, DigitalSignageAd, EventRequest, Order, OrderItem,
    PlacementRequest, ProductAd, Segmentation, SponsoredBrandAd,
};
