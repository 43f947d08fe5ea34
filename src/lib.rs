//! # Campaign Builder
//!
//! Builds advertising campaigns on a remote ads platform one stage at a time:
//! campaign, ad group, ads, review, publish.
//!
//! ## Features
//!
//! - **Explicit sessions**: every stage takes a [`BuildSession`]; sessions are
//!   keyed by a caller-supplied token in a [`SessionStore`]
//! - **Typed requests**: one request type per remote action, validated when built
//! - **Normalized responses**: per-endpoint adapters turn inconsistent payloads
//!   into canonical types
//! - **Concurrent publish**: ad creations run in parallel and partial failures
//!   are reported per ad
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use campaign_builder_rs::{
//!     AdDraft, AdGroupDraft, AdsClient, BuildFlow, BuildSession, CampaignBuilder,
//!     CampaignDraft, Result,
//! };
//! use campaign_builder_rs::draft::{IdentityType, MediaKind, MediaRef};
//! use campaign_builder_rs::schedule::parse_local;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let builder = CampaignBuilder::with_client(AdsClient::from_env()?);
//!     let mut session = BuildSession::new(BuildFlow::Manual);
//!
//!     builder.create_campaign(&mut session, CampaignDraft::new("Q1 Promo")).await?;
//!     let start = parse_local("2024-01-02T00:00")?;
//!     builder
//!         .create_ad_group(&mut session, AdGroupDraft::new("Launch", 50.0, 1.5, start))
//!         .await?;
//!
//!     let ad = AdDraft::new("Launch ad")
//!         .with_text("Shop the sale")
//!         .with_identity("identity-id", IdentityType::CustomizedUser)
//!         .with_destination("https://shop.example.com")
//!         .with_creative(MediaRef::new("video-id", MediaKind::Video, "", "advertiser-id"))?;
//!     builder.add_ad(&mut session, ad)?;
//!
//!     println!("{}", builder.review(&mut session)?);
//!     println!("{}", builder.publish(&mut session).await?);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod dayparting;
pub mod draft;
pub mod error;
pub mod http;
pub mod media;
pub mod normalize;
pub mod request;
pub mod review;
pub mod schedule;
pub mod session;
pub mod traits;
pub mod utils;

// Re-export main types for convenience
pub use builder::{CampaignBuilder, PublishReport, SmartAdStrategy};
pub use client::{AdsClient, RelayResponse};
pub use config::{Config, SmartFallbackPolicy};
pub use dayparting::{Bitmap168, DaypartGrid};
pub use draft::{AdDraft, AdGroupDraft, BuildFlow, CampaignDraft, MediaRef};
pub use error::{CampaignError, Result};
pub use media::{FileMediaCache, MediaResolver, MemoryMediaCache};
pub use request::AdsRequest;
pub use review::ReviewSummary;
pub use session::{BuildSession, BuildStep, SessionStore, SessionToken};
pub use traits::{AdsApi, MediaCache};
