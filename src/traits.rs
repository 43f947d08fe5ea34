//! Trait seams for the campaign builder.
//!
//! - [`AdsApi`]: the remote advertising platform, one method per action.
//!   [`AdsClient`](crate::client::AdsClient) implements it over HTTP; tests
//!   substitute an in-memory fake.
//! - [`MediaCache`]: persisted listing of the media library.

use crate::draft::MediaRef;
use crate::error::Result;
use crate::normalize::{Identity, Pixel};
use crate::request::{
    CreateAdGroupRequest, CreateAdRequest, CreateCampaignRequest, UpdateAdStatusRequest,
};
use async_trait::async_trait;

/// Operations of the remote advertising platform, already normalized.
#[async_trait]
pub trait AdsApi: Send + Sync {
    /// Creates a campaign and returns its id.
    async fn create_campaign(&self, request: &CreateCampaignRequest) -> Result<String>;

    /// Creates an ad group and returns its id.
    async fn create_ad_group(&self, request: &CreateAdGroupRequest) -> Result<String>;

    /// Creates one ad from a single creative entry.
    async fn create_ad(&self, request: &CreateAdRequest) -> Result<Vec<String>>;

    /// Creates an ad from several creative entries in one call.
    async fn create_ad_batch(&self, request: &CreateAdRequest) -> Result<Vec<String>>;

    /// Enables the given ads. Returns the ids the platform confirmed.
    async fn publish_ads(&self, request: &UpdateAdStatusRequest) -> Result<Vec<String>>;

    async fn list_identities(&self) -> Result<Vec<Identity>>;

    async fn list_images(&self) -> Result<Vec<MediaRef>>;

    async fn list_videos(&self) -> Result<Vec<MediaRef>>;

    async fn list_pixels(&self) -> Result<Vec<Pixel>>;

    /// Account the media library belongs to.
    fn account_id(&self) -> &str;
}

/// Persisted media listing. Entries are keyed by media id and owning account.
#[async_trait]
pub trait MediaCache: Send + Sync {
    /// Gets an entry.
    async fn get(&self, account_id: &str, media_id: &str) -> Result<Option<MediaRef>>;

    /// Inserts an entry. Fails with `DuplicateMedia` if it is already present.
    async fn insert(&self, media: MediaRef) -> Result<()>;

    /// Inserts every entry not already present in one pass and returns how
    /// many were added. Duplicates are skipped, not reported.
    async fn insert_many(&self, media: Vec<MediaRef>) -> Result<usize>;

    /// Lists every entry of an account in insertion order.
    async fn list(&self, account_id: &str) -> Result<Vec<MediaRef>>;

    /// Removes every entry of an account.
    async fn clear(&self, account_id: &str) -> Result<()>;
}
