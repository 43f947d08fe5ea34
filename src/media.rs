//! Media reference resolution and the media library cache.
//!
//! The builder never owns media bytes. It works with [`MediaRef`]s: platform
//! ids plus enough metadata to show a thumbnail. The library listing is cached
//! per advertiser account so the UI can pick from it without a round trip.

use crate::config::CacheConfig;
use crate::draft::{MediaKind, MediaRef};
use crate::error::{CampaignError, Result};
use crate::traits::{AdsApi, MediaCache};
use crate::utils::{fingerprint, generate_id};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// What the operator picked in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSelection {
    pub media_id: String,
    /// Restricts the lookup to one kind; `None` accepts either.
    pub kind: Option<MediaKind>,
}

impl MediaSelection {
    pub fn new(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            kind: None,
        }
    }

    pub fn of_kind(media_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            media_id: media_id.into(),
            kind: Some(kind),
        }
    }

    /// Selection whose kind is guessed from the file name shown in the picker.
    pub fn for_file(media_id: impl Into<String>, file_name: &str) -> Self {
        Self {
            media_id: media_id.into(),
            kind: MediaKind::from_file_name(file_name),
        }
    }

    fn matches(&self, media: &MediaRef) -> bool {
        media.media_id == self.media_id && self.kind.is_none_or(|k| k == media.kind)
    }
}

/// Maps the remote library and local selections to [`MediaRef`]s.
pub struct MediaResolver {
    api: Arc<dyn AdsApi>,
    cache: Arc<dyn MediaCache>,
}

impl MediaResolver {
    pub fn new(api: Arc<dyn AdsApi>, cache: Arc<dyn MediaCache>) -> Self {
        Self { api, cache }
    }

    /// Images and videos from the remote library, tagged with their kind and
    /// deduplicated by media id and account. New entries are added to the cache.
    pub async fn list_available_media(&self) -> Result<Vec<MediaRef>> {
        let (images, videos) = futures::try_join!(self.api.list_images(), self.api.list_videos())?;
        info!(
            "Media library has {} images and {} videos",
            images.len(),
            videos.len()
        );

        let mut seen = HashSet::new();
        let mut merged = Vec::with_capacity(images.len() + videos.len());
        for media in images.into_iter().chain(videos) {
            if seen.insert((media.media_id.clone(), media.account_id.clone())) {
                merged.push(media);
            } else {
                debug!("Skipping duplicate media entry {}", media.media_id);
            }
        }

        match self.cache.insert_many(merged.clone()).await {
            Ok(0) => {}
            Ok(added) => debug!("Cached {added} new media entries"),
            Err(e) => warn!("Failed to cache the media library: {e}"),
        }

        Ok(merged)
    }

    /// Resolves a selection from the cache, falling back to the remote library.
    pub async fn resolve(&self, selection: &MediaSelection) -> Result<MediaRef> {
        let account_id = self.api.account_id().to_string();

        if let Some(media) = self.cache.get(&account_id, &selection.media_id).await? {
            if selection.matches(&media) {
                return Ok(media);
            }
        }

        self.list_available_media()
            .await?
            .into_iter()
            .find(|media| selection.matches(media))
            .ok_or_else(|| {
                CampaignError::validation(
                    "media",
                    format!("'{}' is not in the media library", selection.media_id),
                )
            })
    }
}

/// Cache kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryMediaCache {
    entries: RwLock<Vec<MediaRef>>,
}

impl MemoryMediaCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaCache for MemoryMediaCache {
    async fn get(&self, account_id: &str, media_id: &str) -> Result<Option<MediaRef>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|m| m.account_id == account_id && m.media_id == media_id)
            .cloned())
    }

    async fn insert(&self, media: MediaRef) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|m| m.same_media(&media)) {
            return Err(CampaignError::DuplicateMedia {
                media_id: media.media_id,
            });
        }
        entries.push(media);
        Ok(())
    }

    async fn insert_many(&self, media: Vec<MediaRef>) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        for item in media {
            if !entries.iter().any(|m| m.same_media(&item)) {
                entries.push(item);
            }
        }
        Ok(entries.len() - before)
    }

    async fn list(&self, account_id: &str) -> Result<Vec<MediaRef>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn clear(&self, account_id: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .retain(|m| m.account_id != account_id);
        Ok(())
    }
}

/// Cache persisted as one JSON file per account under a directory.
#[derive(Debug)]
pub struct FileMediaCache {
    directory: PathBuf,
    write_lock: Mutex<()>,
}

impl FileMediaCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.directory.clone())
    }

    /// File holding the entries of `account_id`.
    pub fn path_for(&self, account_id: &str) -> PathBuf {
        self.directory
            .join(format!("media-{}.json", fingerprint(account_id)))
    }

    async fn load(path: &Path) -> Result<Vec<MediaRef>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes through a temporary file so readers never see a partial file.
    async fn store(&self, path: &Path, entries: &[MediaRef]) -> Result<()> {
        fs::create_dir_all(&self.directory).await?;
        let tmp = self.directory.join(format!(".{}.tmp", generate_id()));
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl MediaCache for FileMediaCache {
    async fn get(&self, account_id: &str, media_id: &str) -> Result<Option<MediaRef>> {
        let entries = Self::load(&self.path_for(account_id)).await?;
        Ok(entries.into_iter().find(|m| m.media_id == media_id))
    }

    async fn insert(&self, media: MediaRef) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(&media.account_id);
        let mut entries = Self::load(&path).await?;
        if entries.iter().any(|m| m.same_media(&media)) {
            return Err(CampaignError::DuplicateMedia {
                media_id: media.media_id,
            });
        }
        debug!("Caching {} {} in {}", media.kind, media.media_id, path.display());
        entries.push(media);
        self.store(&path, &entries).await
    }

    async fn insert_many(&self, media: Vec<MediaRef>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let mut by_account: BTreeMap<String, Vec<MediaRef>> = BTreeMap::new();
        for item in media {
            by_account.entry(item.account_id.clone()).or_default().push(item);
        }

        let mut added = 0;
        for (account_id, incoming) in by_account {
            let path = self.path_for(&account_id);
            let mut entries = Self::load(&path).await?;
            let before = entries.len();
            for item in incoming {
                if !entries.iter().any(|m| m.same_media(&item)) {
                    entries.push(item);
                }
            }
            // An unchanged listing leaves the file alone
            if entries.len() > before {
                debug!(
                    "Caching {} new media entries in {}",
                    entries.len() - before,
                    path.display()
                );
                self.store(&path, &entries).await?;
                added += entries.len() - before;
            }
        }
        Ok(added)
    }

    async fn list(&self, account_id: &str) -> Result<Vec<MediaRef>> {
        Self::load(&self.path_for(account_id)).await
    }

    async fn clear(&self, account_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.path_for(account_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
