//! Campaign build state machine.
//!
//! ```text
//! CampaignPending -> CampaignCreated -> AdGroupCreated -> AdsReviewed -> Published
//! ```
//!
//! Every stage takes the [`BuildSession`] explicitly. A stage either succeeds
//! and advances the session, or fails and leaves it exactly as it was, so the
//! caller can fix the input and invoke the same stage again. Nothing is rolled
//! back on the remote platform and no remote call is retried automatically:
//! creations are not idempotent.

use crate::client::AdsClient;
use crate::config::{BuildConfig, SmartFallbackPolicy};
use crate::draft::{AdDraft, AdGroupDraft, BuildFlow, CampaignDraft, MediaRef};
use crate::error::{CampaignError, Result};
use crate::request::{
    CreateAdGroupRequest, CreateAdRequest, CreateCampaignRequest, MAX_ADS_PER_STATUS_UPDATE,
    UpdateAdStatusRequest,
};
use crate::review::{self, RemoteIds, ReviewSummary};
use crate::session::{BuildSession, BuildStep, SessionToken};
use crate::traits::AdsApi;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Ad that was created on the platform during publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedAd {
    /// 1-based position of the draft.
    pub position: usize,
    pub ad_name: String,
    pub ad_ids: Vec<String>,
    /// True when the smart batch was rejected and only the first
    /// creative/text pair was created.
    pub degraded: bool,
}

/// Ad whose creation failed during publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAd {
    pub position: usize,
    pub ad_name: String,
    pub message: String,
}

/// Outcome of the publish stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishReport {
    pub created: Vec<CreatedAd>,
    pub failed: Vec<FailedAd>,
    /// Ids the platform confirmed as enabled.
    pub published_ids: Vec<String>,
}

impl PublishReport {
    pub fn succeeded(&self) -> usize {
        self.created.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Every created ad id, in draft order.
    pub fn ad_ids(&self) -> Vec<String> {
        self.created
            .iter()
            .flat_map(|ad| ad.ad_ids.iter().cloned())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && !self.created.is_empty()
    }
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ad(s) created, {} failed, {} published",
            self.succeeded(),
            self.failed_count(),
            self.published_ids.len()
        )?;
        for failure in &self.failed {
            write!(
                f,
                "\n  Ad #{} ({}): {}",
                failure.position, failure.ad_name, failure.message
            )?;
        }
        Ok(())
    }
}

/// Ids returned for one ad draft.
#[derive(Debug, Clone, PartialEq)]
pub struct AdOutcome {
    pub ad_ids: Vec<String>,
    pub degraded: bool,
}

/// Smart flow ad creation: the batch call first, then the single call only
/// when the platform rejected the batch and the policy allows degrading.
pub struct SmartAdStrategy<'a> {
    api: &'a dyn AdsApi,
    policy: SmartFallbackPolicy,
}

impl<'a> SmartAdStrategy<'a> {
    pub fn new(api: &'a dyn AdsApi, policy: SmartFallbackPolicy) -> Self {
        Self { api, policy }
    }

    /// Every creative combined with every text inside one ad.
    pub async fn try_batch(&self, ad_group_id: &str, ad: &AdDraft) -> Result<Vec<String>> {
        let request = CreateAdRequest::batch(ad_group_id, ad)?;
        audit_call("create_smart_ad", &request);
        self.api.create_ad_batch(&request).await
    }

    /// The first creative with the first text.
    pub async fn try_single(&self, ad_group_id: &str, ad: &AdDraft) -> Result<Vec<String>> {
        let request = CreateAdRequest::single(ad_group_id, ad)?;
        audit_call("create_ad", &request);
        self.api.create_ad(&request).await
    }

    pub async fn run(&self, ad_group_id: &str, ad: &AdDraft) -> Result<AdOutcome> {
        match self.try_batch(ad_group_id, ad).await {
            Ok(ad_ids) => Ok(AdOutcome {
                ad_ids,
                degraded: false,
            }),
            Err(e)
                if e.is_remote_rejection()
                    && self.policy == SmartFallbackPolicy::DegradeToFirstPair =>
            {
                warn!(
                    ad = %ad.name,
                    "Batch creation rejected ({e}), creating first creative/text pair only"
                );
                let ad_ids = self.try_single(ad_group_id, ad).await?;
                Ok(AdOutcome {
                    ad_ids,
                    degraded: true,
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Runs build sessions against an [`AdsApi`].
#[derive(Clone)]
pub struct CampaignBuilder {
    api: Arc<dyn AdsApi>,
    rules: BuildConfig,
}

impl CampaignBuilder {
    pub fn new(api: Arc<dyn AdsApi>, rules: BuildConfig) -> Self {
        Self { api, rules }
    }

    /// Builder over an HTTP client, using the client's build rules.
    pub fn with_client(client: AdsClient) -> Self {
        let rules = client.config().build.clone();
        Self::new(Arc::new(client), rules)
    }

    pub fn rules(&self) -> &BuildConfig {
        &self.rules
    }

    pub fn api(&self) -> Arc<dyn AdsApi> {
        Arc::clone(&self.api)
    }

    /// `CampaignPending -> CampaignCreated`. Returns the campaign id.
    pub async fn create_campaign(
        &self,
        session: &mut BuildSession,
        draft: CampaignDraft,
    ) -> Result<String> {
        session.require_step(BuildStep::CampaignPending)?;
        let request = CreateCampaignRequest::new(&draft)?;

        audit_stage(session.token(), "create_campaign", &request);
        let campaign_id = self.api.create_campaign(&request).await?;
        info!(token = %session.token(), %campaign_id, "Campaign created");

        session.campaign = Some(draft);
        session.campaign_id = Some(campaign_id.clone());
        session.step = BuildStep::CampaignCreated;
        Ok(campaign_id)
    }

    /// `CampaignCreated -> AdGroupCreated`. Returns the ad group id.
    pub async fn create_ad_group(
        &self,
        session: &mut BuildSession,
        draft: AdGroupDraft,
    ) -> Result<String> {
        let campaign_id = session
            .campaign_id
            .clone()
            .ok_or_else(|| session.state_error(BuildStep::CampaignCreated))?;
        session.require_step(BuildStep::CampaignCreated)?;

        let min_budget = self.rules.min_budget(session.flow());
        let request = CreateAdGroupRequest::new(&campaign_id, &draft, min_budget)?;

        audit_stage(session.token(), "create_adgroup", &request);
        let ad_group_id = self.api.create_ad_group(&request).await?;
        info!(token = %session.token(), %ad_group_id, "Ad group created");

        session.ad_group = Some(draft);
        session.ad_group_id = Some(ad_group_id.clone());
        session.step = BuildStep::AdGroupCreated;
        Ok(ad_group_id)
    }

    /// Appends an ad draft and returns its 1-based position. Local only.
    ///
    /// Adding after review sends the session back to `AdGroupCreated`.
    pub fn add_ad(&self, session: &mut BuildSession, ad: AdDraft) -> Result<usize> {
        require_draft_changes(session)?;
        if ad.creatives.len() > self.rules.max_creatives_per_ad {
            return Err(CampaignError::limit(
                "creatives per ad",
                self.rules.max_creatives_per_ad,
            ));
        }
        session.ads.push(ad);
        invalidate_review(session);
        Ok(session.ads.len())
    }

    /// Attaches a creative to a draft under the configured per-ad cap.
    pub fn add_creative(&self, ad: &mut AdDraft, media: MediaRef) -> Result<()> {
        ad.add_creative_within(media, self.rules.max_creatives_per_ad)
    }

    /// Removes the ad draft at `position` (1-based).
    pub fn remove_ad(&self, session: &mut BuildSession, position: usize) -> Result<AdDraft> {
        require_draft_changes(session)?;
        if position == 0 || position > session.ads.len() {
            return Err(CampaignError::validation(
                "position",
                format!("{position} is not between 1 and {}", session.ads.len()),
            ));
        }
        let removed = session.ads.remove(position - 1);
        invalidate_review(session);
        Ok(removed)
    }

    /// `AdGroupCreated -> AdsReviewed`. Local validation plus the summary.
    pub fn review(&self, session: &mut BuildSession) -> Result<ReviewSummary> {
        require_ad_editing(session)?;
        let (Some(campaign), Some(campaign_id), Some(ad_group), Some(ad_group_id)) = (
            session.campaign.as_ref(),
            session.campaign_id.as_deref(),
            session.ad_group.as_ref(),
            session.ad_group_id.as_deref(),
        ) else {
            return Err(session.state_error(BuildStep::AdGroupCreated));
        };

        let summary = review::review(
            session.flow(),
            campaign,
            ad_group,
            &session.ads,
            RemoteIds {
                campaign_id,
                ad_group_id,
            },
        )?;
        info!(
            token = %session.token(),
            ads = session.ads.len(),
            "Ads reviewed"
        );

        session.summary = Some(summary.clone());
        session.step = BuildStep::AdsReviewed;
        Ok(summary)
    }

    /// `AdsReviewed -> Published`.
    ///
    /// Creates every ad concurrently, then enables all created ads. Ads whose
    /// creation failed are listed in the report; the others are still
    /// published. If the status update fails the created ids are kept, and
    /// calling `publish` again only retries the status update.
    pub async fn publish(&self, session: &mut BuildSession) -> Result<PublishReport> {
        session.require_step(BuildStep::AdsReviewed)?;
        let ad_group_id = session
            .ad_group_id
            .clone()
            .ok_or_else(|| session.state_error(BuildStep::AdGroupCreated))?;

        if !session.unpublished_ad_ids.is_empty() {
            info!(
                token = %session.token(),
                pending = session.unpublished_ad_ids.len(),
                "Retrying status update for ads created earlier"
            );
            let report = session.last_report.clone().unwrap_or_default();
            return self.enable_ads(session, report).await;
        }

        let outcomes = self
            .create_ads(session.flow(), &ad_group_id, &session.ads)
            .await;

        let mut report = PublishReport::default();
        for ((i, ad), outcome) in session.ads.iter().enumerate().zip(outcomes) {
            let position = i + 1;
            let ad_name = ad.name.trim().to_string();
            match outcome {
                Ok(outcome) if !outcome.ad_ids.is_empty() => report.created.push(CreatedAd {
                    position,
                    ad_name,
                    ad_ids: outcome.ad_ids,
                    degraded: outcome.degraded,
                }),
                Ok(_) => report.failed.push(FailedAd {
                    position,
                    ad_name,
                    message: "The platform returned no ad id".to_string(),
                }),
                Err(e) => {
                    warn!(token = %session.token(), position, "Ad creation failed: {e}");
                    report.failed.push(FailedAd {
                        position,
                        ad_name,
                        message: e.user_message(),
                    });
                }
            }
        }

        info!(
            token = %session.token(),
            created = report.succeeded(),
            failed = report.failed_count(),
            "Ad creation finished"
        );

        let ad_ids = report.ad_ids();
        if ad_ids.is_empty() {
            session.last_report = Some(report.clone());
            return Ok(report);
        }

        session.unpublished_ad_ids = ad_ids;
        session.last_report = Some(report.clone());
        self.enable_ads(session, report).await
    }

    /// Publish-and-restart: forgets every draft and id, keeping token and flow.
    pub fn restart(&self, session: &mut BuildSession) {
        info!(token = %session.token(), step = %session.step(), "Restarting build session");
        session.reset();
    }

    async fn create_ads(
        &self,
        flow: BuildFlow,
        ad_group_id: &str,
        ads: &[AdDraft],
    ) -> Vec<Result<AdOutcome>> {
        let semaphore = Semaphore::new(self.rules.max_concurrent_ad_creates.max(1));
        let semaphore = &semaphore;

        let tasks = ads.iter().map(|ad| async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| CampaignError::Internal(anyhow::anyhow!("Semaphore error: {e}")))?;
            self.create_ad(flow, ad_group_id, ad).await
        });

        join_all(tasks).await
    }

    async fn create_ad(&self, flow: BuildFlow, ad_group_id: &str, ad: &AdDraft) -> Result<AdOutcome> {
        match flow {
            BuildFlow::Manual => {
                let request = CreateAdRequest::single(ad_group_id, ad)?;
                audit_call("create_ad", &request);
                let ad_ids = self.api.create_ad(&request).await?;
                Ok(AdOutcome {
                    ad_ids,
                    degraded: false,
                })
            }
            BuildFlow::Smart => {
                SmartAdStrategy::new(self.api.as_ref(), self.rules.smart_fallback)
                    .run(ad_group_id, ad)
                    .await
            }
        }
    }

    async fn enable_ads(
        &self,
        session: &mut BuildSession,
        mut report: PublishReport,
    ) -> Result<PublishReport> {
        while !session.unpublished_ad_ids.is_empty() {
            let take = session.unpublished_ad_ids.len().min(MAX_ADS_PER_STATUS_UPDATE);
            let chunk = session.unpublished_ad_ids[..take].to_vec();
            let request = UpdateAdStatusRequest::enable(chunk)?;

            audit_stage(session.token(), "update_ad_status", &request);
            let confirmed = self.api.publish_ads(&request).await?;

            session.unpublished_ad_ids = session.unpublished_ad_ids.split_off(take);
            report.published_ids.extend(confirmed);
            session.last_report = Some(report.clone());
        }

        info!(
            token = %session.token(),
            published = report.published_ids.len(),
            "Ads published"
        );
        session.step = BuildStep::Published;
        Ok(report)
    }
}

impl fmt::Debug for CampaignBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CampaignBuilder")
            .field("account_id", &self.api.account_id())
            .field("rules", &self.rules)
            .finish()
    }
}

fn require_ad_editing(session: &BuildSession) -> Result<()> {
    match session.step() {
        BuildStep::AdGroupCreated | BuildStep::AdsReviewed => Ok(()),
        _ => Err(session.state_error(BuildStep::AdGroupCreated)),
    }
}

/// Drafts are frozen once ads exist on the platform: publish must finish
/// enabling them before the ad list can change.
fn require_draft_changes(session: &BuildSession) -> Result<()> {
    require_ad_editing(session)?;
    if !session.unpublished_ad_ids.is_empty() {
        return Err(CampaignError::InvalidState {
            expected: format!("{} with no ads awaiting publish", BuildStep::AdsReviewed),
            actual: format!(
                "{} with {} created ad(s) awaiting publish",
                session.step(),
                session.unpublished_ad_ids.len()
            ),
        });
    }
    Ok(())
}

fn invalidate_review(session: &mut BuildSession) {
    if session.step == BuildStep::AdsReviewed {
        session.step = BuildStep::AdGroupCreated;
        session.summary = None;
    }
}

/// Audit line written before a stage's remote call, whatever its outcome.
fn audit_stage<T: Serialize>(token: SessionToken, action: &str, request: &T) {
    match serde_json::to_string(request) {
        Ok(params) => info!(%token, action, %params, "Dispatching stage"),
        Err(e) => warn!(%token, action, "Dispatching stage, params not serializable: {e}"),
    }
}

fn audit_call<T: Serialize>(action: &str, request: &T) {
    match serde_json::to_string(request) {
        Ok(params) => info!(action, %params, "Dispatching ad creation"),
        Err(e) => warn!(action, "Dispatching ad creation, params not serializable: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{IdentityType, MediaKind, MediaRef};
    use crate::normalize::{Identity, Pixel};
    use crate::schedule::parse_local;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// In-memory platform. Every creation returns a fresh id.
    #[derive(Default)]
    struct FakeApi {
        next_id: AtomicU64,
        calls: Mutex<Vec<String>>,
        reject_batch: bool,
        reject_ad_named: Option<String>,
        publish_failures: AtomicU64,
    }

    impl FakeApi {
        fn id(&self, prefix: &str) -> String {
            format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self, call: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
        }

        fn check_ad(&self, request: &CreateAdRequest) -> Result<()> {
            if let Some(name) = &self.reject_ad_named {
                if request.creatives.iter().any(|c| c.ad_name.starts_with(name.as_str())) {
                    return Err(CampaignError::from_api_response(40002, "Creative rejected"));
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl AdsApi for FakeApi {
        async fn create_campaign(&self, _: &CreateCampaignRequest) -> Result<String> {
            self.record("create_campaign");
            Ok(self.id("campaign"))
        }

        async fn create_ad_group(&self, request: &CreateAdGroupRequest) -> Result<String> {
            self.record("create_ad_group");
            assert!(!request.campaign_id.is_empty());
            Ok(self.id("adgroup"))
        }

        async fn create_ad(&self, request: &CreateAdRequest) -> Result<Vec<String>> {
            self.record("create_ad");
            self.check_ad(request)?;
            Ok(vec![self.id("ad")])
        }

        async fn create_ad_batch(&self, request: &CreateAdRequest) -> Result<Vec<String>> {
            self.record("create_ad_batch");
            if self.reject_batch {
                return Err(CampaignError::from_api_response(40002, "Batch not allowed"));
            }
            self.check_ad(request)?;
            Ok(request.creatives.iter().map(|_| self.id("ad")).collect())
        }

        async fn publish_ads(&self, request: &UpdateAdStatusRequest) -> Result<Vec<String>> {
            self.record("publish_ads");
            let remaining = self.publish_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.publish_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(CampaignError::transport("connection reset"));
            }
            Ok(request.ad_ids.clone())
        }

        async fn list_identities(&self) -> Result<Vec<Identity>> {
            Ok(Vec::new())
        }

        async fn list_images(&self) -> Result<Vec<MediaRef>> {
            Ok(Vec::new())
        }

        async fn list_videos(&self) -> Result<Vec<MediaRef>> {
            Ok(Vec::new())
        }

        async fn list_pixels(&self) -> Result<Vec<Pixel>> {
            Ok(Vec::new())
        }

        fn account_id(&self) -> &str {
            "7000"
        }
    }

    fn builder(api: Arc<FakeApi>) -> CampaignBuilder {
        CampaignBuilder::new(api, BuildConfig::default())
    }

    fn ad_group(budget: f64) -> AdGroupDraft {
        AdGroupDraft::new(
            "Launch week",
            budget,
            1.5,
            parse_local("2024-01-02T00:00").unwrap(),
        )
        .with_timezone("America/New_York")
    }

    fn ad(name: &str) -> AdDraft {
        AdDraft::new(name)
            .with_text("Shop the sale")
            .with_identity("id-1", IdentityType::CustomizedUser)
            .with_destination("https://shop.example.com")
            .with_creative(MediaRef::new("v1", MediaKind::Video, "https://v/1", "7000"))
            .unwrap()
    }

    fn smart_ad(name: &str) -> AdDraft {
        ad(name)
            .with_text_variants(["One", "Two"])
            .with_creative(MediaRef::new("i1", MediaKind::Image, "https://i/1", "7000"))
            .unwrap()
    }

    async fn reviewed(
        builder: &CampaignBuilder,
        flow: BuildFlow,
        ads: Vec<AdDraft>,
    ) -> BuildSession {
        let mut session = BuildSession::new(flow);
        builder
            .create_campaign(&mut session, CampaignDraft::new("Q1 Promo"))
            .await
            .unwrap();
        builder
            .create_ad_group(&mut session, ad_group(50.0))
            .await
            .unwrap();
        for ad in ads {
            builder.add_ad(&mut session, ad).unwrap();
        }
        builder.review(&mut session).unwrap();
        session
    }

    #[tokio::test]
    async fn test_end_to_end_publishes_one_ad() {
        let api = Arc::new(FakeApi::default());
        let builder = builder(api.clone());
        let mut session = reviewed(&builder, BuildFlow::Manual, vec![ad("Launch")]).await;
        assert_eq!(session.step(), BuildStep::AdsReviewed);

        let report = builder.publish(&mut session).await.unwrap();
        assert_eq!(report.ad_ids().len(), 1);
        assert_eq!(report.published_ids, report.ad_ids());
        assert!(report.is_complete());
        assert_eq!(session.step(), BuildStep::Published);
        assert_eq!(api.calls("publish_ads"), 1);
    }

    #[tokio::test]
    async fn test_ad_group_requires_campaign_id() {
        let api = Arc::new(FakeApi::default());
        let builder = builder(api.clone());
        let mut session = BuildSession::new(BuildFlow::Manual);

        let err = builder
            .create_ad_group(&mut session, ad_group(50.0))
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::InvalidState { .. }));
        assert_eq!(api.calls("create_ad_group"), 0);
        assert_eq!(session.step(), BuildStep::CampaignPending);
    }

    #[tokio::test]
    async fn test_campaign_creation_is_not_idempotent() {
        let api = Arc::new(FakeApi::default());
        let builder = builder(api.clone());
        let mut first = BuildSession::new(BuildFlow::Manual);
        let mut second = BuildSession::new(BuildFlow::Manual);

        let a = builder
            .create_campaign(&mut first, CampaignDraft::new("Q1 Promo"))
            .await
            .unwrap();
        let b = builder
            .create_campaign(&mut second, CampaignDraft::new("Q1 Promo"))
            .await
            .unwrap();
        assert_ne!(a, b);

        let again = builder
            .create_campaign(&mut first, CampaignDraft::new("Q1 Promo"))
            .await;
        assert!(matches!(again, Err(CampaignError::InvalidState { .. })));
        assert_eq!(api.calls("create_campaign"), 2);
    }

    #[tokio::test]
    async fn test_failed_stage_keeps_session_state() {
        let api = Arc::new(FakeApi::default());
        let builder = builder(api.clone());
        let mut session = BuildSession::new(BuildFlow::Manual);
        builder
            .create_campaign(&mut session, CampaignDraft::new("Q1 Promo"))
            .await
            .unwrap();

        let err = builder
            .create_ad_group(&mut session, ad_group(19.99))
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::Validation { .. }));
        assert_eq!(session.step(), BuildStep::CampaignCreated);
        assert_eq!(api.calls("create_ad_group"), 0);

        builder
            .create_ad_group(&mut session, ad_group(20.00))
            .await
            .unwrap();
        assert_eq!(session.step(), BuildStep::AdGroupCreated);
    }

    #[tokio::test]
    async fn test_smart_flow_minimum_budget() {
        let api = Arc::new(FakeApi::default());
        let builder = builder(api);
        let mut session = BuildSession::new(BuildFlow::Smart);
        builder
            .create_campaign(&mut session, CampaignDraft::new("Q1 Promo"))
            .await
            .unwrap();
        assert!(builder
            .create_ad_group(&mut session, ad_group(20.0))
            .await
            .is_err());
        assert!(builder
            .create_ad_group(&mut session, ad_group(50.0))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_adding_ad_after_review_requires_new_review() {
        let api = Arc::new(FakeApi::default());
        let builder = builder(api);
        let mut session = reviewed(&builder, BuildFlow::Manual, vec![ad("One")]).await;

        assert_eq!(builder.add_ad(&mut session, ad("Two")).unwrap(), 2);
        assert_eq!(session.step(), BuildStep::AdGroupCreated);
        assert!(session.summary().is_none());
        assert!(builder.publish(&mut session).await.is_err());

        let removed = builder.remove_ad(&mut session, 1).unwrap();
        assert_eq!(removed.name, "One");
        assert!(builder.remove_ad(&mut session, 5).is_err());
        assert_eq!(builder.review(&mut session).unwrap().ads.len(), 1);
    }

    #[tokio::test]
    async fn test_configured_creative_cap_applies_to_drafts_and_ads() {
        let api = Arc::new(FakeApi::default());
        let rules = BuildConfig::builder().max_creatives_per_ad(2).build();
        let builder = CampaignBuilder::new(api, rules);
        let mut session = reviewed(&builder, BuildFlow::Manual, vec![ad("One")]).await;

        let crowded = smart_ad("Crowded")
            .with_creative(MediaRef::new("i2", MediaKind::Image, "https://i/2", "7000"))
            .unwrap();
        let err = builder.add_ad(&mut session, crowded).unwrap_err();
        assert!(matches!(err, CampaignError::LimitExceeded { limit: 2, .. }));
        assert_eq!(session.ads().len(), 1);
        assert_eq!(session.step(), BuildStep::AdsReviewed);

        let mut draft = ad("Two");
        builder
            .add_creative(&mut draft, MediaRef::new("i1", MediaKind::Image, "https://i/1", "7000"))
            .unwrap();
        let err = builder
            .add_creative(&mut draft, MediaRef::new("i2", MediaKind::Image, "https://i/2", "7000"))
            .unwrap_err();
        assert!(matches!(err, CampaignError::LimitExceeded { limit: 2, .. }));
        assert_eq!(builder.add_ad(&mut session, draft).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_review_failure_stays_at_ad_group() {
        let api = Arc::new(FakeApi::default());
        let builder = builder(api.clone());
        let mut session = BuildSession::new(BuildFlow::Manual);
        builder
            .create_campaign(&mut session, CampaignDraft::new("Q1 Promo"))
            .await
            .unwrap();
        builder
            .create_ad_group(&mut session, ad_group(50.0))
            .await
            .unwrap();

        let mut broken = ad("Two");
        broken.destination_url.clear();
        builder.add_ad(&mut session, ad("One")).unwrap();
        builder.add_ad(&mut session, broken).unwrap();

        let err = builder.review(&mut session).unwrap_err();
        assert!(matches!(
            err,
            CampaignError::Validation {
                ad_position: Some(2),
                ..
            }
        ));
        assert_eq!(session.step(), BuildStep::AdGroupCreated);
        assert_eq!(api.calls("create_ad"), 0);
    }

    #[tokio::test]
    async fn test_smart_batch_creates_every_combination() {
        let api = Arc::new(FakeApi::default());
        let builder = builder(api.clone());
        let mut session = reviewed(&builder, BuildFlow::Smart, vec![smart_ad("Smart")]).await;

        let report = builder.publish(&mut session).await.unwrap();
        assert_eq!(report.ad_ids().len(), 4);
        assert!(!report.created[0].degraded);
        assert_eq!(api.calls("create_ad"), 0);
    }

    #[tokio::test]
    async fn test_smart_fallback_degrades_to_first_pair() {
        let api = Arc::new(FakeApi {
            reject_batch: true,
            ..FakeApi::default()
        });
        let builder = builder(api.clone());
        let mut session = reviewed(&builder, BuildFlow::Smart, vec![smart_ad("Smart")]).await;

        let report = builder.publish(&mut session).await.unwrap();
        assert_eq!(report.ad_ids().len(), 1);
        assert!(report.created[0].degraded);
        assert_eq!(api.calls("create_ad_batch"), 1);
        assert_eq!(api.calls("create_ad"), 1);
        assert_eq!(session.step(), BuildStep::Published);
    }

    #[tokio::test]
    async fn test_smart_fallback_disabled_reports_failure() {
        let api = Arc::new(FakeApi {
            reject_batch: true,
            ..FakeApi::default()
        });
        let rules = BuildConfig::builder()
            .smart_fallback(SmartFallbackPolicy::Disabled)
            .build();
        let builder = CampaignBuilder::new(api.clone(), rules);
        let mut session = reviewed(&builder, BuildFlow::Smart, vec![smart_ad("Smart")]).await;

        let report = builder.publish(&mut session).await.unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.failed[0].message, "Batch not allowed");
        assert_eq!(api.calls("create_ad"), 0);
        assert_eq!(api.calls("publish_ads"), 0);
        assert_eq!(session.step(), BuildStep::AdsReviewed);
    }

    #[tokio::test]
    async fn test_partial_failure_still_publishes_created_ads() {
        let api = Arc::new(FakeApi {
            reject_ad_named: Some("Broken".to_string()),
            ..FakeApi::default()
        });
        let builder = builder(api.clone());
        let mut session = reviewed(
            &builder,
            BuildFlow::Manual,
            vec![ad("First"), ad("Broken"), ad("Third")],
        )
        .await;

        let report = builder.publish(&mut session).await.unwrap();
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failed[0].position, 2);
        assert_eq!(
            report.created.iter().map(|c| c.position).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(report.published_ids.len(), 2);
        assert_eq!(session.step(), BuildStep::Published);
        assert!(report.to_string().contains("Ad #2 (Broken): Creative rejected"));
    }

    #[tokio::test]
    async fn test_publish_retry_only_updates_status() {
        let api = Arc::new(FakeApi {
            publish_failures: AtomicU64::new(1),
            ..FakeApi::default()
        });
        let builder = builder(api.clone());
        let mut session = reviewed(&builder, BuildFlow::Manual, vec![ad("Launch")]).await;

        assert!(builder.publish(&mut session).await.is_err());
        assert_eq!(session.step(), BuildStep::AdsReviewed);
        assert_eq!(session.unpublished_ad_ids().len(), 1);

        let report = builder.publish(&mut session).await.unwrap();
        assert_eq!(api.calls("create_ad"), 1);
        assert_eq!(api.calls("publish_ads"), 2);
        assert_eq!(report.published_ids.len(), 1);
        assert!(session.unpublished_ad_ids().is_empty());
        assert_eq!(session.step(), BuildStep::Published);
    }

    #[tokio::test]
    async fn test_drafts_frozen_until_created_ads_are_published() {
        let api = Arc::new(FakeApi {
            publish_failures: AtomicU64::new(1),
            ..FakeApi::default()
        });
        let builder = builder(api.clone());
        let mut session = reviewed(&builder, BuildFlow::Manual, vec![ad("One")]).await;
        assert!(builder.publish(&mut session).await.is_err());

        let err = builder.add_ad(&mut session, ad("Two")).unwrap_err();
        assert!(matches!(err, CampaignError::InvalidState { .. }));
        assert!(matches!(
            builder.remove_ad(&mut session, 1),
            Err(CampaignError::InvalidState { .. })
        ));
        assert_eq!(session.ads().len(), 1);
        assert_eq!(session.step(), BuildStep::AdsReviewed);

        let report = builder.publish(&mut session).await.unwrap();
        assert_eq!(api.calls("create_ad"), 1);
        assert_eq!(report.published_ids, report.ad_ids());
        assert_eq!(session.step(), BuildStep::Published);
    }

    #[tokio::test]
    async fn test_restart_after_publish() {
        let api = Arc::new(FakeApi::default());
        let builder = builder(api);
        let mut session = reviewed(&builder, BuildFlow::Smart, vec![smart_ad("Smart")]).await;
        builder.publish(&mut session).await.unwrap();
        let token = session.token();

        builder.restart(&mut session);
        assert_eq!(session.token(), token);
        assert_eq!(session.step(), BuildStep::CampaignPending);
        assert!(session.ads().is_empty());
        assert!(builder
            .create_campaign(&mut session, CampaignDraft::new("Q2 Promo"))
            .await
            .is_ok());
    }
}
