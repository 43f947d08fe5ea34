//! Build sessions and their store.
//!
//! A [`BuildSession`] holds everything one operator has built so far. It is
//! passed explicitly to every stage of the
//! [`CampaignBuilder`](crate::builder::CampaignBuilder); nothing is global.
//! The [`SessionStore`] ties each session to a token supplied by the caller.

use crate::builder::PublishReport;
use crate::draft::{AdDraft, AdGroupDraft, BuildFlow, CampaignDraft};
use crate::error::{CampaignError, Result};
use crate::review::ReviewSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

/// Opaque handle of a build session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(Uuid);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionToken {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CampaignError::SessionNotFound {
                token: s.to_string(),
            })
    }
}

/// Wizard progress. Stages only move forward on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildStep {
    CampaignPending,
    CampaignCreated,
    AdGroupCreated,
    AdsReviewed,
    Published,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStep::CampaignPending => "campaign pending",
            BuildStep::CampaignCreated => "campaign created",
            BuildStep::AdGroupCreated => "ad group created",
            BuildStep::AdsReviewed => "ads reviewed",
            BuildStep::Published => "published",
        };
        f.write_str(name)
    }
}

/// State of one campaign build.
#[derive(Debug, Clone)]
pub struct BuildSession {
    token: SessionToken,
    flow: BuildFlow,
    pub(crate) step: BuildStep,
    pub(crate) campaign: Option<CampaignDraft>,
    pub(crate) campaign_id: Option<String>,
    pub(crate) ad_group: Option<AdGroupDraft>,
    pub(crate) ad_group_id: Option<String>,
    pub(crate) ads: Vec<AdDraft>,
    pub(crate) summary: Option<ReviewSummary>,
    /// Ads created on the platform whose publish call has not succeeded yet.
    pub(crate) unpublished_ad_ids: Vec<String>,
    pub(crate) last_report: Option<PublishReport>,
    created_at: DateTime<Utc>,
}

impl BuildSession {
    pub fn new(flow: BuildFlow) -> Self {
        Self::with_token(SessionToken::generate(), flow)
    }

    pub fn with_token(token: SessionToken, flow: BuildFlow) -> Self {
        Self {
            token,
            flow,
            step: BuildStep::CampaignPending,
            campaign: None,
            campaign_id: None,
            ad_group: None,
            ad_group_id: None,
            ads: Vec::new(),
            summary: None,
            unpublished_ad_ids: Vec::new(),
            last_report: None,
            created_at: Utc::now(),
        }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn flow(&self) -> BuildFlow {
        self.flow
    }

    pub fn step(&self) -> BuildStep {
        self.step
    }

    pub fn campaign(&self) -> Option<&CampaignDraft> {
        self.campaign.as_ref()
    }

    pub fn campaign_id(&self) -> Option<&str> {
        self.campaign_id.as_deref()
    }

    pub fn ad_group(&self) -> Option<&AdGroupDraft> {
        self.ad_group.as_ref()
    }

    pub fn ad_group_id(&self) -> Option<&str> {
        self.ad_group_id.as_deref()
    }

    /// Ad drafts in creation and display order.
    pub fn ads(&self) -> &[AdDraft] {
        &self.ads
    }

    pub fn summary(&self) -> Option<&ReviewSummary> {
        self.summary.as_ref()
    }

    pub fn unpublished_ad_ids(&self) -> &[String] {
        &self.unpublished_ad_ids
    }

    pub fn last_report(&self) -> Option<&PublishReport> {
        self.last_report.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Fails unless the session is exactly at `expected`.
    pub(crate) fn require_step(&self, expected: BuildStep) -> Result<()> {
        if self.step != expected {
            return Err(self.state_error(expected));
        }
        Ok(())
    }

    pub(crate) fn state_error(&self, expected: BuildStep) -> CampaignError {
        CampaignError::InvalidState {
            expected: expected.to_string(),
            actual: self.step.to_string(),
        }
    }

    /// Drops every draft and id and starts over with the same token and flow.
    pub fn reset(&mut self) {
        *self = Self::with_token(self.token, self.flow);
    }
}

/// Sessions keyed by token.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionToken, Arc<Mutex<BuildSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session and returns its token.
    pub async fn create(&self, flow: BuildFlow) -> SessionToken {
        let session = BuildSession::new(flow);
        let token = session.token();
        self.sessions
            .write()
            .await
            .insert(token, Arc::new(Mutex::new(session)));
        info!(%token, %flow, "Started build session");
        token
    }

    /// Gets the session for `token`. Lock it for the duration of one stage call.
    pub async fn get(&self, token: SessionToken) -> Result<Arc<Mutex<BuildSession>>> {
        self.sessions
            .read()
            .await
            .get(&token)
            .cloned()
            .ok_or_else(|| CampaignError::SessionNotFound {
                token: token.to_string(),
            })
    }

    /// Discards a session (logout, or after publish-and-restart).
    pub async fn discard(&self, token: SessionToken) -> bool {
        let removed = self.sessions.write().await.remove(&token).is_some();
        if removed {
            info!(%token, "Discarded build session");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
