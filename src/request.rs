//! Typed requests, one variant per remote action.
//!
//! Every request struct has a fixed field set and is validated when it is
//! constructed, so nothing malformed reaches the transport. Credentials and
//! the advertiser id are not part of a request; the client attaches them.

use crate::dayparting::Bitmap168;
use crate::draft::{
    AdDraft, AdFormat, AgeGroup, BudgetMode, CampaignDraft, Gender, IdentityType, MediaKind,
    Objective, OptimizationGoal,
};
use crate::error::{CampaignError, Result};
use crate::schedule;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound on creative entries in one ad creation call.
pub const MAX_CREATIVES_PER_CALL: usize = 50;

/// Upper bound on ad ids in one status update call.
pub const MAX_ADS_PER_STATUS_UPDATE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCampaignRequest {
    pub campaign_name: String,
    pub objective_type: Objective,
    pub budget_mode: BudgetMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

impl CreateCampaignRequest {
    pub fn new(draft: &CampaignDraft) -> Result<Self> {
        let request = Self {
            campaign_name: draft.name.trim().to_string(),
            objective_type: draft.objective,
            budget_mode: draft.budget_mode,
            budget: draft.budget,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.campaign_name.trim().is_empty() {
            return Err(CampaignError::validation("campaign_name", "is required"));
        }
        match (self.budget_mode, self.budget) {
            (BudgetMode::Infinite, _) => Ok(()),
            (_, Some(budget)) if budget.is_finite() && budget > 0.0 => Ok(()),
            _ => Err(CampaignError::validation(
                "budget",
                "must be a positive amount when the budget mode is limited",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAdGroupRequest {
    pub campaign_id: String,
    pub adgroup_name: String,
    pub placement_type: String,
    pub location_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub age_groups: Vec<AgeGroup>,
    #[serde(default)]
    pub gender: Gender,
    pub budget_mode: BudgetMode,
    pub budget: f64,
    pub schedule_type: String,
    /// UTC, `YYYY-MM-DD HH:MM:SS`.
    pub schedule_start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dayparting: Option<Bitmap168>,
    pub optimization_goal: OptimizationGoal,
    pub billing_event: String,
    pub bid_type: String,
    pub bid_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_id: Option<String>,
}

impl CreateAdGroupRequest {
    /// Builds the request for `campaign_id`, enforcing `min_budget`.
    pub fn new(
        campaign_id: &str,
        draft: &crate::draft::AdGroupDraft,
        min_budget: f64,
    ) -> Result<Self> {
        if draft.name.trim().is_empty() {
            return Err(CampaignError::validation("adgroup_name", "is required"));
        }
        check_budget(draft.budget, min_budget)?;
        check_bid(draft.bid_price)?;
        schedule::validate_timezone(&draft.timezone)?;

        let schedule_start_time =
            schedule::to_platform_utc(draft.schedule_start, draft.entry_offset()?)?;
        let goal = draft.optimization_goal;

        let request = Self {
            campaign_id: campaign_id.to_string(),
            adgroup_name: draft.name.trim().to_string(),
            placement_type: "PLACEMENT_TYPE_AUTOMATIC".to_string(),
            location_ids: draft.targeting.location_ids.clone(),
            age_groups: draft.targeting.age_groups.clone(),
            gender: draft.targeting.gender,
            budget_mode: BudgetMode::Daily,
            budget: draft.budget,
            schedule_type: "SCHEDULE_FROM_NOW".to_string(),
            schedule_start_time,
            dayparting: draft.dayparting.clone(),
            optimization_goal: goal,
            billing_event: goal.billing_event().to_string(),
            bid_type: "BID_TYPE_CUSTOM".to_string(),
            bid_price: draft.bid_price,
            pixel_id: draft.pixel_id.clone().filter(|p| !p.trim().is_empty()),
        };
        request.validate_fields()?;
        Ok(request)
    }

    /// Checks the fields that are independent of flow-specific budget rules.
    pub fn validate_fields(&self) -> Result<()> {
        if self.campaign_id.trim().is_empty() {
            return Err(CampaignError::validation("campaign_id", "is required"));
        }
        if self.adgroup_name.trim().is_empty() {
            return Err(CampaignError::validation("adgroup_name", "is required"));
        }
        check_bid(self.bid_price)?;
        schedule::parse_platform(&self.schedule_start_time)?;
        Ok(())
    }
}

fn check_budget(budget: f64, min_budget: f64) -> Result<()> {
    if !budget.is_finite() || budget < min_budget {
        return Err(CampaignError::validation(
            "budget",
            format!("must be at least {}", crate::utils::format_amount(min_budget)),
        ));
    }
    Ok(())
}

fn check_bid(bid_price: f64) -> Result<()> {
    if !bid_price.is_finite() || bid_price <= 0.0 {
        return Err(CampaignError::validation("bid_price", "must be greater than 0"));
    }
    Ok(())
}

/// One creative entry inside an ad creation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeEntry {
    pub ad_name: String,
    pub identity_id: String,
    pub identity_type: IdentityType,
    pub ad_format: AdFormat,
    pub ad_text: String,
    pub call_to_action: String,
    pub landing_page_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_ids: Vec<String>,
}

impl CreativeEntry {
    fn build(ad: &AdDraft, ad_name: String, media: &crate::draft::MediaRef, text: &str) -> Self {
        let (ad_format, video_id, image_ids) = match media.kind {
            MediaKind::Video => (AdFormat::SingleVideo, Some(media.media_id.clone()), Vec::new()),
            MediaKind::Image => {
                let format = match ad.format {
                    AdFormat::CarouselAds => AdFormat::CarouselAds,
                    _ => AdFormat::SingleImage,
                };
                (format, None, vec![media.media_id.clone()])
            }
        };
        Self {
            ad_name,
            identity_id: ad.identity_id.clone(),
            identity_type: ad.identity_type,
            ad_format,
            ad_text: text.to_string(),
            call_to_action: ad.call_to_action.clone(),
            landing_page_url: ad.destination_url.trim().to_string(),
            video_id,
            image_ids,
        }
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("ad_name", &self.ad_name),
            ("identity_id", &self.identity_id),
            ("ad_text", &self.ad_text),
            ("landing_page_url", &self.landing_page_url),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(CampaignError::validation(*field, "is required"));
        }
        if self.video_id.is_none() && self.image_ids.is_empty() {
            return Err(CampaignError::validation("creative", "needs a video or image id"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAdRequest {
    pub adgroup_id: String,
    pub creatives: Vec<CreativeEntry>,
}

impl CreateAdRequest {
    /// One creative and one text: the first of each.
    pub fn single(adgroup_id: &str, ad: &AdDraft) -> Result<Self> {
        let media = ad
            .first_creative()
            .ok_or_else(|| CampaignError::validation("creatives", "at least one is required"))?;
        let text = ad
            .ad_text
            .first()
            .ok_or_else(|| CampaignError::validation("ad_text", "is required"))?;

        let request = Self {
            adgroup_id: adgroup_id.to_string(),
            creatives: vec![CreativeEntry::build(ad, ad.name.trim().to_string(), media, text)],
        };
        request.validate()?;
        Ok(request)
    }

    /// Every creative combined with every text, as entries of one call.
    pub fn batch(adgroup_id: &str, ad: &AdDraft) -> Result<Self> {
        let texts = ad.ad_text.texts();
        if ad.creatives.is_empty() {
            return Err(CampaignError::validation("creatives", "at least one is required"));
        }
        if texts.is_empty() {
            return Err(CampaignError::validation("ad_text", "is required"));
        }

        let combinations = ad.creatives.len() * texts.len();
        if combinations > MAX_CREATIVES_PER_CALL {
            return Err(CampaignError::limit(
                "creative/text combinations per ad",
                MAX_CREATIVES_PER_CALL,
            ));
        }

        let base_name = ad.name.trim();
        let creatives = ad
            .creatives
            .iter()
            .flat_map(|media| texts.iter().map(move |text| (media, *text)))
            .enumerate()
            .map(|(i, (media, text))| {
                let name = if combinations == 1 {
                    base_name.to_string()
                } else {
                    format!("{base_name} #{}", i + 1)
                };
                CreativeEntry::build(ad, name, media, text)
            })
            .collect();

        let request = Self {
            adgroup_id: adgroup_id.to_string(),
            creatives,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.adgroup_id.trim().is_empty() {
            return Err(CampaignError::validation("adgroup_id", "is required"));
        }
        if self.creatives.is_empty() {
            return Err(CampaignError::validation("creatives", "at least one is required"));
        }
        if self.creatives.len() > MAX_CREATIVES_PER_CALL {
            return Err(CampaignError::limit("creatives per call", MAX_CREATIVES_PER_CALL));
        }
        self.creatives.iter().try_for_each(CreativeEntry::validate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAdStatusRequest {
    pub ad_ids: Vec<String>,
    pub operation_status: String,
}

impl UpdateAdStatusRequest {
    /// Enables (publishes) the given ads.
    pub fn enable(ad_ids: Vec<String>) -> Result<Self> {
        let request = Self {
            ad_ids,
            operation_status: "ENABLE".to_string(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ad_ids.is_empty() {
            return Err(CampaignError::validation("ad_ids", "at least one is required"));
        }
        if self.ad_ids.len() > MAX_ADS_PER_STATUS_UPDATE {
            return Err(CampaignError::limit("ads per status update", MAX_ADS_PER_STATUS_UPDATE));
        }
        if !matches!(self.operation_status.as_str(), "ENABLE" | "DISABLE" | "DELETE") {
            return Err(CampaignError::validation(
                "operation_status",
                format!("'{}' is not supported", self.operation_status),
            ));
        }
        Ok(())
    }
}

/// Every action the relay and the build state machine can send.
#[derive(Debug, Clone, PartialEq)]
pub enum AdsRequest {
    CreateCampaign(CreateCampaignRequest),
    CreateAdGroup(CreateAdGroupRequest),
    CreateAd(CreateAdRequest),
    CreateSmartAd(CreateAdRequest),
    UpdateAdStatus(UpdateAdStatusRequest),
    GetIdentities,
    GetImages,
    GetVideos,
    GetPixels,
}

impl AdsRequest {
    /// Parses an action name and raw payload as sent through the relay.
    pub fn from_action(action: &str, payload: Value) -> Result<Self> {
        let request = match action {
            "create_campaign" => {
                let r: CreateCampaignRequest = serde_json::from_value(payload)?;
                r.validate()?;
                AdsRequest::CreateCampaign(r)
            }
            "create_adgroup" => {
                let r: CreateAdGroupRequest = serde_json::from_value(payload)?;
                r.validate_fields()?;
                AdsRequest::CreateAdGroup(r)
            }
            "create_ad" | "create_smart_ad" => {
                let r: CreateAdRequest = serde_json::from_value(payload)?;
                r.validate()?;
                if action == "create_ad" {
                    if r.creatives.len() != 1 {
                        return Err(CampaignError::validation(
                            "creatives",
                            "create_ad takes exactly one creative",
                        ));
                    }
                    AdsRequest::CreateAd(r)
                } else {
                    AdsRequest::CreateSmartAd(r)
                }
            }
            "update_ad_status" => {
                let r: UpdateAdStatusRequest = serde_json::from_value(payload)?;
                r.validate()?;
                AdsRequest::UpdateAdStatus(r)
            }
            "get_identities" => AdsRequest::GetIdentities,
            "get_images" => AdsRequest::GetImages,
            "get_videos" => AdsRequest::GetVideos,
            "get_pixels" => AdsRequest::GetPixels,
            other => {
                return Err(CampaignError::validation(
                    "action",
                    format!("'{other}' is not a known action"),
                ));
            }
        };
        Ok(request)
    }

    pub fn action(&self) -> &'static str {
        match self {
            AdsRequest::CreateCampaign(_) => "create_campaign",
            AdsRequest::CreateAdGroup(_) => "create_adgroup",
            AdsRequest::CreateAd(_) => "create_ad",
            AdsRequest::CreateSmartAd(_) => "create_smart_ad",
            AdsRequest::UpdateAdStatus(_) => "update_ad_status",
            AdsRequest::GetIdentities => "get_identities",
            AdsRequest::GetImages => "get_images",
            AdsRequest::GetVideos => "get_videos",
            AdsRequest::GetPixels => "get_pixels",
        }
    }

    /// Endpoint path relative to the configured base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            AdsRequest::CreateCampaign(_) => "/campaign/create/",
            AdsRequest::CreateAdGroup(_) => "/adgroup/create/",
            AdsRequest::CreateAd(_) | AdsRequest::CreateSmartAd(_) => "/ad/create/",
            AdsRequest::UpdateAdStatus(_) => "/ad/status/update/",
            AdsRequest::GetIdentities => "/identity/get/",
            AdsRequest::GetImages => "/file/image/ad/search/",
            AdsRequest::GetVideos => "/file/video/ad/search/",
            AdsRequest::GetPixels => "/pixel/list/",
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            AdsRequest::GetIdentities
            | AdsRequest::GetImages
            | AdsRequest::GetVideos
            | AdsRequest::GetPixels => HttpMethod::Get,
            _ => HttpMethod::Post,
        }
    }

    /// Read requests are safe to retry; creations and updates are not.
    pub fn is_read_only(&self) -> bool {
        self.method() == HttpMethod::Get
    }

    /// JSON body (POST) or query parameters (GET), without credentials.
    pub fn payload(&self) -> Result<Value> {
        let value = match self {
            AdsRequest::CreateCampaign(r) => serde_json::to_value(r)?,
            AdsRequest::CreateAdGroup(r) => serde_json::to_value(r)?,
            AdsRequest::CreateAd(r) | AdsRequest::CreateSmartAd(r) => serde_json::to_value(r)?,
            AdsRequest::UpdateAdStatus(r) => serde_json::to_value(r)?,
            AdsRequest::GetImages | AdsRequest::GetVideos => {
                serde_json::json!({ "page": 1, "page_size": 100 })
            }
            AdsRequest::GetIdentities | AdsRequest::GetPixels => serde_json::json!({}),
        };
        Ok(value)
    }
}
