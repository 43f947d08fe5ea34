//! Pre-publish review pass.
//!
//! Validation is fail-fast: the first ad draft missing a required field stops
//! the walk and is reported with its 1-based position. The summary is only
//! built once every draft passes.

use crate::draft::{AdDraft, AdGroupDraft, BuildFlow, CampaignDraft};
use crate::error::{CampaignError, Result};
use crate::schedule;
use crate::utils::{format_amount, human_list, truncate_text};
use serde::Serialize;
use std::fmt;

const SUMMARY_TEXT_WIDTH: usize = 40;

/// Checks one ad draft. `position` is 1-based.
pub fn validate_ad(position: usize, ad: &AdDraft) -> Result<()> {
    if ad.name.trim().is_empty() {
        return Err(CampaignError::ad_validation(position, "name", "is required"));
    }
    if ad.ad_text.is_blank() {
        return Err(CampaignError::ad_validation(position, "ad_text", "is required"));
    }
    if ad.creatives.is_empty() {
        return Err(CampaignError::ad_validation(
            position,
            "creatives",
            "need at least one image or video",
        ));
    }
    if ad.identity_id.trim().is_empty() {
        return Err(CampaignError::ad_validation(position, "identity_id", "is required"));
    }
    check_destination(position, &ad.destination_url)
}

fn check_destination(position: usize, destination: &str) -> Result<()> {
    let destination = destination.trim();
    if destination.is_empty() {
        return Err(CampaignError::ad_validation(
            position,
            "destination_url",
            "is required",
        ));
    }
    match url::Url::parse(destination) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(CampaignError::ad_validation(
            position,
            "destination_url",
            "must be an http(s) URL",
        )),
    }
}

/// Walks the drafts in order and stops at the first failure.
pub fn validate_ads(ads: &[AdDraft]) -> Result<()> {
    if ads.is_empty() {
        return Err(CampaignError::validation("ads", "at least one ad is required"));
    }
    ads.iter()
        .enumerate()
        .try_for_each(|(i, ad)| validate_ad(i + 1, ad))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdSummary {
    pub position: usize,
    pub name: String,
    pub texts: Vec<String>,
    pub images: usize,
    pub videos: usize,
    pub call_to_action: String,
    pub destination_url: String,
}

/// Everything the operator confirms before publishing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub flow: BuildFlow,
    pub campaign_name: String,
    pub campaign_id: String,
    pub ad_group_name: String,
    pub ad_group_id: String,
    pub budget: f64,
    pub bid_price: f64,
    /// UTC, platform format.
    pub schedule_start: String,
    pub timezone: String,
    /// Available hours per week; `None` means no dayparting restriction.
    pub dayparting_hours: Option<usize>,
    pub locations: Vec<String>,
    pub ads: Vec<AdSummary>,
}

/// Identifiers the summary shows next to the drafts.
#[derive(Debug, Clone, Copy)]
pub struct RemoteIds<'a> {
    pub campaign_id: &'a str,
    pub ad_group_id: &'a str,
}

/// Validates the drafts, then builds the summary.
pub fn review(
    flow: BuildFlow,
    campaign: &CampaignDraft,
    ad_group: &AdGroupDraft,
    ads: &[AdDraft],
    ids: RemoteIds<'_>,
) -> Result<ReviewSummary> {
    validate_ads(ads)?;

    let schedule_start =
        schedule::to_platform_utc(ad_group.schedule_start, ad_group.entry_offset()?)?;

    let ads = ads
        .iter()
        .enumerate()
        .map(|(i, ad)| {
            let images = ad
                .creatives
                .iter()
                .filter(|c| c.kind == crate::draft::MediaKind::Image)
                .count();
            AdSummary {
                position: i + 1,
                name: ad.name.trim().to_string(),
                texts: ad.ad_text.texts().into_iter().map(str::to_string).collect(),
                images,
                videos: ad.creatives.len() - images,
                call_to_action: ad.call_to_action.clone(),
                destination_url: ad.destination_url.trim().to_string(),
            }
        })
        .collect();

    Ok(ReviewSummary {
        flow,
        campaign_name: campaign.name.trim().to_string(),
        campaign_id: ids.campaign_id.to_string(),
        ad_group_name: ad_group.name.trim().to_string(),
        ad_group_id: ids.ad_group_id.to_string(),
        budget: ad_group.budget,
        bid_price: ad_group.bid_price,
        schedule_start,
        timezone: ad_group.timezone.clone(),
        dayparting_hours: ad_group.dayparting.as_ref().map(|d| d.selected_hours()),
        locations: ad_group.targeting.location_ids.clone(),
        ads,
    })
}

impl fmt::Display for ReviewSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Campaign: {} ({})", self.campaign_name, self.campaign_id)?;
        writeln!(f, "Ad group: {} ({})", self.ad_group_name, self.ad_group_id)?;
        writeln!(
            f,
            "  Budget {} / bid {} / {} flow",
            format_amount(self.budget),
            format_amount(self.bid_price),
            self.flow
        )?;
        writeln!(
            f,
            "  Starts {} UTC (shown in {})",
            self.schedule_start, self.timezone
        )?;
        match self.dayparting_hours {
            Some(hours) => writeln!(f, "  Dayparting: {hours} of 168 hours")?,
            None => writeln!(f, "  Dayparting: always on")?,
        }
        if !self.locations.is_empty() {
            writeln!(f, "  Locations: {}", human_list(&self.locations))?;
        }
        for ad in &self.ads {
            let first_text = ad.texts.first().map(String::as_str).unwrap_or_default();
            writeln!(
                f,
                "Ad #{}: {} [{} image(s), {} video(s), {} text(s)]",
                ad.position,
                ad.name,
                ad.images,
                ad.videos,
                ad.texts.len()
            )?;
            writeln!(f, "  \"{}\"", truncate_text(first_text, SUMMARY_TEXT_WIDTH))?;
            writeln!(f, "  {} -> {}", ad.call_to_action, ad.destination_url)?;
        }
        Ok(())
    }
}
