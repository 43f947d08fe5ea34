//! Draft types collected by the wizard before each remote creation step.

use crate::dayparting::Bitmap168;
use crate::error::{CampaignError, Result};
use chrono::{FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on creatives attached to one ad.
pub const MAX_CREATIVES_PER_AD: usize = 10;

/// Which wizard variant built the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuildFlow {
    /// One creative and one text per ad.
    #[default]
    Manual,
    /// Several creatives and texts per ad, optimized by the platform.
    Smart,
}

impl fmt::Display for BuildFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildFlow::Manual => write!(f, "manual"),
            BuildFlow::Smart => write!(f, "smart"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Objective {
    #[default]
    Traffic,
    Reach,
    VideoViews,
    WebConversions,
    LeadGeneration,
    AppPromotion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BudgetMode {
    #[default]
    #[serde(rename = "BUDGET_MODE_INFINITE")]
    Infinite,
    #[serde(rename = "BUDGET_MODE_DAY")]
    Daily,
    #[serde(rename = "BUDGET_MODE_TOTAL")]
    Total,
}

/// Step 1 input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDraft {
    pub name: String,
    pub objective: Objective,
    pub budget_mode: BudgetMode,
    /// Required unless `budget_mode` is `Infinite`.
    pub budget: Option<f64>,
    pub schedule_start: Option<NaiveDateTime>,
    pub schedule_end: Option<NaiveDateTime>,
}

impl CampaignDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objective: Objective::default(),
            budget_mode: BudgetMode::default(),
            budget: None,
            schedule_start: None,
            schedule_end: None,
        }
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_budget(mut self, mode: BudgetMode, budget: f64) -> Self {
        self.budget_mode = mode;
        self.budget = Some(budget);
        self
    }

    pub fn with_schedule(mut self, start: NaiveDateTime, end: Option<NaiveDateTime>) -> Self {
        self.schedule_start = Some(start);
        self.schedule_end = end;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Gender {
    #[default]
    #[serde(rename = "GENDER_UNLIMITED")]
    Unlimited,
    #[serde(rename = "GENDER_MALE")]
    Male,
    #[serde(rename = "GENDER_FEMALE")]
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "AGE_13_17")]
    Age13To17,
    #[serde(rename = "AGE_18_24")]
    Age18To24,
    #[serde(rename = "AGE_25_34")]
    Age25To34,
    #[serde(rename = "AGE_35_44")]
    Age35To44,
    #[serde(rename = "AGE_45_54")]
    Age45To54,
    #[serde(rename = "AGE_55_100")]
    Age55Plus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Targeting {
    pub location_ids: Vec<String>,
    pub age_groups: Vec<AgeGroup>,
    pub gender: Gender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationGoal {
    #[default]
    Click,
    Reach,
    Convert,
}

impl OptimizationGoal {
    /// Billing event the platform pairs with this goal.
    pub fn billing_event(self) -> &'static str {
        match self {
            OptimizationGoal::Click => "CPC",
            OptimizationGoal::Reach => "CPM",
            OptimizationGoal::Convert => "OCPM",
        }
    }
}

/// Step 2 input. The owning campaign id is taken from the session when the
/// request is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdGroupDraft {
    pub name: String,
    pub budget: f64,
    pub bid_price: f64,
    /// Start as entered on the operator's clock.
    pub schedule_start: NaiveDateTime,
    /// Seconds east of UTC of the operator's clock at entry time; used once
    /// for the UTC conversion.
    pub entry_offset_secs: i32,
    /// Display timezone, sent as metadata.
    pub timezone: String,
    pub targeting: Targeting,
    pub dayparting: Option<Bitmap168>,
    pub pixel_id: Option<String>,
    pub optimization_goal: OptimizationGoal,
}

impl AdGroupDraft {
    pub fn new(
        name: impl Into<String>,
        budget: f64,
        bid_price: f64,
        schedule_start: NaiveDateTime,
    ) -> Self {
        Self {
            name: name.into(),
            budget,
            bid_price,
            schedule_start,
            entry_offset_secs: 0,
            timezone: "UTC".to_string(),
            targeting: Targeting::default(),
            dayparting: None,
            pixel_id: None,
            optimization_goal: OptimizationGoal::default(),
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_entry_offset(mut self, offset: FixedOffset) -> Self {
        self.entry_offset_secs = offset.local_minus_utc();
        self
    }

    pub fn entry_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.entry_offset_secs).ok_or_else(|| {
            CampaignError::validation("entry_offset", "is outside the valid UTC offset range")
        })
    }

    pub fn with_targeting(mut self, targeting: Targeting) -> Self {
        self.targeting = targeting;
        self
    }

    pub fn with_dayparting(mut self, dayparting: Option<Bitmap168>) -> Self {
        self.dayparting = dayparting;
        self
    }

    pub fn with_pixel(mut self, pixel_id: impl Into<String>) -> Self {
        self.pixel_id = Some(pixel_id.into());
        self
    }

    pub fn with_optimization_goal(mut self, goal: OptimizationGoal) -> Self {
        self.optimization_goal = goal;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Guesses the kind from a file name's MIME type.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let mime = mime_guess::from_path(file_name).first()?;
        match mime.type_().as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Weak reference into the platform's media library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Platform-native `image_id` or `video_id`.
    pub media_id: String,
    pub kind: MediaKind,
    pub source_url: String,
    /// Advertiser account that owns the media.
    pub account_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl MediaRef {
    pub fn new(
        media_id: impl Into<String>,
        kind: MediaKind,
        source_url: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            media_id: media_id.into(),
            kind,
            source_url: source_url.into(),
            account_id: account_id.into(),
            file_name: None,
        }
    }

    /// Two entries are the same media when id and owning account match.
    pub fn same_media(&self, other: &MediaRef) -> bool {
        self.media_id == other.media_id && self.account_id == other.account_id
    }
}

/// Ad copy: one text, or several variants for the smart flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdText {
    Single(String),
    Variants(Vec<String>),
}

impl Default for AdText {
    fn default() -> Self {
        AdText::Single(String::new())
    }
}

impl AdText {
    /// Non-blank texts in their original order.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            AdText::Single(text) => vec![text.as_str()],
            AdText::Variants(texts) => texts.iter().map(String::as_str).collect(),
        }
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
    }

    pub fn first(&self) -> Option<&str> {
        self.texts().into_iter().next()
    }

    pub fn is_blank(&self) -> bool {
        self.texts().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdFormat {
    #[default]
    SingleVideo,
    SingleImage,
    CarouselAds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityType {
    #[default]
    CustomizedUser,
    AuthCode,
    TtUser,
}

/// Step 3 input. Exists only locally until publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdDraft {
    pub name: String,
    pub ad_text: AdText,
    pub creatives: Vec<MediaRef>,
    pub identity_id: String,
    pub identity_type: IdentityType,
    pub call_to_action: String,
    pub destination_url: String,
    pub format: AdFormat,
}

impl AdDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ad_text: AdText::default(),
            creatives: Vec::new(),
            identity_id: String::new(),
            identity_type: IdentityType::default(),
            call_to_action: "LEARN_MORE".to_string(),
            destination_url: String::new(),
            format: AdFormat::default(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.ad_text = AdText::Single(text.into());
        self
    }

    pub fn with_text_variants<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ad_text = AdText::Variants(texts.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_identity(mut self, identity_id: impl Into<String>, kind: IdentityType) -> Self {
        self.identity_id = identity_id.into();
        self.identity_type = kind;
        self
    }

    pub fn with_call_to_action(mut self, cta: impl Into<String>) -> Self {
        self.call_to_action = cta.into();
        self
    }

    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination_url = url.into();
        self
    }

    pub fn with_format(mut self, format: AdFormat) -> Self {
        self.format = format;
        self
    }

    /// Builder form of [`AdDraft::add_creative`].
    pub fn with_creative(mut self, media: MediaRef) -> Result<Self> {
        self.add_creative(media)?;
        Ok(self)
    }

    /// Attaches a creative. The 11th creative fails with `LimitExceeded` and
    /// leaves the existing ones untouched.
    pub fn add_creative(&mut self, media: MediaRef) -> Result<()> {
        self.add_creative_within(media, MAX_CREATIVES_PER_AD)
    }

    /// Attaches a creative under a caller-supplied cap, itself capped at
    /// [`MAX_CREATIVES_PER_AD`].
    pub fn add_creative_within(&mut self, media: MediaRef, limit: usize) -> Result<()> {
        let limit = limit.min(MAX_CREATIVES_PER_AD);
        if self.creatives.len() >= limit {
            return Err(CampaignError::limit("creatives per ad", limit));
        }
        if self.creatives.iter().any(|c| c.same_media(&media)) {
            return Err(CampaignError::validation(
                "creatives",
                format!("already contain {} {}", media.kind, media.media_id),
            ));
        }
        self.creatives.push(media);
        Ok(())
    }

    pub fn remove_creative(&mut self, media_id: &str) -> Option<MediaRef> {
        let index = self.creatives.iter().position(|c| c.media_id == media_id)?;
        Some(self.creatives.remove(index))
    }

    pub fn first_creative(&self) -> Option<&MediaRef> {
        self.creatives.first()
    }
}
