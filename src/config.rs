//! Configuration management for the campaign builder.
//!
//! Settings are grouped by concern:
//! - HTTP transport (base URL, timeouts, user agent)
//! - Account credentials (access token, advertiser id), supplied out-of-band
//! - Retry policy for read-only requests
//! - Build rules (minimum budgets, creative cap, publish concurrency, smart fallback)
//! - Media cache location
//!
//! ## Usage
//!
//! ```rust
//! use campaign_builder_rs::config::{AccountConfig, BuildConfig, Config, SmartFallbackPolicy};
//! use campaign_builder_rs::Result;
//!
//! fn example() -> Result<()> {
//!     let config = Config::builder()
//!         .account(AccountConfig::new("token", "7000000000000"))
//!         .build_rules(
//!             BuildConfig::builder()
//!                 .smart_fallback(SmartFallbackPolicy::Disabled)
//!                 .build(),
//!         )
//!         .build();
//!     config.validate()?;
//!
//!     // Or load everything from ADS_* environment variables
//!     let _config = Config::from_env()?;
//!     Ok(())
//! }
//! ```

use crate::error::{CampaignError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP client configuration
    pub http: HttpConfig,
    /// Credentials for the advertising platform
    pub account: AccountConfig,
    /// Retry configuration for read requests
    pub retry: RetryConfig,
    /// Campaign build rules
    pub build: BuildConfig,
    /// Media cache configuration
    pub cache: CacheConfig,
}

/// HTTP client configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 30)
    pub request_timeout_secs: u64,
    /// Connection timeout in seconds (default: 10)
    pub connect_timeout_secs: u64,
    /// Base URL of the platform API, including the version prefix
    pub base_url: String,
    /// User agent string for requests
    pub user_agent: String,
}

/// Account credentials. Never part of a request variant; attached by the client.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AccountConfig {
    pub access_token: String,
    pub advertiser_id: String,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("access_token", &"<redacted>")
            .field("advertiser_id", &self.advertiser_id)
            .finish()
    }
}

impl AccountConfig {
    pub fn new(access_token: impl Into<String>, advertiser_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            advertiser_id: advertiser_id.into(),
        }
    }
}

/// Retry configuration settings. Applies to read requests only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (default: 3)
    pub max_attempts: u32,
    /// Base delay between retries in milliseconds (default: 500)
    pub base_delay_ms: u64,
    /// Maximum delay between retries in seconds (default: 30)
    pub max_delay_secs: u64,
    /// Exponential backoff factor (default: 2.0)
    pub backoff_factor: f64,
    /// Whether to add jitter to retry delays (default: true)
    pub enable_jitter: bool,
}

/// What the smart flow does when the multi-creative batch call is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SmartFallbackPolicy {
    /// Retry as a single ad built from the first creative and the first text.
    /// Every other creative/text variant is dropped.
    #[default]
    DegradeToFirstPair,
    /// Report the batch rejection as the ad's failure.
    Disabled,
}

/// Campaign build rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Minimum ad group budget in the manual flow (default: 20)
    pub manual_min_budget: f64,
    /// Minimum ad group budget in the smart flow (default: 50)
    pub smart_min_budget: f64,
    /// Creatives allowed per ad draft, at most 10 (default: 10)
    pub max_creatives_per_ad: usize,
    /// Ad creation calls in flight during publish (default: 5)
    pub max_concurrent_ad_creates: usize,
    /// Smart flow behaviour after a rejected batch call
    pub smart_fallback: SmartFallbackPolicy,
}

/// Media cache configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether to persist the media library listing (default: true)
    pub enable_media_cache: bool,
    /// Directory holding the media cache files
    pub directory: PathBuf,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            base_url: "https://business-api.tiktok.com/open_api/v1.3".to_string(),
            user_agent: format!("campaign-builder-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_secs: 30,
            backoff_factor: 2.0,
            enable_jitter: true,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            manual_min_budget: 20.0,
            smart_min_budget: 50.0,
            max_creatives_per_ad: 10,
            max_concurrent_ad_creates: 5,
            smart_fallback: SmartFallbackPolicy::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_media_cache: true,
            directory: PathBuf::from(".cache/media"),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val
            .parse()
            .map(Some)
            .map_err(|_| CampaignError::config_error(format!("Invalid {name} value"))),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Creates a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Loads configuration from `ADS_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Account
        if let Ok(val) = std::env::var("ADS_ACCESS_TOKEN") {
            config.account.access_token = val;
        }
        if let Ok(val) = std::env::var("ADS_ADVERTISER_ID") {
            config.account.advertiser_id = val;
        }

        // HTTP settings
        if let Ok(val) = std::env::var("ADS_BASE_URL") {
            config.http.base_url = val;
        }
        if let Some(val) = parse_env("ADS_REQUEST_TIMEOUT")? {
            config.http.request_timeout_secs = val;
        }

        // Retry settings
        if let Some(val) = parse_env("ADS_MAX_RETRIES")? {
            config.retry.max_attempts = val;
        }

        // Build rules
        if let Some(val) = parse_env("ADS_MANUAL_MIN_BUDGET")? {
            config.build.manual_min_budget = val;
        }
        if let Some(val) = parse_env("ADS_SMART_MIN_BUDGET")? {
            config.build.smart_min_budget = val;
        }
        if let Some(val) = parse_env("ADS_MAX_CONCURRENT_AD_CREATES")? {
            config.build.max_concurrent_ad_creates = val;
        }
        if let Ok(val) = std::env::var("ADS_SMART_FALLBACK") {
            config.build.smart_fallback = match val.as_str() {
                "degrade_to_first_pair" => SmartFallbackPolicy::DegradeToFirstPair,
                "disabled" => SmartFallbackPolicy::Disabled,
                _ => return Err(CampaignError::config_error("Invalid ADS_SMART_FALLBACK value")),
            };
        }

        // Cache
        if let Ok(val) = std::env::var("ADS_MEDIA_CACHE_DIR") {
            config.cache.directory = PathBuf::from(val);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for consistency and constraints.
    ///
    /// Credentials are not checked here; [`Config::validate_account`] does that
    /// right before the first remote call.
    pub fn validate(&self) -> Result<()> {
        if self.http.request_timeout_secs == 0 {
            return Err(CampaignError::config_error(
                "request_timeout_secs must be greater than 0",
            ));
        }

        if self.http.connect_timeout_secs == 0 {
            return Err(CampaignError::config_error(
                "connect_timeout_secs must be greater than 0",
            ));
        }

        if self.http.base_url.is_empty() {
            return Err(CampaignError::config_error("base_url cannot be empty"));
        }

        if self.retry.max_attempts == 0 {
            return Err(CampaignError::config_error(
                "max_attempts must be greater than 0",
            ));
        }

        if self.retry.backoff_factor < 1.0 {
            return Err(CampaignError::config_error("backoff_factor must be >= 1.0"));
        }

        if !(self.build.manual_min_budget > 0.0) || !(self.build.smart_min_budget > 0.0) {
            return Err(CampaignError::config_error(
                "minimum budgets must be greater than 0",
            ));
        }

        if self.build.max_creatives_per_ad == 0 || self.build.max_creatives_per_ad > 10 {
            return Err(CampaignError::config_error(
                "max_creatives_per_ad must be between 1 and 10",
            ));
        }

        if self.build.max_concurrent_ad_creates == 0 {
            return Err(CampaignError::config_error(
                "max_concurrent_ad_creates must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Checks that credentials are present.
    pub fn validate_account(&self) -> Result<()> {
        if self.account.access_token.trim().is_empty() {
            return Err(CampaignError::config_error("access_token cannot be empty"));
        }
        if self.account.advertiser_id.trim().is_empty() {
            return Err(CampaignError::config_error("advertiser_id cannot be empty"));
        }
        Ok(())
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry.base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_secs(self.retry.max_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_secs)
    }
}

/// Builder for creating Config instances.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    http: Option<HttpConfig>,
    account: Option<AccountConfig>,
    retry: Option<RetryConfig>,
    build: Option<BuildConfig>,
    cache: Option<CacheConfig>,
}

impl ConfigBuilder {
    /// Sets the HTTP configuration.
    pub fn http(mut self, http: HttpConfig) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the account credentials.
    pub fn account(mut self, account: AccountConfig) -> Self {
        self.account = Some(account);
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets the build rules.
    pub fn build_rules(mut self, build: BuildConfig) -> Self {
        self.build = Some(build);
        self
    }

    /// Sets the media cache configuration.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Config {
        Config {
            http: self.http.unwrap_or_default(),
            account: self.account.unwrap_or_default(),
            retry: self.retry.unwrap_or_default(),
            build: self.build.unwrap_or_default(),
            cache: self.cache.unwrap_or_default(),
        }
    }
}

impl HttpConfig {
    /// Creates a new HTTP config builder.
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::default()
    }
}

impl RetryConfig {
    /// Creates a new retry config builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }
}

impl BuildConfig {
    /// Creates a new build rules builder.
    pub fn builder() -> BuildConfigBuilder {
        BuildConfigBuilder::default()
    }

    /// Minimum ad group budget for the given flow.
    pub fn min_budget(&self, flow: crate::draft::BuildFlow) -> f64 {
        match flow {
            crate::draft::BuildFlow::Manual => self.manual_min_budget,
            crate::draft::BuildFlow::Smart => self.smart_min_budget,
        }
    }
}

#[derive(Debug, Default)]
pub struct HttpConfigBuilder {
    request_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    base_url: Option<String>,
    user_agent: Option<String>,
}

impl HttpConfigBuilder {
    pub fn request_timeout_secs(mut self, timeout: u64) -> Self {
        self.request_timeout_secs = Some(timeout);
        self
    }

    pub fn connect_timeout_secs(mut self, timeout: u64) -> Self {
        self.connect_timeout_secs = Some(timeout);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> HttpConfig {
        let default = HttpConfig::default();
        HttpConfig {
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(default.request_timeout_secs),
            connect_timeout_secs: self
                .connect_timeout_secs
                .unwrap_or(default.connect_timeout_secs),
            base_url: self.base_url.unwrap_or(default.base_url),
            user_agent: self.user_agent.unwrap_or(default.user_agent),
        }
    }
}

#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_secs: Option<u64>,
    backoff_factor: Option<f64>,
    enable_jitter: Option<bool>,
}

impl RetryConfigBuilder {
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = Some(delay);
        self
    }

    pub fn max_delay_secs(mut self, delay: u64) -> Self {
        self.max_delay_secs = Some(delay);
        self
    }

    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = Some(factor);
        self
    }

    pub fn enable_jitter(mut self, enable: bool) -> Self {
        self.enable_jitter = Some(enable);
        self
    }

    pub fn build(self) -> RetryConfig {
        let default = RetryConfig::default();
        RetryConfig {
            max_attempts: self.max_attempts.unwrap_or(default.max_attempts),
            base_delay_ms: self.base_delay_ms.unwrap_or(default.base_delay_ms),
            max_delay_secs: self.max_delay_secs.unwrap_or(default.max_delay_secs),
            backoff_factor: self.backoff_factor.unwrap_or(default.backoff_factor),
            enable_jitter: self.enable_jitter.unwrap_or(default.enable_jitter),
        }
    }
}

#[derive(Debug, Default)]
pub struct BuildConfigBuilder {
    manual_min_budget: Option<f64>,
    smart_min_budget: Option<f64>,
    max_creatives_per_ad: Option<usize>,
    max_concurrent_ad_creates: Option<usize>,
    smart_fallback: Option<SmartFallbackPolicy>,
}

impl BuildConfigBuilder {
    pub fn manual_min_budget(mut self, budget: f64) -> Self {
        self.manual_min_budget = Some(budget);
        self
    }

    pub fn smart_min_budget(mut self, budget: f64) -> Self {
        self.smart_min_budget = Some(budget);
        self
    }

    pub fn max_creatives_per_ad(mut self, max: usize) -> Self {
        self.max_creatives_per_ad = Some(max);
        self
    }

    pub fn max_concurrent_ad_creates(mut self, max: usize) -> Self {
        self.max_concurrent_ad_creates = Some(max);
        self
    }

    pub fn smart_fallback(mut self, policy: SmartFallbackPolicy) -> Self {
        self.smart_fallback = Some(policy);
        self
    }

    pub fn build(self) -> BuildConfig {
        let default = BuildConfig::default();
        BuildConfig {
            manual_min_budget: self.manual_min_budget.unwrap_or(default.manual_min_budget),
            smart_min_budget: self.smart_min_budget.unwrap_or(default.smart_min_budget),
            max_creatives_per_ad: self
                .max_creatives_per_ad
                .unwrap_or(default.max_creatives_per_ad),
            max_concurrent_ad_creates: self
                .max_concurrent_ad_creates
                .unwrap_or(default.max_concurrent_ad_creates),
            smart_fallback: self.smart_fallback.unwrap_or(default.smart_fallback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::BuildFlow;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.build.manual_min_budget, 20.0);
        assert_eq!(config.build.smart_min_budget, 50.0);
        assert_eq!(config.build.max_creatives_per_ad, 10);
        assert_eq!(config.build.smart_fallback, SmartFallbackPolicy::DegradeToFirstPair);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .http(HttpConfig::builder().base_url("http://localhost:9000").build())
            .build_rules(
                BuildConfig::builder()
                    .max_concurrent_ad_creates(2)
                    .smart_fallback(SmartFallbackPolicy::Disabled)
                    .build(),
            )
            .build();

        assert_eq!(config.http.base_url, "http://localhost:9000");
        assert_eq!(config.build.max_concurrent_ad_creates, 2);
        assert_eq!(config.build.smart_fallback, SmartFallbackPolicy::Disabled);
        assert_eq!(config.build.manual_min_budget, 20.0);
    }

    #[test]
    fn test_min_budget_per_flow() {
        let rules = BuildConfig::default();
        assert_eq!(rules.min_budget(BuildFlow::Manual), 20.0);
        assert_eq!(rules.min_budget(BuildFlow::Smart), 50.0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.build.max_creatives_per_ad = 11;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.build.max_concurrent_ad_creates = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.build.manual_min_budget = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.backoff_factor = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_account_validation_and_redaction() {
        let config = Config::default();
        assert!(config.validate_account().is_err());

        let account = AccountConfig::new("secret-token", "7000");
        let debug = format!("{account:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("7000"));
    }

    #[test]
    fn test_environment_loading() {
        unsafe {
            std::env::set_var("ADS_ADVERTISER_ID", "7001");
            std::env::set_var("ADS_SMART_MIN_BUDGET", "80");
            std::env::set_var("ADS_SMART_FALLBACK", "disabled");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.account.advertiser_id, "7001");
        assert_eq!(config.build.smart_min_budget, 80.0);
        assert_eq!(config.build.smart_fallback, SmartFallbackPolicy::Disabled);

        unsafe {
            std::env::set_var("ADS_SMART_MIN_BUDGET", "lots");
        }
        assert!(Config::from_env().is_err());

        unsafe {
            std::env::remove_var("ADS_ADVERTISER_ID");
            std::env::remove_var("ADS_SMART_MIN_BUDGET");
            std::env::remove_var("ADS_SMART_FALLBACK");
        }
    }
}
