//! HTTP implementation of [`AdsApi`] and the request relay.

use crate::config::Config;
use crate::draft::{MediaKind, MediaRef};
use crate::error::{CampaignError, Result};
use crate::http::{AdsHttpClient, ApiEnvelope};
use crate::normalize::{self, Identity, Pixel};
use crate::request::{
    AdsRequest, CreateAdGroupRequest, CreateAdRequest, CreateCampaignRequest, HttpMethod,
    UpdateAdStatusRequest,
};
use crate::traits::AdsApi;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Response returned by [`AdsClient::relay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RelayResponse {
    fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn failed(error: &CampaignError) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(error.user_message()),
        }
    }
}

/// Client for the advertising platform.
#[derive(Debug, Clone)]
pub struct AdsClient {
    http: Arc<AdsHttpClient>,
    config: Arc<Config>,
}

impl AdsClient {
    /// Creates a client. Credentials must be present in `config.account`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        config.validate_account()?;
        let http = AdsHttpClient::with_config(config.clone())?;
        Ok(Self {
            http: Arc::new(http),
            config: Arc::new(config),
        })
    }

    /// Creates a client from `ADS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sends a typed request and returns the envelope's data.
    pub async fn dispatch(&self, request: &AdsRequest) -> Result<Value> {
        let mut payload = request.payload()?;
        let advertiser_id = self.config.account.advertiser_id.clone();

        debug!(
            action = request.action(),
            endpoint = request.endpoint(),
            "Dispatching request"
        );

        let body = match request.method() {
            HttpMethod::Post => {
                if let Value::Object(map) = &mut payload {
                    map.insert("advertiser_id".to_string(), Value::String(advertiser_id));
                }
                self.http.post_json(request.endpoint(), &payload).await?
            }
            HttpMethod::Get => {
                let mut query = vec![("advertiser_id".to_string(), advertiser_id)];
                if let Value::Object(map) = &payload {
                    query.extend(map.iter().map(|(k, v)| {
                        let v = match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), v)
                    }));
                }
                self.http.get_json(request.endpoint(), &query).await?
            }
        };

        ApiEnvelope::from_value(body)?.into_data()
    }

    /// Forwards an untyped `(action, payload)` pair, as received from the UI.
    ///
    /// Never fails: every error becomes `success: false` with a message fit
    /// for the operator.
    pub async fn relay(&self, action: &str, payload: Value) -> RelayResponse {
        info!(action, params = %payload, "Relaying request");

        let request = match AdsRequest::from_action(action, payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(action, "Rejected relay request: {e}");
                return RelayResponse::failed(&e);
            }
        };

        match self.dispatch(&request).await {
            Ok(data) => RelayResponse::ok(data),
            Err(e) => {
                warn!(action, "Relay request failed: {e}");
                RelayResponse::failed(&e)
            }
        }
    }

    async fn list_media(&self, request: AdsRequest, kind: MediaKind) -> Result<Vec<MediaRef>> {
        let data = self.dispatch(&request).await?;
        normalize::media(&data, kind, &self.config.account.advertiser_id)
    }
}

#[async_trait]
impl AdsApi for AdsClient {
    async fn create_campaign(&self, request: &CreateCampaignRequest) -> Result<String> {
        let data = self
            .dispatch(&AdsRequest::CreateCampaign(request.clone()))
            .await?;
        normalize::campaign_id(&data)
    }

    async fn create_ad_group(&self, request: &CreateAdGroupRequest) -> Result<String> {
        let data = self
            .dispatch(&AdsRequest::CreateAdGroup(request.clone()))
            .await?;
        normalize::adgroup_id(&data)
    }

    async fn create_ad(&self, request: &CreateAdRequest) -> Result<Vec<String>> {
        let data = self.dispatch(&AdsRequest::CreateAd(request.clone())).await?;
        normalize::ad_ids(&data)
    }

    async fn create_ad_batch(&self, request: &CreateAdRequest) -> Result<Vec<String>> {
        let data = self
            .dispatch(&AdsRequest::CreateSmartAd(request.clone()))
            .await?;
        normalize::ad_ids(&data)
    }

    async fn publish_ads(&self, request: &UpdateAdStatusRequest) -> Result<Vec<String>> {
        let data = self
            .dispatch(&AdsRequest::UpdateAdStatus(request.clone()))
            .await?;
        normalize::status_update(&data, &request.ad_ids)
    }

    async fn list_identities(&self) -> Result<Vec<Identity>> {
        let data = self.dispatch(&AdsRequest::GetIdentities).await?;
        normalize::identities(&data)
    }

    async fn list_images(&self) -> Result<Vec<MediaRef>> {
        self.list_media(AdsRequest::GetImages, MediaKind::Image).await
    }

    async fn list_videos(&self) -> Result<Vec<MediaRef>> {
        self.list_media(AdsRequest::GetVideos, MediaKind::Video).await
    }

    async fn list_pixels(&self) -> Result<Vec<Pixel>> {
        let data = self.dispatch(&AdsRequest::GetPixels).await?;
        normalize::pixels(&data)
    }

    fn account_id(&self) -> &str {
        &self.config.account.advertiser_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountConfig;

    #[test]
    fn test_client_requires_credentials() {
        assert!(AdsClient::new(Config::default()).is_err());

        let config = Config::builder()
            .account(AccountConfig::new("token", "7000"))
            .build();
        let client = AdsClient::new(config).unwrap();
        assert_eq!(client.account_id(), "7000");
    }

    #[test]
    fn test_relay_response_serialization() {
        let ok = RelayResponse::ok(serde_json::json!({"campaign_id": "1"}));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("message").is_none());

        let failed = RelayResponse::failed(&CampaignError::from_api_response(40002, "Bad budget"));
        assert!(!failed.success);
        assert_eq!(failed.message.as_deref(), Some("Bad budget"));
    }

    #[tokio::test]
    async fn test_relay_rejects_unknown_action_without_network() {
        let config = Config::builder()
            .account(AccountConfig::new("token", "7000"))
            .build();
        let client = AdsClient::new(config).unwrap();
        let response = client.relay("delete_everything", Value::Null).await;
        assert!(!response.success);
        assert!(response.message.unwrap().contains("delete_everything"));
    }
}
