// ============================================================================
// Campaign Remote - document server transport
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::SyncError;

/// Whole-document access to the remote campaign
#[async_trait]
pub trait CampaignRemote: Send + Sync {
    async fn fetch_campaign(&self) -> Result<Value, SyncError>;
    async fn put_campaign(&self, payload: &Value) -> Result<(), SyncError>;
}

/// `{base}/api/campaign` over HTTP
pub struct HttpCampaignRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCampaignRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn campaign_url(&self) -> String {
        format!("{}/api/campaign", self.base_url)
    }
}

#[async_trait]
impl CampaignRemote for HttpCampaignRemote {
    async fn fetch_campaign(&self) -> Result<Value, SyncError> {
        let url = self.campaign_url();
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::Status(response.status().as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SyncError::Decode(e.to_string()))
    }

    async fn put_campaign(&self, payload: &Value) -> Result<(), SyncError> {
        let url = self.campaign_url();
        debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let remote = HttpCampaignRemote::new("http://127.0.0.1:5174/");
        assert_eq!(remote.base_url(), "http://127.0.0.1:5174");
        assert_eq!(remote.campaign_url(), "http://127.0.0.1:5174/api/campaign");
    }

    #[test]
    fn test_status_error_message() {
        assert_eq!(SyncError::Status(500).to_string(), "Server responded with 500");
    }
}
