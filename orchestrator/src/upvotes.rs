use echopost_core::{CoreError, UpvoteConfig};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Best-effort promotion side call. Failures never reach loop control
/// flow; the call site only logs them.
#[allow(async_fn_in_trait)]
pub trait UpvoteService {
    async fn order_upvotes(&self, url: &str) -> Result<(), CoreError>;
}

#[derive(Debug, Serialize)]
struct UpvoteOrder<'a> {
    link: &'a str,
    quantity: u32,
}

/// SMM-panel style HTTP implementation: one JSON order per crossposted
/// submission.
#[derive(Debug)]
pub struct HttpUpvoteService {
    http_client: Client,
    endpoint: String,
    api_key: Option<String>,
    quantity: u32,
}

impl HttpUpvoteService {
    /// Build the service from config; `None` when the side call is disabled
    /// or no endpoint is configured.
    pub fn from_config(config: &UpvoteConfig) -> Result<Option<Self>, CoreError> {
        if !config.enabled {
            return Ok(None);
        }
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };

        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Some(Self {
            http_client,
            endpoint,
            api_key: config.api_key.clone(),
            quantity: config.quantity,
        }))
    }
}

impl UpvoteService for HttpUpvoteService {
    async fn order_upvotes(&self, url: &str) -> Result<(), CoreError> {
        let order = UpvoteOrder {
            link: url,
            quantity: self.quantity,
        };
        debug!("Placing upvote order for {}", url);

        let mut request = self.http_client.post(&self.endpoint).json(&order);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(CoreError::RequestFailed {
                message: format!("upvote order for {} rejected", url),
                status_code: Some(response.status().as_u16()),
            });
        }

        info!("Placed upvote order for {}", url);
        Ok(())
    }
}
