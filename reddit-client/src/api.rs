use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use echopost_core::{CandidatePost, CoreError, FlairChoice, RedditApiError, TargetInfo};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
const REDDIT_PUBLIC_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionData {
    pub id: String,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub subreddit: String,
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub is_self: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubredditAboutData {
    pub display_name: String,
    pub subreddit_type: String,
    #[serde(default)]
    pub over18: bool,
    #[serde(default)]
    pub subscribers: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlairChoiceData {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub mod_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityData {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentData {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Envelope of `api_type=json` write endpoints: an error table plus an
/// endpoint-specific data payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiJsonEnvelope<T> {
    pub json: ApiJsonBody<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiJsonBody<T> {
    #[serde(default)]
    pub errors: Vec<Vec<serde_json::Value>>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitData {
    pub url: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentThings {
    #[serde(default)]
    pub things: Vec<RedditListingChild<CommentedData>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentedData {
    pub id: String,
    #[serde(default)]
    pub permalink: Option<String>,
}

/// Rate-limited HTTP client over Reddit's OAuth API.
#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: RateLimiter,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(RateLimitConfig::reddit_oauth()),
        })
    }

    async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        form_params: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", REDDIT_API_BASE, endpoint);

        self.rate_limiter.acquire().await;
        debug!("Reddit API request: {} {}", method, endpoint);

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);
        if let Some(params) = query_params {
            request = request.query(params);
        }
        if let Some(params) = form_params {
            request = request.form(params);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        error!("Request failed with status {} for {}", status, endpoint);

        Err(match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after })
            }
            401 => CoreError::RedditApi(RedditApiError::InvalidToken),
            403 => CoreError::RedditApi(RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            }),
            404 => CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("resource not found: {}", endpoint),
            }),
            code if status.is_server_error() => {
                CoreError::RedditApi(RedditApiError::ServerError { status_code: code })
            }
            code => CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("unexpected status {} for {}", code, endpoint),
            }),
        })
    }

    pub async fn identity(&self, access_token: &str) -> Result<IdentityData, CoreError> {
        let response = self
            .make_request(Method::GET, "/api/v1/me", access_token, None, None)
            .await?;

        let identity: IdentityData = response.json().await.map_err(|e| {
            error!("Failed to parse identity: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "failed to parse identity".to_string(),
            })
        })?;

        debug!("Token belongs to u/{}", identity.name);
        Ok(identity)
    }

    pub async fn submission_by_id(
        &self,
        access_token: &str,
        post_id: &str,
    ) -> Result<SubmissionData, CoreError> {
        let fullname = format!("t3_{}", post_id);
        let response = self
            .make_request(
                Method::GET,
                "/api/info",
                access_token,
                Some(&[("id", fullname.as_str())]),
                None,
            )
            .await?;

        let listing: RedditListing<SubmissionData> = response.json().await.map_err(|e| {
            error!("Failed to parse submission lookup: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse lookup of {}", fullname),
            })
        })?;

        listing
            .data
            .children
            .into_iter()
            .next()
            .map(|child| child.data)
            .ok_or_else(|| {
                CoreError::RedditApi(RedditApiError::PostNotFound {
                    post_id: post_id.to_string(),
                })
            })
    }

    pub async fn newest_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<SubmissionData>, CoreError> {
        let endpoint = format!("/r/{}/new", subreddit);
        let limit_str = limit.to_string();

        let response = self
            .make_request(
                Method::GET,
                &endpoint,
                access_token,
                Some(&[("limit", limit_str.as_str())]),
                None,
            )
            .await?;

        let listing: RedditListing<SubmissionData> = response.json().await.map_err(|e| {
            error!("Failed to parse subreddit posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse posts for r/{}", subreddit),
            })
        })?;

        info!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }

    pub async fn subreddit_about(
        &self,
        access_token: &str,
        subreddit: &str,
    ) -> Result<SubredditAboutData, CoreError> {
        let endpoint = format!("/r/{}/about", subreddit);

        let response = self
            .make_request(Method::GET, &endpoint, access_token, None, None)
            .await?;

        let child: RedditListingChild<SubredditAboutData> =
            response.json().await.map_err(|e| {
                error!("Failed to parse subreddit info: {}", e);
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("failed to parse info for r/{}", subreddit),
                })
            })?;

        debug!("Retrieved info for r/{}", subreddit);
        Ok(child.data)
    }

    /// Selectable link flairs of a target. Mod-only flairs are filtered out
    /// since the bot cannot apply them.
    pub async fn link_flairs(
        &self,
        access_token: &str,
        subreddit: &str,
    ) -> Result<Vec<FlairChoiceData>, CoreError> {
        let endpoint = format!("/r/{}/api/link_flair_v2", subreddit);

        let response = self
            .make_request(Method::GET, &endpoint, access_token, None, None)
            .await?;

        let flairs: Vec<FlairChoiceData> = response.json().await.map_err(|e| {
            error!("Failed to parse flair list: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse flairs for r/{}", subreddit),
            })
        })?;

        Ok(flairs.into_iter().filter(|f| !f.mod_only).collect())
    }

    pub async fn submit_crosspost(
        &self,
        access_token: &str,
        target: &str,
        title: &str,
        source_fullname: &str,
        flair_id: Option<&str>,
    ) -> Result<SubmitData, CoreError> {
        let mut form = vec![
            ("api_type", "json"),
            ("kind", "crosspost"),
            ("sr", target),
            ("title", title),
            ("crosspost_fullname", source_fullname),
        ];
        if let Some(flair) = flair_id {
            form.push(("flair_id", flair));
        }

        let response = self
            .make_request(Method::POST, "/api/submit", access_token, None, Some(&form))
            .await?;

        let envelope: ApiJsonEnvelope<SubmitData> = response.json().await.map_err(|e| {
            error!("Failed to parse submit response: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "failed to parse submit response".to_string(),
            })
        })?;

        if let Some((code, details)) = first_api_error(&envelope.json.errors) {
            if code.contains("FLAIR_REQUIRED") {
                return Err(CoreError::RedditApi(RedditApiError::FlairRequired {
                    subreddit: target.to_string(),
                }));
            }
            return Err(CoreError::RedditApi(RedditApiError::SubmissionRejected {
                details,
            }));
        }

        envelope.json.data.ok_or_else(|| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "submit response carried no data".to_string(),
            })
        })
    }

    /// Reply to a thing; returns the URL of the new comment when the
    /// response carries a permalink.
    pub async fn submit_comment(
        &self,
        access_token: &str,
        parent_fullname: &str,
        text: &str,
    ) -> Result<Option<String>, CoreError> {
        let form = [
            ("api_type", "json"),
            ("thing_id", parent_fullname),
            ("text", text),
        ];

        let response = self
            .make_request(Method::POST, "/api/comment", access_token, None, Some(&form))
            .await?;

        let envelope: ApiJsonEnvelope<CommentThings> = response.json().await.map_err(|e| {
            error!("Failed to parse comment response: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "failed to parse comment response".to_string(),
            })
        })?;

        if let Some((_, details)) = first_api_error(&envelope.json.errors) {
            return Err(CoreError::RedditApi(RedditApiError::SubmissionRejected {
                details,
            }));
        }

        Ok(envelope
            .json
            .data
            .and_then(|d| d.things.into_iter().next())
            .and_then(|t| t.data.permalink)
            .map(|p| format!("{}{}", REDDIT_PUBLIC_BASE, p)))
    }

    /// Top-level comments of a submission. Non-comment children (e.g.
    /// "more" stubs) are ignored.
    pub async fn post_comments(
        &self,
        access_token: &str,
        subreddit: &str,
        post_id: &str,
    ) -> Result<Vec<CommentData>, CoreError> {
        let endpoint = format!("/r/{}/comments/{}", subreddit, post_id);

        let response = self
            .make_request(
                Method::GET,
                &endpoint,
                access_token,
                Some(&[("limit", "100"), ("depth", "1")]),
                None,
            )
            .await?;

        let listings: Vec<RedditListing<serde_json::Value>> =
            response.json().await.map_err(|e| {
                error!("Failed to parse comment tree: {}", e);
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("failed to parse comments of {}", post_id),
                })
            })?;

        // The endpoint returns [post listing, comment listing]
        Ok(listings
            .into_iter()
            .nth(1)
            .map(|listing| {
                listing
                    .data
                    .children
                    .into_iter()
                    .filter(|child| child.kind == "t1")
                    .filter_map(|child| serde_json::from_value::<CommentData>(child.data).ok())
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// First entry of an `api_type=json` error table as (code, joined details).
fn first_api_error(errors: &[Vec<serde_json::Value>]) -> Option<(String, String)> {
    let first = errors.first()?;
    let code = first
        .first()
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let details = first
        .iter()
        .filter_map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(": ");
    Some((code, details))
}

impl From<SubmissionData> for CandidatePost {
    fn from(data: SubmissionData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            body: if data.is_self && !data.selftext.is_empty() {
                Some(data.selftext)
            } else {
                None
            },
            subreddit: data.subreddit,
            permalink: data.permalink,
            created_utc: data.created_utc as i64,
            score: data.score,
        }
    }
}

impl From<SubredditAboutData> for TargetInfo {
    fn from(data: SubredditAboutData) -> Self {
        Self {
            display_name: data.display_name,
            community_type: data.subreddit_type,
            over_18: data.over18,
        }
    }
}

impl From<FlairChoiceData> for FlairChoice {
    fn from(data: FlairChoiceData) -> Self {
        Self {
            id: data.id,
            text: data.text,
        }
    }
}
