use echopost_core::{CoreError, RedditAccount, RedditApiError};
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, ResourceOwnerPassword, ResourceOwnerUsername, Scope,
    TokenResponse, TokenUrl,
};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

const AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Refresh this long before the advertised expiry so a token never dies
/// mid-request.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

/// Resource-owner password grant for script-type Reddit apps: one account,
/// no redirect dance, token re-exchanged when stale.
pub struct RedditAuthenticator {
    oauth: BasicClient,
    username: String,
    password: String,
    token: Option<RedditToken>,
}

impl RedditAuthenticator {
    pub fn new(account: &RedditAccount) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(AUTHORIZE_URL.to_string()).map_err(|e| {
            CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: format!("invalid authorize URL: {}", e),
            })
        })?;
        let token_url = TokenUrl::new(TOKEN_URL.to_string()).map_err(|e| {
            CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: format!("invalid token URL: {}", e),
            })
        })?;

        let oauth = BasicClient::new(
            ClientId::new(account.client_id.clone()),
            Some(ClientSecret::new(account.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            oauth,
            username: account.username.clone(),
            password: account.password.clone(),
            token: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_expired())
    }

    /// Return a valid access token, exchanging credentials when the cached
    /// token is missing or stale.
    pub async fn access_token(&mut self) -> Result<String, CoreError> {
        if let Some(token) = &self.token {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
            debug!("Cached token for u/{} is stale, re-authenticating", self.username);
        }

        let token = self.exchange_password().await?;
        let access = token.access_token.clone();
        self.token = Some(token);
        Ok(access)
    }

    async fn exchange_password(&self) -> Result<RedditToken, CoreError> {
        let response = self
            .oauth
            .exchange_password(
                &ResourceOwnerUsername::new(self.username.clone()),
                &ResourceOwnerPassword::new(self.password.clone()),
            )
            .add_scope(Scope::new("identity".to_string()))
            .add_scope(Scope::new("read".to_string()))
            .add_scope(Scope::new("submit".to_string()))
            .add_scope(Scope::new("flair".to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: e.to_string(),
                })
            })?;

        let expires_in = response.expires_in().unwrap_or(Duration::from_secs(3600));
        let token = RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + expires_in,
            scope: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
        };

        info!("Authenticated as u/{}", self.username);
        Ok(token)
    }

    #[cfg(test)]
    pub(crate) fn set_token(&mut self, token: RedditToken) {
        self.token = Some(token);
    }
}
