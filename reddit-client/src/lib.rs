pub mod api;
pub mod auth;
pub mod rate_limiter;

pub use api::RedditApiClient;
pub use auth::{RedditAuthenticator, RedditToken};

use echopost_core::{CandidatePost, CoreError, FlairChoice, RedditAccount, TargetInfo};

/// One authenticated Reddit session: the password-grant authenticator plus
/// the rate-limited API client, exposed in terms of core domain types.
pub struct RedditSession {
    auth: RedditAuthenticator,
    api: RedditApiClient,
}

impl RedditSession {
    pub fn new(account: &RedditAccount) -> Result<Self, CoreError> {
        let auth = RedditAuthenticator::new(account)?;
        let api = RedditApiClient::new(account.resolved_user_agent())?;
        Ok(Self { auth, api })
    }

    /// Username the session's token belongs to.
    pub async fn me(&mut self) -> Result<String, CoreError> {
        let token = self.auth.access_token().await?;
        Ok(self.api.identity(&token).await?.name)
    }

    pub async fn submission_from_url(&mut self, url: &str) -> Result<CandidatePost, CoreError> {
        let post_id = post_id_from_url(url)?;
        let token = self.auth.access_token().await?;
        let data = self.api.submission_by_id(&token, &post_id).await?;
        Ok(data.into())
    }

    pub async fn newest_posts(
        &mut self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<CandidatePost>, CoreError> {
        let token = self.auth.access_token().await?;
        let posts = self.api.newest_posts(&token, subreddit, limit).await?;
        Ok(posts.into_iter().map(Into::into).collect())
    }

    pub async fn target_info(&mut self, subreddit: &str) -> Result<TargetInfo, CoreError> {
        let token = self.auth.access_token().await?;
        let about = self.api.subreddit_about(&token, subreddit).await?;
        Ok(about.into())
    }

    pub async fn link_flairs(&mut self, subreddit: &str) -> Result<Vec<FlairChoice>, CoreError> {
        let token = self.auth.access_token().await?;
        let flairs = self.api.link_flairs(&token, subreddit).await?;
        Ok(flairs.into_iter().map(Into::into).collect())
    }

    pub async fn crosspost(
        &mut self,
        target: &str,
        title: &str,
        source_fullname: &str,
        flair_id: Option<&str>,
    ) -> Result<Option<String>, CoreError> {
        let token = self.auth.access_token().await?;
        let data = self
            .api
            .submit_crosspost(&token, target, title, source_fullname, flair_id)
            .await?;
        Ok(data.url)
    }

    pub async fn reply(
        &mut self,
        parent_fullname: &str,
        text: &str,
    ) -> Result<Option<String>, CoreError> {
        let token = self.auth.access_token().await?;
        self.api.submit_comment(&token, parent_fullname, text).await
    }

    /// Authors of a submission's top-level comments, for the optional
    /// remote-history check.
    pub async fn comment_authors(
        &mut self,
        post: &CandidatePost,
    ) -> Result<Vec<String>, CoreError> {
        let token = self.auth.access_token().await?;
        let comments = self
            .api
            .post_comments(&token, &post.subreddit, &post.id)
            .await?;
        Ok(comments.into_iter().filter_map(|c| c.author).collect())
    }
}

/// Extract the base36 submission id from a Reddit post URL
/// (`…/r/<subreddit>/comments/<id>/<slug>/`).
pub fn post_id_from_url(url: &str) -> Result<String, CoreError> {
    let parsed = url::Url::parse(url).map_err(|e| CoreError::InvalidInput {
        message: format!("invalid post URL {}: {}", url, e),
    })?;

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    segments
        .windows(2)
        .find(|w| w[0] == "comments")
        .map(|w| w[1].to_string())
        .ok_or_else(|| CoreError::InvalidInput {
            message: format!("no submission id in URL {}", url),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_id_from_url() {
        let id = post_id_from_url(
            "https://www.reddit.com/r/Entrepreneur/comments/1abcde/example_post_title/",
        )
        .unwrap();
        assert_eq!(id, "1abcde");
    }

    #[test]
    fn test_post_id_without_slug() {
        let id = post_id_from_url("https://reddit.com/r/rust/comments/zz9xy").unwrap();
        assert_eq!(id, "zz9xy");
    }

    #[test]
    fn test_post_id_rejects_non_post_urls() {
        assert!(post_id_from_url("https://www.reddit.com/r/rust/").is_err());
        assert!(post_id_from_url("not a url").is_err());
    }

    #[test]
    fn test_session_creation() {
        let account = RedditAccount {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            username: "user".to_string(),
            password: "password".to_string(),
            user_agent: None,
        };
        assert!(RedditSession::new(&account).is_ok());
    }
}
