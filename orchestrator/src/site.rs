use echopost_core::{CandidatePost, CoreError, FlairChoice, TargetInfo};
use reddit_client::RedditSession;

/// The surface of the social-media client the loops consume. Kept narrow
/// so tests can drive the loops with scripted fakes.
#[allow(async_fn_in_trait)]
pub trait SocialSite {
    async fn submission_from_url(&mut self, url: &str) -> Result<CandidatePost, CoreError>;

    async fn newest_posts(
        &mut self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<CandidatePost>, CoreError>;

    async fn target_info(&mut self, subreddit: &str) -> Result<TargetInfo, CoreError>;

    async fn link_flairs(&mut self, subreddit: &str) -> Result<Vec<FlairChoice>, CoreError>;

    async fn crosspost(
        &mut self,
        target: &str,
        title: &str,
        source_fullname: &str,
        flair_id: Option<&str>,
    ) -> Result<Option<String>, CoreError>;

    async fn reply(
        &mut self,
        parent_fullname: &str,
        text: &str,
    ) -> Result<Option<String>, CoreError>;

    async fn me(&mut self) -> Result<String, CoreError>;

    async fn comment_authors(&mut self, post: &CandidatePost) -> Result<Vec<String>, CoreError>;
}

impl SocialSite for RedditSession {
    async fn submission_from_url(&mut self, url: &str) -> Result<CandidatePost, CoreError> {
        RedditSession::submission_from_url(self, url).await
    }

    async fn newest_posts(
        &mut self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<CandidatePost>, CoreError> {
        RedditSession::newest_posts(self, subreddit, limit).await
    }

    async fn target_info(&mut self, subreddit: &str) -> Result<TargetInfo, CoreError> {
        RedditSession::target_info(self, subreddit).await
    }

    async fn link_flairs(&mut self, subreddit: &str) -> Result<Vec<FlairChoice>, CoreError> {
        RedditSession::link_flairs(self, subreddit).await
    }

    async fn crosspost(
        &mut self,
        target: &str,
        title: &str,
        source_fullname: &str,
        flair_id: Option<&str>,
    ) -> Result<Option<String>, CoreError> {
        RedditSession::crosspost(self, target, title, source_fullname, flair_id).await
    }

    async fn reply(
        &mut self,
        parent_fullname: &str,
        text: &str,
    ) -> Result<Option<String>, CoreError> {
        RedditSession::reply(self, parent_fullname, text).await
    }

    async fn me(&mut self) -> Result<String, CoreError> {
        RedditSession::me(self).await
    }

    async fn comment_authors(&mut self, post: &CandidatePost) -> Result<Vec<String>, CoreError> {
        RedditSession::comment_authors(self, post).await
    }
}
