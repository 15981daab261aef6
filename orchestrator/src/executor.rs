use crate::site::SocialSite;
use echopost_core::{
    ActionOutcome, CandidatePost, CoreError, FailureKind, RedditApiError, SkipReason,
};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Backoff after a server-side failure before giving the action up for
/// this run.
const TRANSIENT_BACKOFF: Duration = Duration::from_secs(60);

/// Performs the external side-effecting actions and classifies their
/// outcomes. Exactly one submit per invocation, plus at most one
/// retry-with-flair for crossposts.
pub struct ActionExecutor {
    transient_backoff: Duration,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExecutor {
    pub fn new() -> Self {
        Self {
            transient_backoff: TRANSIENT_BACKOFF,
        }
    }

    pub fn with_backoff(transient_backoff: Duration) -> Self {
        Self { transient_backoff }
    }

    /// Crosspost with the flair fallback: one plain attempt, and on a
    /// flair-required rejection one retry with the target's first flair.
    pub async fn crosspost<S: SocialSite>(
        &self,
        site: &mut S,
        post: &CandidatePost,
        target: &str,
    ) -> ActionOutcome {
        let fullname = post.fullname();
        match site.crosspost(target, &post.title, &fullname, None).await {
            Ok(url) => {
                info!("Crossposted {} to r/{}", fullname, target);
                ActionOutcome::Success { url }
            }
            Err(CoreError::RedditApi(RedditApiError::FlairRequired { .. })) => {
                self.crosspost_with_flair(site, post, target, &fullname)
                    .await
            }
            Err(e) => {
                warn!("Crosspost to r/{} failed: {}", target, e);
                ActionOutcome::Failed(classify_failure(&e))
            }
        }
    }

    async fn crosspost_with_flair<S: SocialSite>(
        &self,
        site: &mut S,
        post: &CandidatePost,
        target: &str,
        fullname: &str,
    ) -> ActionOutcome {
        let flairs = match site.link_flairs(target).await {
            Ok(flairs) => flairs,
            Err(e) => {
                warn!("Could not list flairs for r/{}: {}", target, e);
                return ActionOutcome::Failed(classify_failure(&e));
            }
        };
        let Some(flair) = flairs.first() else {
            info!("r/{} requires a flair but offers none", target);
            return ActionOutcome::Skipped(SkipReason::NoFlairAvailable);
        };

        info!(
            "Retrying crosspost to r/{} with flair {:?}",
            target, flair.text
        );
        match site
            .crosspost(target, &post.title, fullname, Some(&flair.id))
            .await
        {
            Ok(url) => ActionOutcome::Success { url },
            Err(e) => {
                warn!("Flaired crosspost to r/{} failed: {}", target, e);
                ActionOutcome::Failed(classify_failure(&e))
            }
        }
    }

    /// Reply to a post, classifying failures the way the comment loop
    /// needs: a forbidden target is permanent for this pair, a server error
    /// gets the fixed backoff and counts as transient, anything else is
    /// unknown.
    pub async fn comment<S: SocialSite>(
        &self,
        site: &mut S,
        post: &CandidatePost,
        text: &str,
    ) -> ActionOutcome {
        match site.reply(&post.fullname(), text).await {
            Ok(url) => {
                info!("Commented on {} in r/{}", post.id, post.subreddit);
                ActionOutcome::Success { url }
            }
            Err(e @ CoreError::RedditApi(RedditApiError::Forbidden { .. })) => {
                warn!("Forbidden to comment in r/{}", post.subreddit);
                ActionOutcome::Failed(FailureKind::Permanent(e.to_string()))
            }
            Err(e @ CoreError::RedditApi(RedditApiError::ServerError { .. })) => {
                warn!(
                    "Server error while commenting, backing off {:?}",
                    self.transient_backoff
                );
                sleep(self.transient_backoff).await;
                ActionOutcome::Failed(FailureKind::Transient(e.to_string()))
            }
            Err(e) => {
                warn!("Failed to comment on {}: {}", post.id, e);
                ActionOutcome::Failed(FailureKind::Unknown(e.to_string()))
            }
        }
    }
}

/// Map an external-call error onto the executor's failure taxonomy.
pub fn classify_failure(err: &CoreError) -> FailureKind {
    match err {
        CoreError::RedditApi(
            RedditApiError::Forbidden { .. }
            | RedditApiError::AuthenticationFailed { .. }
            | RedditApiError::InvalidToken
            | RedditApiError::SubredditNotFound { .. }
            | RedditApiError::PostNotFound { .. }
            | RedditApiError::SubmissionRejected { .. },
        ) => FailureKind::Permanent(err.to_string()),
        _ if err.is_transient() => FailureKind::Transient(err.to_string()),
        _ => FailureKind::Unknown(err.to_string()),
    }
}
