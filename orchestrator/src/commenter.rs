use crate::content::CommentGenerator;
use crate::eligibility::{comment_skip_reason, is_blacklisted};
use crate::executor::ActionExecutor;
use crate::site::SocialSite;
use crate::RunSummary;
use echopost_core::{ActionOutcome, CandidatePost, CoreError, SkipReason};
use ledger::Ledger;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Limits and thresholds for one comment run.
#[derive(Debug, Clone)]
pub struct CommentPolicy {
    pub max_daily_comments: u32,
    pub interval: Duration,
    pub max_post_age_hours: i64,
    pub min_post_score: i64,
    pub posts_per_subreddit: u32,
    pub blacklist: Vec<String>,
    pub verify_remote_history: bool,
}

/// Walks the target subreddits newest-first and comments on eligible posts
/// until the daily cap is reached.
pub struct CommentRunner<'a, S: SocialSite> {
    site: &'a mut S,
    posts_ledger: &'a mut Ledger,
    urls_ledger: &'a mut Ledger,
    generator: CommentGenerator,
    executor: ActionExecutor,
    policy: CommentPolicy,
}

impl<'a, S: SocialSite> CommentRunner<'a, S> {
    pub fn new(
        site: &'a mut S,
        posts_ledger: &'a mut Ledger,
        urls_ledger: &'a mut Ledger,
        generator: CommentGenerator,
        executor: ActionExecutor,
        policy: CommentPolicy,
    ) -> Self {
        Self {
            site,
            posts_ledger,
            urls_ledger,
            generator,
            executor,
            policy,
        }
    }

    pub async fn run(&mut self, subreddits: &[String]) -> Result<RunSummary, CoreError> {
        // Resolved once; only needed for the remote-history verification
        let me = if self.policy.verify_remote_history {
            Some(self.site.me().await?)
        } else {
            None
        };

        let mut summary = RunSummary::default();
        let mut comments_made = 0u32;

        'subreddits: for subreddit in subreddits {
            if is_blacklisted(subreddit, &self.policy.blacklist) {
                debug!("Skipping r/{}: {:?}", subreddit, SkipReason::Blacklisted);
                summary.skipped += 1;
                continue;
            }

            let posts = match self
                .site
                .newest_posts(subreddit, self.policy.posts_per_subreddit)
                .await
            {
                Ok(posts) => posts,
                Err(e) => {
                    warn!("Could not fetch posts from r/{}: {}", subreddit, e);
                    continue;
                }
            };

            for post in posts {
                if comments_made >= self.policy.max_daily_comments {
                    info!(
                        "Daily comment cap of {} reached, stopping run",
                        self.policy.max_daily_comments
                    );
                    break 'subreddits;
                }

                let now = chrono::Utc::now().timestamp();
                if let Some(reason) = comment_skip_reason(
                    &post,
                    self.posts_ledger,
                    now,
                    self.policy.max_post_age_hours,
                    self.policy.min_post_score,
                ) {
                    debug!("Skipping {}: {:?}", post.id, reason);
                    summary.skipped += 1;
                    continue;
                }

                if let Some(me) = &me {
                    if self.already_commented_remotely(&post, me).await {
                        debug!("Skipping {}: found an existing comment", post.id);
                        summary.skipped += 1;
                        continue;
                    }
                }

                let Some(text) = self.generator.generate(&post).await else {
                    info!(
                        "Skipping {}: {:?}",
                        post.id,
                        SkipReason::NoCommentProduced
                    );
                    summary.skipped += 1;
                    continue;
                };

                summary.attempted += 1;
                match self.executor.comment(self.site, &post, &text).await {
                    ActionOutcome::Success { url } => {
                        summary.succeeded += 1;
                        comments_made += 1;
                        self.posts_ledger.record(&post.id);
                        if let Some(url) = url {
                            self.urls_ledger.record(&url);
                        }
                        sleep(self.policy.interval).await;
                    }
                    ActionOutcome::Skipped(reason) => {
                        info!("Skipped {}: {:?}", post.id, reason);
                        summary.skipped += 1;
                    }
                    ActionOutcome::Failed(kind) => {
                        warn!("Comment on {} failed: {:?}", post.id, kind);
                        summary.failed += 1;
                    }
                }
            }
        }

        info!("Comment run finished: {:?}", summary);
        Ok(summary)
    }

    /// Secondary verification against the live comment tree. The local
    /// ledger stays the primary dedup; this catches comments made by other
    /// runs or by hand. An error while scanning counts as "assume
    /// commented": a duplicate comment is worse than a missed one.
    async fn already_commented_remotely(&mut self, post: &CandidatePost, me: &str) -> bool {
        match self.site.comment_authors(post).await {
            Ok(authors) => authors.iter().any(|a| a == me),
            Err(e) => {
                warn!("Could not verify comment history of {}: {}", post.id, e);
                true
            }
        }
    }
}
