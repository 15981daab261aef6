use echopost_core::{CandidatePost, CoreError, FlairChoice, RedditApiError, TargetInfo};
use ledger::Ledger;
use orchestrator::{
    ActionExecutor, CommentGenerator, CommentPolicy, CommentRunner, CrosspostOptions,
    CrosspostRunner, SocialSite, TemplateGenerator, UpvoteService,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("echopost_loop_{}.json", uuid::Uuid::new_v4()))
}

fn post(id: &str, subreddit: &str, age_secs: i64, score: i64) -> CandidatePost {
    CandidatePost {
        id: id.to_string(),
        title: format!("Post {}", id),
        body: Some("body text".to_string()),
        subreddit: subreddit.to_string(),
        permalink: format!("/r/{}/comments/{}/x/", subreddit, id),
        created_utc: chrono::Utc::now().timestamp() - age_secs,
        score,
    }
}

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Scripted stand-in for the Reddit session: behavior is driven by the
/// fields, calls are recorded for assertions.
#[derive(Default)]
struct FakeSite {
    source: Option<CandidatePost>,
    posts: HashMap<String, Vec<CandidatePost>>,
    flairs: HashMap<String, Vec<FlairChoice>>,
    flair_required: Vec<String>,
    closed_targets: Vec<String>,
    unreachable_targets: Vec<String>,
    reply_forbidden: bool,
    username: String,
    existing_commenters: HashMap<String, Vec<String>>,
    crosspost_calls: u32,
    crossposts: Vec<(String, Option<String>)>,
    replies: Vec<String>,
}

impl SocialSite for FakeSite {
    async fn submission_from_url(&mut self, _url: &str) -> Result<CandidatePost, CoreError> {
        self.source.clone().ok_or_else(|| CoreError::InvalidInput {
            message: "no source submission scripted".to_string(),
        })
    }

    async fn newest_posts(
        &mut self,
        subreddit: &str,
        _limit: u32,
    ) -> Result<Vec<CandidatePost>, CoreError> {
        Ok(self.posts.get(subreddit).cloned().unwrap_or_default())
    }

    async fn target_info(&mut self, subreddit: &str) -> Result<TargetInfo, CoreError> {
        if self.unreachable_targets.iter().any(|t| t == subreddit) {
            return Err(RedditApiError::SubredditNotFound {
                subreddit: subreddit.to_string(),
            }
            .into());
        }
        let closed = self.closed_targets.iter().any(|t| t == subreddit);
        Ok(TargetInfo {
            display_name: subreddit.to_string(),
            community_type: if closed { "private" } else { "public" }.to_string(),
            over_18: false,
        })
    }

    async fn link_flairs(&mut self, subreddit: &str) -> Result<Vec<FlairChoice>, CoreError> {
        Ok(self.flairs.get(subreddit).cloned().unwrap_or_default())
    }

    async fn crosspost(
        &mut self,
        target: &str,
        _title: &str,
        _source_fullname: &str,
        flair_id: Option<&str>,
    ) -> Result<Option<String>, CoreError> {
        self.crosspost_calls += 1;
        if flair_id.is_none() && self.flair_required.iter().any(|t| t == target) {
            return Err(RedditApiError::FlairRequired {
                subreddit: target.to_string(),
            }
            .into());
        }
        self.crossposts
            .push((target.to_string(), flair_id.map(|f| f.to_string())));
        Ok(Some(format!(
            "https://www.reddit.com/r/{}/comments/new1/x/",
            target
        )))
    }

    async fn reply(
        &mut self,
        parent_fullname: &str,
        _text: &str,
    ) -> Result<Option<String>, CoreError> {
        if self.reply_forbidden {
            return Err(RedditApiError::Forbidden {
                resource: "/api/comment".to_string(),
            }
            .into());
        }
        self.replies.push(parent_fullname.to_string());
        Ok(Some(format!(
            "https://www.reddit.com/comments/{}/c1/",
            parent_fullname
        )))
    }

    async fn me(&mut self) -> Result<String, CoreError> {
        Ok(self.username.clone())
    }

    async fn comment_authors(&mut self, post: &CandidatePost) -> Result<Vec<String>, CoreError> {
        Ok(self
            .existing_commenters
            .get(&post.id)
            .cloned()
            .unwrap_or_default())
    }
}

struct NoUpvotes;

impl UpvoteService for NoUpvotes {
    async fn order_upvotes(&self, _url: &str) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Upvote service that always fails, for checking the call is best-effort.
struct FailingUpvotes {
    calls: AtomicU32,
}

impl UpvoteService for FailingUpvotes {
    async fn order_upvotes(&self, _url: &str) -> Result<(), CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::RequestFailed {
            message: "panel is down".to_string(),
            status_code: Some(500),
        })
    }
}

fn options() -> CrosspostOptions {
    CrosspostOptions {
        check_target_metadata: true,
        delay: Duration::ZERO,
        blacklist: Vec::new(),
    }
}

fn policy() -> CommentPolicy {
    CommentPolicy {
        max_daily_comments: 50,
        interval: Duration::ZERO,
        max_post_age_hours: 24,
        min_post_score: 1,
        posts_per_subreddit: 10,
        blacklist: Vec::new(),
        verify_remote_history: false,
    }
}

fn template_generator() -> CommentGenerator {
    CommentGenerator::Template(TemplateGenerator::new(vec![
        "Interesting take on {post_title}".to_string(),
    ]))
}

const SOURCE_URL: &str = "https://www.reddit.com/r/origin/comments/src1/example/";

fn site_with_source() -> FakeSite {
    FakeSite {
        source: Some(post("src1", "origin", 60, 100)),
        ..Default::default()
    }
}

#[tokio::test]
async fn preloaded_ledger_limits_attempts_to_unseen_targets() {
    let mut site = site_with_source();
    let mut ledger = Ledger::open(temp_path());
    ledger.record("b");

    let mut runner = CrosspostRunner::new(
        &mut site,
        &mut ledger,
        ActionExecutor::new(),
        None::<&NoUpvotes>,
        options(),
    );
    let summary = runner.run(SOURCE_URL, &targets(&["a", "b", "c"])).await.unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        site.crossposts,
        vec![("a".to_string(), None), ("c".to_string(), None)]
    );
    for target in ["a", "b", "c"] {
        assert!(ledger.contains(target));
    }
}

#[tokio::test]
async fn second_run_performs_no_additional_actions() {
    let mut site = site_with_source();
    let mut ledger = Ledger::open(temp_path());
    let list = targets(&["a", "b", "c"]);

    let mut runner = CrosspostRunner::new(
        &mut site,
        &mut ledger,
        ActionExecutor::new(),
        None::<&NoUpvotes>,
        options(),
    );
    let first = runner.run(SOURCE_URL, &list).await.unwrap();
    assert_eq!(first.succeeded, 3);

    let mut runner = CrosspostRunner::new(
        &mut site,
        &mut ledger,
        ActionExecutor::new(),
        None::<&NoUpvotes>,
        options(),
    );
    let second = runner.run(SOURCE_URL, &list).await.unwrap();

    assert_eq!(second.attempted, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(site.crossposts.len(), 3);
}

#[tokio::test]
async fn blacklisted_target_never_reaches_the_executor() {
    let mut site = site_with_source();
    let mut ledger = Ledger::open(temp_path());

    let mut crosspost_options = options();
    crosspost_options.blacklist = vec!["B".to_string()];

    let mut runner = CrosspostRunner::new(
        &mut site,
        &mut ledger,
        ActionExecutor::new(),
        None::<&NoUpvotes>,
        crosspost_options,
    );
    let summary = runner.run(SOURCE_URL, &targets(&["b"])).await.unwrap();

    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.skipped, 1);
    assert!(site.crossposts.is_empty());
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn closed_and_unreachable_targets_skip_without_recording() {
    let mut site = site_with_source();
    site.closed_targets = vec!["vault".to_string()];
    site.unreachable_targets = vec!["ghost".to_string()];
    let mut ledger = Ledger::open(temp_path());

    let mut runner = CrosspostRunner::new(
        &mut site,
        &mut ledger,
        ActionExecutor::new(),
        None::<&NoUpvotes>,
        options(),
    );
    let summary = runner.run(SOURCE_URL, &targets(&["vault", "ghost"])).await.unwrap();

    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.skipped, 2);
    assert!(site.crossposts.is_empty());
    // Neither is ledgered, so both are retried on a later run
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn metadata_probe_can_be_disabled() {
    let mut site = site_with_source();
    site.unreachable_targets = vec!["ghost".to_string()];
    let mut ledger = Ledger::open(temp_path());

    let mut crosspost_options = options();
    crosspost_options.check_target_metadata = false;

    let mut runner = CrosspostRunner::new(
        &mut site,
        &mut ledger,
        ActionExecutor::new(),
        None::<&NoUpvotes>,
        crosspost_options,
    );
    let summary = runner.run(SOURCE_URL, &targets(&["ghost"])).await.unwrap();

    // Without the probe the target goes straight to the executor
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.succeeded, 1);
}

#[tokio::test]
async fn flair_required_retries_once_with_first_flair() {
    let mut site = site_with_source();
    site.flair_required = vec!["needsflair".to_string()];
    site.flairs.insert(
        "needsflair".to_string(),
        vec![
            FlairChoice {
                id: "flair-1".to_string(),
                text: "Discussion".to_string(),
            },
            FlairChoice {
                id: "flair-2".to_string(),
                text: "News".to_string(),
            },
        ],
    );
    let mut ledger = Ledger::open(temp_path());

    let mut runner = CrosspostRunner::new(
        &mut site,
        &mut ledger,
        ActionExecutor::new(),
        None::<&NoUpvotes>,
        options(),
    );
    let summary = runner.run(SOURCE_URL, &targets(&["needsflair"])).await.unwrap();

    assert_eq!(summary.succeeded, 1);
    // One plain attempt plus exactly one retry with the first flair id
    assert_eq!(site.crosspost_calls, 2);
    assert_eq!(
        site.crossposts,
        vec![("needsflair".to_string(), Some("flair-1".to_string()))]
    );
    assert!(ledger.contains("needsflair"));
}

#[tokio::test]
async fn flair_required_without_flairs_is_skipped_not_failed() {
    let mut site = site_with_source();
    site.flair_required = vec!["noflair".to_string()];
    let mut ledger = Ledger::open(temp_path());

    let mut runner = CrosspostRunner::new(
        &mut site,
        &mut ledger,
        ActionExecutor::new(),
        None::<&NoUpvotes>,
        options(),
    );
    let summary = runner.run(SOURCE_URL, &targets(&["noflair"])).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(site.crosspost_calls, 1);
    assert!(site.crossposts.is_empty());
    assert!(!ledger.contains("noflair"));
}

#[tokio::test]
async fn upvote_failure_does_not_affect_ledger_or_flow() {
    let mut site = site_with_source();
    let mut ledger = Ledger::open(temp_path());
    let upvotes = FailingUpvotes {
        calls: AtomicU32::new(0),
    };

    let mut runner = CrosspostRunner::new(
        &mut site,
        &mut ledger,
        ActionExecutor::new(),
        Some(&upvotes),
        options(),
    );
    let summary = runner.run(SOURCE_URL, &targets(&["a", "b"])).await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(upvotes.calls.load(Ordering::SeqCst), 2);
    assert!(ledger.contains("a"));
    assert!(ledger.contains("b"));
}

#[tokio::test]
async fn old_and_low_score_posts_are_never_commented_on() {
    let mut site = FakeSite::default();
    site.posts.insert(
        "rust".to_string(),
        vec![
            post("old1", "rust", 48 * 3600, 50),
            post("low1", "rust", 3600, 0),
            post("good1", "rust", 3600, 5),
        ],
    );
    let mut posts_ledger = Ledger::open(temp_path());
    let mut urls_ledger = Ledger::open(temp_path());

    let mut runner = CommentRunner::new(
        &mut site,
        &mut posts_ledger,
        &mut urls_ledger,
        template_generator(),
        ActionExecutor::new(),
        policy(),
    );
    let summary = runner.run(&targets(&["rust"])).await.unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(site.replies, vec!["t3_good1".to_string()]);
    assert!(posts_ledger.contains("good1"));
    assert!(!posts_ledger.contains("old1"));
    assert!(!posts_ledger.contains("low1"));
}

#[tokio::test]
async fn daily_cap_stops_the_run_before_evaluating_further_posts() {
    let mut site = FakeSite::default();
    site.posts.insert(
        "rust".to_string(),
        (1..=5).map(|i| post(&format!("p{}", i), "rust", 3600, 5)).collect(),
    );
    let mut posts_ledger = Ledger::open(temp_path());
    let mut urls_ledger = Ledger::open(temp_path());

    let mut capped = policy();
    capped.max_daily_comments = 2;

    let mut runner = CommentRunner::new(
        &mut site,
        &mut posts_ledger,
        &mut urls_ledger,
        template_generator(),
        ActionExecutor::new(),
        capped,
    );
    let summary = runner.run(&targets(&["rust"])).await.unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 2);
    // Posts after the cap were never evaluated, so nothing else was skipped
    assert_eq!(summary.skipped, 0);
    assert_eq!(site.replies.len(), 2);
}

#[tokio::test]
async fn successful_comment_records_post_id_and_url() {
    let mut site = FakeSite::default();
    site.posts
        .insert("rust".to_string(), vec![post("good1", "rust", 3600, 5)]);
    let mut posts_ledger = Ledger::open(temp_path());
    let mut urls_ledger = Ledger::open(temp_path());

    let mut runner = CommentRunner::new(
        &mut site,
        &mut posts_ledger,
        &mut urls_ledger,
        template_generator(),
        ActionExecutor::new(),
        policy(),
    );
    runner.run(&targets(&["rust"])).await.unwrap();

    assert!(posts_ledger.contains("good1"));
    assert_eq!(urls_ledger.len(), 1);
}

#[tokio::test]
async fn ledgered_post_is_not_commented_again() {
    let mut site = FakeSite::default();
    site.posts
        .insert("rust".to_string(), vec![post("seen1", "rust", 3600, 5)]);
    let mut posts_ledger = Ledger::open(temp_path());
    posts_ledger.record("seen1");
    let mut urls_ledger = Ledger::open(temp_path());

    let mut runner = CommentRunner::new(
        &mut site,
        &mut posts_ledger,
        &mut urls_ledger,
        template_generator(),
        ActionExecutor::new(),
        policy(),
    );
    let summary = runner.run(&targets(&["rust"])).await.unwrap();

    assert_eq!(summary.attempted, 0);
    assert!(site.replies.is_empty());
}

#[tokio::test]
async fn forbidden_reply_is_failed_and_not_recorded() {
    let mut site = FakeSite::default();
    site.reply_forbidden = true;
    site.posts
        .insert("rust".to_string(), vec![post("good1", "rust", 3600, 5)]);
    let mut posts_ledger = Ledger::open(temp_path());
    let mut urls_ledger = Ledger::open(temp_path());

    let mut runner = CommentRunner::new(
        &mut site,
        &mut posts_ledger,
        &mut urls_ledger,
        template_generator(),
        ActionExecutor::new(),
        policy(),
    );
    let summary = runner.run(&targets(&["rust"])).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert!(posts_ledger.is_empty());
    assert!(urls_ledger.is_empty());
}

#[tokio::test]
async fn blacklisted_subreddit_is_not_visited() {
    let mut site = FakeSite::default();
    site.posts
        .insert("funny".to_string(), vec![post("f1", "funny", 3600, 5)]);
    let mut posts_ledger = Ledger::open(temp_path());
    let mut urls_ledger = Ledger::open(temp_path());

    let mut comment_policy = policy();
    comment_policy.blacklist = vec!["FUNNY".to_string()];

    let mut runner = CommentRunner::new(
        &mut site,
        &mut posts_ledger,
        &mut urls_ledger,
        template_generator(),
        ActionExecutor::new(),
        comment_policy,
    );
    let summary = runner.run(&targets(&["funny"])).await.unwrap();

    assert_eq!(summary.attempted, 0);
    assert!(site.replies.is_empty());
}

#[tokio::test]
async fn remote_history_check_skips_posts_already_commented_by_us() {
    let mut site = FakeSite::default();
    site.username = "botuser".to_string();
    site.posts.insert(
        "rust".to_string(),
        vec![post("mine1", "rust", 3600, 5), post("fresh1", "rust", 3600, 5)],
    );
    site.existing_commenters
        .insert("mine1".to_string(), vec!["botuser".to_string()]);
    let mut posts_ledger = Ledger::open(temp_path());
    let mut urls_ledger = Ledger::open(temp_path());

    let mut verifying = policy();
    verifying.verify_remote_history = true;

    let mut runner = CommentRunner::new(
        &mut site,
        &mut posts_ledger,
        &mut urls_ledger,
        template_generator(),
        ActionExecutor::new(),
        verifying,
    );
    let summary = runner.run(&targets(&["rust"])).await.unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(site.replies, vec!["t3_fresh1".to_string()]);
    assert!(!posts_ledger.contains("mine1"));
}
