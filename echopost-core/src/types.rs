use serde::{Deserialize, Serialize};

/// Credential bundle for one Reddit script-type app.
///
/// Loaded once per run from the accounts file, never mutated, never
/// persisted back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditAccount {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl RedditAccount {
    /// The user agent to send, deriving one from the username when the
    /// account record does not carry its own.
    pub fn resolved_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("rust:echopost:v0.1 (by /u/{})", self.username))
    }
}

/// A submission under consideration by one of the loops. Transient: fetched
/// per run, only its id may end up in a ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePost {
    pub id: String,
    pub title: String,
    pub body: Option<String>,
    pub subreddit: String,
    pub permalink: String,
    pub created_utc: i64,
    pub score: i64,
}

impl CandidatePost {
    /// Reddit fullname of the submission (`t3_` kind prefix).
    pub fn fullname(&self) -> String {
        format!("t3_{}", self.id)
    }
}

/// Metadata probe result for a target subreddit.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetInfo {
    pub display_name: String,
    pub community_type: String,
    pub over_18: bool,
}

impl TargetInfo {
    /// A target the crosspost loop is willing to submit to.
    pub fn is_open(&self) -> bool {
        self.community_type == "public" && !self.over_18
    }
}

/// One selectable link flair of a target subreddit.
#[derive(Debug, Clone, PartialEq)]
pub struct FlairChoice {
    pub id: String,
    pub text: String,
}

/// Outcome of one attempted external action, consumed by the loops to
/// decide ledger updates and logging.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Success { url: Option<String> },
    Skipped(SkipReason),
    Failed(FailureKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    AlreadyActedOn,
    Blacklisted,
    TooOld,
    BelowScoreThreshold,
    TargetNotOpen,
    TargetUnreachable,
    NoFlairAvailable,
    NoCommentProduced,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    Permanent(String),
    Transient(String),
    Unknown(String),
}
