use echopost_core::{CandidatePost, SkipReason};
use ledger::Ledger;

/// Case-insensitive membership test against the configured blacklist.
pub fn is_blacklisted(name: &str, blacklist: &[String]) -> bool {
    blacklist.iter().any(|b| b.eq_ignore_ascii_case(name))
}

pub fn is_too_old(created_utc: i64, now: i64, max_age_hours: i64) -> bool {
    now - created_utc > max_age_hours * 3600
}

pub fn meets_score_threshold(score: i64, min_score: i64) -> bool {
    score >= min_score
}

/// First reason a post is ineligible for commenting, cheapest check first,
/// or `None` when it passes all of them.
pub fn comment_skip_reason(
    post: &CandidatePost,
    ledger: &Ledger,
    now: i64,
    max_age_hours: i64,
    min_score: i64,
) -> Option<SkipReason> {
    if ledger.contains(&post.id) {
        return Some(SkipReason::AlreadyActedOn);
    }
    if is_too_old(post.created_utc, now, max_age_hours) {
        return Some(SkipReason::TooOld);
    }
    if !meets_score_threshold(post.score, min_score) {
        return Some(SkipReason::BelowScoreThreshold);
    }
    None
}
