pub mod commenter;
pub mod content;
pub mod crosspost;
pub mod eligibility;
pub mod executor;
pub mod site;
pub mod upvotes;

pub use commenter::{CommentPolicy, CommentRunner};
pub use content::{CommentGenerator, GenerativeCommenter, TemplateGenerator};
pub use crosspost::{CrosspostOptions, CrosspostRunner};
pub use executor::ActionExecutor;
pub use site::SocialSite;
pub use upvotes::{HttpUpvoteService, UpvoteService};

/// Per-run outcome counters, logged at the end of each loop.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub attempted: u32,
    pub succeeded: u32,
    pub skipped: u32,
    pub failed: u32,
}
