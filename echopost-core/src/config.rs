use crate::error::ConfigError;
use crate::types::RedditAccount;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Which comment text strategy the comment loop uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    #[default]
    Template,
    Generative,
}

/// Process-wide configuration, constructed once at startup and passed to
/// each component. Every field has an explicit default so a partial config
/// file is usable; validation runs at load time.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    // Comment limits
    #[serde(default = "defaults::max_daily_comments")]
    pub max_daily_comments: u32,
    #[serde(default = "defaults::comment_interval_secs")]
    pub comment_interval_secs: u64,

    // Eligibility thresholds
    #[serde(default = "defaults::max_post_age_hours")]
    pub max_post_age_hours: i64,
    #[serde(default = "defaults::min_post_score")]
    pub min_post_score: i64,
    #[serde(default = "defaults::posts_per_subreddit")]
    pub posts_per_subreddit: u32,

    // Communities
    #[serde(default)]
    pub comment_subreddits: Vec<String>,
    #[serde(default)]
    pub crosspost_subreddits: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,

    // Comment content
    #[serde(default = "defaults::comment_templates")]
    pub comment_templates: Vec<String>,
    #[serde(default = "defaults::comment_prompt")]
    pub comment_prompt: String,
    #[serde(default = "defaults::style_instructions")]
    pub style_instructions: String,
    #[serde(default)]
    pub generator: GeneratorKind,
    pub openrouter: Option<OpenRouterConfig>,

    // Crosspost flow
    pub source_post_url: Option<String>,
    #[serde(default = "defaults::check_target_metadata")]
    pub check_target_metadata: bool,
    #[serde(default = "defaults::crosspost_delay_secs")]
    pub crosspost_delay_secs: u64,
    pub upvotes: Option<UpvoteConfig>,

    // Dedup ledgers
    #[serde(default)]
    pub verify_remote_history: bool,
    #[serde(default = "defaults::crossposted_file")]
    pub crossposted_file: String,
    #[serde(default = "defaults::commented_posts_file")]
    pub commented_posts_file: String,
    #[serde(default = "defaults::comment_urls_file")]
    pub comment_urls_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default = "defaults::openrouter_base_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "defaults::openrouter_model")]
    pub model: String,
    #[serde(default = "defaults::max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "defaults::temperature")]
    pub temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpvoteConfig {
    #[serde(default)]
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "defaults::upvote_quantity")]
    pub quantity: u32,
}

mod defaults {
    pub(super) fn max_daily_comments() -> u32 {
        50
    }

    pub(super) fn comment_interval_secs() -> u64 {
        600
    }

    pub(super) fn max_post_age_hours() -> i64 {
        24
    }

    pub(super) fn min_post_score() -> i64 {
        1
    }

    pub(super) fn posts_per_subreddit() -> u32 {
        10
    }

    pub(super) fn comment_templates() -> Vec<String> {
        vec![
            "Great post! I found this very interesting because {post_title}.".to_string(),
            "Thanks for sharing! This {post_title} is exactly what I've been looking for."
                .to_string(),
            "I really appreciate this content about {post_title}. Very informative!".to_string(),
        ]
    }

    pub(super) fn comment_prompt() -> String {
        "Write a short, helpful comment replying to this post. Stay on topic and \
         add something useful for the original poster."
            .to_string()
    }

    pub(super) fn style_instructions() -> String {
        "You are a regular forum user replying to a post. Keep the reply casual and \
         conversational, two to four sentences, no headings or bullet points."
            .to_string()
    }

    pub(super) fn check_target_metadata() -> bool {
        true
    }

    pub(super) fn crosspost_delay_secs() -> u64 {
        30
    }

    pub(super) fn crossposted_file() -> String {
        "crossposted_subreddits.json".to_string()
    }

    pub(super) fn commented_posts_file() -> String {
        "commented_posts.json".to_string()
    }

    pub(super) fn comment_urls_file() -> String {
        "comment_urls.json".to_string()
    }

    pub(super) fn openrouter_base_url() -> String {
        "https://openrouter.ai/api/v1".to_string()
    }

    pub(super) fn openrouter_model() -> String {
        "anthropic/claude-3-haiku".to_string()
    }

    pub(super) fn max_tokens() -> u32 {
        800
    }

    pub(super) fn temperature() -> f64 {
        0.8
    }

    pub(super) fn upvote_quantity() -> u32 {
        10
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            max_daily_comments: defaults::max_daily_comments(),
            comment_interval_secs: defaults::comment_interval_secs(),
            max_post_age_hours: defaults::max_post_age_hours(),
            min_post_score: defaults::min_post_score(),
            posts_per_subreddit: defaults::posts_per_subreddit(),
            comment_subreddits: Vec::new(),
            crosspost_subreddits: Vec::new(),
            blacklist: Vec::new(),
            comment_templates: defaults::comment_templates(),
            comment_prompt: defaults::comment_prompt(),
            style_instructions: defaults::style_instructions(),
            generator: GeneratorKind::default(),
            openrouter: None,
            source_post_url: None,
            check_target_metadata: defaults::check_target_metadata(),
            crosspost_delay_secs: defaults::crosspost_delay_secs(),
            upvotes: None,
            verify_remote_history: false,
            crossposted_file: defaults::crossposted_file(),
            commented_posts_file: defaults::commented_posts_file(),
            comment_urls_file: defaults::comment_urls_file(),
        }
    }
}

impl BotConfig {
    /// Load the configuration from a TOML file, falling back to defaults
    /// when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::InvalidFormat {
            details: format!("failed to read {}: {}", path.display(), e),
        })?;
        let config: BotConfig = toml::from_str(&contents)?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_daily_comments == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_daily_comments".to_string(),
                value: "0".to_string(),
            });
        }
        if self.comment_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "comment_interval_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.generator == GeneratorKind::Template && self.comment_templates.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "template generator selected but comment_templates is empty".to_string(),
            });
        }
        if self.generator == GeneratorKind::Generative {
            match &self.openrouter {
                None => {
                    return Err(ConfigError::MissingField {
                        field: "openrouter".to_string(),
                    })
                }
                Some(or) if or.api_key.trim().is_empty() => {
                    return Err(ConfigError::InvalidValue {
                        field: "openrouter.api_key".to_string(),
                        value: "<empty>".to_string(),
                    })
                }
                Some(_) => {}
            }
        }
        if let Some(upvotes) = &self.upvotes {
            if upvotes.enabled && upvotes.endpoint.is_none() {
                return Err(ConfigError::MissingField {
                    field: "upvotes.endpoint".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Load the account list. A missing file is fatal: without credentials
/// there is no possible action.
pub fn load_accounts(path: &Path) -> Result<Vec<RedditAccount>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = fs::read_to_string(path).map_err(|e| ConfigError::InvalidFormat {
        details: format!("failed to read {}: {}", path.display(), e),
    })?;
    let accounts: Vec<RedditAccount> =
        serde_json::from_str(&contents).map_err(|e| ConfigError::InvalidFormat {
            details: format!("failed to parse {}: {}", path.display(), e),
        })?;

    if accounts.is_empty() {
        return Err(ConfigError::ValidationFailed {
            reason: format!("no accounts in {}", path.display()),
        });
    }

    info!("Loaded {} accounts", accounts.len());
    Ok(accounts)
}
