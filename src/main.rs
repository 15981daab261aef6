mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use echopost_core::{BotConfig, ConfigError, GeneratorKind};
use ledger::Ledger;
use llm_interface::OpenRouterClient;
use orchestrator::{
    ActionExecutor, CommentGenerator, CommentPolicy, CommentRunner, CrosspostOptions,
    CrosspostRunner, GenerativeCommenter, HttpUpvoteService, TemplateGenerator,
};
use reddit_client::RedditSession;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
            |_| {
                tracing_subscriber::EnvFilter::new(
                    "echopost=info,orchestrator=info,reddit_client=info,ledger=info",
                )
            },
        ))
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting echopost");

    let config = BotConfig::load(&cli.config).context("loading configuration")?;
    let accounts = echopost_core::load_accounts(&cli.accounts).context("loading accounts")?;

    let account = accounts[fastrand::usize(..accounts.len())].clone();
    tracing::info!("Using account u/{}", account.username);

    let mut session = RedditSession::new(&account)?;

    match cli.command {
        Command::Crosspost { source_url } => {
            run_crosspost(&mut session, &config, source_url).await?
        }
        Command::Comment => run_comment(&mut session, &config).await?,
    }

    Ok(())
}

async fn run_crosspost(
    session: &mut RedditSession,
    config: &BotConfig,
    source_override: Option<String>,
) -> anyhow::Result<()> {
    let source_url = source_override
        .or_else(|| config.source_post_url.clone())
        .ok_or(ConfigError::MissingField {
            field: "source_post_url".to_string(),
        })?;
    if config.crosspost_subreddits.is_empty() {
        anyhow::bail!("crosspost_subreddits is empty, nothing to do");
    }

    let upvotes = match &config.upvotes {
        Some(upvote_config) => HttpUpvoteService::from_config(upvote_config)?,
        None => None,
    };

    let mut ledger = Ledger::open(&config.crossposted_file);
    let options = CrosspostOptions {
        check_target_metadata: config.check_target_metadata,
        delay: Duration::from_secs(config.crosspost_delay_secs),
        blacklist: config.blacklist.clone(),
    };

    let mut runner = CrosspostRunner::new(
        session,
        &mut ledger,
        ActionExecutor::new(),
        upvotes.as_ref(),
        options,
    );
    let summary = runner
        .run(&source_url, &config.crosspost_subreddits)
        .await?;

    tracing::info!(
        "Crosspost run: {} attempted, {} succeeded, {} skipped, {} failed",
        summary.attempted,
        summary.succeeded,
        summary.skipped,
        summary.failed
    );
    Ok(())
}

async fn run_comment(session: &mut RedditSession, config: &BotConfig) -> anyhow::Result<()> {
    if config.comment_subreddits.is_empty() {
        anyhow::bail!("comment_subreddits is empty, nothing to do");
    }

    let generator = match config.generator {
        GeneratorKind::Template => {
            CommentGenerator::Template(TemplateGenerator::new(config.comment_templates.clone()))
        }
        GeneratorKind::Generative => {
            let openrouter = config
                .openrouter
                .clone()
                .ok_or(ConfigError::MissingField {
                    field: "openrouter".to_string(),
                })?;
            let client = OpenRouterClient::new(openrouter)?;
            CommentGenerator::Generative(GenerativeCommenter::new(
                client,
                config.comment_prompt.clone(),
                config.style_instructions.clone(),
            ))
        }
    };

    let mut posts_ledger = Ledger::open(&config.commented_posts_file);
    let mut urls_ledger = Ledger::open(&config.comment_urls_file);
    let policy = CommentPolicy {
        max_daily_comments: config.max_daily_comments,
        interval: Duration::from_secs(config.comment_interval_secs),
        max_post_age_hours: config.max_post_age_hours,
        min_post_score: config.min_post_score,
        posts_per_subreddit: config.posts_per_subreddit,
        blacklist: config.blacklist.clone(),
        verify_remote_history: config.verify_remote_history,
    };

    let mut runner = CommentRunner::new(
        session,
        &mut posts_ledger,
        &mut urls_ledger,
        generator,
        ActionExecutor::new(),
        policy,
    );
    let summary = runner.run(&config.comment_subreddits).await?;

    tracing::info!(
        "Comment run: {} attempted, {} succeeded, {} skipped, {} failed",
        summary.attempted,
        summary.succeeded,
        summary.skipped,
        summary.failed
    );
    Ok(())
}
