use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "echopost",
    about = "Reddit crosspost and comment automation",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "echopost.toml")]
    pub config: PathBuf,

    /// Path to the accounts file
    #[arg(long, global = true, default_value = "accounts.json")]
    pub accounts: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Crosspost the configured source submission into the target list
    Crosspost {
        /// Source post URL, overriding the configured one
        #[arg(long)]
        source_url: Option<String>,
    },
    /// Comment on newly discovered posts in the target subreddits
    Comment,
}
