//! rebasebot - run individual bot operations from the command line
//!
//! Each subcommand maps onto one operation of the library, using the
//! configuration read from the environment at startup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use rebasebot::Config;
use rebasebot::git::{self, GitClient};
use rebasebot::github::GitHubClient;

/// rebasebot - keep branches rebased and answer mentions
#[derive(Parser, Debug)]
#[command(name = "rebasebot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone a repository under the configured root and print its path
    Clone {
        /// Clone URL, or `owner/name` when --full-name is given
        repository: String,

        /// Treat the argument as `owner/name` and build an authenticated URL
        #[arg(long)]
        full_name: bool,
    },
    /// Fetch from origin
    Fetch { path: PathBuf },
    /// Check out a ref
    Checkout { path: PathBuf, git_ref: String },
    /// Hard reset to a branch or commit
    Reset { path: PathBuf, target: String },
    /// Rebase the current branch onto a base branch (aborts on failure)
    Rebase { path: PathBuf, base_branch: String },
    /// Prune stale remote-tracking branches of origin
    Prune { path: PathBuf },
    /// Force-push a branch to origin
    Push { path: PathBuf, branch: String },
    /// Set a local git config value
    Config {
        path: PathBuf,
        key: String,
        value: String,
    },
    /// Write the configured author name and email into a working copy
    Identity { path: PathBuf },
    /// Print where a repository lives under the clone root
    Path { name: String },
    /// Fetch comments from an API path and print the ones mentioning the bot
    Mentions {
        /// API path, e.g. /repos/acme/widgets/issues/7/comments
        api_path: String,
    },
    /// Print the current configuration (secrets redacted)
    ShowConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install()?;

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Config::from_env();

    run(&config, args.command)
}

fn run(config: &Config, command: Commands) -> Result<()> {
    let client = GitClient::new(config);

    match command {
        Commands::Clone {
            repository,
            full_name,
        } => {
            let url = if full_name {
                config.clone_url(&repository)
            } else {
                repository
            };
            let path = client.clone_repository(&url)?;
            println!("{}", path.display());
        }
        Commands::Fetch { path } => client.fetch(&path)?,
        Commands::Checkout { path, git_ref } => client.checkout(&path, &git_ref)?,
        Commands::Reset { path, target } => client.reset(&path, &target)?,
        Commands::Rebase { path, base_branch } => client.rebase(&path, &base_branch)?,
        Commands::Prune { path } => client.prune(&path)?,
        Commands::Push { path, branch } => client.push(&path, &branch)?,
        Commands::Config { path, key, value } => client.config(&path, &key, &value)?,
        Commands::Identity { path } => {
            client.configure_identity(&path)?;
            println!("{} <{}>", config.git_name, config.git_email);
        }
        Commands::Path { name } => {
            let path = config.repository_path(&name);
            let state = if git::exists(&path) { "exists" } else { "missing" };
            println!("{} ({})", path.display(), state);
        }
        Commands::Mentions { api_path } => {
            let github = GitHubClient::new(config)?;
            let comments = github
                .fetch_comments(&api_path)
                .with_context(|| format!("Failed to fetch comments from {}", api_path))?;

            for comment in comments.iter().filter(|c| github.was_mentioned(c)) {
                println!(
                    "{}\t{}\t{}",
                    comment.id.map(|id| id.to_string()).unwrap_or_default(),
                    comment.author().unwrap_or("-"),
                    comment.html_url.as_deref().unwrap_or("-"),
                );
            }
        }
        Commands::ShowConfig => {
            let json = serde_json::to_string_pretty(config)
                .with_context(|| "Failed to serialize config")?;
            println!("{}", json);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_rebase() {
        let args = Args::parse_from(["rebasebot", "rebase", "/tmp/acme/widgets", "main"]);
        match args.command {
            Commands::Rebase { path, base_branch } => {
                assert_eq!(path, PathBuf::from("/tmp/acme/widgets"));
                assert_eq!(base_branch, "main");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_clone_full_name() {
        let args = Args::parse_from(["rebasebot", "--debug", "clone", "--full-name", "acme/widgets"]);
        assert!(args.debug);
        assert!(matches!(
            args.command,
            Commands::Clone { full_name: true, .. }
        ));
    }
}
