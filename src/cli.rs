use crate::error::InsightsError;
use crate::github::client::{DEFAULT_API_URL, DEFAULT_MAX_RETRIES};
use crate::insights::DEFAULT_TOP_FILES;
use crate::model::DateWindow;
use crate::util::is_repo_slug;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gitlog-insights")]
#[command(about = "Commit-history and pull-request analytics rendered as HTML reports")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Start date, inclusive (YYYY-MM-DD)")]
    pub since: Option<String>,

    #[arg(long, global = true, help = "End date, inclusive (YYYY-MM-DD)")]
    pub until: Option<String>,

    #[arg(long, global = true, help = "HTML report path (defaults to <insight>_report.html)")]
    pub output: Option<PathBuf>,

    #[arg(long, global = true, help = "Print the result as JSON instead of a table")]
    pub json: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "More log output (-v info, -vv debug)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Only log errors")]
    pub quiet: bool,
}

impl CommonArgs {
    pub fn window(&self) -> crate::error::Result<DateWindow> {
        match (self.since.as_deref(), self.until.as_deref()) {
            (Some(since), Some(until)) => DateWindow::parse(since, until),
            _ => Err(InsightsError::InvalidInput(
                "both --since and --until are required".to_string(),
            )),
        }
    }

    pub fn output_or(&self, default_name: &str) -> PathBuf {
        self.output.clone().unwrap_or_else(|| PathBuf::from(default_name))
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Where to read history from.
#[derive(Args, Clone, Debug)]
pub struct RepoArgs {
    #[arg(help = "Local path or clone URL of the repository")]
    pub repo: String,

    #[arg(long, default_value_t = 10, help = "Network timeout in seconds when cloning a remote")]
    pub timeout: u64,
}

impl RepoArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }
}

/// Connection settings for the code-review platform.
#[derive(Args, Clone, Debug)]
pub struct ApiArgs {
    #[arg(help = "Repository as owner/name")]
    pub repo: String,

    #[arg(long, env = "GITLOG_INSIGHTS_API_URL", default_value = DEFAULT_API_URL, help = "API base URL")]
    pub api_url: String,

    #[arg(long, default_value_t = 10, help = "Per-request timeout in seconds")]
    pub timeout: u64,

    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, help = "Retries after a rate-limited response")]
    pub retries: u32,
}

impl ApiArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    fn validate(&self) -> crate::error::Result<()> {
        if !is_repo_slug(&self.repo) {
            return Err(InsightsError::InvalidInput(format!(
                "'{}' is not an owner/name repository",
                self.repo
            )));
        }
        Ok(())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authorship concentration per file, measured as entropy.
    AuthorBias {
        #[clap(flatten)]
        source: RepoArgs,

        #[arg(long, help = "Branch to walk (defaults to HEAD)")]
        branch: Option<String>,
    },
    /// The most frequently modified files.
    TopFiles {
        #[clap(flatten)]
        source: RepoArgs,

        #[arg(long, default_value = "main", help = "Branch to walk")]
        branch: String,

        #[arg(long, help = "Only count files with this extension, e.g. .rs (or 'all')")]
        ext: Option<String>,

        #[arg(long, default_value_t = DEFAULT_TOP_FILES, help = "Number of files to report")]
        limit: usize,
    },
    /// Pull request sizes derived from commits that mention #<number>.
    CommitPrSize {
        #[clap(flatten)]
        source: RepoArgs,

        #[arg(long, help = "Branch to walk (defaults to HEAD)")]
        branch: Option<String>,
    },
    /// Time from opening to closing for pull requests merged in the window.
    ReviewTime {
        #[clap(flatten)]
        api: ApiArgs,
    },
    /// Pull request sizes from the platform's file listings.
    PrSize {
        #[clap(flatten)]
        api: ApiArgs,
    },
    /// Merges per weekday and month.
    MergeActivity {
        #[clap(flatten)]
        api: ApiArgs,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        let window = self.common.window()?;
        match self.command {
            Commands::AuthorBias { source, branch } => {
                crate::exec::author_bias(&self.common, window, &source, branch.as_deref())
            }
            Commands::TopFiles { source, branch, ext, limit } => {
                crate::exec::top_files(&self.common, window, &source, &branch, ext.as_deref(), limit)
            }
            Commands::CommitPrSize { source, branch } => {
                crate::exec::commit_pr_size(&self.common, window, &source, branch.as_deref())
            }
            Commands::ReviewTime { api } => {
                api.validate()?;
                crate::exec::review_time(&self.common, window, &api)
            }
            Commands::PrSize { api } => {
                api.validate()?;
                crate::exec::pr_size(&self.common, window, &api)
            }
            Commands::MergeActivity { api } => {
                api.validate()?;
                crate::exec::merge_activity(&self.common, window, &api)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("gitlog-insights").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["top-files", "repo", "--since", "2023-01-01", "--until", "2023-02-01", "--json"]);
        assert!(cli.common.json);
        assert!(cli.common.window().is_ok());
        match cli.command {
            Commands::TopFiles { source, branch, limit, .. } => {
                assert_eq!(source.repo, "repo");
                assert_eq!(source.timeout(), Duration::from_secs(10));
                assert_eq!(branch, "main");
                assert_eq!(limit, DEFAULT_TOP_FILES);
            }
            _ => panic!("expected top-files"),
        }
    }

    #[test]
    fn clone_timeout_is_configurable() {
        let cli = parse(&["author-bias", "https://example.com/r.git", "--timeout", "3"]);
        match cli.command {
            Commands::AuthorBias { source, .. } => assert_eq!(source.timeout(), Duration::from_secs(3)),
            _ => panic!("expected author-bias"),
        }
    }

    #[test]
    fn missing_dates_are_rejected() {
        let cli = parse(&["author-bias", "repo", "--since", "2023-01-01"]);
        assert!(cli.common.window().is_err());
    }

    #[test]
    fn api_repo_must_be_a_slug() {
        let cli = parse(&["review-time", "not-a-slug", "--api-url", "http://localhost:1"]);
        match cli.command {
            Commands::ReviewTime { api } => {
                assert!(api.validate().is_err());
                assert_eq!(api.retries, DEFAULT_MAX_RETRIES);
            }
            _ => panic!("expected review-time"),
        }
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(parse(&["author-bias", "r"]).common.log_level(), log::LevelFilter::Warn);
        assert_eq!(parse(&["-vv", "author-bias", "r"]).common.log_level(), log::LevelFilter::Debug);
        assert_eq!(parse(&["author-bias", "r", "-q"]).common.log_level(), log::LevelFilter::Error);
    }
}
