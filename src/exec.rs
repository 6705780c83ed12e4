use crate::cli::{ApiArgs, CommonArgs, RepoArgs};
use crate::git::GitRepo;
use crate::github::{ApiClient, ClientConfig, PullRequestExtractor};
use crate::insights;
use crate::model::{CommitRecord, DateWindow};
use crate::report::{print_json, print_table, write_html, Report, EMPTY_PLACEHOLDER};
use crate::util::extension_filter;
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

const TABLE_ROWS: usize = 20;

pub fn author_bias(common: &CommonArgs, window: DateWindow, source: &RepoArgs, branch: Option<&str>) -> anyhow::Result<()> {
    let commits = mine_commits(common, window, source, branch)?;
    let report = insights::author_bias(&commits);
    emit(common, &report, "author_bias_report.html")
}

pub fn top_files(
    common: &CommonArgs,
    window: DateWindow,
    source: &RepoArgs,
    branch: &str,
    ext: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let extension = extension_filter(ext);
    let commits = mine_commits(common, window, source, Some(branch))?;
    let report = insights::top_touched_files(&commits, extension.as_deref(), limit);
    emit(common, &report, "top_files_report.html")
}

pub fn commit_pr_size(common: &CommonArgs, window: DateWindow, source: &RepoArgs, branch: Option<&str>) -> anyhow::Result<()> {
    let commits = mine_commits(common, window, source, branch)?;
    let report = insights::commit_pr_sizes(&commits);
    emit(common, &report, "commit_pr_size_report.html")
}

pub fn review_time(common: &CommonArgs, window: DateWindow, api: &ApiArgs) -> anyhow::Result<()> {
    let extractor = extractor(api)?;
    let pulls = with_spinner(common, "Fetching merged pull requests...", || {
        extractor.merged_pull_requests(&window)
    })
    .context("Failed to fetch merged pull requests")?;
    let report = insights::review_times(&pulls);
    emit(common, &report, "review_time_report.html")
}

pub fn pr_size(common: &CommonArgs, window: DateWindow, api: &ApiArgs) -> anyhow::Result<()> {
    let extractor = extractor(api)?;
    let files = with_spinner(common, "Fetching pull request files...", || extractor.files_in_window(&window))
        .context("Failed to fetch pull request files")?;
    let report = insights::pr_sizes(&files);
    emit(common, &report, "pr_size_report.html")
}

pub fn merge_activity(common: &CommonArgs, window: DateWindow, api: &ApiArgs) -> anyhow::Result<()> {
    let extractor = extractor(api)?;
    let pulls = with_spinner(common, "Fetching merged pull requests...", || {
        extractor.merged_pull_requests(&window)
    })
    .context("Failed to fetch merged pull requests")?;
    let report = insights::merge_activity(&pulls);
    emit(common, &report, "merge_activity_report.html")
}

fn mine_commits(
    common: &CommonArgs,
    window: DateWindow,
    source: &RepoArgs,
    branch: Option<&str>,
) -> anyhow::Result<Vec<CommitRecord>> {
    let repo = GitRepo::open_with_timeout(&source.repo, source.timeout()).context("Failed to open git repository")?;
    log::info!("walking {} for {window}", repo.location());
    let commits = with_spinner(common, "Collecting commits...", || {
        repo.commits(window, branch)?.collect::<Result<Vec<_>, _>>()
    })
    .context("Failed to collect commits")?;
    log::info!("collected {} commits", commits.len());
    Ok(commits)
}

fn extractor(api: &ApiArgs) -> anyhow::Result<PullRequestExtractor> {
    let config = ClientConfig::from_env()?
        .with_base_url(api.api_url.as_str())
        .with_timeout(api.timeout())
        .with_max_retries(api.retries);
    let client = ApiClient::new(config).context("Failed to build HTTP client")?;
    Ok(PullRequestExtractor::new(client, api.repo.as_str()))
}

/// Runs `work` under a spinner on stderr. JSON and quiet runs stay silent.
fn with_spinner<T, F>(common: &CommonArgs, message: &'static str, work: F) -> T
where
    F: FnOnce() -> T,
{
    let pb = if common.json || common.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    let result = work();
    pb.finish_and_clear();
    result
}

fn emit<R>(common: &CommonArgs, report: &R, default_name: &str) -> anyhow::Result<()>
where
    R: Report + Serialize,
{
    let path = common.output_or(default_name);
    write_html(&path, report)?;

    if common.json {
        // stdout carries only JSON; the table view prints the placeholder itself.
        if report.table().is_empty() && !common.quiet {
            eprintln!("{EMPTY_PLACEHOLDER}");
        }
        print_json(report)?;
    } else {
        print_table(report, TABLE_ROWS);
        eprintln!("Report written to {}", path.display());
    }
    Ok(())
}
