use crate::error::ExtractionError;
use crate::github::client::ApiClient;
use crate::model::{DateWindow, FileChangeRecord, PrStatus, PullRequestRecord};
use chrono::{DateTime, Utc};
use serde::Deserialize;

type Result<T> = std::result::Result<T, ExtractionError>;

const PER_PAGE: usize = 100;
/// The search endpoint never returns more than this many results.
const SEARCH_RESULT_CAP: usize = 1000;
/// The pull request files endpoint lists at most this many files.
const FILES_CAP: usize = 3000;

#[derive(Debug, Deserialize)]
struct SearchPage {
    total_count: u64,
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    number: u64,
    title: String,
    user: SearchUser,
    state: String,
    created_at: Option<String>,
    closed_at: Option<String>,
    pull_request: Option<PullRequestLinks>,
}

#[derive(Debug, Deserialize)]
struct SearchUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestLinks {
    merged_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    filename: String,
    status: String,
    additions: u64,
    deletions: u64,
    changes: u64,
}

/// Pull request queries against one `owner/name` repository.
pub struct PullRequestExtractor {
    client: ApiClient,
    repo: String,
}

impl PullRequestExtractor {
    pub fn new(client: ApiClient, repo: impl Into<String>) -> Self {
        Self {
            client,
            repo: repo.into(),
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn created_query(&self, window: &DateWindow) -> String {
        format!("is:pr repo:{} created:{}", self.repo, window.query_range())
    }

    pub fn merged_query(&self, window: &DateWindow) -> String {
        format!("is:pr is:merged repo:{} merged:{}", self.repo, window.query_range())
    }

    /// Pull requests created inside `window`.
    pub fn pull_requests(&self, window: &DateWindow) -> Result<Vec<PullRequestRecord>> {
        self.search(&self.created_query(window))
    }

    /// Pull requests merged inside `window`.
    pub fn merged_pull_requests(&self, window: &DateWindow) -> Result<Vec<PullRequestRecord>> {
        self.search(&self.merged_query(window))
    }

    pub fn search(&self, query: &str) -> Result<Vec<PullRequestRecord>> {
        let url = format!("{}/search/issues", self.client.base_url());
        let mut records = Vec::new();
        let mut page = 1usize;

        loop {
            let result: SearchPage = self.client.get_json(
                "/search/issues",
                &[
                    ("q", query.to_string()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ],
            )?;

            let fetched = result.items.len();
            for item in result.items {
                records.push(to_record(item, &url)?);
            }
            log::debug!(
                "search page {page}: {fetched} items ({} of {})",
                records.len(),
                result.total_count
            );

            if fetched < PER_PAGE
                || records.len() as u64 >= result.total_count
                || records.len() >= SEARCH_RESULT_CAP
            {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    pub fn files_for(&self, pr_number: u64) -> Result<Vec<FileChangeRecord>> {
        let path = format!("/repos/{}/pulls/{pr_number}/files", self.repo);
        let mut files = Vec::new();
        let mut page = 1usize;

        loop {
            let entries: Vec<FileEntry> = self.client.get_json(
                &path,
                &[("per_page", PER_PAGE.to_string()), ("page", page.to_string())],
            )?;
            let fetched = entries.len();
            files.extend(entries.into_iter().map(|entry| FileChangeRecord {
                filename: entry.filename,
                status: entry.status,
                additions: entry.additions,
                deletions: entry.deletions,
                changes: entry.changes,
                pr_number,
            }));

            if fetched < PER_PAGE || files.len() >= FILES_CAP {
                break;
            }
            page += 1;
        }

        Ok(files)
    }

    /// Search, then one files request per matching pull request.
    pub fn files_in_window(&self, window: &DateWindow) -> Result<Vec<FileChangeRecord>> {
        let pulls = self.pull_requests(window)?;
        let mut files = Vec::new();
        for pr in &pulls {
            files.extend(self.files_for(pr.number)?);
        }
        Ok(files)
    }
}

fn to_record(item: SearchItem, url: &str) -> Result<PullRequestRecord> {
    let status = match item.state.as_str() {
        "open" => PrStatus::Open,
        "closed" => PrStatus::Closed,
        other => {
            return Err(ExtractionError::malformed(
                url,
                format!("pull request #{} has unknown state '{other}'", item.number),
            ))
        }
    };

    let closed_at = match status {
        PrStatus::Open => None,
        PrStatus::Closed => {
            let raw = item.closed_at.as_deref().ok_or_else(|| {
                ExtractionError::malformed(
                    url,
                    format!("closed pull request #{} has no closed_at", item.number),
                )
            })?;
            parse_timestamp(raw, item.number)
        }
    };

    Ok(PullRequestRecord {
        number: item.number,
        title: item.title,
        author: item.user.login,
        created_at: item
            .created_at
            .as_deref()
            .and_then(|raw| parse_timestamp(raw, item.number)),
        status,
        closed_at,
        merged_at: item
            .pull_request
            .and_then(|links| links.merged_at)
            .and_then(|raw| parse_timestamp(&raw, item.number)),
    })
}

fn parse_timestamp(raw: &str, number: u64) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(err) => {
            log::debug!("pull request #{number}: ignoring unparseable timestamp '{raw}': {err}");
            None
        }
    }
}
