use crate::error::MiningError;
use crate::git::complexity;
use crate::model::{CommitRecord, DateWindow, FileModification};
use chrono::{DateTime, Utc};
use gix::object::tree::diff::ChangeDetached;
use gix::revision::walk::Sorting;
use gix::traverse::commit::simple::CommitTimeOrder;
use gix::{ObjectId, Repository};
use similar::{ChangeTag, TextDiff};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tempfile::TempDir;

type Result<T> = std::result::Result<T, MiningError>;

const BINARY_SNIFF_LEN: usize = 8192;
pub const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(10);

/// An opened repository. Remote locations are cloned bare into a temporary
/// directory that is removed when this value is dropped.
pub struct GitRepo {
    repo: Repository,
    location: String,
    _clone_dir: Option<TempDir>,
}

impl GitRepo {
    /// Open a local path, or clone a remote URL (`scheme://...`, `git@...`).
    pub fn open(location: &str) -> Result<Self> {
        Self::open_with_timeout(location, DEFAULT_CLONE_TIMEOUT)
    }

    /// Like [`GitRepo::open`], bounding a remote clone's connect time and
    /// stalls by `timeout`.
    pub fn open_with_timeout(location: &str, timeout: Duration) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(MiningError::InvalidLocation {
                location: String::new(),
                source: "repository location is empty".into(),
            });
        }
        if is_remote(location) {
            Self::clone_remote(location, timeout)
        } else {
            Self::open_local(location)
        }
    }

    fn open_local(location: &str) -> Result<Self> {
        let path = Path::new(location);
        if !path.exists() {
            return Err(MiningError::InvalidLocation {
                location: location.to_string(),
                source: "path does not exist".into(),
            });
        }
        let repo = gix::discover(path).map_err(|err| MiningError::InvalidLocation {
            location: location.to_string(),
            source: Box::new(err),
        })?;

        Ok(Self {
            repo,
            location: location.to_string(),
            _clone_dir: None,
        })
    }

    fn clone_remote(url: &str, timeout: Duration) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("gitlog-insights-")
            .tempdir()
            .map_err(clone_failed(url))?;

        log::info!("cloning {url} into {}", dir.path().display());
        let interrupt = AtomicBool::new(false);
        let mut prepare = gix::prepare_clone_bare(url, dir.path())
            .map_err(clone_failed(url))?
            .with_in_memory_config_overrides(transport_timeouts(timeout));
        let (repo, _outcome) = prepare
            .fetch_only(gix::progress::Discard, &interrupt)
            .map_err(clone_failed(url))?;

        Ok(Self {
            repo,
            location: url.to_string(),
            _clone_dir: Some(dir),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Walk the commits reachable from `branch` (or HEAD) whose commit time
    /// falls inside `window`, newest first.
    pub fn commits(&self, window: DateWindow, branch: Option<&str>) -> Result<CommitWalk<'_>> {
        let tip = self.resolve_tip(branch)?;
        let walk = self
            .repo
            .rev_walk([tip])
            .sorting(Sorting::ByCommitTime(CommitTimeOrder::NewestFirst))
            .all()
            .map_err(MiningError::traversal)?;

        Ok(CommitWalk {
            repo: self,
            walk,
            window,
        })
    }

    fn resolve_tip(&self, branch: Option<&str>) -> Result<ObjectId> {
        let Some(branch) = branch else {
            return self
                .repo
                .head_id()
                .map(|id| id.detach())
                .map_err(MiningError::traversal);
        };

        // Bare clones may keep remote branches under refs/remotes/origin.
        for candidate in [branch.to_string(), format!("origin/{branch}")] {
            if let Ok(id) = self.repo.rev_parse_single(candidate.as_str()) {
                return Ok(id.detach());
            }
        }
        Err(MiningError::BranchNotFound(branch.to_string()))
    }

    fn read_commit(&self, id: ObjectId, window: &DateWindow) -> Result<Option<CommitRecord>> {
        let commit = self.repo.find_commit(id).map_err(MiningError::traversal)?;
        let secs = commit.time().map_err(MiningError::traversal)?.seconds;
        let timestamp = DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| MiningError::Traversal(format!("invalid timestamp {secs} on {id}").into()))?;

        if !window.contains(&timestamp) {
            return Ok(None);
        }

        let author = commit.author().map_err(MiningError::traversal)?;
        let author_name = author.name.to_string();
        let author_email = author.email.to_string();
        let message = commit.message_raw_sloppy().to_string().trim_end().to_string();
        let parents: Vec<ObjectId> = commit.parent_ids().map(|pid| pid.detach()).collect();

        let files = match parents.as_slice() {
            [] => self.modified_files(None, id)?,
            [parent] => self.modified_files(Some(*parent), id)?,
            _ => Vec::new(),
        };

        Ok(Some(CommitRecord {
            id: id.to_string(),
            author_name,
            author_email,
            message,
            timestamp,
            files,
        }))
    }

    fn modified_files(&self, parent: Option<ObjectId>, id: ObjectId) -> Result<Vec<FileModification>> {
        let new_tree = self
            .repo
            .find_commit(id)
            .map_err(MiningError::traversal)?
            .tree()
            .map_err(MiningError::traversal)?;
        let old_tree = match parent {
            Some(pid) => Some(
                self.repo
                    .find_commit(pid)
                    .map_err(MiningError::traversal)?
                    .tree()
                    .map_err(MiningError::traversal)?,
            ),
            None => None,
        };

        let changes: Vec<ChangeDetached> = self
            .repo
            .diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), None)
            .map_err(MiningError::traversal)?;

        let mut files = Vec::new();
        for change in changes {
            if let Some(modification) = self.handle_change(change)? {
                files.push(modification);
            }
        }
        Ok(files)
    }

    fn handle_change(&self, change: ChangeDetached) -> Result<Option<FileModification>> {
        let (old_id, new_id, location, entry_mode) = match change {
            ChangeDetached::Addition {
                id,
                location,
                entry_mode,
                ..
            } => (None, Some(id), location, entry_mode),
            ChangeDetached::Deletion {
                id,
                location,
                entry_mode,
                ..
            } => (Some(id), None, location, entry_mode),
            ChangeDetached::Modification {
                previous_id,
                id,
                location,
                entry_mode,
                ..
            } => (Some(previous_id), Some(id), location, entry_mode),
            ChangeDetached::Rewrite {
                source_id,
                id,
                location,
                entry_mode,
                ..
            } => (Some(source_id), Some(id), location, entry_mode),
        };

        if entry_mode.is_tree() || entry_mode.is_commit() {
            return Ok(None);
        }

        let old = match old_id {
            Some(oid) => Some(self.blob_text(oid)?),
            None => None,
        };
        let new = match new_id {
            Some(oid) => Some(self.blob_text(oid)?),
            None => None,
        };

        // Binary on either side: skipped entirely.
        let (old, new) = match (old, new) {
            (Some(None), _) | (_, Some(None)) => return Ok(None),
            (old, new) => (old.flatten(), new.flatten()),
        };

        let path = location.to_string();
        let (added_lines, deleted_lines) =
            line_delta(old.as_deref().unwrap_or(""), new.as_deref().unwrap_or(""));
        let complexity = new
            .as_deref()
            .and_then(|text| complexity::estimate(&path, text));

        Ok(Some(FileModification {
            path,
            added_lines,
            deleted_lines,
            complexity,
        }))
    }

    /// `None` for binary blobs.
    fn blob_text(&self, id: ObjectId) -> Result<Option<String>> {
        let object = self.repo.find_object(id).map_err(MiningError::traversal)?;
        let data = object.data.as_slice();
        if data.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0) {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(data).into_owned()))
    }
}

/// Lazy, single-pass traversal produced by [`GitRepo::commits`].
pub struct CommitWalk<'repo> {
    repo: &'repo GitRepo,
    walk: gix::revision::Walk<'repo>,
    window: DateWindow,
}

impl Iterator for CommitWalk<'_> {
    type Item = Result<CommitRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let info = match self.walk.next()? {
                Ok(info) => info,
                Err(err) => return Some(Err(MiningError::traversal(err))),
            };
            match self.repo.read_commit(info.id, &self.window) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

fn clone_failed<E>(url: &str) -> impl Fn(E) -> MiningError + '_
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |err| MiningError::Clone {
        url: url.to_string(),
        source: Box::new(err),
    }
}

/// Transport settings that abort a clone which cannot connect within
/// `timeout`, or which moves less than one byte per second for that long.
fn transport_timeouts(timeout: Duration) -> Vec<String> {
    let secs = timeout.as_secs().max(1);
    vec![
        format!("gitoxide.http.connectTimeout={}", secs * 1000),
        "http.lowSpeedLimit=1".to_string(),
        format!("http.lowSpeedTime={secs}"),
    ]
}

pub fn is_remote(location: &str) -> bool {
    location.contains("://") || location.starts_with("git@")
}

fn line_delta(old: &str, new: &str) -> (u32, u32) {
    let diff = TextDiff::from_lines(old, new);
    let mut added = 0u32;
    let mut deleted = 0u32;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => deleted += 1,
            ChangeTag::Equal => {}
        }
    }
    (added, deleted)
}
