use crate::model::CommitRecord;
use crate::report::{Report, Table};
use crate::util::files_matching;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

pub const DEFAULT_TOP_FILES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TouchedFile {
    pub path: String,
    pub modifications: usize,
    pub authors: BTreeSet<String>,
    pub last_message: String,
    pub last_date: DateTime<Utc>,
    pub complexity: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopFilesReport {
    /// Most modified first; equal counts keep traversal order.
    pub files: Vec<TouchedFile>,
}

impl TopFilesReport {
    /// The top file with the highest recorded complexity.
    pub fn most_complex(&self) -> Option<&TouchedFile> {
        super::first_max_by(self.files.iter().filter(|f| f.complexity.is_some()), |f| f.complexity)
    }
}

/// The `limit` most frequently modified files, optionally restricted to one
/// extension.
///
/// Selection keeps a bounded min-heap of `limit` entries rather than sorting
/// every file.
pub fn top_touched_files(commits: &[CommitRecord], extension: Option<&str>, limit: usize) -> TopFilesReport {
    let mut order: Vec<TouchedFile> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for commit in commits {
        for file in files_matching(&commit.files, extension) {
            let slot = *index.entry(file.path.as_str()).or_insert_with(|| {
                order.push(TouchedFile {
                    path: file.path.clone(),
                    modifications: 0,
                    authors: BTreeSet::new(),
                    last_message: commit.message.clone(),
                    last_date: commit.timestamp,
                    complexity: None,
                });
                order.len() - 1
            });

            let entry = &mut order[slot];
            entry.modifications += 1;
            entry.authors.insert(commit.author_name.clone());
            if commit.timestamp > entry.last_date {
                entry.last_date = commit.timestamp;
                entry.last_message = commit.message.clone();
            }
            if let Some(score) = file.complexity {
                entry.complexity = Some(entry.complexity.map_or(score, |c| c.max(score)));
            }
        }
    }

    if limit == 0 {
        return TopFilesReport::default();
    }

    // Min-heap on (count, earlier-is-better); the root is the weakest kept entry.
    let mut heap: BinaryHeap<Reverse<(usize, Reverse<usize>)>> = BinaryHeap::with_capacity(limit + 1);
    for (slot, file) in order.iter().enumerate() {
        heap.push(Reverse((file.modifications, Reverse(slot))));
        if heap.len() > limit {
            heap.pop();
        }
    }

    let mut ranked: Vec<(usize, Reverse<usize>)> = heap.into_iter().map(|Reverse(key)| key).collect();
    ranked.sort_by(|a, b| b.cmp(a));

    TopFilesReport {
        files: ranked
            .into_iter()
            .map(|(_, Reverse(slot))| order[slot].clone())
            .collect(),
    }
}

impl Report for TopFilesReport {
    fn title(&self) -> &'static str {
        "Top Touched Files"
    }

    fn table(&self) -> Table {
        let mut table = Table::new([
            "File",
            "Count",
            "Complexity",
            "Authors",
            "Last Commit Message",
            "Last Commit Date",
        ]);
        for file in &self.files {
            let authors: Vec<&str> = file.authors.iter().map(String::as_str).collect();
            table.push_row([
                file.path.clone(),
                file.modifications.to_string(),
                file.complexity.map_or_else(|| "-".to_string(), |c| c.to_string()),
                authors.join(", "),
                file.last_message.lines().next().unwrap_or("").to_string(),
                file.last_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]);
        }
        table
    }

    fn summary(&self) -> Vec<String> {
        match self.most_complex() {
            Some(TouchedFile {
                path,
                complexity: Some(score),
                ..
            }) => vec![format!(
                "The file {path} is one of the top modified files within the given time period having a high complexity of {score}."
            )],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileModification;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn commit(author: &str, day: u32, message: &str, files: &[(&str, Option<u32>)]) -> CommitRecord {
        CommitRecord {
            id: format!("{author}{day}"),
            author_name: author.to_string(),
            author_email: format!("{author}@example.com"),
            message: message.to_string(),
            timestamp: Utc.with_ymd_and_hms(2023, 2, day, 9, 0, 0).unwrap(),
            files: files
                .iter()
                .map(|(path, complexity)| FileModification {
                    path: path.to_string(),
                    added_lines: 1,
                    deleted_lines: 1,
                    complexity: *complexity,
                })
                .collect(),
        }
    }

    fn paths(report: &TopFilesReport) -> Vec<&str> {
        report.files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn returns_at_most_limit_sorted_by_count() {
        let commits = vec![
            commit("a", 3, "m3", &[("x.rs", None), ("y.rs", None)]),
            commit("b", 2, "m2", &[("x.rs", None), ("z.rs", None)]),
            commit("a", 1, "m1", &[("x.rs", None), ("y.rs", None), ("w.rs", None)]),
        ];
        let report = top_touched_files(&commits, None, 2);
        assert_eq!(paths(&report), vec!["x.rs", "y.rs"]);
        assert_eq!(report.files[0].modifications, 3);

        let all = top_touched_files(&commits, None, 10);
        assert_eq!(all.files.len(), 4);
    }

    #[test]
    fn ties_keep_encounter_order() {
        let commits = vec![
            commit("a", 3, "m", &[("late.rs", None)]),
            commit("a", 2, "m", &[("early.rs", None)]),
            commit("a", 1, "m", &[("third.rs", None)]),
        ];
        let report = top_touched_files(&commits, None, 2);
        assert_eq!(paths(&report), vec!["late.rs", "early.rs"]);
    }

    #[test]
    fn tracks_authors_last_commit_and_max_complexity() {
        let commits = vec![
            commit("bob", 5, "newest", &[("x.py", Some(4))]),
            commit("alice", 2, "older", &[("x.py", Some(9))]),
        ];
        let report = top_touched_files(&commits, None, DEFAULT_TOP_FILES);
        let file = &report.files[0];
        assert_eq!(file.authors.len(), 2);
        assert_eq!(file.last_message, "newest");
        assert_eq!(file.complexity, Some(9));
        assert!(report.summary()[0].contains("x.py"));
        assert!(report.summary()[0].contains("complexity of 9"));
    }

    #[test]
    fn extension_filter_applies() {
        let commits = vec![commit("a", 1, "m", &[("x.rs", None), ("notes.md", None)])];
        let report = top_touched_files(&commits, Some(".md"), 5);
        assert_eq!(paths(&report), vec!["notes.md"]);
    }

    #[test]
    fn empty_and_zero_limit() {
        assert_eq!(top_touched_files(&[], None, 5), TopFilesReport::default());
        let commits = vec![commit("a", 1, "m", &[("x.rs", None)])];
        assert!(top_touched_files(&commits, None, 0).files.is_empty());
        assert!(TopFilesReport::default().summary().is_empty());
    }
}
