use super::first_max_by;
use crate::model::{CommitRecord, FileChangeRecord};
use crate::report::{Report, Table};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;

pub const SMALL_LIMIT: u64 = 100;
pub const MEDIUM_LIMIT: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeBucket {
    Small,
    Medium,
    Large,
}

impl SizeBucket {
    /// `< 100` changed lines is small, `< 500` medium, anything else large.
    pub fn classify(insertions: u64, deletions: u64) -> Self {
        match insertions + deletions {
            total if total < SMALL_LIMIT => SizeBucket::Small,
            total if total < MEDIUM_LIMIT => SizeBucket::Medium,
            _ => SizeBucket::Large,
        }
    }
}

impl fmt::Display for SizeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeBucket::Small => f.write_str("small"),
            SizeBucket::Medium => f.write_str("medium"),
            SizeBucket::Large => f.write_str("large"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrSize {
    pub number: u64,
    pub files_changed: usize,
    pub additions: u64,
    pub deletions: u64,
    pub lines_changed: u64,
    pub bucket: SizeBucket,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrSizeReport {
    /// Ordered by pull request number.
    pub sizes: Vec<PrSize>,
    pub most_lines: Option<u64>,
    pub most_files: Option<u64>,
}

/// Per pull request size from the platform's file listings.
pub fn pr_sizes(files: &[FileChangeRecord]) -> PrSizeReport {
    #[derive(Default)]
    struct Accum<'a> {
        filenames: BTreeSet<&'a str>,
        additions: u64,
        deletions: u64,
        changes: u64,
    }

    let mut per_pr: BTreeMap<u64, Accum<'_>> = BTreeMap::new();
    for file in files {
        let entry = per_pr.entry(file.pr_number).or_default();
        entry.filenames.insert(file.filename.as_str());
        entry.additions += file.additions;
        entry.deletions += file.deletions;
        entry.changes += file.changes;
    }

    let sizes: Vec<PrSize> = per_pr
        .into_iter()
        .map(|(number, acc)| PrSize {
            number,
            files_changed: acc.filenames.len(),
            additions: acc.additions,
            deletions: acc.deletions,
            lines_changed: acc.changes,
            bucket: SizeBucket::classify(acc.additions, acc.deletions),
        })
        .collect();

    PrSizeReport {
        most_lines: first_max_by(sizes.iter(), |s| s.lines_changed).map(|s| s.number),
        most_files: first_max_by(sizes.iter(), |s| s.files_changed).map(|s| s.number),
        sizes,
    }
}

impl PrSizeReport {
    fn size_of(&self, number: u64) -> Option<&PrSize> {
        self.sizes.iter().find(|s| s.number == number)
    }
}

impl Report for PrSizeReport {
    fn title(&self) -> &'static str {
        "Pull Request Size"
    }

    fn table(&self) -> Table {
        let mut table = Table::new([
            "PR Number",
            "Files Changed",
            "Additions",
            "Deletions",
            "Total Lines Changed",
            "Size",
        ]);
        for size in &self.sizes {
            table.push_row([
                size.number.to_string(),
                size.files_changed.to_string(),
                size.additions.to_string(),
                size.deletions.to_string(),
                size.lines_changed.to_string(),
                size.bucket.to_string(),
            ]);
        }
        table
    }

    fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(size) = self.most_lines.and_then(|n| self.size_of(n)) {
            lines.push(format!(
                "PR #{} has the most lines changed: {} lines. This extensive change might pose challenges in review and testing.",
                size.number, size.lines_changed
            ));
        }
        if let Some(size) = self.most_files.and_then(|n| self.size_of(n)) {
            lines.push(format!(
                "PR #{} has the most files changed: {} files. This needs more attention in review and testing.",
                size.number, size.files_changed
            ));
        }
        lines
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitPrSize {
    pub number: u64,
    pub commits: usize,
    pub insertions: u64,
    pub deletions: u64,
    pub size: u64,
    pub bucket: SizeBucket,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitPrSizeReport {
    /// Ordered by pull request number.
    pub sizes: Vec<CommitPrSize>,
}

fn pr_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#(\d+)").expect("pull request reference pattern is valid"))
}

/// The first `#<number>` in a commit message, if any.
pub fn referenced_pr(message: &str) -> Option<u64> {
    pr_reference()
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Per pull request size from commits whose message references `#<number>`.
pub fn commit_pr_sizes(commits: &[CommitRecord]) -> CommitPrSizeReport {
    let mut per_pr: BTreeMap<u64, (usize, u64, u64)> = BTreeMap::new();
    for commit in commits {
        let Some(number) = referenced_pr(&commit.message) else {
            continue;
        };
        let entry = per_pr.entry(number).or_insert((0, 0, 0));
        entry.0 += 1;
        entry.1 += commit.insertions();
        entry.2 += commit.deletions();
    }

    CommitPrSizeReport {
        sizes: per_pr
            .into_iter()
            .map(|(number, (commits, insertions, deletions))| CommitPrSize {
                number,
                commits,
                insertions,
                deletions,
                size: insertions + deletions,
                bucket: SizeBucket::classify(insertions, deletions),
            })
            .collect(),
    }
}

impl Report for CommitPrSizeReport {
    fn title(&self) -> &'static str {
        "Pull Request Size (from commits)"
    }

    fn table(&self) -> Table {
        let mut table = Table::new(["PR Number", "Commits", "Insertions", "Deletions", "Size of PR", "Size"]);
        for size in &self.sizes {
            table.push_row([
                size.number.to_string(),
                size.commits.to_string(),
                size.insertions.to_string(),
                size.deletions.to_string(),
                size.size.to_string(),
                size.bucket.to_string(),
            ]);
        }
        table
    }

    fn summary(&self) -> Vec<String> {
        if self.sizes.is_empty() {
            return Vec::new();
        }
        let mut counts = [0usize; 3];
        for size in &self.sizes {
            counts[size.bucket as usize] += 1;
        }
        vec![format!(
            "{} small, {} medium and {} large pull requests",
            counts[0], counts[1], counts[2]
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileModification;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn change(pr_number: u64, filename: &str, additions: u64, deletions: u64) -> FileChangeRecord {
        FileChangeRecord {
            filename: filename.to_string(),
            status: "modified".to_string(),
            additions,
            deletions,
            changes: additions + deletions,
            pr_number,
        }
    }

    fn commit(message: &str, added: u32, deleted: u32) -> CommitRecord {
        CommitRecord {
            id: message.to_string(),
            author_name: "alice".to_string(),
            author_email: "alice@example.com".to_string(),
            message: message.to_string(),
            timestamp: Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap(),
            files: vec![FileModification {
                path: "a.rs".to_string(),
                added_lines: added,
                deleted_lines: deleted,
                complexity: None,
            }],
        }
    }

    #[test]
    fn bucket_examples() {
        assert_eq!(SizeBucket::classify(40, 30), SizeBucket::Small);
        assert_eq!(SizeBucket::classify(300, 150), SizeBucket::Medium);
        assert_eq!(SizeBucket::classify(1000, 200), SizeBucket::Large);
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(SizeBucket::classify(99, 0), SizeBucket::Small);
        assert_eq!(SizeBucket::classify(60, 40), SizeBucket::Medium);
        assert_eq!(SizeBucket::classify(499, 0), SizeBucket::Medium);
        assert_eq!(SizeBucket::classify(250, 250), SizeBucket::Large);
    }

    #[test]
    fn sizes_group_by_pr() {
        let files = vec![
            change(1, "a.rs", 10, 5),
            change(1, "b.rs", 1, 1),
            change(2, "a.rs", 400, 300),
            change(3, "a.rs", 1, 0),
            change(3, "b.rs", 1, 0),
            change(3, "c.rs", 1, 0),
        ];
        let report = pr_sizes(&files);
        assert_eq!(report.sizes.len(), 3);
        assert_eq!(report.sizes[0].files_changed, 2);
        assert_eq!(report.sizes[0].lines_changed, 17);
        assert_eq!(report.sizes[1].bucket, SizeBucket::Large);
        assert_eq!(report.most_lines, Some(2));
        assert_eq!(report.most_files, Some(3));
        assert_eq!(report.summary().len(), 2);
    }

    #[test]
    fn empty_file_list() {
        let report = pr_sizes(&[]);
        assert_eq!(report, PrSizeReport::default());
        assert!(report.summary().is_empty());
    }

    #[test]
    fn pr_reference_parsing() {
        assert_eq!(referenced_pr("Merge pull request #42 from x/y"), Some(42));
        assert_eq!(referenced_pr("Fix (#7) and #8"), Some(7));
        assert_eq!(referenced_pr("no reference"), None);
    }

    #[test]
    fn commit_sizes_accumulate_per_pr() {
        let commits = vec![
            commit("Add feature (#12)", 30, 10),
            commit("Follow-up for #12", 50, 20),
            commit("Unrelated", 500, 0),
            commit("Big rewrite #13", 900, 100),
        ];
        let report = commit_pr_sizes(&commits);
        assert_eq!(
            report.sizes,
            vec![
                CommitPrSize {
                    number: 12,
                    commits: 2,
                    insertions: 80,
                    deletions: 30,
                    size: 110,
                    bucket: SizeBucket::Medium,
                },
                CommitPrSize {
                    number: 13,
                    commits: 1,
                    insertions: 900,
                    deletions: 100,
                    size: 1000,
                    bucket: SizeBucket::Large,
                },
            ]
        );
        assert_eq!(report.summary(), vec!["0 small, 1 medium and 1 large pull requests".to_string()]);
    }
}
