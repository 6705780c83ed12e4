use crate::model::CommitRecord;
use crate::report::{Report, Table};
use serde::Serialize;
use std::collections::BTreeMap;

/// Added to every entropy so that `log(0)` never appears and single-author
/// files stay strictly positive.
pub const ENTROPY_SMOOTHING: f64 = 0.0001;
pub const HIGH_BIAS_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileAuthorship {
    pub path: String,
    /// Modification count per author.
    pub authors: BTreeMap<String, usize>,
    pub modifications: usize,
    pub entropy: f64,
}

impl FileAuthorship {
    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    fn dominant_author(&self) -> Option<&str> {
        super::first_max_by(self.authors.iter(), |(_, count)| **count).map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthorBiasReport {
    /// Every modified file, ordered by path.
    pub files: Vec<FileAuthorship>,
    pub mean_entropy: Option<f64>,
    /// Files below the mean entropy, most concentrated first.
    pub high_bias: Vec<FileAuthorship>,
}

/// Shannon entropy (base 2) of the authorship distribution, plus smoothing.
pub fn entropy<I>(counts: I) -> f64
where
    I: IntoIterator<Item = usize>,
{
    let counts: Vec<usize> = counts.into_iter().filter(|&c| c > 0).collect();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return ENTROPY_SMOOTHING;
    }
    let h: f64 = counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    h.max(0.0) + ENTROPY_SMOOTHING
}

pub fn author_bias(commits: &[CommitRecord]) -> AuthorBiasReport {
    let mut per_file: BTreeMap<&str, BTreeMap<String, usize>> = BTreeMap::new();
    for commit in commits {
        for file in &commit.files {
            *per_file
                .entry(file.path.as_str())
                .or_default()
                .entry(commit.author_name.clone())
                .or_insert(0) += 1;
        }
    }

    let files: Vec<FileAuthorship> = per_file
        .into_iter()
        .map(|(path, authors)| FileAuthorship {
            path: path.to_string(),
            modifications: authors.values().sum(),
            entropy: entropy(authors.values().copied()),
            authors,
        })
        .collect();

    if files.is_empty() {
        return AuthorBiasReport::default();
    }

    let mean = files.iter().map(|f| f.entropy).sum::<f64>() / files.len() as f64;
    let mut high_bias: Vec<FileAuthorship> = files.iter().filter(|f| f.entropy < mean).cloned().collect();
    high_bias.sort_by(|a, b| {
        a.entropy
            .total_cmp(&b.entropy)
            .then_with(|| b.modifications.cmp(&a.modifications))
            .then_with(|| a.path.cmp(&b.path))
    });
    high_bias.truncate(HIGH_BIAS_LIMIT);

    AuthorBiasReport {
        files,
        mean_entropy: Some(mean),
        high_bias,
    }
}

impl Report for AuthorBiasReport {
    fn title(&self) -> &'static str {
        "Author Bias"
    }

    fn table(&self) -> Table {
        let mut table = Table::new(["File Name", "Authors", "Major", "Modifications", "Entropy", "High Bias"]);
        for file in &self.files {
            let authors: Vec<&str> = file.authors.keys().map(String::as_str).collect();
            let high = self.high_bias.iter().any(|h| h.path == file.path);
            table.push_row([
                file.path.clone(),
                authors.join(", "),
                file.author_count().to_string(),
                file.modifications.to_string(),
                format!("{:.4}", file.entropy),
                if high { "yes" } else { "no" }.to_string(),
            ]);
        }
        table
    }

    fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(mean) = self.mean_entropy {
            lines.push(format!("Mean authorship entropy: {mean:.4}"));
        }
        for file in &self.high_bias {
            lines.push(format!(
                "{} is concentrated on {} ({} modifications, entropy {:.4})",
                file.path,
                file.dominant_author().unwrap_or("-"),
                file.modifications,
                file.entropy
            ));
        }
        lines
    }
}
