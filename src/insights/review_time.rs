use super::{first_max_by, format_seconds};
use crate::model::{PrStatus, PullRequestRecord};
use crate::report::{Report, Table};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrReview {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub review_seconds: i64,
}

impl PrReview {
    pub fn review_time(&self) -> Duration {
        Duration::seconds(self.review_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorReviews {
    pub author: String,
    pub pull_requests: usize,
    pub mean_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewTimeReport {
    pub reviews: Vec<PrReview>,
    pub mean_seconds: Option<f64>,
    /// Pull request numbers whose review took longer than the mean.
    pub long_reviews: Vec<u64>,
    pub most_prs_author: Option<AuthorReviews>,
    pub slowest_author: Option<AuthorReviews>,
}

/// Review time of every closed pull request with usable timestamps.
pub fn review_times(pulls: &[PullRequestRecord]) -> ReviewTimeReport {
    let reviews: Vec<PrReview> = pulls
        .iter()
        .filter(|pr| pr.status == PrStatus::Closed)
        .filter_map(|pr| {
            let (Some(created_at), Some(closed_at)) = (pr.created_at, pr.closed_at) else {
                log::debug!("pull request #{} excluded: missing timestamps", pr.number);
                return None;
            };
            Some(PrReview {
                number: pr.number,
                title: pr.title.clone(),
                author: pr.author.clone(),
                created_at,
                closed_at,
                review_seconds: (closed_at - created_at).num_seconds(),
            })
        })
        .collect();

    if reviews.is_empty() {
        return ReviewTimeReport::default();
    }

    let mean = reviews.iter().map(|r| r.review_seconds as f64).sum::<f64>() / reviews.len() as f64;
    let long_reviews = reviews
        .iter()
        .filter(|r| r.review_seconds as f64 > mean)
        .map(|r| r.number)
        .collect();

    let mut by_author: BTreeMap<&str, (usize, i64)> = BTreeMap::new();
    for review in &reviews {
        let entry = by_author.entry(review.author.as_str()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += review.review_seconds;
    }
    let per_author: Vec<AuthorReviews> = by_author
        .into_iter()
        .map(|(author, (count, total))| AuthorReviews {
            author: author.to_string(),
            pull_requests: count,
            mean_seconds: total as f64 / count as f64,
        })
        .collect();

    ReviewTimeReport {
        most_prs_author: first_max_by(per_author.iter(), |a| a.pull_requests).cloned(),
        slowest_author: first_max_by(per_author.iter(), |a| a.mean_seconds).cloned(),
        reviews,
        mean_seconds: Some(mean),
        long_reviews,
    }
}

impl Report for ReviewTimeReport {
    fn title(&self) -> &'static str {
        "Pull Request Review Time"
    }

    fn table(&self) -> Table {
        let mut table = Table::new([
            "PR Number",
            "Title",
            "Author",
            "Created At",
            "Closed At",
            "Review Time",
            "Longer Than Average",
        ]);
        for review in &self.reviews {
            let long = self.long_reviews.contains(&review.number);
            table.push_row([
                review.number.to_string(),
                review.title.clone(),
                review.author.clone(),
                review.created_at.to_rfc3339(),
                review.closed_at.to_rfc3339(),
                format_seconds(review.review_seconds as f64),
                if long { "yes" } else { "no" }.to_string(),
            ]);
        }
        table
    }

    fn summary(&self) -> Vec<String> {
        let Some(mean) = self.mean_seconds else {
            return Vec::new();
        };
        let mut lines = vec![format!("The average time taken to review a PR: {}", format_seconds(mean))];
        for review in self.reviews.iter().filter(|r| self.long_reviews.contains(&r.number)) {
            lines.push(format!(
                "PR #{}: {} took longer than average ({})",
                review.number,
                review.title,
                format_seconds(review.review_seconds as f64)
            ));
        }
        if let Some(author) = &self.most_prs_author {
            lines.push(format!(
                "Author with the most PRs: {} ({})",
                author.author, author.pull_requests
            ));
        }
        if let Some(author) = &self.slowest_author {
            lines.push(format!(
                "Author with the highest average review time: {} ({})",
                author.author,
                format_seconds(author.mean_seconds)
            ));
        }
        lines
    }
}
