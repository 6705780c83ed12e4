//! Pure aggregations over extracted records. Nothing here performs I/O, and
//! every function returns an empty result for empty input.

pub mod author_bias;
pub mod merge_activity;
pub mod pr_size;
pub mod review_time;
pub mod top_files;

pub use author_bias::{author_bias, AuthorBiasReport};
pub use merge_activity::{merge_activity, MergeActivityReport};
pub use pr_size::{commit_pr_sizes, pr_sizes, CommitPrSizeReport, PrSizeReport, SizeBucket};
pub use review_time::{review_times, ReviewTimeReport};
pub use top_files::{top_touched_files, TopFilesReport, DEFAULT_TOP_FILES};

use std::time::Duration;

/// The first item with the greatest key. `Iterator::max_by_key` keeps the
/// last one, which would make ties depend on the end of the input.
pub(crate) fn first_max_by<I, T, K, F>(items: I, mut key: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    K: PartialOrd,
    F: FnMut(&T) -> K,
{
    let mut best: Option<(K, T)> = None;
    for item in items {
        let k = key(&item);
        let replace = match &best {
            Some((best_key, _)) => k > *best_key,
            None => true,
        };
        if replace {
            best = Some((k, item));
        }
    }
    best.map(|(_, item)| item)
}

pub(crate) fn format_seconds(seconds: f64) -> String {
    let rounded = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    humantime::format_duration(Duration::from_secs(rounded)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_max_keeps_earliest_tie() {
        let items = vec![("a", 2), ("b", 3), ("c", 3)];
        assert_eq!(first_max_by(items, |(_, n)| *n), Some(("b", 3)));
    }

    #[test]
    fn first_max_of_empty_is_none() {
        let items: Vec<u32> = Vec::new();
        assert_eq!(first_max_by(items, |n| *n), None);
    }

    #[test]
    fn seconds_are_humanised() {
        assert_eq!(format_seconds(172_800.0), "2days");
        assert_eq!(format_seconds(-5.0), "0s");
    }
}
