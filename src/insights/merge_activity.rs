use crate::model::PullRequestRecord;
use crate::report::{Report, Section, Table};
use chrono::{DateTime, Datelike, Month, Utc, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeCell {
    /// `YYYY-MonthName`, e.g. `2023-February`.
    pub month: String,
    pub weekday: String,
    pub merges: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedPr {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: Option<DateTime<Utc>>,
    pub merged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeActivityReport {
    /// Every weekday of every month that saw a merge, chronological.
    pub cells: Vec<MergeCell>,
    /// The busiest cells; several when tied.
    pub peaks: Vec<MergeCell>,
    /// The merged pull requests behind the grid, oldest merge first.
    pub merged: Vec<MergedPr>,
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Merge counts per (month, weekday), keyed on when each pull request closed.
pub fn merge_activity(pulls: &[PullRequestRecord]) -> MergeActivityReport {
    let mut grid: BTreeMap<(i32, u32), [usize; 7]> = BTreeMap::new();
    let mut merged = Vec::new();
    for pr in pulls {
        let Some(closed_at) = pr.closed_at else {
            continue;
        };
        let day = closed_at.weekday().num_days_from_monday() as usize;
        grid.entry((closed_at.year(), closed_at.month())).or_default()[day] += 1;
        merged.push(MergedPr {
            number: pr.number,
            title: pr.title.clone(),
            author: pr.author.clone(),
            created_at: pr.created_at,
            merged_at: pr.merged_at.unwrap_or(closed_at),
        });
    }
    merged.sort_by(|a, b| a.merged_at.cmp(&b.merged_at).then(a.number.cmp(&b.number)));

    let cells: Vec<MergeCell> = grid
        .into_iter()
        .flat_map(|((year, month), counts)| {
            let name = u8::try_from(month)
                .ok()
                .and_then(|m| Month::try_from(m).ok())
                .map_or("Unknown", |m| m.name());
            let label = format!("{year}-{name}");
            WEEKDAYS.iter().zip(counts).map(move |(day, merges)| MergeCell {
                month: label.clone(),
                weekday: weekday_name(*day).to_string(),
                merges,
            })
        })
        .collect();

    let busiest = cells.iter().map(|c| c.merges).max().unwrap_or(0);
    let peaks = if busiest == 0 {
        Vec::new()
    } else {
        cells.iter().filter(|c| c.merges == busiest).cloned().collect()
    };

    MergeActivityReport { cells, peaks, merged }
}

impl Report for MergeActivityReport {
    fn title(&self) -> &'static str {
        "Merge Activity"
    }

    fn table(&self) -> Table {
        let mut table = Table::new(["Month", "Weekday", "Merges"]);
        for cell in &self.cells {
            table.push_row([cell.month.clone(), cell.weekday.clone(), cell.merges.to_string()]);
        }
        table
    }

    fn summary(&self) -> Vec<String> {
        self.peaks
            .iter()
            .map(|c| format!("Maximum merges happened on {} in {}: {}", c.weekday, c.month, c.merges))
            .collect()
    }

    fn sections(&self) -> Vec<Section> {
        let mut table = Table::new(["PR Number", "Title", "Author", "Created At", "Merged At"]);
        for pr in &self.merged {
            table.push_row([
                pr.number.to_string(),
                pr.title.clone(),
                pr.author.clone(),
                pr.created_at.map_or_else(|| "-".to_string(), |t| t.to_rfc3339()),
                pr.merged_at.to_rfc3339(),
            ]);
        }
        vec![Section {
            heading: "Merged Pull Requests".to_string(),
            table,
        }]
    }
}
