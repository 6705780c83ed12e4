use crate::error::{InsightsError, Result};
use console::style;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const EMPTY_PLACEHOLDER: &str = "No data available between the specified dates.";

/// A rendered insight: a table plus free-text findings.
pub trait Report {
    fn title(&self) -> &'static str;
    fn table(&self) -> Table;
    fn summary(&self) -> Vec<String> {
        Vec::new()
    }

    /// Supporting tables rendered after the summary.
    fn sections(&self) -> Vec<Section> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub table: Table,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.rows.push(row.into_iter().map(|cell| cell.to_string()).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn render_html(title: &str, table: &Table, summary: &[String], sections: &[Section]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n</head>\n<body>\n", escape(title)));
    html.push_str(&format!("<h1>{}</h1>\n", escape(title)));

    if table.is_empty() {
        html.push_str(&format!("<p>{EMPTY_PLACEHOLDER}</p>\n"));
    } else {
        push_table(&mut html, table);
        for line in summary {
            html.push_str(&format!("<p>{}</p>\n", escape(line)));
        }
        for section in sections.iter().filter(|s| !s.table.is_empty()) {
            html.push_str(&format!("<h2>{}</h2>\n", escape(&section.heading)));
            push_table(&mut html, &section.table);
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn push_table(html: &mut String, table: &Table) {
    html.push_str("<table border=\"1\">\n<thead>\n<tr>");
    for header in &table.headers {
        html.push_str(&format!("<th>{}</th>", escape(header)));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in &table.rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
}

/// Write the report to `path`. The file is closed before returning, on
/// success and on failure.
pub fn write_html(path: &Path, report: &dyn Report) -> Result<()> {
    let report_err = |source: std::io::Error| InsightsError::Report {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(report_err)?;
    }

    let html = render_html(report.title(), &report.table(), &report.summary(), &report.sections());
    let file = File::create(path).map_err(report_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(html.as_bytes()).map_err(report_err)?;
    writer.flush().map_err(report_err)?;
    log::info!("wrote {}", path.display());
    Ok(())
}

pub fn print_table(report: &dyn Report, limit: usize) {
    let table = report.table();
    println!("{}", style(report.title()).bold());
    println!("{}", "─".repeat(60));

    if table.is_empty() {
        println!("{EMPTY_PLACEHOLDER}");
        return;
    }

    println!("{}", style(table.headers.join(" | ")).bold());
    for row in table.rows.iter().take(limit) {
        println!("{}", row.join(" | "));
    }
    if table.rows.len() > limit {
        println!("\n... and {} more rows", table.rows.len() - limit);
    }
    for line in report.summary() {
        println!("\n -> {}", style(line).cyan());
    }
    for section in report.sections().iter().filter(|s| !s.table.is_empty()) {
        println!("\n{}", style(&section.heading).bold());
        for row in section.table.rows.iter().take(limit) {
            println!("{}", row.join(" | "));
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
