use assert_cmd::prelude::*;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MERGED_QUERY: &str = "is:pr is:merged repo:octo/widgets merged:2023-02-01..2023-02-28";

fn pr(number: u64, title: &str, created: &str, closed: &str, merged: Option<&str>) -> serde_json::Value {
    json!({
        "number": number,
        "title": title,
        "user": {"login": "alice"},
        "state": "closed",
        "created_at": created,
        "closed_at": closed,
        "pull_request": {"merged_at": merged}
    })
}

fn page(items: Vec<serde_json::Value>) -> ResponseTemplate {
    let total = items.len();
    ResponseTemplate::new(200).set_body_json(json!({"total_count": total, "items": items}))
}

/// Runs the binary off the async runtime so the mock server keeps serving.
async fn insights(api_url: String, subcommand: &'static str, report: PathBuf) -> Output {
    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("gitlog-insights")
            .unwrap()
            .env("TOKEN", "test-token")
            .env_remove("RUST_LOG")
            .args([subcommand, "octo/widgets", "--api-url", api_url.as_str()])
            .args(["--since", "2023-02-01", "--until", "2023-02-28", "--json", "--output"])
            .arg(report)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

fn json_stdout(output: &Output) -> serde_json::Value {
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn review_time_measures_merged_pull_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .and(query_param("q", MERGED_QUERY))
        .respond_with(page(vec![pr(
            1,
            "merged",
            "2023-01-20T00:00:00Z",
            "2023-02-03T00:00:00Z",
            Some("2023-02-03T00:00:00Z"),
        )]))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .respond_with(page(vec![pr(
            2,
            "rejected",
            "2023-02-01T00:00:00Z",
            "2023-02-02T00:00:00Z",
            None,
        )]))
        .with_priority(10)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let report = dir.path().join("review.html");
    let v = json_stdout(&insights(server.uri(), "review-time", report.clone()).await);

    let reviews = v["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["number"], 1);
    assert_eq!(reviews[0]["review_seconds"], 14 * 86_400);
    assert!(fs::read_to_string(&report).unwrap().contains("merged"));
}

#[tokio::test(flavor = "multi_thread")]
async fn pr_size_reads_files_of_each_pull_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .respond_with(page(vec![pr(
            5,
            "big change",
            "2023-02-01T00:00:00Z",
            "2023-02-02T00:00:00Z",
            None,
        )]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls/5/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"filename": "src/a.rs", "status": "modified", "additions": 300, "deletions": 50, "changes": 350},
            {"filename": "src/b.rs", "status": "added", "additions": 40, "deletions": 0, "changes": 40}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let v = json_stdout(&insights(server.uri(), "pr-size", dir.path().join("size.html")).await);

    let sizes = v["sizes"].as_array().unwrap();
    assert_eq!(sizes.len(), 1);
    assert_eq!(sizes[0]["files_changed"], 2);
    assert_eq!(sizes[0]["lines_changed"], 390);
    assert_eq!(sizes[0]["bucket"], "medium");
    assert_eq!(v["most_lines"], 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn merge_activity_writes_grid_and_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .and(query_param("q", MERGED_QUERY))
        .respond_with(page(vec![
            pr(1, "first", "2023-02-01T00:00:00Z", "2023-02-06T10:00:00Z", Some("2023-02-06T10:00:00Z")),
            pr(2, "second", "2023-02-01T00:00:00Z", "2023-02-13T10:00:00Z", Some("2023-02-13T10:00:00Z")),
            pr(3, "third", "2023-02-01T00:00:00Z", "2023-02-07T10:00:00Z", Some("2023-02-07T10:00:00Z")),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let report = dir.path().join("merges.html");
    let v = json_stdout(&insights(server.uri(), "merge-activity", report.clone()).await);

    assert_eq!(v["peaks"][0]["weekday"], "Monday");
    assert_eq!(v["peaks"][0]["merges"], 2);
    assert_eq!(v["merged"].as_array().unwrap().len(), 3);

    let html = fs::read_to_string(&report).unwrap();
    assert!(html.contains("Maximum merges happened on Monday in 2023-February: 2"));
    assert!(html.contains("<h2>Merged Pull Requests</h2>"));
    assert!(html.contains("third"));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_platform_result_writes_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .respond_with(page(Vec::new()))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let report = dir.path().join("empty.html");
    let output = insights(server.uri(), "review-time", report.clone()).await;
    let v = json_stdout(&output);

    assert!(v["reviews"].as_array().unwrap().is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No data available between the specified dates."));
    let html = fs::read_to_string(&report).unwrap();
    assert!(html.contains("No data available between the specified dates."));
}
