use chrono::{Local, TimeZone};
use httpmock::prelude::*;
use survey::{CsvFileSink, ResponseRecord, ResultsSink, SinkError, Submission, WebhookSink};
use uuid::Uuid;

const SESSION: &str = "6f1c2a9e-3b4d-4e5f-8a6b-7c8d9e0f1a2b";

fn submission(label: &str, prefixes: &[&str]) -> Submission {
    Submission {
        label: label.into(),
        session: Uuid::parse_str(SESSION).unwrap(),
        timestamp: Local.with_ymd_and_hms(2024, 11, 14, 9, 30, 0).unwrap(),
        records: prefixes
            .iter()
            .map(|p| ResponseRecord {
                grade: label.into(),
                prefix: (*p).into(),
                real_filename: format!("{p}.jpg"),
                synth_filename: format!("{p}_synthesized_image.jpg"),
                similarity_rating: "4".into(),
                weather_rating: "5".into(),
            })
            .collect(),
    }
}

#[tokio::test]
async fn csv_appends_without_repeating_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");
    let sink = CsvFileSink::new(&path);

    sink.append(&submission("1", &["a_1", "b_2"])).await.unwrap();
    sink.append(&submission("2", &["c_3"])).await.unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "timestamp,grade,prefix,real_filename,synth_filename,similarity_rating,weather_rating,session"
    );
    assert_eq!(
        lines[1],
        format!("2024-11-14 09:30:00,1,a_1,a_1.jpg,a_1_synthesized_image.jpg,4,5,{SESSION}")
    );
    assert!(lines[3].starts_with("2024-11-14 09:30:00,2,c_3,"));
}

#[tokio::test]
async fn csv_keeps_existing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");
    std::fs::write(&path, "timestamp,grade\r\nold,row\r\n").unwrap();

    CsvFileSink::new(&path)
        .append(&submission("1", &["a_1"]))
        .await
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("timestamp,grade\r\nold,row\r\n"));
    assert_eq!(text.lines().count(), 3);
}

#[tokio::test]
async fn csv_reports_unwritable_path() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CsvFileSink::new(dir.path().join("missing").join("results.csv"));
    let err = sink.append(&submission("1", &["a_1"])).await.unwrap_err();
    assert!(matches!(err, SinkError::Io(_)));
}

#[tokio::test]
async fn webhook_posts_rows() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/sheet")
                .header("content-type", "application/json")
                .body_contains("\"label\":\"1\"")
                .body_contains("a_1_synthesized_image.jpg")
                .body_contains(SESSION);
            then.status(200);
        })
        .await;

    let sink = WebhookSink::new(server.url("/sheet"));
    sink.append(&submission("1", &["a_1"])).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn webhook_surfaces_rejection() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/sheet");
            then.status(500);
        })
        .await;

    let sink = WebhookSink::new(server.url("/sheet"));
    let err = sink.append(&submission("1", &["a_1"])).await.unwrap_err();
    assert!(matches!(err, SinkError::Rejected { status: 500 }));
}
