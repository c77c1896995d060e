//! Remote spreadsheet reached through an HTTP endpoint.
//!
//! The endpoint (for example a spreadsheet script deployed as a web app)
//! receives `{"label": "...", "columns": [...], "rows": [[...], ...]}` and is
//! expected to append the rows to its sheet.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::SinkError;
use crate::sink::{COLUMNS, ResultsSink, Row, Submission};

#[derive(Serialize)]
struct Payload<'a> {
    label: &'a str,
    columns: [&'static str; 8],
    rows: Vec<Row>,
}

/// Posts each submission as JSON to a remote endpoint.
#[derive(Clone)]
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ResultsSink for WebhookSink {
    async fn append(&self, submission: &Submission) -> Result<(), SinkError> {
        let payload = Payload {
            label: &submission.label,
            columns: COLUMNS,
            rows: submission.rows(),
        };
        let body = serde_json::to_vec(&payload)?;
        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SinkError::Rejected {
                status: status.as_u16(),
            });
        }
        debug!(url = %self.url, rows = payload.rows.len(), "posted rows");
        Ok(())
    }
}
