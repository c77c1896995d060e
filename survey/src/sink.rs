//! Destinations for completed sessions.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::SinkError;
use crate::session::ResponseRecord;

/// Column headers, in the order every sink writes them. The trailing
/// `session` column groups the rows of one submission.
pub const COLUMNS: [&str; 8] = [
    "timestamp",
    "grade",
    "prefix",
    "real_filename",
    "synth_filename",
    "similarity_rating",
    "weather_rating",
    "session",
];

/// One written row, in [`COLUMNS`] order.
pub type Row = [String; 8];

/// Format used for the timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The responses of one completed session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Submission {
    /// Label identifying the session, the respondent's cohort.
    pub label: String,
    /// Id of the session the records came from.
    pub session: Uuid,
    pub timestamp: DateTime<Local>,
    pub records: Vec<ResponseRecord>,
}

impl Submission {
    /// One row per record, in [`COLUMNS`] order.
    pub fn rows(&self) -> Vec<Row> {
        let timestamp = self.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let session = self.session.to_string();
        self.records
            .iter()
            .map(|r| {
                [
                    timestamp.clone(),
                    r.grade.clone(),
                    r.prefix.clone(),
                    r.real_filename.clone(),
                    r.synth_filename.clone(),
                    r.similarity_rating.clone(),
                    r.weather_rating.clone(),
                    session.clone(),
                ]
            })
            .collect()
    }
}

/// Append-only store for completed sessions.
///
/// Implementations must append and never overwrite rows written by earlier
/// calls.
#[async_trait]
pub trait ResultsSink: Send + Sync {
    async fn append(&self, submission: &Submission) -> Result<(), SinkError>;
}

/// Sink keeping every submission in memory.
#[derive(Clone, Default)]
pub struct MemorySink {
    submissions: Arc<Mutex<Vec<Submission>>>,
}

impl MemorySink {
    /// Snapshot of everything appended so far.
    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().clone()
    }

    /// Total number of rows across all submissions.
    pub fn row_count(&self) -> usize {
        self.lock().iter().map(|s| s.records.len()).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Submission>> {
        self.submissions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ResultsSink for MemorySink {
    async fn append(&self, submission: &Submission) -> Result<(), SinkError> {
        self.lock().push(submission.clone());
        Ok(())
    }
}
