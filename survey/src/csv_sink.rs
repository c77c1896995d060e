//! Local spreadsheet file holding every completed session.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::SinkError;
use crate::sink::{COLUMNS, ResultsSink, Submission};

/// Appends rows to a CSV file, writing the header when the file is new.
pub struct CsvFileSink {
    path: PathBuf,
    write: Mutex<()>,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn line<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = fields
        .into_iter()
        .map(|f| escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str("\r\n");
    out
}

/// Output that can be cut back to an earlier length.
trait Truncate: AsyncWrite + Unpin {
    async fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    async fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len).await
    }
}

/// Write `bytes` after `start` bytes of existing content. A failed write is
/// cut back to `start` so a retried submission is not stored twice.
async fn append_all<W: Truncate>(out: &mut W, start: u64, bytes: &[u8]) -> io::Result<()> {
    let written = async {
        out.write_all(bytes).await?;
        out.flush().await
    }
    .await;
    if let Err(err) = written {
        if let Err(undo) = out.truncate(start).await {
            warn!(%undo, start, "could not remove partially written rows");
        }
        return Err(err);
    }
    Ok(())
}

#[async_trait]
impl ResultsSink for CsvFileSink {
    async fn append(&self, submission: &Submission) -> Result<(), SinkError> {
        let _guard = self.write.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let start = file.metadata().await?.len();
        let mut buf = String::new();
        if start == 0 {
            buf.push_str(&line(COLUMNS));
        }
        for row in submission.rows() {
            buf.push_str(&line(row));
        }
        append_all(&mut file, start, buf.as_bytes()).await?;
        debug!(path = %self.path.display(), rows = submission.records.len(), "appended rows");
        Ok(())
    }
}
