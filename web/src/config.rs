use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use survey::{CsvFileSink, MemorySink, ResultsSink, WebhookSink};

/// Cohort labels offered on the entry page when none are configured.
pub const DEFAULT_COHORTS: [&str; 7] = [
    "本科1", "本科2", "本科3", "本科4", "本科5", "専攻科1", "専攻科2",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Append to a local CSV file.
    Csv,
    /// Post rows to a remote spreadsheet endpoint.
    Webhook,
    /// Keep rows in memory (lost on exit).
    Memory,
}

/// Command line and environment configuration.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Address to bind the HTTP server
    #[arg(long, env = "SURVEY_ADDR", default_value = "127.0.0.1:3000")]
    pub addr: String,

    /// Directory holding the real photographs
    #[arg(long, env = "REAL_DIR", default_value = "static/chichi_img")]
    pub real_dir: PathBuf,

    /// Directory holding the synthesized images
    #[arg(long, env = "SYNTH_DIR", default_value = "static/images")]
    pub synth_dir: PathBuf,

    /// Questions drawn per respondent
    #[arg(long, env = "QUESTION_COUNT", default_value_t = survey::DEFAULT_QUESTION_COUNT)]
    pub question_count: usize,

    /// Delimiter between tokens of synthetic filenames
    #[arg(long, default_value_t = survey::DEFAULT_DELIMITER)]
    pub delimiter: char,

    /// Where completed responses are stored
    #[arg(long, value_enum, env = "RESULTS_SINK", default_value = "csv")]
    pub sink: SinkKind,

    /// CSV file used by the csv sink
    #[arg(long, env = "RESULTS_FILE", default_value = "results.csv")]
    pub results: PathBuf,

    /// Endpoint used by the webhook sink
    #[arg(long, env = "SHEET_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Seconds a session may sit idle before it is forgotten
    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = crate::store::DEFAULT_SESSION_TTL.as_secs())]
    pub session_ttl: u64,

    /// Sessions kept in memory before the least recently used are dropped
    #[arg(long, env = "MAX_SESSIONS", default_value_t = crate::store::DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Cohort label offered on the entry page (repeatable)
    #[arg(long = "cohort")]
    pub cohorts: Vec<String>,
}

impl Cli {
    /// Configured cohorts, falling back to [`DEFAULT_COHORTS`].
    pub fn cohorts(&self) -> Vec<String> {
        if self.cohorts.is_empty() {
            DEFAULT_COHORTS.iter().map(|c| c.to_string()).collect()
        } else {
            self.cohorts.clone()
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl)
    }

    /// Build the configured results sink.
    pub fn results_sink(&self) -> anyhow::Result<Arc<dyn ResultsSink>> {
        Ok(match self.sink {
            SinkKind::Csv => Arc::new(CsvFileSink::new(&self.results)),
            SinkKind::Memory => Arc::new(MemorySink::default()),
            SinkKind::Webhook => {
                let url = self
                    .webhook_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("--webhook-url is required for the webhook sink"))?;
                Arc::new(WebhookSink::new(url))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_layout() {
        let cli = Cli::try_parse_from(["survey-web"]).unwrap();
        assert_eq!(cli.question_count, 10);
        assert_eq!(cli.real_dir, PathBuf::from("static/chichi_img"));
        assert_eq!(cli.cohorts().len(), 7);
        assert_eq!(cli.session_ttl(), Duration::from_secs(7200));
        assert_eq!(cli.max_sessions, 10_000);
    }

    #[test]
    fn cohorts_are_repeatable() {
        let cli = Cli::try_parse_from(["survey-web", "--cohort", "A", "--cohort", "B"]).unwrap();
        assert_eq!(cli.cohorts(), vec!["A", "B"]);
    }

    #[test]
    fn webhook_requires_url() {
        let cli = Cli::try_parse_from(["survey-web", "--sink", "webhook"]).unwrap();
        assert!(cli.results_sink().is_err());
    }
}
