//! Web front end of the image-pair survey.
//!
//! Serves the cohort page, walks each respondent through their sampled
//! questions and stores the finished responses through the configured sink.

pub mod config;
pub mod logging;
pub mod render;
pub mod store;
pub mod web;

pub use config::{Cli, SinkKind};
pub use logging::init_logging;
pub use store::{Catalog, SessionStore};
pub use web::{AppState, SESSION_COOKIE, Settings, app, session_id};

use std::sync::Arc;
use survey::DirListing;

/// Index the configured directories and assemble the shared state.
pub fn build_state(cli: &Cli) -> anyhow::Result<AppState> {
    let catalog = Catalog::load(
        Box::new(DirListing::images(&cli.real_dir)),
        Box::new(DirListing::images(&cli.synth_dir)),
        cli.delimiter,
    )?;
    if catalog.universe().is_empty() {
        tracing::warn!(
            real = %cli.real_dir.display(),
            synth = %cli.synth_dir.display(),
            "no image pairs found, sessions will finish immediately"
        );
    }
    Ok(AppState {
        catalog: Arc::new(catalog),
        sessions: Arc::new(SessionStore::new(cli.session_ttl(), cli.max_sessions)),
        sink: cli.results_sink()?,
        settings: Arc::new(Settings {
            question_count: cli.question_count,
            cohorts: cli.cohorts(),
            real_dir: cli.real_dir.clone(),
            synth_dir: cli.synth_dir.clone(),
        }),
    })
}
