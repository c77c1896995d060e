use clap::Parser;
use std::net::SocketAddr;
use survey_web::{Cli, app, build_state, init_logging};
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging();

    let state = build_state(&cli)?;
    info!(
        pairs = state.catalog.universe().len(),
        questions = cli.question_count,
        sink = ?cli.sink,
        "survey ready"
    );

    let addr: SocketAddr = cli.addr.parse()?;
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
