use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use survey::{Answer, ResultsSink, Step, SurveySession};
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::render;
use crate::store::{Catalog, SessionStore};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "survey_session";

/// Settings fixed for the lifetime of the server.
#[derive(Clone, Debug)]
pub struct Settings {
    pub question_count: usize,
    pub cohorts: Vec<String>,
    pub real_dir: PathBuf,
    pub synth_dir: PathBuf,
}

/// State shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionStore>,
    pub sink: Arc<dyn ResultsSink>,
    pub settings: Arc<Settings>,
}

#[derive(Deserialize)]
pub struct StartForm {
    #[serde(default)]
    pub grade: String,
}

/// Extract the session id from the request cookies.
pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

fn session_cookie(id: Uuid) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    debug!("cohort page requested");
    Html(render::cohort_page(&state.settings.cohorts, None))
}

/// Start a fresh session for the submitted cohort, replacing any previous one.
///
/// A previous session whose responses never reached the sink is delivered
/// first; while that keeps failing it stays in place and no new one starts.
pub async fn start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<StartForm>,
) -> Response {
    let grade = form.grade.trim();
    if grade.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Html(render::cohort_page(
                &state.settings.cohorts,
                Some("Please choose your cohort."),
            )),
        )
            .into_response();
    }
    if let Some(old) = session_id(&headers) {
        if let Some(handle) = state.sessions.get(old) {
            let mut previous = handle.lock().await;
            if previous.awaiting_delivery() {
                if let Err(err) = previous.advance(state.sink.as_ref(), Local::now()).await {
                    warn!(%old, %err, "previous responses still not stored, keeping session");
                    return (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Html(render::save_failed_page()),
                    )
                        .into_response();
                }
            }
        }
        state.sessions.remove(old);
    }
    let universe = state.catalog.universe();
    let session = SurveySession::start(
        &universe,
        grade,
        state.settings.question_count,
        &mut rand::thread_rng(),
    );
    let id = state.sessions.insert(session);
    info!(%id, grade, "new respondent");
    (
        [(header::SET_COOKIE, session_cookie(id))],
        Redirect::to("/survey"),
    )
        .into_response()
}

pub async fn survey_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    proceed(&state, &headers, None).await
}

pub async fn survey_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(answer): Form<Answer>,
) -> Response {
    proceed(&state, &headers, Some(answer)).await
}

async fn proceed(state: &AppState, headers: &HeaderMap, answer: Option<Answer>) -> Response {
    let Some(handle) = session_id(headers).and_then(|id| state.sessions.get(id)) else {
        debug!("no session, back to cohort page");
        return Redirect::to("/").into_response();
    };
    let mut session = handle.lock().await;

    if let Some(answer) = answer {
        if let Err(err) = session.submit_answer(&answer) {
            return match session.pending_question() {
                Some(question) if err.is_validation() => (
                    StatusCode::BAD_REQUEST,
                    Html(render::question_page(
                        &question,
                        Some("Please answer both questions."),
                    )),
                )
                    .into_response(),
                _ => {
                    error!(%err, "unexpected answer failure");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            };
        }
    }

    match session.advance(state.sink.as_ref(), Local::now()).await {
        Ok(Step::Question(question)) => Html(render::question_page(&question, None)).into_response(),
        Ok(Step::Complete) => Html(render::done_page(session.responses().len())).into_response(),
        Err(err) => {
            warn!(%err, "responses not stored, waiting for retry");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Html(render::save_failed_page()),
            )
                .into_response()
        }
    }
}

/// Rebuild the pair universe from the configured directories.
pub async fn reindex(State(state): State<AppState>) -> Response {
    let catalog = state.catalog.clone();
    match tokio::task::spawn_blocking(move || catalog.reload()).await {
        Ok(Ok(pairs)) => Json(json!({ "pairs": pairs })).into_response(),
        Ok(Err(err)) => {
            error!(%err, "reindex failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
        Err(err) => {
            error!(%err, "reindex task panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "pairs": state.catalog.universe().len(),
        "sessions": state.sessions.len(),
    }))
}

/// Build the application router with the provided state.
pub fn app(state: AppState) -> Router {
    let real = ServeDir::new(&state.settings.real_dir);
    let synth = ServeDir::new(&state.settings.synth_dir);
    Router::new()
        .route("/", get(index).post(start))
        .route("/survey", get(survey_page).post(survey_answer))
        .route("/reindex", post(reindex))
        .route("/health", get(health))
        .nest_service("/real", real)
        .nest_service("/synth", synth)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_session_cookie() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={id}")).unwrap(),
        );
        assert_eq!(session_id(&headers), Some(id));
    }

    #[test]
    fn ignores_malformed_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("survey_session=not-a-uuid"),
        );
        assert_eq!(session_id(&headers), None);
    }
}
