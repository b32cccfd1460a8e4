use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::GatewayError;
use crate::schedule;
use crate::search;
use crate::store::ResultView;
use crate::types::{
    ContentType, Endpoint, Schedule, ScheduledSearch, SearchResult, SearchTag,
};
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/search", get(search_handler))
        .route("/search/:endpoint", get(endpoint_search_handler))
        .route("/results", get(results_handler))
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/:id", delete(delete_tag))
        .route("/schedules", get(list_schedules).post(create_schedule))
        .route("/schedules/:id", delete(delete_schedule))
        .route("/schedules/:id/toggle", post(toggle_schedule))
        .route("/saved", get(list_saved))
        .route("/saved/toggle", post(toggle_saved))
        .route("/scheduled/run", post(run_scheduled))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "naver-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
    #[serde(rename = "type", default)]
    content_type: ContentType,
    #[serde(default = "default_page")]
    page: u32,
}

fn default_page() -> u32 {
    1
}

/// Page-based search. The outcome — results or failure — also becomes the
/// live view, mirroring what a client would render.
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchResult>>, GatewayError> {
    let query = params.query.as_deref().unwrap_or("");

    match search::search(&state, query, params.content_type, params.page).await {
        Ok(results) => {
            state.store.set_results(results.clone()).await;
            Ok(Json(results))
        }
        Err(e) => {
            state.store.set_search_error(e.to_string()).await;
            Err(e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct EndpointSearchParams {
    query: Option<String>,
    #[serde(default = "default_display")]
    display: u32,
    #[serde(default = "default_start")]
    start: u32,
}

fn default_display() -> u32 {
    search::PAGE_SIZE
}

fn default_start() -> u32 {
    1
}

/// Offset-based proxy variant. Unknown endpoints alias onto blog; the live
/// view is untouched.
async fn endpoint_search_handler(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    Query(params): Query<EndpointSearchParams>,
) -> Result<Json<Vec<SearchResult>>, GatewayError> {
    let endpoint = match endpoint.as_str() {
        "news" => Endpoint::News,
        _ => Endpoint::Blog,
    };
    let query = params.query.as_deref().unwrap_or("");

    let results =
        search::search_endpoint(&state, query, endpoint, params.display, params.start).await?;
    Ok(Json(results))
}

async fn results_handler(State(state): State<Arc<AppState>>) -> Json<ResultView> {
    Json(state.store.view().await)
}

// Tags

#[derive(Debug, Deserialize)]
struct NewTag {
    keyword: String,
    #[serde(default)]
    content_type: ContentType,
}

async fn list_tags(State(state): State<Arc<AppState>>) -> Json<Vec<SearchTag>> {
    Json(state.store.search_tags().await)
}

async fn create_tag(
    State(state): State<Arc<AppState>>,
    Json(new_tag): Json<NewTag>,
) -> Result<(StatusCode, Json<SearchTag>), GatewayError> {
    let keyword = new_tag.keyword.trim().to_string();
    if keyword.is_empty() {
        return Err(GatewayError::Validation(
            "tag keyword must not be empty".to_string(),
        ));
    }

    let tag = state.store.add_tag(keyword, new_tag.content_type).await;
    info!("created tag '{}' ({})", tag.keyword, tag.id);
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn delete_tag(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> StatusCode {
    if state.store.remove_tag(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// Schedules

#[derive(Debug, Deserialize)]
struct NewSchedule {
    search_tags: Vec<SearchTag>,
    schedule: Schedule,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

async fn list_schedules(State(state): State<Arc<AppState>>) -> Json<Vec<ScheduledSearch>> {
    Json(state.store.scheduled_searches().await)
}

async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Json(new_schedule): Json<NewSchedule>,
) -> Result<(StatusCode, Json<ScheduledSearch>), GatewayError> {
    if new_schedule.search_tags.is_empty() {
        return Err(GatewayError::Validation(
            "a schedule requires at least one tag".to_string(),
        ));
    }
    schedule::validate_schedule(&new_schedule.schedule)?;

    let scheduled = state
        .store
        .add_schedule(
            new_schedule.search_tags,
            new_schedule.schedule,
            new_schedule.is_active,
        )
        .await;
    info!("created schedule {} at {}", scheduled.id, scheduled.schedule.time);
    Ok((StatusCode::CREATED, Json(scheduled)))
}

async fn delete_schedule(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> StatusCode {
    if state.store.remove_schedule(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Serialize)]
struct ToggleResponse {
    id: String,
    is_active: bool,
}

async fn toggle_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ToggleResponse>, StatusCode> {
    match state.store.toggle_schedule(&id).await {
        Some(is_active) => Ok(Json(ToggleResponse { id, is_active })),
        None => Err(StatusCode::NOT_FOUND),
    }
}

// Bookmarks

async fn list_saved(State(state): State<Arc<AppState>>) -> Json<Vec<SearchResult>> {
    Json(state.store.saved_results().await)
}

#[derive(Debug, Serialize)]
struct ToggleSavedResponse {
    saved: bool,
}

async fn toggle_saved(
    State(state): State<Arc<AppState>>,
    Json(result): Json<SearchResult>,
) -> Json<ToggleSavedResponse> {
    let saved = state.store.toggle_saved(result).await;
    Json(ToggleSavedResponse { saved })
}

// Remote evaluation trigger

#[derive(Debug, Serialize)]
struct ScheduledRunResponse {
    success: bool,
    fired: usize,
    failed: usize,
}

/// One remote evaluation pass, the equivalent of an external timer trigger.
async fn run_scheduled(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ScheduledRunResponse>, GatewayError> {
    let now = Local::now();
    let outcomes = schedule::evaluate_remote(&state, &now).await?;
    let failed = outcomes.iter().filter(|o| o.failed()).count();

    Ok(Json(ScheduledRunResponse {
        success: true,
        fired: outcomes.len(),
        failed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, Config};
    use crate::store::StateStore;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    fn test_app(config: Config) -> (Arc<AppState>, Router) {
        let state = Arc::new(
            AppState::new(config, reqwest::Client::new(), StateStore::ephemeral()).unwrap(),
        );
        let app = router(Arc::clone(&state));
        (state, app)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check_responds() {
        let (_, app) = test_app(config::test_config("http://localhost:9"));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["service"], "naver-relay");
    }

    #[tokio::test]
    async fn search_without_query_is_a_400_envelope() {
        let (state, app) = test_app(config::test_config("http://localhost:9"));

        let response = app
            .oneshot(Request::builder().uri("/search").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "query parameter is required");

        // The failure also becomes the live view.
        let view = state.store.view().await;
        assert!(view.results.is_empty());
        assert!(view.error.is_some());
    }

    #[tokio::test]
    async fn search_without_credentials_reports_which_is_missing() {
        let mut config = config::test_config("http://localhost:9");
        config.naver.client_id = None;
        let (_, app) = test_app(config);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/search?query=rust")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["debug"]["has_client_id"], false);
        assert_eq!(json["debug"]["has_client_secret"], true);
    }

    #[tokio::test]
    async fn tag_lifecycle_cascades_through_the_router() {
        let (state, app) = test_app(config::test_config("http://localhost:9"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tags")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"keyword": "rust", "content_type": "blog"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let tag = body_json(response).await;
        let tag_id = tag["id"].as_str().unwrap().to_string();

        let schedule_body = serde_json::json!({
            "search_tags": [tag],
            "schedule": {"type": "daily", "time": "09:00"}
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/schedules")
                    .header("content-type", "application/json")
                    .body(Body::from(schedule_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/tags/{}", tag_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        assert!(state.store.scheduled_searches().await.is_empty());
    }

    #[tokio::test]
    async fn weekly_schedule_without_days_is_rejected() {
        let (_, app) = test_app(config::test_config("http://localhost:9"));

        let body = serde_json::json!({
            "search_tags": [{"id": "t1", "keyword": "rust", "content_type": "all"}],
            "schedule": {"type": "weekly", "time": "10:00", "days": []}
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/schedules")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn scheduled_run_without_a_datastore_is_a_configuration_error() {
        let (_, app) = test_app(config::test_config("http://localhost:9"));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/scheduled/run")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "remote datastore is not configured");
    }
}
