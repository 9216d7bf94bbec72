//! HTTP server for fonttag (made by FontLab https://www.fontlab.com/)
//!
//! The same operations as the subcommands, as a small JSON API over one
//! shared [`Library`]. The registry is loaded once at startup; taggings added
//! or removed through the API live until the process exits.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task;
use tracing::info;

use fonttag_core::csv::TaggingRecord;
use fonttag_core::exemplars::Exemplars;
use fonttag_core::library::Library;
use fonttag_core::lint::LintWarning;
use fonttag_core::location::Location;
use fonttag_core::similarity::DEFAULT_NEIGHBOURS;

use crate::{load_library, DataArgs};

type SharedLibrary = Arc<Mutex<Library>>;
type ApiError = (StatusCode, String);

#[derive(Clone, Debug, Deserialize)]
pub struct LintRequest {
    pub family: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LintResponse {
    pub family: String,
    pub warnings: Vec<LintWarning>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SimilarRequest {
    pub family: String,
    /// Ranking depth; the family itself takes one slot.
    pub count: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimilarResponse {
    pub family: String,
    pub similar: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExemplarsRequest {
    pub tag: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AddTaggingRequest {
    pub family: String,
    pub tag: String,
    pub score: f32,
    /// `axis,axis@value,value`; absent for a static tagging.
    pub location: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RemoveTaggingRequest {
    pub family: String,
    pub tag: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChangeResponse {
    pub changed: bool,
}

/// Load the data directory and serve until the listener fails.
pub async fn serve(bind: &str, data: DataArgs) -> Result<()> {
    let library = task::spawn_blocking(move || load_library(&data))
        .await
        .context("loading data")??;

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding HTTP server to {bind}"))?;
    info!(bind, "serving");

    axum::serve(listener, router(library))
        .await
        .context("serving HTTP")?;
    Ok(())
}

pub fn router(library: Library) -> Router {
    let state: SharedLibrary = Arc::new(Mutex::new(library));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/lint", post(lint_handler))
        .route("/similar", post(similar_handler))
        .route("/exemplars", post(exemplars_handler))
        .route("/taggings/add", post(add_tagging_handler))
        .route("/taggings/remove", post(remove_tagging_handler))
        .route("/taggings/export", get(export_handler))
        .with_state(state)
}

async fn lint_handler(
    State(state): State<SharedLibrary>,
    Json(req): Json<LintRequest>,
) -> Result<Json<LintResponse>, ApiError> {
    let warnings = lock(&state)?
        .lint(&req.family)
        .ok_or_else(|| not_found(format!("unknown family: {}", req.family)))?;

    Ok(Json(LintResponse {
        family: req.family,
        warnings,
    }))
}

async fn similar_handler(
    State(state): State<SharedLibrary>,
    Json(req): Json<SimilarRequest>,
) -> Result<Json<SimilarResponse>, ApiError> {
    let count = req.count.unwrap_or(DEFAULT_NEIGHBOURS);
    let similar = lock(&state)?.similar_families(&req.family, count);

    Ok(Json(SimilarResponse {
        family: req.family,
        similar,
    }))
}

async fn exemplars_handler(
    State(state): State<SharedLibrary>,
    Json(req): Json<ExemplarsRequest>,
) -> Result<Json<Exemplars>, ApiError> {
    let exemplars = lock(&state)?
        .exemplars(&req.tag)
        .cloned()
        .ok_or_else(|| not_found(format!("unknown tag: {}", req.tag)))?;
    Ok(Json(exemplars))
}

async fn add_tagging_handler(
    State(state): State<SharedLibrary>,
    Json(req): Json<AddTaggingRequest>,
) -> Result<Json<ChangeResponse>, ApiError> {
    let location = match req.location.as_deref().map(str::trim) {
        Some(spec) if !spec.is_empty() => Some(Location::parse_spec(spec).map_err(to_bad_request)?),
        _ => None,
    };

    let record = TaggingRecord {
        family: req.family,
        location,
        tag: req.tag,
        score: req.score,
    };
    let changed = lock(&state)?.import_record(record);
    Ok(Json(ChangeResponse { changed }))
}

async fn remove_tagging_handler(
    State(state): State<SharedLibrary>,
    Json(req): Json<RemoveTaggingRequest>,
) -> Result<Json<ChangeResponse>, ApiError> {
    let changed = lock(&state)?
        .remove_tagging(&req.family, &req.tag)
        .is_some();
    Ok(Json(ChangeResponse { changed }))
}

async fn export_handler(State(state): State<SharedLibrary>) -> Result<String, ApiError> {
    Ok(lock(&state)?.export_taggings())
}

fn lock(state: &SharedLibrary) -> Result<MutexGuard<'_, Library>, ApiError> {
    state.lock().map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "library lock poisoned".to_string(),
        )
    })
}

fn not_found(message: String) -> ApiError {
    (StatusCode::NOT_FOUND, message)
}

fn to_bad_request(err: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use fonttag_core::lint::{LintRule, Severity};
    use fonttag_core::location::axis_tag;
    use fonttag_core::registry::Registry;
    use fonttag_core::tagging::{Axis, Font, Tagging};
    use fonttag_core::tags::TagDefinition;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn library() -> Library {
        let wght = axis_tag("wght").unwrap();
        let registry = Registry::builder()
            .family(Font::new("Roboto", Vec::new()))
            .family(Font::new("Roboto Flex", vec![Axis::new(wght, 100.0, 1000.0)]))
            .family(Font::new("Lato", Vec::new()))
            .tag(TagDefinition::new("/Expressive/Loud"))
            .rule(LintRule::new(
                r#"tags["/Expressive/Loud"] > 80"#,
                Severity::Warn,
                "Too loud",
            ))
            .embedding("Roboto", vec![0.0, 0.0])
            .embedding("Lato", vec![1.0, 0.0])
            .embedding("Roboto Flex", vec![0.0, 3.0])
            .build()
            .unwrap();

        let mut library = Library::new(Arc::new(registry));
        library.add_tagging(Tagging::new_static("Roboto", "/Expressive/Loud", 95.0));
        library
    }

    fn post(uri: &str, payload: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = router(library());
        let request = Request::get("/health").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn lint_endpoint_reports_warnings() {
        let app = router(library());

        let response = app
            .oneshot(post("/lint", json!({"family": "Roboto"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let parsed: LintResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(parsed.family, "Roboto");
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].description, "Too loud");
    }

    #[tokio::test]
    async fn lint_endpoint_rejects_unknown_family() {
        let app = router(library());

        let response = app
            .oneshot(post("/lint", json!({"family": "Nope"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).expect("utf8 body");
        assert!(text.contains("unknown family"), "body: {text}");
    }

    #[tokio::test]
    async fn similar_endpoint_ranks_neighbours() {
        let app = router(library());

        let response = app
            .oneshot(post("/similar", json!({"family": "Roboto", "count": 2})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let parsed: SimilarResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(parsed.similar, vec!["Lato".to_string()]);
    }

    #[tokio::test]
    async fn exemplars_endpoint_returns_buckets() {
        let app = router(library());

        let response = app
            .oneshot(post("/exemplars", json!({"tag": "/Expressive/Loud"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["high"][0]["font"], "Roboto");
        assert_eq!(body["low"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn taggings_can_be_added_removed_and_exported() {
        let app = router(library());

        let add = json!({
            "family": "Roboto Flex",
            "tag": "/Expressive/Loud",
            "score": 40,
            "location": "wght@700"
        });
        let response = app.clone().oneshot(post("/taggings/add", add)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["changed"], true);

        let remove = json!({"family": "Roboto", "tag": "/Expressive/Loud"});
        let response = app
            .clone()
            .oneshot(post("/taggings/remove", remove))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["changed"], true);

        let request = Request::get("/taggings/export").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            String::from_utf8(body.to_vec()).unwrap(),
            r#"Roboto Flex,"wght@700",/Expressive/Loud,40"#
        );
    }

    #[tokio::test]
    async fn add_endpoint_rejects_bad_locations() {
        let app = router(library());

        let add = json!({
            "family": "Roboto Flex",
            "tag": "/Expressive/Loud",
            "score": 40,
            "location": "wght@heavy"
        });
        let response = app.oneshot(post("/taggings/add", add)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
