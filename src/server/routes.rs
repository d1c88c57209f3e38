use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::location::Location;
use crate::query::{
    self, DiagnosticFailure, LocationDissociation, LocationLookup, Record, SpatialResolver,
    TermCount, TermDissociation, TermLookup, TermResolver,
};
use crate::server::AppState;
use crate::Error;

/// Maximum number of terms listed by `/debug/terms`
pub const DEBUG_TERMS_LIMIT: usize = 100;

/// Maximum number of term groups returned by `/debug/search_term`
pub const DEBUG_SEARCH_LIMIT: usize = 20;

type ApiError = (StatusCode, Json<Value>);

/// JSON error body carrying the message and the request input that caused it
fn failure(err: &Error, context: &[(&str, &str)]) -> ApiError {
    let status = if err.is_client_error() {
        tracing::warn!("Rejected request: {}", err);
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!("Request failed: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let mut body = Map::new();
    body.insert("error".to_string(), Value::String(err.to_string()));
    for (key, value) in context {
        body.insert(key.to_string(), Value::String(value.to_string()));
    }
    (status, Json(Value::Object(body)))
}

pub async fn health() -> Html<&'static str> {
    Html("<p>Server working!</p>")
}

pub async fn term_studies(
    State(state): State<Arc<AppState>>,
    Path(term): Path<String>,
) -> Result<Json<TermLookup>, ApiError> {
    let lookup_term = term.clone();
    state
        .with_store(move |conn| TermResolver::new(conn).lookup(&lookup_term))
        .await
        .map(Json)
        .map_err(|e| failure(&e, &[("term", term.as_str())]))
}

pub async fn location_studies(
    State(state): State<Arc<AppState>>,
    Path(coords): Path<String>,
) -> Result<Json<LocationLookup>, ApiError> {
    let location =
        Location::parse(&coords).map_err(|e| failure(&e, &[("location", coords.as_str())]))?;
    state
        .with_store(move |conn| SpatialResolver::new(conn).lookup(&location))
        .await
        .map(Json)
        .map_err(|e| failure(&e, &[("location", coords.as_str())]))
}

pub async fn dissociate_terms(
    State(state): State<Arc<AppState>>,
    Path((term_a, term_b)): Path<(String, String)>,
) -> Result<Json<TermDissociation>, ApiError> {
    let (a, b) = (term_a.clone(), term_b.clone());
    state
        .with_store(move |conn| TermResolver::new(conn).dissociate(&a, &b))
        .await
        .map(Json)
        .map_err(|e| failure(&e, &[("term_a", term_a.as_str()), ("term_b", term_b.as_str())]))
}

pub async fn dissociate_terms_records(
    State(state): State<Arc<AppState>>,
    Path((term_a, term_b)): Path<(String, String)>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let (a, b) = (term_a.clone(), term_b.clone());
    state
        .with_store(move |conn| {
            let ids = TermResolver::new(conn).exact_difference_not_in(&a, &b)?;
            query::materialize(conn, &ids)
        })
        .await
        .map(Json)
        .map_err(|e| failure(&e, &[("term_a", term_a.as_str()), ("term_b", term_b.as_str())]))
}

/// Parse both path coordinates before any store access
fn parse_pair(coords_a: &str, coords_b: &str) -> Result<(Location, Location), ApiError> {
    let context = [("location_a", coords_a), ("location_b", coords_b)];
    let a = Location::parse(coords_a).map_err(|e| failure(&e, &context))?;
    let b = Location::parse(coords_b).map_err(|e| failure(&e, &context))?;
    Ok((a, b))
}

pub async fn dissociate_locations(
    State(state): State<Arc<AppState>>,
    Path((coords_a, coords_b)): Path<(String, String)>,
) -> Result<Json<LocationDissociation>, ApiError> {
    let (a, b) = parse_pair(&coords_a, &coords_b)?;
    state
        .with_store(move |conn| SpatialResolver::new(conn).dissociate(&a, &b))
        .await
        .map(Json)
        .map_err(|e| {
            failure(&e, &[("location_a", coords_a.as_str()), ("location_b", coords_b.as_str())])
        })
}

pub async fn dissociate_locations_records(
    State(state): State<Arc<AppState>>,
    Path((coords_a, coords_b)): Path<(String, String)>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let (a, b) = parse_pair(&coords_a, &coords_b)?;
    state
        .with_store(move |conn| {
            let ids = SpatialResolver::new(conn).voxel_difference(&a, &b)?;
            query::materialize(conn, &ids)
        })
        .await
        .map(Json)
        .map_err(|e| {
            failure(&e, &[("location_a", coords_a.as_str()), ("location_b", coords_b.as_str())])
        })
}

#[derive(Serialize)]
pub struct TermList {
    pub count: usize,
    pub terms: Vec<String>,
}

pub async fn debug_terms(State(state): State<Arc<AppState>>) -> Result<Json<TermList>, ApiError> {
    state
        .with_store(|conn| TermResolver::new(conn).distinct_terms(DEBUG_TERMS_LIMIT))
        .await
        .map(|terms| Json(TermList { count: terms.len(), terms }))
        .map_err(|e| failure(&e, &[]))
}

#[derive(Serialize)]
pub struct TermSearch {
    pub keyword: String,
    pub matches: usize,
    pub terms: Vec<TermCount>,
}

pub async fn debug_search_term(
    State(state): State<Arc<AppState>>,
    Path(keyword): Path<String>,
) -> Result<Json<TermSearch>, ApiError> {
    let search = keyword.clone();
    state
        .with_store(move |conn| TermResolver::new(conn).search_terms(&search, DEBUG_SEARCH_LIMIT))
        .await
        .map(|terms| {
            Json(TermSearch {
                keyword: keyword.clone(),
                matches: terms.len(),
                terms,
            })
        })
        .map_err(|e| failure(&e, &[("keyword", keyword.as_str())]))
}

pub async fn test_db(State(state): State<Arc<AppState>>) -> Response {
    match state.with_store(query::run_probes).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            tracing::error!("Store diagnostics failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(DiagnosticFailure::new(&e))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router;
    use crate::storage::testing::{self, insert_coordinate, insert_study, insert_term};
    use crate::config::ServiceConfig;
    use crate::storage::ConnectionProvider;
    use axum::{body::Body, http::Request, Router};
    use rusqlite::Connection;
    use serde_json::json;
    use tower::ServiceExt;

    fn app_with(database_url: Option<String>) -> Router {
        let config = ServiceConfig {
            database_url,
            ..ServiceConfig::default()
        };
        let provider = Arc::new(ConnectionProvider::with_env(config, |_| None));
        router(Arc::new(AppState::new(provider, "amygdala.gif".into())))
    }

    /// App over a seeded temporary database
    fn seeded_app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let url = testing::file_database(dir.path());

        let conn = Connection::open(dir.path().join("ns.db")).unwrap();
        insert_study(&conn, 1, "Fear");
        insert_study(&conn, 2, "Memory");
        insert_study(&conn, 7, "Default mode");
        insert_term(&conn, 1, "amygdala");
        insert_term(&conn, 2, "amygdala");
        insert_term(&conn, 2, "hippocampus");
        insert_coordinate(&conn, 7, 0.0, -52.0, 26.0);
        insert_coordinate(&conn, 2, 100.0, 100.0, 100.0);

        (dir, app_with(Some(url)))
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with(None);
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<p>Server working!</p>");
    }

    #[tokio::test]
    async fn test_dissociate_terms() {
        let (_dir, app) = seeded_app();
        let (status, body) = get(&app, "/dissociate/terms/amygdala/hippocampus").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["match_type"], "exact");
        assert_eq!(body["count"], 1);
        assert_eq!(body["studies"], json!([1]));
        assert_eq!(body["term_a"], "amygdala");
        assert_eq!(body["term_b"], "hippocampus");
    }

    #[tokio::test]
    async fn test_dissociate_terms_records() {
        let (_dir, app) = seeded_app();
        let (status, body) = get(&app, "/dissociate/terms/amygdala/hippocampus/records").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["study_id"], 1);
        assert_eq!(body[0]["title"], "Fear");

        let (status, body) = get(&app, "/dissociate/terms/insula/amygdala/records").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_dissociate_locations() {
        let (_dir, app) = seeded_app();
        let (status, body) = get(&app, "/dissociate/locations/0_-52_26/100_100_100").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["studies"], json!([7]));
        assert_eq!(body["distance_threshold"], 5.0);
        assert_eq!(body["location_a"], "0_-52_26");

        let (status, body) = get(&app, "/dissociate/locations/0_-52_26/100_100_100/records").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["study_id"], 7);
    }

    #[tokio::test]
    async fn test_malformed_coordinates_are_client_errors() {
        // No database configured: a 400 proves no store access was attempted
        let app = app_with(None);

        let (status, body) = get(&app, "/dissociate/locations/0_x_26/1_2_3").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["location_a"], "0_x_26");
        assert_eq!(body["location_b"], "1_2_3");
        assert!(body["error"].as_str().unwrap().contains("0_x_26"));

        let (status, _) = get(&app, "/dissociate/locations/1_2_3/4_5/records").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get(&app, "/locations/1_2/studies").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["location"], "1_2");
    }

    #[tokio::test]
    async fn test_store_failure_is_structured() {
        let app = app_with(None);
        let (status, body) = get(&app, "/dissociate/terms/amygdala/hippocampus").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["term_a"], "amygdala");
        assert_eq!(body["term_b"], "hippocampus");
        assert!(body["error"].as_str().unwrap().contains("DB_URL"));
    }

    #[tokio::test]
    async fn test_single_condition_lookups() {
        let (_dir, app) = seeded_app();

        let (status, body) = get(&app, "/terms/hippocampus/studies").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["match_type"], "exact");
        assert_eq!(body["studies"], json!([2]));

        let (status, body) = get(&app, "/locations/1_-50_25/studies").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["studies"], json!([7]));
    }

    #[tokio::test]
    async fn test_debug_endpoints() {
        let (_dir, app) = seeded_app();

        let (status, body) = get(&app, "/debug/terms").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"count": 2, "terms": ["amygdala", "hippocampus"]}));

        let (status, body) = get(&app, "/debug/search_term/amyg").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"keyword": "amyg", "matches": 1, "terms": [{"term": "amygdala", "count": 2}]})
        );
    }

    #[tokio::test]
    async fn test_db_report() {
        let (_dir, app) = seeded_app();
        let (status, body) = get(&app, "/test_db").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["dialect"], "sqlite");
        assert_eq!(body["metadata_count"], 3);
        assert_eq!(body["annotations_terms_count"], 3);
        assert_eq!(body["coordinates_count"], 2);
        assert_eq!(body["coordinates_sample"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_db_report_without_configuration() {
        let app = app_with(None);
        let (status, body) = get(&app, "/test_db").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["ok"], false);
        assert_eq!(body["dialect"], "sqlite");
        assert!(body["error"].is_string());
    }
}
