pub mod alerts;
pub mod data;
pub mod metrics;
pub mod query;
pub mod status;
pub mod tenant;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, ALLOW};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

const ALLOWED_METHODS: &str = "GET,PUT,POST,DELETE,OPTIONS";

/// Answers every `OPTIONS` request with the fixed `Allow` header of spec §6
/// (the route table lists the same method set for every endpoint).
async fn options_allow() -> impl IntoResponse {
    ([(ALLOW, ALLOWED_METHODS)], StatusCode::NO_CONTENT)
}

/// `bearer-auth`/`basic-auth` gate (spec §6 "Configuration"). A no-op when
/// neither is configured.
async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.expected_authorization_header() else {
        return next.run(request).await;
    };
    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if provided == Some(expected.as_str()) {
        next.run(request).await
    } else {
        AppError::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid Authorization header",
        )
        .into_response()
    }
}

/// One metric type's `raw`/`stats`/tag/delete route table, mounted under
/// `/gauges`, `/counters`, or `/availability` (spec §6 table). `supports_write`
/// gates ingest; `supports_put` gates tag mutation; `supports_delete` gates
/// range/tag deletion — only `gauges` supports the latter, matching the
/// table's per-type method support. Each distinct path is built with exactly
/// one `.route()` call so its `MethodRouter` carries every verb (including
/// `OPTIONS`) at once; axum panics if the same method is registered twice for
/// one path, which repeated `.route()` calls on the same path would do.
fn metric_type_router(supports_write: bool, supports_put: bool, supports_delete: bool) -> Router<AppState> {
    let mut raw_by_id = get(data::get_raw);
    if supports_delete {
        raw_by_id = raw_by_id.delete(data::delete_raw);
    }

    let mut router = Router::new()
        .route("/{id}/raw", raw_by_id.options(options_allow))
        .route("/{id}/stats", get(data::get_stats).options(options_allow))
        // Deprecated alias: `{id}/data` behaves identically to `{id}/raw`.
        .route("/{id}/data", get(data::get_raw).options(options_allow));

    if supports_write {
        router = router
            .route("/raw", post(data::post_ingest).options(options_allow))
            .route(
                "/raw/query",
                post(data::post_raw_query).options(options_allow),
            )
            // Deprecated aliases.
            .route("/data", post(data::post_ingest).options(options_allow))
            .route(
                "/stats/query",
                post(data::post_raw_query).options(options_allow),
            );
    }

    if supports_put {
        router = router.route(
            "/{id}/tags",
            put(data::put_tags_single).options(options_allow),
        );
    }

    if supports_delete {
        router = router.route(
            "/{id}/tags/{tags}",
            delete(data::delete_tags).options(options_allow),
        );
    }

    router
}

pub fn router(state: AppState) -> Router {
    let gauges = metric_type_router(true, true, true).route(
        "/tags",
        put(data::put_tags_bulk).options(options_allow),
    );
    let counters = metric_type_router(true, true, false);
    let availability = metric_type_router(false, false, false);

    let metrics_api = Router::new()
        .route("/status", get(status::status).options(options_allow))
        .route("/tenants", get(metrics::tenants).options(options_allow))
        .route("/metrics", get(metrics::list_items).options(options_allow))
        .route(
            "/m/stats/query",
            post(query::post_stats_query).options(options_allow),
        )
        .nest("/gauges", gauges)
        .nest("/counters", counters)
        .nest("/availability", availability);

    let alerts_api = Router::new()
        .route("/status", get(alerts::status).options(options_allow))
        .route("/raw", get(alerts::raw).options(options_allow));

    Router::new()
        .nest("/hawkular/metrics", metrics_api)
        .nest("/hawkular/alerts", alerts_api)
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertsHandle;
    use crate::storage::memory::MemoryEngine;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            storage: Arc::new(MemoryEngine::new()),
            alerts: AlertsHandle::disabled(),
            default_tenant: "_ops".to_string(),
            default_start_time: "-8h".to_string(),
            bearer_auth: None,
            basic_auth: None,
        }
    }

    #[tokio::test]
    async fn status_endpoint_reports_storage_name() {
        let app = router(test_state());
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/hawkular/metrics/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["MohawkStorage"], "memory");
    }

    #[tokio::test]
    async fn options_reports_allowed_methods() {
        let app = router(test_state());
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("OPTIONS")
                    .uri("/hawkular/metrics/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers().get(ALLOW).unwrap(), ALLOWED_METHODS);
    }

    #[tokio::test]
    async fn bearer_auth_rejects_missing_header() {
        let mut state = test_state();
        state.bearer_auth = Some("secret".to_string());
        let app = router(state);
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/hawkular/metrics/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bearer_auth_accepts_matching_header() {
        let mut state = test_state();
        state.bearer_auth = Some("secret".to_string());
        let app = router(state);
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/hawkular/metrics/status")
                    .header(AUTHORIZATION, "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ingest_then_read_back_raw_sample() {
        let app = router(test_state());
        let ingest_body = serde_json::json!([{"id": "cpu", "data": [{"timestamp": 1000, "value": 42.5}]}]);
        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/hawkular/metrics/gauges/raw")
                    .header("content-type", "application/json")
                    .body(Body::from(ingest_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/hawkular/metrics/gauges/cpu/raw?start=0&end=2000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let samples: Vec<crate::storage::Sample> = serde_json::from_slice(&body).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 42.5);
    }

    #[tokio::test]
    async fn deprecated_data_alias_ingests_like_raw() {
        let app = router(test_state());
        let ingest_body = serde_json::json!([{"id": "cpu", "data": [{"timestamp": "1000", "value": "7"}]}]);
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/hawkular/metrics/gauges/data")
                    .header("content-type", "application/json")
                    .body(Body::from(ingest_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn alerts_status_is_unavailable_with_no_rules_configured() {
        let app = router(test_state());
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/hawkular/alerts/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["AlertsService"], "UNAVAILABLE");
    }
}
