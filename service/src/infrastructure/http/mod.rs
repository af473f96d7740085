use anyhow::Context;
use axum::Router;
use axum::routing::{get, post, put};
use axum_prometheus::PrometheusMetricLayer;
use tokio::net;

use crate::domain::AppState;
use crate::infrastructure::http::handlers::documents::{
    document_status_history, processed_documents,
};
use crate::infrastructure::http::handlers::health_check;
use crate::infrastructure::http::handlers::notifications::{
    mark_notification_read, user_notifications,
};
use crate::infrastructure::http::handlers::responses::{
    combined_history, create_response, response_details, response_for_revision,
    responses_by_citizen, responses_by_form, revise_response, update_response_status,
};

mod api;
mod handlers;
mod querystring;

/// Configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServerConfig<'a> {
    pub port: &'a str,
}

/// The application's HTTP server. The underlying HTTP package is opaque to module consumers.
pub struct HttpServer {
    router: Router,
    listener: net::TcpListener,
}

impl HttpServer {
    /// Returns a new HTTP server bound to the port specified in `config`.
    pub async fn new<S: AppState>(state: S, config: HttpServerConfig<'_>) -> anyhow::Result<Self> {
        let trace_layer = tower_http::trace::TraceLayer::new_for_http().make_span_with(
            |request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                tracing::info_span!("http_request", method = ?request.method(), uri)
            },
        );
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

        let router = router(state)
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(trace_layer)
            .layer(prometheus_layer);

        let listener = net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("failed to listen on {}", config.port))?;

        Ok(Self { router, listener })
    }

    /// Runs the HTTP server.
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::debug!("listening on {}", self.listener.local_addr()?);
        axum::serve(self.listener, self.router)
            .await
            .context("received error from running server")?;
        Ok(())
    }
}

fn router<S: AppState>(state: S) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes::<S>())
        .with_state(state)
}

fn api_routes<S: AppState>() -> Router<S> {
    Router::new()
        .route("/responses", post(create_response::<S>))
        .route(
            "/responses/{id}",
            get(responses_by_form::<S>).put(update_response_status::<S>),
        )
        .route("/responses/details/{id}", get(response_details::<S>))
        .route("/responses/citizen/{id}", get(responses_by_citizen::<S>))
        .route("/responses/history/combined", get(combined_history::<S>))
        .route(
            "/responses/revise/{id}",
            get(response_for_revision::<S>).put(revise_response::<S>),
        )
        .route("/documents/statushistory", get(document_status_history::<S>))
        .route("/documents/processed", get(processed_documents::<S>))
        .route("/notifications/{id}", get(user_notifications::<S>))
        .route("/notifications/{id}/read", put(mark_notification_read::<S>))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use lingkod_common::domain::submission::Submission;
    use lingkod_common::test_utils;

    use super::*;
    use crate::domain::dispatcher::NotificationDispatcher;
    use crate::domain::engine::TransitionEngine;
    use crate::domain::repository::SubmissionStore;
    use crate::infrastructure::AppStateImpl;
    use crate::infrastructure::persistence::memory::InMemoryStore;
    use crate::infrastructure::push::{InMemoryUserDirectory, RecordingPushSender};
    use crate::infrastructure::storage::InMemoryFileStore;

    type TestDispatcher =
        NotificationDispatcher<InMemoryUserDirectory, RecordingPushSender, InMemoryStore>;
    type TestState = AppStateImpl<InMemoryStore, InMemoryFileStore, TestDispatcher>;

    fn test_state() -> (TestState, InMemoryStore) {
        let store = InMemoryStore::default();
        let dispatcher = NotificationDispatcher::new(
            InMemoryUserDirectory::default(),
            RecordingPushSender::default(),
            store.clone(),
        );
        let engine = TransitionEngine::new(
            store.clone(),
            InMemoryFileStore::default(),
            dispatcher,
            "SUB",
        );
        (AppStateImpl::new(engine, store.clone()), store)
    }

    async fn seed(store: &InMemoryStore) -> Submission {
        let submission = test_utils::pending_form_submission();
        store.insert(&submission).await.unwrap();
        submission
    }

    async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn put_json(uri: String, body: Value) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_at(uri: String) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn rejecting_updates_status_ledger_and_notifications() {
        let (state, store) = test_state();
        let router = router(state);
        let submission = seed(&store).await;

        let (status, body) = call(
            &router,
            put_json(
                format!("/api/responses/{}", submission.id),
                json!({
                    "status": "rejected",
                    "updatedBy": "Ana Reyes",
                    "comments": "Missing a valid ID",
                    "reviewerId": test_utils::reviewer_id().0,
                    "lgu": { "id": "lgu-01", "name": "Barangay San Roque" }
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "rejected");
        assert_eq!(body["comments"], "Missing a valid ID");
        assert_eq!(body["history"].as_array().unwrap().len(), 1);

        let (status, ledger) = call(
            &router,
            get_at(format!(
                "/api/documents/statushistory?documentId={}",
                submission.id
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entries = ledger.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["previousStatus"], "pending");
        assert_eq!(entries[0]["newStatus"], "rejected");
        assert_eq!(entries[0]["reviewerName"], "Ana Reyes");

        let (status, notifications) = call(
            &router,
            get_at(format!("/api/notifications/{}", submission.citizen_id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(notifications.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approving_without_a_signature_is_a_bad_request() {
        let (state, store) = test_state();
        let router = router(state);
        let submission = seed(&store).await;

        let (status, body) = call(
            &router,
            put_json(
                format!("/api/responses/{}", submission.id),
                json!({ "status": "approved", "updatedBy": "Ana Reyes" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["data"]["message"]
                .as_str()
                .unwrap()
                .contains("signature")
        );

        let unchanged = store.find(submission.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, submission.status);
    }

    #[tokio::test]
    async fn unknown_statuses_and_ids_map_to_400_and_404() {
        let (state, store) = test_state();
        let router = router(state);
        let submission = seed(&store).await;

        let (status, _) = call(
            &router,
            put_json(
                format!("/api/responses/{}", submission.id),
                json!({ "status": "confirmed", "updatedBy": "Ana Reyes" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &router,
            put_json(
                format!("/api/responses/{}", uuid::Uuid::new_v4()),
                json!({ "status": "rejected", "updatedBy": "Ana Reyes" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn combined_history_is_capped_and_reverse_chronological() {
        let (state, store) = test_state();
        let router = router(state.clone());
        let submission = seed(&store).await;

        for status in ["rejected", "pending", "rejected"] {
            let (code, _) = call(
                &router,
                put_json(
                    format!("/api/responses/{}", submission.id),
                    json!({ "status": status, "updatedBy": "Ana Reyes" }),
                ),
            )
            .await;
            assert_eq!(code, StatusCode::OK);
        }

        let (status, body) = call(&router, get_at("/api/responses/history/combined".to_string())).await;
        assert_eq!(status, StatusCode::OK);

        let entries = body.as_array().unwrap();
        assert!(entries.len() <= 50);
        // three ledger records plus three embedded entries
        assert_eq!(entries.len(), 6);
        let timestamps: Vec<chrono::DateTime<chrono::FixedOffset>> = entries
            .iter()
            .map(|e| {
                chrono::DateTime::parse_from_rfc3339(e["timestamp"].as_str().unwrap()).unwrap()
            })
            .collect();
        assert!(timestamps.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[tokio::test]
    async fn health_check_responds_ok() {
        let (state, _) = test_state();
        let router = router(state);
        let response = router
            .oneshot(get_at("/health".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
