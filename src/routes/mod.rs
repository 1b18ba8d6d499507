// src/routes/mod.rs

pub mod webhook;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::AppState;

/// Build the HTTP surface: the Telegram webhook, `/health`, and a liveness
/// string on every other path or method.
pub fn router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(webhook::telegram_webhook).fallback(liveness))
        .route("/health", get(health_check).fallback(liveness))
        .fallback(liveness)
        .with_state(state)
}

async fn liveness() -> &'static str {
    "Bot running"
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.queue.stats();

    Json(json!({
        "status": "ok",
        "env": format!("{:?}", state.env),
        "queue": {
            "pending": stats.pending,
            "busy": stats.busy,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tokio::time::{sleep, timeout, Instant};
    use tower::ServiceExt;

    use crate::config::AppEnv;
    use crate::jobs::{command, messages};
    use crate::ledger::RecordPool;
    use crate::testing::{MemoryLedger, RecordingNotifier};
    use crate::worker::{job_queue, Worker, WorkerDeps};

    fn setup_with(notifier: RecordingNotifier) -> (Router, Arc<RecordingNotifier>, Worker) {
        let ledger = Arc::new(MemoryLedger::new());
        let notifier = Arc::new(notifier);
        let (queue, worker) = job_queue(WorkerDeps {
            pool: RecordPool::new(ledger),
            notifier: notifier.clone(),
            delivery_delay: Duration::ZERO,
        });

        let state = AppState {
            env: AppEnv::Development,
            queue,
            notifier: notifier.clone(),
        };
        (router(state, "/webhook"), notifier, worker)
    }

    fn setup() -> (Router, Arc<RecordingNotifier>, Worker) {
        setup_with(RecordingNotifier::new())
    }

    fn update(text: &str) -> String {
        json!({
            "update_id": 1,
            "message": {
                "message_id": 9,
                "chat": {"id": -500, "type": "group"},
                "from": {"id": 77, "is_bot": false, "first_name": "U"},
                "text": text,
            }
        })
        .to_string()
    }

    fn webhook_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn post_webhook(app: Router, body: String) -> (StatusCode, String) {
        let response = app.oneshot(webhook_request(body)).await.unwrap();
        let status = response.status();
        (status, body_string(response).await)
    }

    /// Replies go out from spawned tasks; wait until `n` texts were sent.
    async fn wait_for_texts(notifier: &RecordingNotifier, n: usize) -> Vec<(i64, String)> {
        for _ in 0..200 {
            let texts = notifier.texts();
            if texts.len() >= n {
                return texts;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {n} texts, got {:?}", notifier.texts());
    }

    #[tokio::test]
    async fn test_other_paths_return_liveness() {
        let (app, _, _worker) = setup();

        let response = app
            .oneshot(Request::builder().uri("/anything").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Bot running");
    }

    #[tokio::test]
    async fn test_get_on_webhook_path_returns_liveness() {
        let (app, notifier, _worker) = setup();

        let response = app
            .oneshot(Request::builder().uri("/webhook").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Bot running");
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_request_command_is_queued() {
        let (app, notifier, _worker) = setup();

        let (status, body) = post_webhook(app.clone(), update("#vcardfresh 10")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
        assert_eq!(
            wait_for_texts(&notifier, 1).await,
            vec![(-500, messages::QUEUED.to_string())]
        );

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let health: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(health["queue"]["pending"], 1);
        assert_eq!(health["queue"]["busy"], false);
    }

    async fn pending_jobs(app: &Router) -> u64 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let health: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        health["queue"]["pending"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn test_slow_reply_does_not_hold_the_response() {
        let (app, notifier, _worker) =
            setup_with(RecordingNotifier::with_text_delay(Duration::from_secs(2)));
        assert_eq!(pending_jobs(&app).await, 0);

        let started = Instant::now();
        let response = timeout(
            Duration::from_millis(500),
            app.clone().oneshot(webhook_request(update("#vcardfresh 3"))),
        )
        .await
        .expect("webhook waited on the outbound reply")
        .unwrap();

        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(body_string(response).await, "OK");
        assert_eq!(pending_jobs(&app).await, 1);
        // The acknowledgement is still in flight.
        assert!(notifier.texts().is_empty());
    }

    #[tokio::test]
    async fn test_start_replies_with_usage() {
        let (app, notifier, _worker) = setup();

        post_webhook(app, update("/start")).await;

        assert_eq!(
            wait_for_texts(&notifier, 1).await,
            vec![(-500, command::usage())]
        );
    }

    #[tokio::test]
    async fn test_other_text_is_ignored() {
        let (app, notifier, _worker) = setup();

        let (_, body) = post_webhook(app, update("hello there")).await;
        sleep(Duration::from_millis(20)).await;

        assert_eq!(body, "OK");
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let (app, notifier, _worker) = setup();

        let (status, body) = post_webhook(app, "{not json".to_string()).await;
        sleep(Duration::from_millis(20)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ERROR");
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_closed_queue_reports_failure() {
        let (app, notifier, worker) = setup();
        drop(worker);

        post_webhook(app, update("#vcardfu 3")).await;

        assert_eq!(
            wait_for_texts(&notifier, 1).await,
            vec![(-500, messages::FAILED.to_string())]
        );
    }
}
