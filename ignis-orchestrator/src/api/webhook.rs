//! Webhook API Handler
//!
//! The single endpoint GitHub delivers `workflow_job` events to. Every
//! call terminates in exactly one of two statuses: 200 for handled or
//! intentionally ignored, 500 for any parsing or processing failure. The
//! response body is unused; GitHub only looks at the status.

use axum::{body::Bytes, extract::State, http::HeaderMap, http::StatusCode};
use tracing::{debug, error};

use crate::api::AppState;

/// POST /webhook
/// Decode, verify and dispatch one webhook delivery
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    debug!("webhook received");

    let event = match state.parser.parse(&headers, &body) {
        Ok(Some(event)) => event,
        Ok(None) => {
            debug!("payload is not a workflow job event, ignoring");
            return StatusCode::OK;
        }
        Err(err) => {
            error!(error = %err, "failed to parse webhook payload");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    debug!(run_url = %event.run_url, action = %event.action, "workflow job event found");

    match state.lifecycle.handle_event(&event).await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            error!(
                runner = %event.runner_name(),
                action = %event.action,
                error = %err,
                "failed to process workflow job event"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::api::create_router;
    use crate::config::Config;
    use crate::payload::GithubParser;
    use crate::service::Lifecycle;

    use async_trait::async_trait;
    use ignis_client::{BackendClient, ClientError, Connector, Result as ClientResult};
    use ignis_core::spec::{CreatedInstance, Instance, InstanceSpec};

    /// Backend double: create always succeeds, everything else is empty
    struct StubBackend;

    #[async_trait]
    impl BackendClient for StubBackend {
        async fn create(&self, spec: &InstanceSpec) -> ClientResult<CreatedInstance> {
            Ok(CreatedInstance {
                uid: format!("uid-{}", spec.id),
            })
        }

        async fn list(&self, _name: &str, _namespace: &str) -> ClientResult<Vec<Instance>> {
            Ok(vec![])
        }

        async fn delete(&self, _uid: &str) -> ClientResult<()> {
            Ok(())
        }

        async fn close(&self) -> ClientResult<()> {
            Ok(())
        }
    }

    struct StubConnector;

    impl Connector for StubConnector {
        fn connect(&self, _host: &str) -> ClientResult<Box<dyn BackendClient>> {
            Ok(Box::new(StubBackend))
        }
    }

    struct FailingConnector;

    impl Connector for FailingConnector {
        fn connect(&self, _host: &str) -> ClientResult<Box<dyn BackendClient>> {
            Err(ClientError::api_error(503, "host unreachable"))
        }
    }

    fn router(connector: Box<dyn Connector>) -> axum::Router {
        let config = Config {
            hosts: vec!["host-a".to_string()],
            api_token: "ghp_token".to_string(),
            ssh_public_key: String::new(),
            webhook_secret: None,
            required_labels: vec![],
            owner: "example-org".to_string(),
            repo: "example-repo".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
        };

        create_router(AppState {
            parser: Arc::new(GithubParser::new(None)),
            lifecycle: Arc::new(Lifecycle::new(config, connector)),
        })
    }

    fn delivery(event: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-github-event", event)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const QUEUED: &str = r#"{
        "action": "queued",
        "workflow_job": {
            "id": 118,
            "run_id": 4272,
            "node_id": "CR_kwDOHZpp",
            "labels": ["self-hosted"],
            "run_url": "https://api.github.com/repos/o/r/actions/runs/4272"
        }
    }"#;

    #[tokio::test]
    async fn test_queued_delivery_returns_200() {
        let response = router(Box::new(StubConnector))
            .oneshot(delivery("workflow_job", QUEUED))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ping_delivery_is_acknowledged() {
        let response = router(Box::new(StubConnector))
            .oneshot(delivery("ping", r#"{"zen": "Design for failure."}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_payload_returns_500() {
        let response = router(Box::new(StubConnector))
            .oneshot(delivery("workflow_job", "not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_backend_failure_returns_500() {
        let response = router(Box::new(FailingConnector))
            .oneshot(delivery("workflow_job", QUEUED))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_completed_for_unknown_runner_returns_500() {
        let completed = QUEUED.replace("queued", "completed");

        let response = router(Box::new(StubConnector))
            .oneshot(delivery("workflow_job", &completed))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
