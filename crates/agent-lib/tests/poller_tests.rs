//! End-to-end tests against a fake task metadata endpoint
//!
//! Each test serves a purpose-built router on an ephemeral port and drives
//! the real HTTP client and poller against it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_lib::metadata::{ClientConfig, MetadataClient, MetadataError};
use agent_lib::models::{MetricDatum, TaskMetadata};
use agent_lib::poller::{await_task_running, MetricSet, Poller, PollerConfig};
use agent_lib::publisher::{async_trait, MetricPublisher, METRIC_MEMORY_UTILIZATION};
use agent_lib::registry::ContainerRegistry;
use anyhow::Result;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::broadcast;

/// Serve the router on an ephemeral port, returning the base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Client with the production retry budget but test-friendly delays.
fn test_client(base_url: &str) -> Arc<MetadataClient> {
    Arc::new(
        MetadataClient::new(ClientConfig {
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(1),
            max_attempts: 4,
            retry_delay: Duration::from_millis(10),
        })
        .unwrap(),
    )
}

fn running_task_json() -> serde_json::Value {
    serde_json::json!({
        "Cluster": "default",
        "TaskARN": "arn:aws:ecs:us-east-1:012345678910:task/abc",
        "KnownStatus": "RUNNING",
        "Containers": [
            {"DockerId": "c1", "Name": "web", "DockerName": "ecs-app-1-web", "Type": "NORMAL"},
            {"DockerId": "pause123", "Name": "~internal~ecs~pause",
             "DockerName": "ecs-app-1-internalecspause", "Type": "CNI_PAUSE"},
            {"DockerId": "c2", "Name": "worker", "DockerName": "ecs-app-1-worker", "Type": "NORMAL"}
        ]
    })
}

fn task_metadata_from(value: &serde_json::Value) -> TaskMetadata {
    serde_json::from_value(value.clone()).unwrap()
}

#[derive(Default)]
struct RecordingPublisher {
    batches: Mutex<Vec<Vec<MetricDatum>>>,
}

#[async_trait]
impl MetricPublisher for RecordingPublisher {
    async fn publish(&self, batch: &[MetricDatum]) -> Result<()> {
        self.batches.lock().unwrap().push(batch.to_vec());
        Ok(())
    }
}

impl RecordingPublisher {
    fn batches(&self) -> Vec<Vec<MetricDatum>> {
        self.batches.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn test_fetch_retries_server_errors_within_one_call() {
    let hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = hits.clone();

    let app = Router::new().route(
        "/task",
        get(move || {
            let hits = handler_hits.clone();
            async move {
                if hits.fetch_add(1, Ordering::SeqCst) < 2 {
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                } else {
                    Json(running_task_json()).into_response()
                }
            }
        }),
    );

    let client = test_client(&serve(app).await);
    let task = client.fetch_task_metadata().await.unwrap();

    assert!(task.is_running());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_fetch_returns_last_error_after_exhausting_attempts() {
    let hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = hits.clone();

    let app = Router::new().route(
        "/task",
        get(move || {
            let hits = handler_hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            }
        }),
    );

    let client = test_client(&serve(app).await);
    let err = client.fetch_task_metadata().await.unwrap_err();

    assert!(matches!(err, MetadataError::Status { status, .. }
        if status.as_u16() == 503));
    assert_eq!(hits.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_parse_failure_is_not_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = hits.clone();

    let app = Router::new().route(
        "/task",
        get(move || {
            let hits = handler_hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                "definitely not json"
            }
        }),
    );

    let client = test_client(&serve(app).await);
    let err = client.fetch_task_metadata().await.unwrap_err();

    assert!(matches!(err, MetadataError::Parse(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_transport_error() {
    // nothing listens on port 9; connection attempts fail fast
    let client = test_client("http://127.0.0.1:9");
    let err = client.fetch_task_metadata().await.unwrap_err();

    assert!(matches!(err, MetadataError::Transport { .. }));
}

#[tokio::test]
async fn test_awaiting_ready_transitions_after_second_poll() {
    let hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = hits.clone();

    let app = Router::new().route(
        "/task",
        get(move || {
            let hits = handler_hits.clone();
            async move {
                let mut task = running_task_json();
                if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                    task["KnownStatus"] = serde_json::json!("PENDING");
                }
                Json(task)
            }
        }),
    );

    let client = test_client(&serve(app).await);
    let task = await_task_running(&client, Duration::from_millis(10))
        .await
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(task.containers.len(), 3);

    let registry = ContainerRegistry::from_task(&task);
    assert_eq!(registry.len(), 3);
    assert!(registry.is_excluded("pause123"));
}

#[tokio::test]
async fn test_tick_publishes_only_reportable_containers() {
    let app = Router::new().route(
        "/task/stats",
        get(|| async {
            Json(serde_json::json!({
                "c1": {"memory_stats": {"usage": 50, "limit": 100}},
                "pause123": {"memory_stats": {"usage": 10, "limit": 100}},
                "c2": null
            }))
        }),
    );

    let client = test_client(&serve(app).await);
    let registry = ContainerRegistry::from_task(&task_metadata_from(&running_task_json()));
    let publisher = Arc::new(RecordingPublisher::default());

    let poller = Poller::new(
        client,
        publisher.clone(),
        registry,
        "default",
        PollerConfig {
            interval: Duration::from_millis(50),
            metric_set: MetricSet::Memory,
            ..PollerConfig::default()
        },
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(poller.run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(80)).await;
    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();

    let batches = publisher.batches();
    assert!(!batches.is_empty());
    for batch in &batches {
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].metric_name, METRIC_MEMORY_UTILIZATION);
        assert_eq!(batch[0].value, 50.0);
        assert_eq!(batch[0].dimensions[0].value, "default");
        assert_eq!(batch[0].dimensions[1].value, "ecs-app-1-web");
    }
}

#[tokio::test]
async fn test_stats_fetch_failure_skips_tick_and_loop_continues() {
    let hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = hits.clone();

    let app = Router::new().route(
        "/task/stats",
        get(move || {
            let hits = handler_hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }),
    );

    let client = test_client(&serve(app).await);
    let registry = ContainerRegistry::from_task(&task_metadata_from(&running_task_json()));
    let publisher = Arc::new(RecordingPublisher::default());

    let poller = Poller::new(
        client,
        publisher.clone(),
        registry,
        "default",
        PollerConfig {
            interval: Duration::from_millis(60),
            metric_set: MetricSet::Memory,
            ..PollerConfig::default()
        },
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(poller.run(shutdown_rx));
    // long enough for at least two ticks, each exhausting its retry budget
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();

    // every tick failed and was skipped, yet the loop kept polling
    assert!(publisher.batches().is_empty());
    assert!(hits.load(Ordering::SeqCst) > 4);
}

#[tokio::test]
async fn test_shutdown_between_ticks_stops_publishing() {
    let app = Router::new().route(
        "/task/stats",
        get(|| async {
            Json(serde_json::json!({
                "c1": {"memory_stats": {"usage": 50, "limit": 100}}
            }))
        }),
    );

    let client = test_client(&serve(app).await);
    let registry = ContainerRegistry::from_task(&task_metadata_from(&running_task_json()));
    let publisher = Arc::new(RecordingPublisher::default());

    let poller = Poller::new(
        client,
        publisher.clone(),
        registry,
        "default",
        PollerConfig {
            // long interval: only the immediate first tick fires
            interval: Duration::from_secs(60),
            metric_set: MetricSet::Memory,
            ..PollerConfig::default()
        },
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(poller.run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();

    let batches_at_shutdown = publisher.batches().len();
    assert_eq!(batches_at_shutdown, 1);

    // nothing publishes after the loop has exited
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(publisher.batches().len(), batches_at_shutdown);
}
