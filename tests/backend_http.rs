//! End-to-end tests of the analysis client against a mock backend served
//! by axum on an ephemeral port.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use crisislink::analysis::config::AnalysisConfig;
use crisislink::analysis::{AnalysisClient, AnalysisError, RetryMode};

#[derive(Default)]
struct MockBackend {
    script: Mutex<VecDeque<(u16, String)>>,
    received: Mutex<Vec<Value>>,
}

impl MockBackend {
    fn hits(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

async fn analyze(State(backend): State<Arc<MockBackend>>, Json(body): Json<Value>) -> (StatusCode, String) {
    backend.received.lock().unwrap().push(body);
    let (status, body) = backend
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((500, r#"{"detail":"script exhausted"}"#.to_string()));
    (StatusCode::from_u16(status).unwrap(), body)
}

async fn spawn_backend(script: Vec<(u16, String)>) -> (String, Arc<MockBackend>) {
    let backend = Arc::new(MockBackend { script: Mutex::new(script.into()), ..MockBackend::default() });
    let app = Router::new()
        .route("/analyze-and-respond", post(analyze))
        .with_state(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), backend)
}

fn fast_config(base_url: &str) -> AnalysisConfig {
    AnalysisConfig { initial_delay_ms: 20, ..AnalysisConfig::default() }.with_base_url(base_url)
}

fn mumbai_body() -> String {
    serde_json::json!({
        "user_input": "Is there a flood in Mumbai?",
        "bot_response": "Yes, confirmed.",
        "is_verified": "true",
        "verification_confidence": 0.92,
        "official_sources_count": 2,
        "sources": [{ "title": "X", "url": "https://x", "source": "NDMA", "snippet": "..." }],
        "language": "en",
        "language_full": "English",
        "urgency": "High",
        "sentiment": "Negative",
        "emotion": "Fear",
        "emotion_confidence": 0.8
    })
    .to_string()
}

#[tokio::test]
async fn success_posts_json_once_and_normalizes() {
    let (base, backend) = spawn_backend(vec![(200, mumbai_body())]).await;
    let client = AnalysisClient::from_config(&fast_config(&base)).unwrap();

    let result = client.send("Is there a flood in Mumbai?").await.unwrap();

    assert!(result.is_verified);
    assert_eq!(result.bot_response, "Yes, confirmed.");
    assert_eq!(result.sources.len(), 1);
    assert_eq!(backend.hits(), 1);
    assert_eq!(
        backend.received.lock().unwrap()[0],
        serde_json::json!({ "user_input": "Is there a flood in Mumbai?" })
    );
}

#[tokio::test]
async fn server_error_then_success_makes_two_calls() {
    let (base, backend) =
        spawn_backend(vec![(500, r#"{"detail":"warming up"}"#.to_string()), (200, mumbai_body())]).await;
    let client = AnalysisClient::from_config(&fast_config(&base)).unwrap();

    let result = client.send("Is there a flood in Mumbai?").await.unwrap();

    assert_eq!(result.urgency, "High");
    assert_eq!(backend.hits(), 2);
}

#[tokio::test]
async fn persistent_failure_exhausts_after_three_calls() {
    let (base, backend) = spawn_backend(vec![
        (503, "<html>Service Unavailable</html>".to_string()),
        (500, String::new()),
        (502, r#"{"detail":"bad gateway"}"#.to_string()),
    ])
    .await;
    let client = AnalysisClient::from_config(&fast_config(&base)).unwrap();
    let started = Instant::now();

    let err = client.send("anything").await.unwrap_err();

    assert!(started.elapsed() >= Duration::from_millis(60));
    assert_eq!(backend.hits(), 3);
    match err {
        AnalysisError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.to_string(), "API returned status 502: bad gateway");
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_backend_exhausts_with_transport_cause() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = AnalysisClient::from_config(&fast_config(&format!("http://127.0.0.1:{port}"))).unwrap();
    let err = client.send("anything").await.unwrap_err();

    assert!(matches!(&err, AnalysisError::Exhausted { last, .. } if matches!(**last, AnalysisError::Transport(_))));
    assert_eq!(err.to_string(), "failed to connect to the analysis backend after multiple retries");
}

#[tokio::test]
async fn strict_mode_fails_fast_on_bad_request() {
    let (base, backend) = spawn_backend(vec![(400, r#"{"detail":"user_input is required"}"#.to_string())]).await;
    let config = AnalysisConfig { retry_mode: RetryMode::Strict, ..fast_config(&base) };
    let client = AnalysisClient::from_config(&config).unwrap();

    let err = client.send("").await.unwrap_err();

    assert!(matches!(err, AnalysisError::Server { status: 400, detail } if detail == "user_input is required"));
    assert_eq!(backend.hits(), 1);
}
