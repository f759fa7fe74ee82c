use super::*;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Transport that replays a fixed script and records when each call began.
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<TransportResponse, AnalysisError>>>,
    calls: Mutex<Vec<(Instant, AnalysisRequest)>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<TransportResponse, AnalysisError>>) -> Self {
        Self { script: Mutex::new(script.into()), calls: Mutex::new(Vec::new()) }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }
}

#[async_trait::async_trait]
impl AnalysisTransport for ScriptedTransport {
    async fn post_json(&self, request: &AnalysisRequest) -> Result<TransportResponse, AnalysisError> {
        self.calls.lock().unwrap().push((Instant::now(), request.clone()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AnalysisError::Transport("script exhausted".into())))
    }
}

fn ok(body: &serde_json::Value) -> Result<TransportResponse, AnalysisError> {
    Ok(TransportResponse { status: 200, body: body.to_string() })
}

fn status(code: u16, body: &str) -> Result<TransportResponse, AnalysisError> {
    Ok(TransportResponse { status: code, body: body.to_string() })
}

fn refused() -> Result<TransportResponse, AnalysisError> {
    Err(AnalysisError::Transport("connection refused".into()))
}

fn mumbai_body() -> serde_json::Value {
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
}

fn client(script: Vec<Result<TransportResponse, AnalysisError>>) -> AnalysisClient<ScriptedTransport> {
    AnalysisClient::with_transport(ScriptedTransport::new(script), RetryPolicy::default())
}

// =========================================================================
// success paths
// =========================================================================

#[tokio::test(start_paused = true)]
async fn mumbai_flood_scenario_resolves_with_bool() {
    let client = client(vec![ok(&mumbai_body())]);
    let started = Instant::now();

    let result = client.send("Is there a flood in Mumbai?").await.unwrap();

    assert!(result.is_verified);
    assert_eq!(result.bot_response, "Yes, confirmed.");
    assert_eq!(result.official_sources_count, 2);
    assert_eq!(result.sources[0].source, "NDMA");
    assert_eq!(result.urgency_level(), UrgencyLevel::High);
    assert_eq!(client.transport.call_count(), 1);
    assert_eq!(Instant::now(), started);
}

#[tokio::test(start_paused = true)]
async fn request_body_carries_user_input_verbatim() {
    let client = client(vec![ok(&mumbai_body())]);
    client.send("  spaces are the caller's problem  ").await.unwrap();

    let calls = client.transport.calls.lock().unwrap();
    assert_eq!(calls[0].1.user_input, "  spaces are the caller's problem  ");
}

#[tokio::test(start_paused = true)]
async fn second_attempt_success_returns_its_body() {
    let mut second = mumbai_body();
    second["bot_response"] = "second try".into();
    let client = client(vec![status(500, r#"{"detail":"warming up"}"#), ok(&second)]);

    let result = client.send("anything").await.unwrap();

    assert_eq!(result.bot_response, "second try");
    assert_eq!(client.transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_success_body_is_retried() {
    let client = client(vec![status(200, "{ truncated"), ok(&mumbai_body())]);
    let result = client.send("anything").await.unwrap();
    assert!(result.is_verified);
    assert_eq!(client.transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn loosely_typed_success_body_resolves_in_one_call() {
    let mut body = mumbai_body();
    body["emotion"] = serde_json::Value::Null;
    body["emotion_confidence"] = serde_json::Value::Null;
    body["official_sources_count"] = serde_json::json!(2.0);
    body.as_object_mut().unwrap().remove("bot_response");
    let client = client(vec![ok(&body), ok(&mumbai_body())]);

    let result = client.send("Is there a flood in Mumbai?").await.unwrap();

    assert_eq!(client.transport.call_count(), 1);
    assert!(result.is_verified);
    assert_eq!(result.bot_response, "");
    assert_eq!(result.emotion, "");
    assert_eq!(result.official_sources_count, 2);
}

// =========================================================================
// failure paths
// =========================================================================

#[tokio::test(start_paused = true)]
async fn three_failures_exhaust_with_backoff() {
    let client = client(vec![refused(), status(503, "<html>down</html>"), refused()]);

    let err = client.send("anything").await.unwrap_err();

    assert!(matches!(err, AnalysisError::Exhausted { attempts: 3, .. }));
    assert_eq!(err.to_string(), "failed to connect to the analysis backend after multiple retries");
    let times = client.transport.call_times();
    assert_eq!(times.len(), 3);
    assert!(times[1] - times[0] >= Duration::from_millis(1000));
    assert!(times[2] - times[1] >= Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn unparsable_error_bodies_do_not_break_the_loop() {
    let client = client(vec![status(500, "\u{0}garbage"), status(502, ""), ok(&mumbai_body())]);
    assert!(client.send("anything").await.is_ok());
    assert_eq!(client.transport.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn uniform_mode_retries_client_errors() {
    let client = client(vec![status(400, r#"{"detail":"bad"}"#), status(400, "{}"), status(400, "{}")]);
    let err = client.send("anything").await.unwrap_err();
    assert!(matches!(err, AnalysisError::Exhausted { .. }));
    assert_eq!(client.transport.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn strict_mode_rejects_client_error_immediately() {
    let policy = RetryPolicy::new(3, Duration::from_millis(1000), 2, RetryMode::Strict);
    let client = AnalysisClient::with_transport(
        ScriptedTransport::new(vec![status(422, r#"{"detail":"user_input too long"}"#)]),
        policy,
    );

    let err = client.send("anything").await.unwrap_err();

    assert!(matches!(&err, AnalysisError::Server { status: 422, detail } if detail == "user_input too long"));
    assert_eq!(client.transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn analyze_trait_honours_cancellation() {
    let client = client(vec![refused(), refused(), refused()]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        trigger.cancel();
    });

    let analyzer: &dyn Analyze = &client;
    let err = analyzer.analyze("anything", &cancel).await.unwrap_err();

    assert!(matches!(err, AnalysisError::Cancelled));
    assert_eq!(client.transport.call_count(), 2);
}
