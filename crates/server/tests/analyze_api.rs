//! Integration tests for the PhishGuard HTTP API.
//!
//! Each test mounts the router with test doubles (scripted classifier,
//! token-map credential verifier, in-memory store) on an ephemeral port,
//! makes raw HTTP requests, and verifies responses and stored records.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use phishguard_core::prompt::AnalysisPrompt;
use phishguard_server::auth::{AuthError, AuthenticatedUser, CredentialVerifier};
use phishguard_server::classify::{ClassificationError, ClassificationProvider};
use phishguard_server::pipeline::AnalysisPipeline;
use phishguard_server::serve::{build_router, AppState, RateLimiter};
use phishguard_storage::{AuthScope, MemoryStore, ScamLogRecord, ScamLogStore, StorageError};

const ALICE_TOKEN: &str = "alice-token-0123456789abcdef";
const BOB_TOKEN: &str = "bob-token-0123456789abcdef";

const PHISHING_REPLY: &str = r#"{
    "risk_level": "phishing",
    "risk_score": 0.92,
    "flagged_reasons": ["Urgency tactics", "Credential request"],
    "analysis": "Classic account-verification phishing.",
    "recommendations": "Do not click the link."
}"#;

// ── Test doubles ─────────────────────────────────────────────────────────────

/// What the scripted classifier should do when called.
enum Script {
    Reply(&'static str),
    RateLimited,
    QuotaExhausted,
    Upstream,
    Internal,
}

/// Classifier double that records calls and the last prompt it saw.
struct ScriptedClassifier {
    script: Script,
    calls: AtomicUsize,
    last: Mutex<Option<(AnalysisPrompt, Option<String>)>>,
}

impl ScriptedClassifier {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationProvider for ScriptedClassifier {
    async fn classify(
        &self,
        prompt: &AnalysisPrompt,
        audio_data: Option<&str>,
    ) -> Result<String, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().await = Some((prompt.clone(), audio_data.map(str::to_string)));
        match &self.script {
            Script::Reply(text) => Ok(text.to_string()),
            Script::RateLimited => Err(ClassificationError::RateLimited),
            Script::QuotaExhausted => Err(ClassificationError::QuotaExhausted),
            Script::Upstream => Err(ClassificationError::Upstream("HTTP 500".to_string())),
            Script::Internal => Err(ClassificationError::Internal("task join error".to_string())),
        }
    }
}

/// Verifier double resolving tokens from a fixed map.
struct TokenMapVerifier {
    users: HashMap<String, String>,
}

impl TokenMapVerifier {
    fn with_default_users() -> Arc<Self> {
        let mut users = HashMap::new();
        users.insert(ALICE_TOKEN.to_string(), "alice".to_string());
        users.insert(BOB_TOKEN.to_string(), "bob".to_string());
        Arc::new(Self { users })
    }
}

#[async_trait]
impl CredentialVerifier for TokenMapVerifier {
    async fn verify(&self, bearer_token: &str) -> Result<AuthenticatedUser, AuthError> {
        match self.users.get(bearer_token) {
            Some(user_id) => Ok(AuthenticatedUser {
                user_id: user_id.clone(),
                bearer_token: bearer_token.to_string(),
            }),
            None => Err(AuthError::Rejected("unknown token".to_string())),
        }
    }
}

/// Store double whose inserts always fail, for the persistence-error path.
struct FailingInsertStore {
    inner: MemoryStore,
}

#[async_trait]
impl ScamLogStore for FailingInsertStore {
    async fn trusted_contacts(&self, scope: &AuthScope) -> Result<Vec<String>, StorageError> {
        self.inner.trusted_contacts(scope).await
    }

    async fn insert_scam_log(
        &self,
        _scope: &AuthScope,
        _record: ScamLogRecord,
    ) -> Result<(), StorageError> {
        Err(StorageError::Backend("insert refused".to_string()))
    }

    async fn list_scam_logs(
        &self,
        scope: &AuthScope,
        limit: usize,
    ) -> Result<Vec<ScamLogRecord>, StorageError> {
        self.inner.list_scam_logs(scope, limit).await
    }
}

// ── Server and HTTP helpers ──────────────────────────────────────────────────

async fn start_server(
    classifier: Arc<ScriptedClassifier>,
    store: Arc<dyn ScamLogStore>,
    verifier: Arc<dyn CredentialVerifier>,
) -> u16 {
    let pipeline_classifier: Arc<dyn ClassificationProvider> = classifier;
    let state = Arc::new(AppState {
        verifier,
        pipeline: AnalysisPipeline::new(pipeline_classifier, store.clone()),
        store,
        rate_limiter: RateLimiter::new(10_000),
    });
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await
        .expect("serve");
    });
    port
}

/// Make a raw HTTP request and return (status, parsed JSON body).
fn http_request(
    port: u16,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> (u16, serde_json::Value) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{port}")).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .expect("read timeout");

    let mut request = format!("{method} {path} HTTP/1.1\r\nHost: localhost:{port}\r\n");
    if let Some(token) = token {
        request.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    match body {
        Some(body) => request.push_str(&format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )),
        None => request.push_str("Connection: close\r\n\r\n"),
    }
    stream.write_all(request.as_bytes()).expect("write request");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);

    let (head, raw_body) = response.split_once("\r\n\r\n").unwrap_or((&response, ""));
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);
    let json = serde_json::from_str(raw_body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post_analyze(
    port: u16,
    token: Option<&str>,
    body: serde_json::Value,
) -> (u16, serde_json::Value) {
    let token = token.map(str::to_string);
    let body = body.to_string();
    tokio::task::spawn_blocking(move || {
        http_request(port, "POST", "/analyze", token.as_deref(), Some(&body))
    })
    .await
    .expect("join")
}

async fn get_json(port: u16, path: &str, token: Option<&str>) -> (u16, serde_json::Value) {
    let token = token.map(str::to_string);
    let path = path.to_string();
    tokio::task::spawn_blocking(move || http_request(port, "GET", &path, token.as_deref(), None))
        .await
        .expect("join")
}

fn email_body() -> serde_json::Value {
    serde_json::json!({
        "messageType": "email",
        "sender": "a@b.com",
        "subject": "Urgent!",
        "content": "Click here to verify your account now"
    })
}

fn alice_scope() -> AuthScope {
    AuthScope {
        user_id: "alice".to_string(),
        bearer_token: ALICE_TOKEN.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_open_and_reports_ok() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let port = start_server(
        classifier,
        Arc::new(MemoryStore::new()),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = get_json(port, "/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert!(body.get("version").is_some());
}

#[tokio::test]
async fn analyze_email_returns_and_persists_model_verdict() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let store = Arc::new(MemoryStore::new());
    let port = start_server(
        classifier.clone(),
        store.clone(),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(status, 200, "body: {body}");
    assert_eq!(body["risk_level"], "phishing");
    assert_eq!(body["risk_score"], 0.92);
    assert_eq!(classifier.calls(), 1);

    let records = store.list_scam_logs(&alice_scope(), 0).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.user_id, "alice");
    assert_eq!(record.message_type, "email");
    assert_eq!(record.sender, "a@b.com");
    assert_eq!(record.subject.as_deref(), Some("Urgent!"));
    assert_eq!(record.risk_level, "phishing");
    assert_eq!(record.risk_score, 0.92);
    assert_eq!(record.ai_analysis["risk_level"], "phishing");
    assert!(!record.id.is_empty());
    assert!(!record.created_at.is_empty());
}

#[tokio::test]
async fn analyze_sanitizes_fields_before_storage() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let store = Arc::new(MemoryStore::new());
    let port = start_server(
        classifier.clone(),
        store.clone(),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let body = serde_json::json!({
        "messageType": "email",
        "sender": "a@b.com",
        "subject": "<b>Urgent</b>",
        "content": "Click javascript:verify() now onclick=x"
    });
    let (status, _) = post_analyze(port, Some(ALICE_TOKEN), body).await;
    assert_eq!(status, 200);

    // The prompt and the stored record both see sanitized text.
    let last = classifier.last.lock().await;
    let (prompt, _) = last.as_ref().unwrap();
    assert!(prompt.text.contains("Subject: bUrgent/b"));
    assert!(prompt.text.contains("Click verify() now x"));

    let records = store.list_scam_logs(&alice_scope(), 0).await.unwrap();
    assert_eq!(records[0].subject.as_deref(), Some("bUrgent/b"));
    assert_eq!(records[0].content, "Click verify() now x");
}

#[tokio::test]
async fn trusted_contact_downgrades_verdict_to_safe() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let store = Arc::new(MemoryStore::new());
    store.add_trusted_contact("alice", "A@B.com").await;
    let port = start_server(
        classifier,
        store.clone(),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(status, 200);
    assert_eq!(body["risk_level"], "safe");
    assert_eq!(body["risk_score"], 0.0);
    assert_eq!(body["flagged_reasons"], serde_json::json!(["Trusted contact"]));

    let records = store.list_scam_logs(&alice_scope(), 0).await.unwrap();
    assert_eq!(records[0].risk_level, "safe");
    assert_eq!(records[0].risk_score, 0.0);
}

#[tokio::test]
async fn trusted_contact_does_not_suppress_scam_verdict() {
    const SCAM_REPLY: &str =
        r#"{"risk_level": "scam", "risk_score": 0.97, "flagged_reasons": ["Fake prize"]}"#;
    let classifier = ScriptedClassifier::new(Script::Reply(SCAM_REPLY));
    let store = Arc::new(MemoryStore::new());
    store.add_trusted_contact("alice", "a@b.com").await;
    let port = start_server(
        classifier,
        store.clone(),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(status, 200);
    assert_eq!(body["risk_level"], "scam");
    assert_eq!(body["risk_score"], 0.97);

    let records = store.list_scam_logs(&alice_scope(), 0).await.unwrap();
    assert_eq!(records[0].risk_level, "scam");
}

#[tokio::test]
async fn trust_override_ignores_other_users_contacts() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let store = Arc::new(MemoryStore::new());
    store.add_trusted_contact("bob", "a@b.com").await;
    let port = start_server(
        classifier,
        store.clone(),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (_, body) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(body["risk_level"], "phishing");
}

#[tokio::test]
async fn missing_bearer_is_rejected_before_classification() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let port = start_server(
        classifier.clone(),
        Arc::new(MemoryStore::new()),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, None, email_body()).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Authentication required. Please log in.");
    assert_eq!(classifier.calls(), 0, "classifier must not be called");
}

#[tokio::test]
async fn short_token_is_rejected_without_auth_round_trip() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let port = start_server(
        classifier.clone(),
        Arc::new(MemoryStore::new()),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, Some("short"), email_body()).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Invalid authentication token");
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let port = start_server(
        classifier.clone(),
        Arc::new(MemoryStore::new()),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) =
        post_analyze(port, Some("mallory-token-0123456789"), email_body()).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Authentication failed");
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn invalid_request_is_rejected_before_classification() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let store = Arc::new(MemoryStore::new());
    let port = start_server(
        classifier.clone(),
        store.clone(),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    // A call with neither content nor audio.
    let body = serde_json::json!({"messageType": "call", "sender": "+15551234567"});
    let (status, response) = post_analyze(port, Some(ALICE_TOKEN), body).await;
    assert_eq!(status, 400);
    assert_eq!(response["error"], "Validation failed");
    assert!(response["details"]
        .as_str()
        .unwrap()
        .contains("either content or audioData is required"));
    assert_eq!(classifier.calls(), 0);
    assert!(store
        .list_scam_logs(&alice_scope(), 0)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn validation_reports_every_violated_field() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let port = start_server(
        classifier,
        Arc::new(MemoryStore::new()),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let body = serde_json::json!({"messageType": "email", "sender": "not a sender"});
    let (status, response) = post_analyze(port, Some(ALICE_TOKEN), body).await;
    assert_eq!(status, 400);
    let details = response["details"].as_str().unwrap();
    assert!(details.contains("sender: must be a valid email or phone number"));
    assert!(details.contains("content: either content or audioData is required"));
}

#[tokio::test]
async fn rate_limited_upstream_returns_429_without_record() {
    let classifier = ScriptedClassifier::new(Script::RateLimited);
    let store = Arc::new(MemoryStore::new());
    let port = start_server(
        classifier,
        store.clone(),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(status, 429);
    assert_eq!(body["error"], "AI rate limit exceeded. Please try again later.");
    assert!(store
        .list_scam_logs(&alice_scope(), 0)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn quota_exhausted_returns_402() {
    let classifier = ScriptedClassifier::new(Script::QuotaExhausted);
    let port = start_server(
        classifier,
        Arc::new(MemoryStore::new()),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(status, 402);
    assert_eq!(body["error"], "AI credits exhausted. Please add credits to continue.");
}

#[tokio::test]
async fn generic_upstream_failure_returns_502() {
    let classifier = ScriptedClassifier::new(Script::Upstream);
    let port = start_server(
        classifier,
        Arc::new(MemoryStore::new()),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(status, 502);
    assert_eq!(body["error"], "AI analysis failed");
}

#[tokio::test]
async fn classifier_client_failure_returns_500_not_502() {
    let classifier = ScriptedClassifier::new(Script::Internal);
    let store = Arc::new(MemoryStore::new());
    let port = start_server(
        classifier,
        store.clone(),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "internal error");
    assert!(store
        .list_scam_logs(&alice_scope(), 0)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn unparsable_model_reply_falls_back_and_persists() {
    let classifier = ScriptedClassifier::new(Script::Reply("I cannot help with that."));
    let store = Arc::new(MemoryStore::new());
    let port = start_server(
        classifier,
        store.clone(),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(status, 200, "fallback must never fail the call");
    assert_eq!(body["risk_level"], "suspicious");
    assert_eq!(body["risk_score"], 0.5);
    assert_eq!(
        body["flagged_reasons"],
        serde_json::json!(["Unable to complete full analysis"])
    );

    let records = store.list_scam_logs(&alice_scope(), 0).await.unwrap();
    assert_eq!(records[0].risk_level, "suspicious");
    assert_eq!(records[0].risk_score, 0.5);
}

#[tokio::test]
async fn prose_wrapped_json_reply_is_extracted() {
    const WRAPPED: &str = "Sure! Here is my analysis:\n\n{\"risk_level\": \"scam\", \"risk_score\": 0.8}\n\nStay safe!";
    let classifier = ScriptedClassifier::new(Script::Reply(WRAPPED));
    let port = start_server(
        classifier,
        Arc::new(MemoryStore::new()),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(status, 200);
    assert_eq!(body["risk_level"], "scam");
    assert_eq!(body["risk_score"], 0.8);
}

#[tokio::test]
async fn call_with_audio_uses_audio_prompt_and_payload() {
    const SAFE_REPLY: &str = r#"{"risk_level": "safe", "risk_score": 0.05}"#;
    let classifier = ScriptedClassifier::new(Script::Reply(SAFE_REPLY));
    let port = start_server(
        classifier.clone(),
        Arc::new(MemoryStore::new()),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let body = serde_json::json!({
        "messageType": "call",
        "sender": "+15551234567",
        "audioData": "UklGRg=="
    });
    let (status, _) = post_analyze(port, Some(ALICE_TOKEN), body).await;
    assert_eq!(status, 200);

    let last = classifier.last.lock().await;
    let (prompt, audio) = last.as_ref().unwrap();
    assert!(prompt.attach_audio);
    assert!(prompt.text.contains("phone call recording"));
    assert_eq!(audio.as_deref(), Some("UklGRg=="));
}

#[tokio::test]
async fn persistence_failure_returns_500_and_discards_verdict() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let store = Arc::new(FailingInsertStore {
        inner: MemoryStore::new(),
    });
    let port = start_server(
        classifier.clone(),
        store,
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Failed to save analysis");
    assert!(body["details"].as_str().unwrap().contains("insert refused"));
    // The classification did happen; only its result was discarded.
    assert_eq!(classifier.calls(), 1);
    assert!(body.get("risk_level").is_none());
}

#[tokio::test]
async fn logs_returns_only_the_callers_records() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let store = Arc::new(MemoryStore::new());
    let port = start_server(
        classifier,
        store.clone(),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, _) = post_analyze(port, Some(ALICE_TOKEN), email_body()).await;
    assert_eq!(status, 200);
    let bob_body = serde_json::json!({
        "messageType": "sms",
        "sender": "+15559876543",
        "content": "You won a prize"
    });
    let (status, _) = post_analyze(port, Some(BOB_TOKEN), bob_body).await;
    assert_eq!(status, 200);

    let (status, body) = get_json(port, "/logs", Some(ALICE_TOKEN)).await;
    assert_eq!(status, 200);
    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["user_id"], "alice");
    assert_eq!(logs[0]["sender"], "a@b.com");

    let (status, body) = get_json(port, "/logs", Some(BOB_TOKEN)).await;
    assert_eq!(status, 200);
    assert_eq!(body["logs"].as_array().unwrap().len(), 1);
    assert_eq!(body["logs"][0]["message_type"], "sms");
}

#[tokio::test]
async fn logs_requires_authentication() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let port = start_server(
        classifier,
        Arc::new(MemoryStore::new()),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, _) = get_json(port, "/logs", None).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let classifier = ScriptedClassifier::new(Script::Reply(PHISHING_REPLY));
    let port = start_server(
        classifier,
        Arc::new(MemoryStore::new()),
        TokenMapVerifier::with_default_users(),
    )
    .await;

    let (status, body) = get_json(port, "/nonexistent", Some(ALICE_TOKEN)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not found");
}
