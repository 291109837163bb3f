//! HTTP boundary tests against a gateway bound to an ephemeral port.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use stachat::{
    api::{sign_payload, APIGateway, APIGatewayConfig, SignatureVerifier},
    config::ServerConfig,
    generation::PromptTemplate,
    pipeline::{AnswerPipeline, ContextAssembler},
};
use stachat_core::{
    CandidateDocument, GenerationBackend, GenerationError, ModelId, Query, RetrievalOutcome,
    RetrievalSource, Retriever,
};
use tokio::net::TcpListener;

const BODY: &str = r#"{"question":"x"}"#;
const HEADER: &str = "X-Hub-Signature-256";

struct OneDocument;

#[async_trait]
impl Retriever for OneDocument {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn retrieve(&self, _query: &Query) -> RetrievalOutcome {
        RetrievalOutcome::Retrieved(vec![CandidateDocument::new(
            "name: Sentinel-1",
            RetrievalSource::Vector,
        )])
    }
}

/// Answers with the last line of the prompt, or fails on demand.
struct EchoBackend {
    model: ModelId,
    fail: bool,
}

#[async_trait]
impl GenerationBackend for EchoBackend {
    fn model(&self) -> &ModelId {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.fail {
            return Err(GenerationError::Api {
                status: 503,
                message: "overloaded".to_string(),
            });
        }
        Ok(prompt.trim_end().lines().last().unwrap_or_default().to_string())
    }
}

async fn spawn_with(
    verifier: SignatureVerifier,
    max_question_chars: Option<usize>,
    fail: bool,
) -> SocketAddr {
    let pipeline = AnswerPipeline::new(
        Arc::new(OneDocument),
        Arc::new(EchoBackend {
            model: ModelId::new("gpt-3.5-turbo").unwrap(),
            fail,
        }),
        PromptTemplate::default(),
        ContextAssembler::default(),
        Duration::from_secs(5),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = APIGatewayConfig {
        bind_addr: addr,
        verifier,
        max_question_chars,
    };
    let gateway = APIGateway::new(config, Arc::new(pipeline));
    tokio::spawn(async move { gateway.serve(listener).await });
    addr
}

/// `None` runs with unsigned requests allowed.
async fn spawn_gateway(secret: Option<&str>, fail: bool) -> SocketAddr {
    let verifier = match secret {
        Some(secret) => SignatureVerifier::new(Some(secret.to_string()), HEADER, false),
        None => SignatureVerifier::unsigned(),
    };
    spawn_with(verifier, None, fail).await
}

async fn post(addr: SocketAddr, body: &str, signature: Option<&str>) -> reqwest::Response {
    let mut request = reqwest::Client::new()
        .post(format!("http://{}/webhook", addr))
        .header("content-type", "application/json")
        .body(body.to_string());
    if let Some(signature) = signature {
        request = request.header(HEADER, signature);
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn test_welcome_and_health() {
    let addr = spawn_gateway(None, false).await;
    let client = reqwest::Client::new();

    let welcome: Value = client
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(welcome["message"], "Welcome to STACHAT!");

    let health: Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_signed_request_is_answered() {
    let addr = spawn_gateway(Some("s"), false).await;
    let signature = sign_payload(b"s", BODY.as_bytes()).unwrap();

    let response = post(addr, BODY, Some(&signature)).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["answer"], "Question: x");
}

#[tokio::test]
async fn test_bare_hex_signature_is_accepted() {
    let addr = spawn_gateway(Some("s"), false).await;
    let signature = sign_payload(b"s", BODY.as_bytes()).unwrap();

    let response = post(addr, BODY, Some(signature.trim_start_matches("sha256="))).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_tampered_body_is_rejected() {
    let addr = spawn_gateway(Some("s"), false).await;
    let signature = sign_payload(b"s", BODY.as_bytes()).unwrap();

    let response = post(addr, r#"{"question":"y"}"#, Some(&signature)).await;
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "authentication");
}

#[tokio::test]
async fn test_tampered_signature_is_rejected() {
    let addr = spawn_gateway(Some("s"), false).await;
    let signature = sign_payload(b"s", BODY.as_bytes()).unwrap();
    let last = signature.chars().last().unwrap();
    let replacement = if last == '0' { '1' } else { '0' };
    let tampered = format!("{}{}", &signature[..signature.len() - 1], replacement);

    let response = post(addr, BODY, Some(&tampered)).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let addr = spawn_gateway(Some("s"), false).await;
    let response = post(addr, BODY, None).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_missing_question_is_bad_request() {
    let addr = spawn_gateway(None, false).await;

    let response = post(addr, "{}", None).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "validation");
    assert!(body["error"].as_str().unwrap().contains("Question is required"));

    let response = post(addr, r#"{"question":"   "}"#, None).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let addr = spawn_gateway(None, false).await;
    let response = post(addr, "question=x", None).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_generation_failure_is_server_error() {
    let addr = spawn_gateway(None, true).await;

    let response = post(addr, BODY, None).await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "generation");
    assert!(body["error"].as_str().unwrap().contains("overloaded"));
}

#[tokio::test]
async fn test_default_server_config_rejects_without_secret() {
    let gateway_config = APIGatewayConfig::from_server_config(&ServerConfig::default()).unwrap();
    let addr = spawn_with(gateway_config.verifier, gateway_config.max_question_chars, false).await;

    let response = post(addr, BODY, None).await;
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "authentication");

    let signature = sign_payload(b"s", BODY.as_bytes()).unwrap();
    let response = post(addr, BODY, Some(&signature)).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_long_questions_pass_without_a_limit() {
    let addr = spawn_gateway(None, false).await;
    let body = serde_json::json!({ "question": "q".repeat(20_000) }).to_string();

    let response = post(addr, &body, None).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_configured_question_limit_is_enforced() {
    let addr = spawn_with(SignatureVerifier::unsigned(), Some(10), false).await;

    let response = post(addr, r#"{"question":"way more than ten characters"}"#, None).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("exceeds 10 characters"));

    let response = post(addr, r#"{"question":"short"}"#, None).await;
    assert_eq!(response.status(), 200);
}
