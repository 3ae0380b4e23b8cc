//! The chat relay route.
//!
//! `POST /ai-chat` authenticates the caller, validates the conversation,
//! prepends the tutoring persona and relays the provider's event stream
//! back to the caller chunk by chunk.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use futures::TryStreamExt;
use tracing::{info, warn};
use tutor_types::{ChatRequest, MAX_CONTENT_CHARS, MAX_MESSAGES};
use utoipa::{OpenApi, ToSchema};

use crate::auth::RequireUser;
use crate::error::GatewayError;
use crate::prompt::with_persona;
use crate::state::AppState;

/// Bytes a single character can take in a request body: an astral
/// character written as an escaped surrogate pair (`\ud83d\ude00`).
const MAX_ESCAPED_CHAR_BYTES: usize = 12;

/// Per-message JSON envelope (`{"role":"assistant","content":""}`, commas,
/// whitespace) with headroom.
const MESSAGE_ENVELOPE_BYTES: usize = 256;

/// Largest body a valid request can have: every message at the content
/// limit in its most expensive encoding, plus the outer object. Larger
/// bodies cannot be valid and are refused while reading.
const MAX_BODY_BYTES: usize =
    MAX_MESSAGES * (MAX_CONTENT_CHARS * MAX_ESCAPED_CHAR_BYTES + MESSAGE_ENVELOPE_BYTES) + 1024;

#[derive(OpenApi)]
#[openapi(
    paths(relay_chat),
    components(schemas(ChatRequestBody, ChatMessageBody, ErrorBody))
)]
pub struct ChatApi;

/// Register the relay route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ai-chat", post(relay_chat))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

// ── OpenAPI schemas ───────────────────────────────────────────────────────────

/// Request body accepted by `POST /ai-chat`.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ChatRequestBody {
    /// Between 1 and 50 messages, oldest first.
    messages: Vec<ChatMessageBody>,
}

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ChatMessageBody {
    /// One of `system`, `user`, `assistant`.
    #[schema(example = "user")]
    role: String,
    /// At most 8000 characters.
    #[schema(example = "什么是光合作用？")]
    content: String,
}

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ErrorBody {
    error: String,
}

// ── Handler ───────────────────────────────────────────────────────────────────

/// Relay a tutoring conversation to the model provider.
///
/// On success the provider's `text/event-stream` body is forwarded as it
/// arrives: `data: {"choices":[{"delta":{"content":"…"}}]}` lines followed
/// by `data: [DONE]`.
#[utoipa::path(
    post,
    path = "/ai-chat",
    tag = "chat",
    request_body = ChatRequestBody,
    responses(
        (status = 200, description = "Event stream of completion deltas", content_type = "text/event-stream", body = String),
        (status = 400, description = "Invalid conversation", body = ErrorBody),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
        (status = 402, description = "Provider quota exhausted", body = ErrorBody),
        (status = 429, description = "Provider rate limited", body = ErrorBody),
        (status = 500, description = "Provider or server failure", body = ErrorBody),
    )
)]
pub async fn relay_chat(
    State(state): State<Arc<AppState>>,
    RequireUser(identity): RequireUser,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, GatewayError> {
    let request = ChatRequest::from_json(&body?).inspect_err(|e| {
        warn!(user_id = %identity.user_id, error = %e, "rejected chat request");
    })?;

    let count = request.messages.len();
    let messages = with_persona(request.messages);

    let upstream = state.provider.stream_chat(&messages).await?;
    info!(user_id = %identity.user_id, messages = count, "relaying chat stream");

    let relayed = upstream.inspect_err(|e| warn!(error = %e, "provider stream interrupted"));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(relayed),
    )
        .into_response())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::http::{Method, Request, StatusCode};
    use futures::stream::{self, StreamExt};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tutor_types::{done_event, text, ChatChunk, ChatMessage, Role};

    use crate::auth::{Identity, IdentityVerifier, VerifyError};
    use crate::config::Config;
    use crate::prompt::TUTOR_SYSTEM_PROMPT;
    use crate::routes;
    use crate::upstream::{ByteStream, ChatProvider, UpstreamError};

    use super::*;

    /// Accepts the token `good`, rejects everything else, fails on `boom`.
    #[derive(Default)]
    struct FakeVerifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityVerifier for FakeVerifier {
        async fn verify(&self, token: &str) -> Result<Option<Identity>, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match token {
                "good" => Ok(Some(Identity {
                    user_id: "student-1".into(),
                    email: None,
                })),
                "boom" => Err(VerifyError::UnexpectedStatus(503)),
                _ => Ok(None),
            }
        }
    }

    enum Reply {
        Chunks(Vec<String>),
        Status(u16),
    }

    struct FakeProvider {
        reply: Reply,
        calls: AtomicUsize,
        seen: Mutex<Vec<ChatMessage>>,
    }

    impl FakeProvider {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatProvider for FakeProvider {
        async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ByteStream, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = messages.to_vec();
            match &self.reply {
                Reply::Chunks(chunks) => Ok(stream::iter(
                    chunks
                        .iter()
                        .map(|c| Ok::<_, io::Error>(Bytes::from(c.clone())))
                        .collect::<Vec<_>>(),
                )
                .boxed()),
                Reply::Status(429) => Err(UpstreamError::RateLimited),
                Reply::Status(402) => Err(UpstreamError::QuotaExhausted),
                Reply::Status(status) => Err(UpstreamError::Status {
                    status: *status,
                    body: "upstream secret detail".into(),
                }),
            }
        }
    }

    struct Harness {
        app: Router,
        verifier: Arc<FakeVerifier>,
        provider: Arc<FakeProvider>,
    }

    fn harness(reply: Reply) -> Harness {
        let verifier = Arc::new(FakeVerifier::default());
        let provider = Arc::new(FakeProvider::new(reply));
        let state = Arc::new(AppState {
            config: Arc::new(Config::default()),
            verifier: verifier.clone(),
            provider: provider.clone(),
        });
        Harness {
            app: routes::build(state),
            verifier,
            provider,
        }
    }

    fn ok_stream() -> Reply {
        Reply::Chunks(vec![ChatChunk::delta("A").to_sse_event(), done_event()])
    }

    fn chat_request(auth: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/ai-chat")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn hello() -> Value {
        json!({ "messages": [{ "role": "user", "content": "你好" }] })
    }

    #[tokio::test]
    async fn missing_or_malformed_credentials_are_rejected_before_upstream() {
        let h = harness(ok_stream());
        for auth in [None, Some("good"), Some("Basic good"), Some("Bearer "), Some("bearer good")] {
            let res = h.app.clone().oneshot(chat_request(auth, hello())).await.unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{auth:?}");
            assert_eq!(json_body(res).await, json!({ "error": "Unauthorized" }));
        }
        assert_eq!(h.verifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unverified_token_is_unauthorized() {
        let h = harness(ok_stream());
        let res = h.app.clone().oneshot(chat_request(Some("Bearer expired"), hello())).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unauthorized_wins_over_invalid_body() {
        let h = harness(ok_stream());
        let res = h
            .app
            .clone()
            .oneshot(chat_request(Some("Bearer expired"), json!({ "messages": [] })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn verifier_failure_is_generic_500() {
        let h = harness(ok_stream());
        let res = h.app.clone().oneshot(chat_request(Some("Bearer boom"), hello())).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(res).await["error"], text::SERVICE_UNAVAILABLE);
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn message_count_must_be_between_one_and_fifty() {
        let h = harness(ok_stream());
        let many: Vec<Value> = (0..51).map(|i| json!({ "role": "user", "content": i.to_string() })).collect();
        for body in [json!({ "messages": [] }), json!({ "messages": many }), json!({}), json!([1, 2])] {
            let res = h.app.clone().oneshot(chat_request(Some("Bearer good"), body)).await.unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            assert!(json_body(res).await["error"].is_string());
        }
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bad_role_or_oversized_content_is_rejected() {
        let h = harness(ok_stream());
        let bodies = [
            json!({ "messages": [{ "role": "tool", "content": "x" }] }),
            json!({ "messages": [{ "role": "user", "content": "字".repeat(8001) }] }),
            json!({ "messages": [{ "role": "user", "content": 42 }] }),
            json!({ "messages": [{ "role": "user", "content": "ok" }, "nope"] }),
        ];
        for body in bodies {
            let res = h.app.clone().oneshot(chat_request(Some("Bearer good"), body)).await.unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);

        let boundary = json!({ "messages": [{ "role": "user", "content": "字".repeat(8000) }] });
        let res = h.app.clone().oneshot(chat_request(Some("Bearer good"), boundary)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_is_a_client_error() {
        let h = harness(ok_stream());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/ai-chat")
            .header(header::AUTHORIZATION, "Bearer good")
            .body(Body::from("{\"messages\": ["))
            .unwrap();
        let res = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    }

    fn raw_request(body: String) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/ai-chat")
            .header(header::AUTHORIZATION, "Bearer good")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn body_over_the_size_limit_is_a_client_error() {
        let h = harness(ok_stream());
        let huge = json!({ "messages": [{ "role": "user", "content": "a".repeat(MAX_BODY_BYTES) }] });
        let res = h.app.clone().oneshot(raw_request(huge.to_string())).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["error"], "request body could not be read");
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn largest_valid_body_fits_the_limit() {
        // Every character is an astral one written as an escaped surrogate pair.
        let content = r"\ud83d\ude00".repeat(MAX_CONTENT_CHARS);
        let message = format!(r#"{{"role":"assistant","content":"{content}"}}"#);
        let body = format!(r#"{{"messages":[{}]}}"#, vec![message; MAX_MESSAGES].join(","));
        assert!(body.len() > 4 * 1024 * 1024);

        let h = harness(ok_stream());
        let res = h.app.clone().oneshot(raw_request(body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let seen = h.provider.seen.lock().unwrap();
        assert_eq!(seen.len(), MAX_MESSAGES + 1);
        assert_eq!(seen[1].content.chars().count(), MAX_CONTENT_CHARS);
        assert!(seen[1].content.chars().all(|c| c == '😀'));
    }

    #[tokio::test]
    async fn persona_is_prepended_and_order_kept() {
        let h = harness(ok_stream());
        let body = json!({ "messages": [
            { "role": "user", "content": "第一题" },
            { "role": "assistant", "content": "答案是3" },
            { "role": "system", "content": "extra" },
            { "role": "user", "content": "第二题" },
        ]});
        let res = h.app.clone().oneshot(chat_request(Some("Bearer good"), body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let seen = h.provider.seen.lock().unwrap().clone();
        let expected = vec![
            ChatMessage::system(TUTOR_SYSTEM_PROMPT),
            ChatMessage::user("第一题"),
            ChatMessage::assistant("答案是3"),
            ChatMessage::new(Role::System, "extra"),
            ChatMessage::user("第二题"),
        ];
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn fifty_messages_plus_persona_is_allowed() {
        let h = harness(ok_stream());
        let fifty: Vec<Value> = (0..50).map(|i| json!({ "role": "user", "content": i.to_string() })).collect();
        let res = h
            .app
            .clone()
            .oneshot(chat_request(Some("Bearer good"), json!({ "messages": fifty })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(h.provider.seen.lock().unwrap().len(), 51);
    }

    #[tokio::test]
    async fn success_relays_upstream_bytes_unchanged() {
        let first = ChatChunk::delta("你").to_sse_event();
        let second = ChatChunk::delta("好").to_sse_event();
        let h = harness(Reply::Chunks(vec![
            first.clone(),
            ": keep-alive\n\n".to_owned(),
            second.clone(),
            done_event(),
        ]));

        let res = h.app.clone().oneshot(chat_request(Some("Bearer good"), hello())).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(res.headers()[header::CACHE_CONTROL], "no-cache");

        let body = res.into_body().collect().await.unwrap().to_bytes();
        let expected = format!("{first}: keep-alive\n\n{second}data: [DONE]\n\n");
        assert_eq!(body, expected.as_bytes());
    }

    #[tokio::test]
    async fn upstream_statuses_map_to_client_statuses() {
        let cases = [
            (429, StatusCode::TOO_MANY_REQUESTS, text::RATE_LIMITED),
            (402, StatusCode::PAYMENT_REQUIRED, text::QUOTA_EXHAUSTED),
            (400, StatusCode::INTERNAL_SERVER_ERROR, text::SERVICE_UNAVAILABLE),
            (401, StatusCode::INTERNAL_SERVER_ERROR, text::SERVICE_UNAVAILABLE),
            (500, StatusCode::INTERNAL_SERVER_ERROR, text::SERVICE_UNAVAILABLE),
            (503, StatusCode::INTERNAL_SERVER_ERROR, text::SERVICE_UNAVAILABLE),
        ];
        for (upstream, status, message) in cases {
            let h = harness(Reply::Status(upstream));
            let res = h.app.clone().oneshot(chat_request(Some("Bearer good"), hello())).await.unwrap();
            assert_eq!(res.status(), status, "upstream {upstream}");
            let body = json_body(res).await;
            assert_eq!(body, json!({ "error": message }));
            assert!(!body.to_string().contains("secret"));
        }
    }

    #[tokio::test]
    async fn preflight_is_answered_without_auth() {
        let h = harness(ok_stream());
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/ai-chat")
            .header(header::ORIGIN, "https://tutor.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization, content-type, apikey")
            .body(Body::empty())
            .unwrap();
        let res = h.app.clone().oneshot(req).await.unwrap();
        assert!(res.status().is_success());
        assert!(res.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        assert_eq!(h.verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn actual_request_carries_cors_header() {
        let h = harness(ok_stream());
        let mut req = chat_request(Some("Bearer good"), hello());
        req.headers_mut()
            .insert(header::ORIGIN, "https://tutor.example".parse().unwrap());
        let res = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
