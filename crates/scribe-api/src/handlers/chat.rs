use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use scribe_persist::{ConversationStore, MessageRole};
use scribe_relay::{relay_stream, CompletionFn};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Thread titles are a truncated prefix of the first message.
const TITLE_MAX_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub locale: Option<String>,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
}

/// Relay a chat turn from the RAG service to the caller.
///
/// The inbound user message is persisted (identified callers only) before
/// the upstream call; the raw SSE bytes are then forwarded verbatim while a
/// decoder reconstructs the answer, which is persisted once the stream ends.
/// Storage failures after streaming begins are logged, never surfaced: the
/// live response takes priority over persistence.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Response> {
    let message = req.message.as_deref().unwrap_or("").trim().to_string();
    if message.is_empty() {
        return Err(ApiError::BadRequest("message is required".to_string()));
    }

    let locale = req
        .locale
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| state.config.rag.default_locale.clone());

    let thread_id = match caller_identity(&headers) {
        Some(user_id) => {
            resolve_thread(&state, &user_id, req.thread_id.as_deref(), &message).await?
        }
        // Anonymous callers get the stream but no persistence at all.
        None => None,
    };

    let upstream = state.upstream.open_chat_stream(&message, &locale).await?;

    let store = Arc::clone(&state.store);
    let on_complete: CompletionFn = Box::new(move |transcript| {
        Box::pin(async move {
            save_answer(store, thread_id, transcript).await;
        })
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(relay_stream(upstream, on_complete)))
        .map_err(|_| ApiError::Internal)?;

    Ok(response)
}

/// Caller identity as established by the fronting auth layer.
fn caller_identity(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Resolve the thread this turn belongs to and persist the user message.
///
/// A supplied thread must exist and belong to the caller. Storage failures
/// never block the stream: they leave the turn without a resolved thread,
/// which disables the remaining writes for this turn.
async fn resolve_thread(
    state: &AppState,
    user_id: &str,
    supplied: Option<&str>,
    message: &str,
) -> ApiResult<Option<ObjectId>> {
    let thread_id = match supplied {
        Some(raw) => {
            let id = ObjectId::from_str(raw)
                .map_err(|_| ApiError::BadRequest("Invalid thread ID format".to_string()))?;

            match state.store.find_thread(id).await {
                Ok(Some(thread)) if thread.user_id == user_id => Some(id),
                Ok(_) => return Err(ApiError::ThreadNotFound(raw.to_string())),
                Err(e) => {
                    tracing::error!(error = %e, thread_id = %id, "thread lookup failed");
                    None
                }
            }
        }
        None => {
            let title: String = message.chars().take(TITLE_MAX_CHARS).collect();
            match state.store.create_thread(user_id, &title).await {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::error!(error = %e, "failed to create thread");
                    None
                }
            }
        }
    };

    if let Some(id) = thread_id {
        if let Err(e) = state
            .store
            .append_message(id, MessageRole::User, message)
            .await
        {
            tracing::error!(error = %e, thread_id = %id, "failed to save user message");
        }
    }

    Ok(thread_id)
}

/// Completion side of the relay: persist the reconstructed answer and bump
/// the thread's last-activity timestamp. Runs after the stream ended (or
/// with a partial transcript after a mid-stream failure or disconnect).
async fn save_answer(
    store: Arc<dyn ConversationStore>,
    thread_id: Option<ObjectId>,
    transcript: String,
) {
    let Some(thread_id) = thread_id else {
        return;
    };
    if transcript.is_empty() {
        return;
    }

    if let Err(e) = store
        .append_message(thread_id, MessageRole::Model, &transcript)
        .await
    {
        tracing::error!(error = %e, %thread_id, "failed to save model message");
        return;
    }

    if let Err(e) = store.touch_thread(thread_id).await {
        tracing::error!(error = %e, %thread_id, "failed to touch thread");
    }
}
