use serde::{Deserialize, Serialize};

/// One decoded SSE frame from the RAG service.
///
/// Only `content` fragments contribute to the stored answer text; `sources`
/// and `done` are forwarded to the client but never accumulated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RagEvent {
    Content {
        content: String,
    },

    Sources {
        sources: Vec<SourceDocument>,
    },

    Done,
}

/// A reference document attached to a `sources` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub slug: String,
    pub title: String,
    pub url: String,
    pub content_type: String,
    pub similarity: f64,
    pub excerpt: String,
}

impl RagEvent {
    /// Text carried by a `content` frame, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            RagEvent::Content { content } => Some(content),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, RagEvent::Done)
    }
}
