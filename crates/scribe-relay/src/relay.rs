use std::pin::Pin;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use thiserror::Error;

use crate::decoder::FrameDecoder;

/// Invoked exactly once per turn with the full accumulated answer text
/// (possibly empty). Persistence lives behind this boundary so the
/// transport-level stream never touches the store directly.
pub type CompletionFn = Box<dyn FnOnce(String) -> BoxFuture<'static, ()> + Send>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream stream failed: {0}")]
    Upstream(#[source] anyhow::Error),
}

/// Owns the decoder, the running transcript and the completion callback.
///
/// The callback fires on exactly one of three paths: explicit finish after
/// the upstream ends, explicit finish after a mid-stream upstream error, or
/// the drop guard when the downstream consumer disconnects and the relay
/// stream is dropped mid-turn.
struct TurnRecorder {
    decoder: FrameDecoder,
    transcript: String,
    on_complete: Option<CompletionFn>,
}

impl TurnRecorder {
    fn new(on_complete: CompletionFn) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            transcript: String::new(),
            on_complete: Some(on_complete),
        }
    }

    /// Feed a copy of a forwarded chunk into the decoder and accumulate
    /// every `content` fragment in arrival order. Never fails: frame errors
    /// are absorbed inside the decoder.
    fn observe(&mut self, chunk: &[u8]) {
        for event in self.decoder.feed(chunk) {
            if let Some(text) = event.content() {
                self.transcript.push_str(text);
            }
        }
    }

    /// Fire the completion callback with whatever has accumulated, and
    /// disarm the drop guard.
    async fn finish(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(std::mem::take(&mut self.transcript)).await;
        }
    }
}

impl Drop for TurnRecorder {
    fn drop(&mut self) {
        // Downstream disconnected mid-turn: persist the partial transcript
        // best-effort. Outside a runtime (plain drop in a sync test) the
        // callback is skipped.
        if let Some(on_complete) = self.on_complete.take() {
            let transcript = std::mem::take(&mut self.transcript);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(on_complete(transcript));
            }
        }
    }
}

/// Tee the upstream byte stream: every chunk is yielded downstream unchanged
/// and, from the same read, observed by a [`FrameDecoder`] to reconstruct
/// the answer text. One read, two consumers — the decode side can never
/// block or truncate the forwarded bytes.
///
/// When the upstream ends naturally, `on_complete` receives the full
/// transcript after the last chunk was yielded. On a mid-stream upstream
/// error the partial transcript is still delivered, then the stream yields
/// [`RelayError::Upstream`] and ends abruptly (the client sees no `done`
/// frame). If the returned stream is dropped before the upstream ends,
/// the partial transcript is delivered from the drop guard.
pub fn relay_stream<S, E>(
    upstream: S,
    on_complete: CompletionFn,
) -> Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<anyhow::Error> + Send,
{
    Box::pin(async_stream::stream! {
        let mut upstream = Box::pin(upstream);
        let mut recorder = TurnRecorder::new(on_complete);

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    recorder.observe(&bytes);
                    yield Ok(bytes);
                }
                Err(e) => {
                    let e = e.into();
                    tracing::warn!(error = %e, "upstream stream failed mid-turn");
                    recorder.finish().await;
                    yield Err(RelayError::Upstream(e));
                    return;
                }
            }
        }

        recorder.finish().await;
    })
}
