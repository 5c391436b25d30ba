use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use scribe_relay::{relay_stream, CompletionFn};

struct Completion {
    text: Arc<Mutex<Option<String>>>,
    calls: Arc<AtomicUsize>,
}

fn completion() -> (Completion, CompletionFn) {
    let text = Arc::new(Mutex::new(None));
    let calls = Arc::new(AtomicUsize::new(0));

    let text_slot = Arc::clone(&text);
    let call_count = Arc::clone(&calls);
    let on_complete: CompletionFn = Box::new(move |transcript| {
        Box::pin(async move {
            call_count.fetch_add(1, Ordering::SeqCst);
            *text_slot.lock().unwrap() = Some(transcript);
        })
    });

    (Completion { text, calls }, on_complete)
}

fn upstream_ok(chunks: &[&[u8]]) -> futures::stream::Iter<std::vec::IntoIter<anyhow::Result<Bytes>>> {
    let items: Vec<anyhow::Result<Bytes>> = chunks
        .iter()
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    futures::stream::iter(items)
}

#[tokio::test]
async fn forwards_bytes_verbatim_and_accumulates_content() {
    let chunks: &[&[u8]] = &[
        b"data: {\"type\":\"content\",\"content\":\"Hi\"}\n\n",
        b"data: {\"type\":\"content\",\"content\":\" there\"}\n\ndata: {\"type\":\"done\"}\n\n",
    ];
    let expected_bytes: Vec<u8> = chunks.concat();

    let (completion, on_complete) = completion();
    let mut relay = relay_stream(upstream_ok(chunks), on_complete);

    let mut forwarded = Vec::new();
    while let Some(chunk) = relay.next().await {
        forwarded.extend_from_slice(&chunk.unwrap());
    }

    assert_eq!(forwarded, expected_bytes);
    assert_eq!(
        completion.text.lock().unwrap().as_deref(),
        Some("Hi there")
    );
    assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_frame_does_not_corrupt_forwarding() {
    let chunks: &[&[u8]] = &[
        b"data: {\"type\":\"content\",\"content\":\"a\"}\n",
        b"data: {broken\n",
        b"data: {\"type\":\"content\",\"content\":\"b\"}\n",
    ];
    let expected_bytes: Vec<u8> = chunks.concat();

    let (completion, on_complete) = completion();
    let mut relay = relay_stream(upstream_ok(chunks), on_complete);

    let mut forwarded = Vec::new();
    while let Some(chunk) = relay.next().await {
        forwarded.extend_from_slice(&chunk.unwrap());
    }

    // The broken line reaches the client untouched; only accumulation skips it.
    assert_eq!(forwarded, expected_bytes);
    assert_eq!(completion.text.lock().unwrap().as_deref(), Some("ab"));
}

#[tokio::test]
async fn sources_and_done_contribute_no_text() {
    let chunks: &[&[u8]] = &[
        b"data: {\"type\":\"sources\",\"sources\":[]}\n\ndata: {\"type\":\"done\"}\n\n",
    ];

    let (completion, on_complete) = completion();
    let mut relay = relay_stream(upstream_ok(chunks), on_complete);
    while let Some(chunk) = relay.next().await {
        chunk.unwrap();
    }

    // Completion still fires, with an empty transcript.
    assert_eq!(completion.text.lock().unwrap().as_deref(), Some(""));
}

#[tokio::test]
async fn content_split_across_network_chunks() {
    let chunks: &[&[u8]] = &[
        b"data: {\"type\":\"content\",\"con",
        b"tent\":\"Hello\"}\n\ndata: {\"type\":\"done\"}\n\n",
    ];

    let (completion, on_complete) = completion();
    let mut relay = relay_stream(upstream_ok(chunks), on_complete);
    while let Some(chunk) = relay.next().await {
        chunk.unwrap();
    }

    assert_eq!(completion.text.lock().unwrap().as_deref(), Some("Hello"));
}

#[tokio::test]
async fn mid_stream_error_persists_partial_and_ends_abruptly() {
    let items: Vec<anyhow::Result<Bytes>> = vec![
        Ok(Bytes::from_static(
            b"data: {\"type\":\"content\",\"content\":\"partial\"}\n\n",
        )),
        Err(anyhow::anyhow!("connection reset")),
    ];

    let (completion, on_complete) = completion();
    let mut relay = relay_stream(futures::stream::iter(items), on_complete);

    assert!(relay.next().await.unwrap().is_ok());
    assert!(relay.next().await.unwrap().is_err());
    assert!(relay.next().await.is_none());

    assert_eq!(completion.text.lock().unwrap().as_deref(), Some("partial"));
    assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_disconnect_persists_partial_transcript() {
    let chunks: &[&[u8]] = &[
        b"data: {\"type\":\"content\",\"content\":\"first\"}\n\n",
        b"data: {\"type\":\"content\",\"content\":\" second\"}\n\n",
    ];

    let (completion, on_complete) = completion();
    let mut relay = relay_stream(upstream_ok(chunks), on_complete);

    // Consume one chunk, then drop the stream as a disconnecting client would.
    assert!(relay.next().await.unwrap().is_ok());
    drop(relay);

    // The drop guard fires the callback on the runtime.
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(completion.text.lock().unwrap().as_deref(), Some("first"));
    assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
}
