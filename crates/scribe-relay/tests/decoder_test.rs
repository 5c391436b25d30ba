use scribe_relay::{FrameDecoder, RagEvent};

const STREAM: &[u8] = b"data: {\"type\":\"sources\",\"sources\":[{\"slug\":\"intro\",\"title\":\"Intro\",\"url\":\"/blog/intro\",\"content_type\":\"post\",\"similarity\":0.91,\"excerpt\":\"...\"}]}\n\ndata: {\"type\":\"content\",\"content\":\"Hi\"}\n\ndata: {\"type\":\"content\",\"content\":\" there\"}\n\ndata: {\"type\":\"done\"}\n\n";

fn decode_all(decoder: &mut FrameDecoder, chunks: &[&[u8]]) -> Vec<String> {
    let mut out = Vec::new();
    for chunk in chunks {
        for event in decoder.feed(chunk) {
            out.push(serde_json::to_string(&event).unwrap());
        }
    }
    out
}

#[test]
fn whole_stream_in_one_chunk() {
    let mut decoder = FrameDecoder::new();
    let events = decoder.feed(STREAM);

    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], RagEvent::Sources { .. }));
    assert_eq!(events[1].content(), Some("Hi"));
    assert_eq!(events[2].content(), Some(" there"));
    assert!(events[3].is_done());
}

#[test]
fn chunk_boundary_invariance() {
    let mut reference = FrameDecoder::new();
    let expected = decode_all(&mut reference, &[STREAM]);

    // Split at every byte offset, including mid-line.
    for split in 1..STREAM.len() {
        let mut decoder = FrameDecoder::new();
        let got = decode_all(&mut decoder, &[&STREAM[..split], &STREAM[split..]]);
        assert_eq!(got, expected, "split at byte {split}");
    }

    // One byte at a time.
    let mut decoder = FrameDecoder::new();
    let singles: Vec<&[u8]> = STREAM.chunks(1).collect();
    assert_eq!(decode_all(&mut decoder, &singles), expected);
}

#[test]
fn multibyte_character_split_across_chunks() {
    let frame = "data: {\"type\":\"content\",\"content\":\"안녕하세요\"}\n";
    let bytes = frame.as_bytes();

    for split in 1..bytes.len() {
        let mut decoder = FrameDecoder::new();
        let mut events = decoder.feed(&bytes[..split]);
        events.extend(decoder.feed(&bytes[split..]));

        assert_eq!(events.len(), 1, "split at byte {split}");
        assert_eq!(events[0].content(), Some("안녕하세요"));
    }
}

#[test]
fn malformed_frame_between_valid_frames() {
    let mut decoder = FrameDecoder::new();
    let events = decoder.feed(
        b"data: {\"type\":\"content\",\"content\":\"a\"}\ndata: {not json\ndata: {\"type\":\"content\",\"content\":\"b\"}\n",
    );

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].content(), Some("a"));
    assert_eq!(events[1].content(), Some("b"));
}

#[test]
fn unknown_event_type_is_dropped() {
    let mut decoder = FrameDecoder::new();
    let events = decoder.feed(b"data: {\"type\":\"telemetry\",\"ms\":12}\ndata: {\"type\":\"done\"}\n");

    assert_eq!(events.len(), 1);
    assert!(events[0].is_done());
}

#[test]
fn blank_and_comment_lines_are_keepalives() {
    let mut decoder = FrameDecoder::new();
    let events = decoder.feed(b"\n\n: keep-alive\n\ndata: {\"type\":\"content\",\"content\":\"x\"}\n");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].content(), Some("x"));
}

#[test]
fn trailing_fragment_without_newline_is_never_emitted() {
    let mut decoder = FrameDecoder::new();
    let events = decoder.feed(b"data: {\"type\":\"content\",\"content\":\"tail\"}");
    assert!(events.is_empty());
    assert!(decoder.pending() > 0);
}
