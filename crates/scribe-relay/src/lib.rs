pub mod client;
pub mod decoder;
pub mod events;
pub mod relay;

pub use client::{ByteStream, RagClient, UpstreamClient, UpstreamError};
pub use decoder::FrameDecoder;
pub use events::{RagEvent, SourceDocument};
pub use relay::{relay_stream, CompletionFn, RelayError};
