//! Streaming of artifact files into response bodies.

use axum::body::Body;
use bytes::Bytes;
use futures::Stream;
use std::io;
use std::path::Path;
use std::pin::Pin;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Chunk size for streaming reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// A boxed stream of artifact bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// An opened artifact, ready to be sent as a response body.
///
/// The file handle lives inside the stream and is closed when the stream
/// finishes, fails or is dropped.
pub struct ArtifactBody {
    size: u64,
    stream: ByteStream,
}

impl ArtifactBody {
    /// Open the artifact at `path`.
    ///
    /// Open and stat failures surface here, before a status line is sent.
    pub async fn open(path: &Path) -> io::Result<Self> {
        let file = fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        let source = path.display().to_string();

        // Stream the file in chunks instead of loading entirely into memory
        let stream = async_stream::try_stream! {
            let mut file = file;
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = file.read(&mut buf).await.inspect_err(|e| {
                    crate::metrics::ARTIFACT_STREAM_ERRORS.inc();
                    tracing::error!(path = %source, error = %e, "artifact streaming failed mid-transfer");
                })?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(Self {
            size,
            stream: Box::pin(stream),
        })
    }

    /// Size of the artifact in bytes, as seen when it was opened.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn into_stream(self) -> ByteStream {
        self.stream
    }

    pub fn into_body(self) -> Body {
        Body::from_stream(self.stream)
    }
}
