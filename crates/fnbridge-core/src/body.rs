use std::fmt;

use bytes::Bytes;
use futures_util::stream::{LocalBoxStream, Stream, StreamExt};
use serde::Serialize;

/// HTTP body carried through the handler chain. Either a single buffered
/// `Bytes` payload or a streaming source of chunks. Streams use
/// `LocalBoxStream` so handler futures stay usable on single-threaded
/// executors.
pub enum Body {
    Once(Bytes),
    Stream(LocalBoxStream<'static, Result<Bytes, anyhow::Error>>),
}

impl Body {
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    pub fn from_bytes<B>(bytes: B) -> Self
    where
        B: Into<Bytes>,
    {
        Self::Once(bytes.into())
    }

    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + 'static,
        anyhow::Error: From<E>,
    {
        Self::Stream(
            stream
                .map(|chunk| chunk.map_err(anyhow::Error::from))
                .boxed_local(),
        )
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Bytes> + 'static,
    {
        Self::Stream(stream.map(Ok::<Bytes, anyhow::Error>).boxed_local())
    }

    pub fn text<S>(text: S) -> Self
    where
        S: Into<String>,
    {
        Self::from_bytes(text.into().into_bytes())
    }

    pub fn json<T>(value: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize,
    {
        serde_json::to_vec(value).map(Self::from_bytes)
    }

    /// Buffered payload bytes. Panics on a streaming body; callers decide
    /// buffered-ness before reading.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Once(bytes) => bytes.as_ref(),
            Body::Stream(_) => panic!("streaming body does not expose in-memory bytes"),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Body::Once(bytes) => bytes,
            Body::Stream(_) => panic!("streaming body cannot be converted into bytes"),
        }
    }

    pub fn into_stream(self) -> Option<LocalBoxStream<'static, Result<Bytes, anyhow::Error>>> {
        match self {
            Body::Once(_) => None,
            Body::Stream(stream) => Some(stream),
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Body::Stream(_))
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Once(bytes) => f
                .debug_struct("Body::Once")
                .field("len", &bytes.len())
                .finish(),
            Body::Stream(_) => f.debug_tuple("Body::Stream").finish(),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body::from_bytes(value)
    }
}

impl From<&[u8]> for Body {
    fn from(value: &[u8]) -> Self {
        Body::from_bytes(Bytes::copy_from_slice(value))
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::text(value)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::text(value)
    }
}
