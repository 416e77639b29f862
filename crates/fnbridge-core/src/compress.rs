use std::io::{self, Write};

use async_compression::futures::bufread::{BrotliEncoder, GzipEncoder};
use async_stream::try_stream;
use async_trait::async_trait;
use brotli::CompressorWriter;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression as GzipLevel;
use futures::io::{AsyncReadExt, BufReader};
use futures::stream::Stream;
use futures::TryStream;
use futures_util::{StreamExt, TryStreamExt};

use crate::body::Body;
use crate::context::RequestContext;
use crate::error::BridgeError;
use crate::http::{
    header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, VARY},
    HeaderValue, Response,
};
use crate::middleware::{Middleware, Next};

const BUFFER_SIZE: usize = 8 * 1024;

/// Content codings the middleware can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentCoding {
    Brotli,
    Gzip,
}

impl ContentCoding {
    pub fn token(self) -> &'static str {
        match self {
            ContentCoding::Brotli => "br",
            ContentCoding::Gzip => "gzip",
        }
    }
}

/// Pick a coding from an `Accept-Encoding` header value. Brotli wins when
/// both are acceptable; entries with `q=0` are treated as absent.
pub fn negotiate(accept_encoding: Option<&str>) -> Option<ContentCoding> {
    let raw = accept_encoding?;
    let mut fallback = None;

    for entry in raw.split(',') {
        let mut parts = entry.split(';');
        let token = parts.next().map(str::trim).unwrap_or("");
        let rejected = parts.any(|param| {
            param
                .trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        });
        if rejected {
            continue;
        }

        if token.eq_ignore_ascii_case("br") {
            return Some(ContentCoding::Brotli);
        }
        if token.eq_ignore_ascii_case("gzip") || token.eq_ignore_ascii_case("x-gzip") || token == "*"
        {
            fallback.get_or_insert(ContentCoding::Gzip);
        }
    }

    fallback
}

/// Encode a stream of chunks with gzip.
pub fn encode_gzip_stream<S>(stream: S) -> impl Stream<Item = Result<Bytes, io::Error>>
where
    S: TryStream<Ok = Bytes, Error = io::Error> + Unpin,
{
    try_stream! {
        let reader = BufReader::new(stream.into_async_read());
        let mut encoder = GzipEncoder::new(reader);
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let read = encoder.read(&mut buffer).await?;
            if read == 0 {
                break;
            }

            yield Bytes::copy_from_slice(&buffer[..read]);
        }
    }
}

/// Encode a stream of chunks with brotli.
pub fn encode_brotli_stream<S>(stream: S) -> impl Stream<Item = Result<Bytes, io::Error>>
where
    S: TryStream<Ok = Bytes, Error = io::Error> + Unpin,
{
    try_stream! {
        let reader = BufReader::new(stream.into_async_read());
        let mut encoder = BrotliEncoder::new(reader);
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let read = encoder.read(&mut buffer).await?;
            if read == 0 {
                break;
            }

            yield Bytes::copy_from_slice(&buffer[..read]);
        }
    }
}

fn gzip_bytes(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), GzipLevel::default());
    encoder.write_all(input)?;
    encoder.finish()
}

fn brotli_bytes(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    {
        let mut writer = CompressorWriter::new(&mut output, 4096, 5, 21);
        writer.write_all(input)?;
    }
    Ok(output)
}

fn encode_response(response: Response, coding: ContentCoding) -> Result<Response, BridgeError> {
    let (mut parts, body) = response.into_parts();
    parts
        .headers
        .insert(CONTENT_ENCODING, HeaderValue::from_static(coding.token()));
    parts
        .headers
        .append(VARY, HeaderValue::from_static("accept-encoding"));

    let body = match body {
        Body::Once(bytes) => {
            let encoded = match coding {
                ContentCoding::Gzip => gzip_bytes(&bytes),
                ContentCoding::Brotli => brotli_bytes(&bytes),
            }
            .map_err(BridgeError::internal)?;
            parts
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from(encoded.len()));
            Body::from_bytes(encoded)
        }
        Body::Stream(stream) => {
            // Encoded length is unknowable up front.
            parts.headers.remove(CONTENT_LENGTH);
            let chunks = stream.map(|chunk| chunk.map_err(io::Error::other));
            match coding {
                ContentCoding::Gzip => Body::from_stream(encode_gzip_stream(chunks)),
                ContentCoding::Brotli => Body::from_stream(encode_brotli_stream(chunks)),
            }
        }
    };

    Ok(Response::from_parts(parts, body))
}

/// Response compression with no minimum-size threshold: any response whose
/// client advertises support is encoded, down to a single byte. Responses
/// that already carry a `Content-Encoding` pass through untouched.
pub struct Compression;

#[async_trait(?Send)]
impl Middleware for Compression {
    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Result<Response, BridgeError> {
        let accept_encoding = ctx
            .request()
            .headers()
            .get(ACCEPT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let response = next.run(ctx).await?;

        let Some(coding) = negotiate(accept_encoding.as_deref()) else {
            return Ok(response);
        };
        if response.headers().contains_key(CONTENT_ENCODING) {
            return Ok(response);
        }

        encode_response(response, coding)
    }
}
