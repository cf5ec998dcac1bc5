//! Gzip request bodies and compressed responses.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::GzEncoder;
use flate2::Compression;
use http::header::CONTENT_ENCODING;
use http::HeaderMap;
use thiserror::Error;

use crate::adapter::Response;

pub const GZIP: &str = "gzip";

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("failed to compress request body: {0}")]
    Encode(std::io::Error),

    #[error("failed to inflate {encoding} response body: {source}")]
    Decode {
        encoding: String,
        source: std::io::Error,
    },
}

/// Gzip a request body.
pub fn gzip(body: &[u8]) -> Result<Bytes, CompressionError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
    encoder.write_all(body).map_err(CompressionError::Encode)?;
    let compressed = encoder.finish().map_err(CompressionError::Encode)?;
    Ok(Bytes::from(compressed))
}

/// Inflate a response whose `content-encoding` is gzip or deflate.
///
/// Other encodings are returned as received. On success the header is dropped
/// so the body and headers agree.
pub fn inflate(mut response: Response) -> Result<Response, CompressionError> {
    let Some(encoding) = content_encoding(&response.headers) else {
        return Ok(response);
    };

    let mut inflated = Vec::with_capacity(response.body.len() * 4);
    let result = match encoding.as_str() {
        GZIP | "x-gzip" => GzDecoder::new(response.body.as_ref()).read_to_end(&mut inflated),
        "deflate" => ZlibDecoder::new(response.body.as_ref()).read_to_end(&mut inflated),
        _ => return Ok(response),
    };
    result.map_err(|source| CompressionError::Decode { encoding, source })?;

    response.headers.remove(CONTENT_ENCODING);
    response.body = Bytes::from(inflated);
    Ok(response)
}

fn content_encoding(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_ENCODING)?.to_str().ok()?;
    Some(value.trim().to_ascii_lowercase())
}
