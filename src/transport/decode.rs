//! Content-encoding aware body decoding for dumps.

use std::io::Read;

use axum::http::header::{HeaderMap, CONTENT_ENCODING};

use crate::transport::dump::DumpError;

/// Decodes `body` according to its `Content-Encoding` headers and returns
/// it as text.
///
/// Stacked encodings are undone in reverse order. An encoding that cannot
/// be decoded yields a placeholder instead of the body. An empty body is
/// empty whatever its declared encoding (HEAD, 204 and 304 responses).
pub fn decode_body(headers: &HeaderMap, body: &[u8]) -> Result<String, DumpError> {
    if body.is_empty() {
        return Ok(String::new());
    }
    let encodings = content_encodings(headers);

    let mut decoded = body.to_vec();
    for encoding in encodings.iter().rev() {
        decoded = match encoding.as_str() {
            "gzip" | "x-gzip" => read_all(encoding, flate2::read::GzDecoder::new(&decoded[..]))?,
            "deflate" => read_all(encoding, flate2::read::ZlibDecoder::new(&decoded[..]))?,
            "br" => read_all(encoding, brotli::Decompressor::new(&decoded[..], 4096))?,
            other => {
                return Ok(format!("<{} bytes of {}-encoded body>", body.len(), other));
            }
        };
    }

    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

fn content_encodings(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty() && v != "identity")
        .collect()
}

fn read_all(encoding: &str, mut reader: impl Read) -> Result<Vec<u8>, DumpError> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|source| DumpError::Decode {
            encoding: encoding.to_string(),
            source,
        })?;
    Ok(out)
}
