//! Transport envelope handling: base64 text bodies and block compression.
//!
//! Both layers are peeled off before any dialect sees the payload.

use base64::Engine;
use std::borrow::Cow;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while unwrapping the transport envelope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The body was marked as base64 but is not valid base64.
    #[error("Invalid base64 body: {0}")]
    InvalidBase64(String),

    /// The `Content-Encoding` is not one this service understands.
    #[error("Unsupported content encoding: '{0}'")]
    UnsupportedEncoding(String),

    /// Snappy decompression failed.
    #[error("Invalid snappy compression: {0}")]
    InvalidSnappy(String),

    /// Nothing remained after unwrapping.
    #[error("Body is empty after decoding")]
    Empty,
}

/// Block compression applied to the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    /// No compression.
    #[default]
    Identity,
    /// Raw (block) snappy, as used by Prometheus remote write.
    Snappy,
}

impl FromStr for ContentEncoding {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "identity" => Ok(Self::Identity),
            "snappy" => Ok(Self::Snappy),
            other => Err(EnvelopeError::UnsupportedEncoding(other.to_string())),
        }
    }
}

impl ContentEncoding {
    /// Parses an optional `Content-Encoding` header value.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::UnsupportedEncoding`] for unknown encodings.
    pub fn from_header(value: Option<&str>) -> Result<Self, EnvelopeError> {
        value.map_or(Ok(Self::Identity), str::parse)
    }
}

/// Decodes a base64 text body. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`EnvelopeError::InvalidBase64`] when the text is not base64.
pub fn decode_base64(body: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    base64::engine::general_purpose::STANDARD
        .decode(body.trim_ascii())
        .map_err(|e| EnvelopeError::InvalidBase64(e.to_string()))
}

/// Decompresses a body according to its content encoding.
///
/// # Errors
///
/// Returns [`EnvelopeError::InvalidSnappy`] when snappy decoding fails.
pub fn decompress(body: &[u8], encoding: ContentEncoding) -> Result<Cow<'_, [u8]>, EnvelopeError> {
    match encoding {
        ContentEncoding::Identity => Ok(Cow::Borrowed(body)),
        ContentEncoding::Snappy => snap::raw::Decoder::new()
            .decompress_vec(body)
            .map(Cow::Owned)
            .map_err(|e| EnvelopeError::InvalidSnappy(e.to_string())),
    }
}

/// Peels the full envelope: base64 first, then decompression.
///
/// # Errors
///
/// Returns an error when either layer is invalid or the result is empty.
pub fn unwrap_envelope(
    body: &[u8],
    base64_encoded: bool,
    encoding: ContentEncoding,
) -> Result<Vec<u8>, EnvelopeError> {
    let decoded: Cow<'_, [u8]> = if base64_encoded {
        Cow::Owned(decode_base64(body)?)
    } else {
        Cow::Borrowed(body)
    };

    let payload = decompress(&decoded, encoding)?.into_owned();
    if payload.is_empty() {
        return Err(EnvelopeError::Empty);
    }
    Ok(payload)
}
