//! Link codec: URL-safe base64 → 4-byte header → zlib
//!
//! Decoding runs in four steps, each failing with its own error kind:
//!
//! 1. strip the `vpn://` scheme (optional)
//! 2. URL-safe base64 decode
//! 3. drop the 4-byte header (big-endian uncompressed length)
//! 4. zlib decompress

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::io::{self, Read, Write};
use thiserror::Error;
use tracing::debug;

/// Scheme marker in front of subscription links
pub const LINK_SCHEME: &str = "vpn://";

const HEADER_LEN: usize = 4;

/// Cap on the capacity pre-allocated from the length header
const MAX_PREALLOC: usize = 1 << 20;

/// URL-safe alphabet; padding is optional on input but must be canonical when present.
const LINK_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid base64 encoding: {0}")]
    EncodingError(#[from] base64::DecodeError),

    #[error("Payload too short: {len} bytes, expected at least 4")]
    TruncatedPayloadError { len: usize },

    #[error("Failed to decompress payload: {0}")]
    DecompressionError(#[source] io::Error),

    #[error("Unexpected payload structure: {0}")]
    StructureError(String),
}

/// Endpoint and credential carried by a subscription link
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ProvisioningParams {
    #[serde(rename = "api_endpoint")]
    pub endpoint: String,
    #[serde(rename = "api_key")]
    pub credential: String,
}

impl ProvisioningParams {
    /// Decode a subscription link straight into its parameters
    pub fn from_link(link: &str) -> Result<Self, DecodeError> {
        parse_params(&decode(link)?)
    }
}

impl fmt::Debug for ProvisioningParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningParams")
            .field("endpoint", &self.endpoint)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Decode a subscription link, stripping the `vpn://` scheme if present
pub fn decode(link: &str) -> Result<Vec<u8>, DecodeError> {
    let text = link.trim();
    decode_payload(text.strip_prefix(LINK_SCHEME).unwrap_or(text))
}

/// Decode primitive shared by links and server responses (no scheme handling)
pub fn decode_payload(text: &str) -> Result<Vec<u8>, DecodeError> {
    let raw = LINK_ENGINE.decode(text.trim())?;

    if raw.len() < HEADER_LEN {
        return Err(DecodeError::TruncatedPayloadError { len: raw.len() });
    }
    let (header, body) = raw.split_at(HEADER_LEN);
    if body.is_empty() {
        return Err(DecodeError::DecompressionError(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "empty compressed stream",
        )));
    }

    // The header is only trusted as a capacity hint
    let hint = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let mut out = Vec::with_capacity(hint.min(MAX_PREALLOC));
    ZlibDecoder::new(body)
        .read_to_end(&mut out)
        .map_err(DecodeError::DecompressionError)?;

    debug!("Decoded payload: {} compressed bytes -> {} bytes", body.len(), out.len());
    Ok(out)
}

/// Parse a decoded payload as a JSON document of type `T`
pub fn decode_document<T: DeserializeOwned>(payload: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(payload).map_err(|e| DecodeError::StructureError(e.to_string()))
}

/// Extract the endpoint and credential from a decoded link payload
pub fn parse_params(payload: &[u8]) -> Result<ProvisioningParams, DecodeError> {
    let params: ProvisioningParams = decode_document(payload)?;

    if params.endpoint.trim().is_empty() {
        return Err(DecodeError::StructureError("api_endpoint is empty".to_string()));
    }
    if params.credential.trim().is_empty() {
        return Err(DecodeError::StructureError("api_key is empty".to_string()));
    }

    Ok(params)
}

/// Inverse of [`decode_payload`]: compress, prepend the length header, base64 encode
pub fn encode(data: &[u8]) -> io::Result<String> {
    let len = u32::try_from(data.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "payload exceeds 4 GiB"))?;

    let mut encoder = ZlibEncoder::new(len.to_be_bytes().to_vec(), Compression::default());
    encoder.write_all(data)?;
    let framed = encoder.finish()?;

    Ok(LINK_ENGINE.encode(framed))
}

/// Build a complete `vpn://` link for the given parameters
pub fn encode_link(endpoint: &str, credential: &str) -> io::Result<String> {
    let doc = serde_json::json!({
        "api_endpoint": endpoint,
        "api_key": credential,
    });
    Ok(format!("{}{}", LINK_SCHEME, encode(doc.to_string().as_bytes())?))
}
