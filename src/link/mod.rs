//! Subscription link handling
//!
//! A subscription link is `vpn://` followed by URL-safe base64 of a 4-byte
//! length header and a zlib stream. The same encoding (minus the scheme) is
//! used by the provisioning server for the `config` field of its response,
//! so the decode primitive in [`codec`] is shared by both paths.

pub mod codec;

pub use codec::{
    decode, decode_document, decode_payload, encode, encode_link, parse_params, DecodeError,
    ProvisioningParams, LINK_SCHEME,
};
