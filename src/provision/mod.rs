//! Provisioning exchange with the remote configuration service
//!
//! One authenticated POST trades the client's public key for an encoded
//! server configuration. There is no retry: a failed exchange is reported
//! to the caller, which may re-run it with the same key pair.

pub mod client;

pub use client::{ProvisioningClient, ProvisioningRequest, ProvisioningResponse, RequestError};
