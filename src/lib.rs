//! VPN Provision - turn a `vpn://` subscription link into a tunnel config
//!
//! The link carries an API endpoint and key. The client generates a fresh
//! X25519 key pair, registers the public half with the provisioning server,
//! and fills the private half into the configuration template the server
//! returns.
//!
//! # Architecture
//!
//! - `link`: subscription link codec (base64 + zlib) shared with server responses
//! - `keys`: X25519 key pair generation
//! - `provision`: HTTP exchange with the provisioning server
//! - `assemble`: template extraction and private key substitution
//! - `config`: Configuration file handling (TOML)
//!
//! # Usage
//!
//! ```bash
//! vpn-provision provision --key 'vpn://AAAA...' --output wg0.conf
//! ```

pub mod assemble;
pub mod config;
pub mod keys;
pub mod link;
pub mod provision;

pub use assemble::{assemble, AssemblyError};
pub use config::{Config, ConfigError};
pub use keys::{CryptoError, KeyPair};
pub use link::{DecodeError, ProvisioningParams};
pub use provision::{ProvisioningClient, RequestError};

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Link decoding failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("Key generation failed: {0}")]
    Crypto(#[from] CryptoError),
    #[error("Provisioning request failed: {0}")]
    Request(#[from] RequestError),
    #[error("Config assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
}

/// Result of a successful provisioning run
#[derive(Debug, Clone)]
pub struct Provisioned {
    /// Tunnel config with the private key filled in
    pub config: String,
    /// Public key registered with the server
    pub public_key: String,
}

/// Run the whole pipeline: decode link, generate keys, provision, assemble
///
/// Each stage runs once, in order, and the first failure ends the run.
pub async fn provision_from_link(link: &str, config: &Config) -> Result<Provisioned, Error> {
    let params = ProvisioningParams::from_link(link)?;
    info!("Decoded subscription link for {}", params.endpoint);

    let keys = KeyPair::generate()?;
    let client = ProvisioningClient::new(&config.client)?;
    provision_with_keys(&client, &params, &keys, &config.tunnel.protocol).await
}

/// Provision with an existing key pair, e.g. when retrying a failed exchange
pub async fn provision_with_keys(
    client: &ProvisioningClient,
    params: &ProvisioningParams,
    keys: &KeyPair,
    protocol: &str,
) -> Result<Provisioned, Error> {
    let public_key = keys.public_key_base64();
    let response = client
        .provision(&params.endpoint, &params.credential, &public_key)
        .await?;

    let private_key = keys.private_key_base64();
    let config = assemble::assemble_with_protocol(&response.config, &private_key, protocol)?;
    info!("Configuration assembled");

    Ok(Provisioned { config, public_key })
}
