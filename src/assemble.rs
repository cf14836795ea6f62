//! Final configuration assembly
//!
//! The server's `config` field decodes to a document shaped like:
//!
//! ```json
//! {"containers": [{"awg": {"last_config": "{\"config\": \"...\"}"}}]}
//! ```
//!
//! `last_config` is itself a JSON string whose `config` field holds the
//! tunnel config with the private key left as a placeholder.

use crate::link::{self, DecodeError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Placeholder the server leaves in place of the client's private key
pub const PRIVATE_KEY_PLACEHOLDER: &str = "$WIREGUARD_CLIENT_PRIVATE_KEY";

/// Container key for AmneziaWG templates
pub const DEFAULT_PROTOCOL: &str = "awg";

const TEMPLATE_KEY: &str = "last_config";

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Failed to decode server config: {0}")]
    Decode(#[from] DecodeError),

    #[error("Server config has no containers")]
    NoContainers,

    #[error("First container has no {protocol}.last_config template")]
    MissingTemplate { protocol: String },

    #[error("Template has no usable config field: {0}")]
    MissingConfigField(String),
}

#[derive(Debug, Deserialize)]
struct TemplateDocument {
    config: String,
}

/// Assemble the final config using the default `awg` container key
pub fn assemble(response_config: &str, private_key: &str) -> Result<String, AssemblyError> {
    assemble_with_protocol(response_config, private_key, DEFAULT_PROTOCOL)
}

/// Decode the server's config payload and substitute the private key
///
/// # Arguments
/// * `response_config` - Encoded `config` field from the provisioning response
/// * `private_key` - Base64 private key to place into the template
/// * `protocol` - Container key that holds the template (e.g. "awg")
pub fn assemble_with_protocol(
    response_config: &str,
    private_key: &str,
    protocol: &str,
) -> Result<String, AssemblyError> {
    let payload = link::decode_payload(response_config)?;
    let document: Value = link::decode_document(&payload)?;

    let template = extract_template(&document, protocol)?;
    let parsed: TemplateDocument = serde_json::from_str(template)
        .map_err(|e| AssemblyError::MissingConfigField(e.to_string()))?;

    Ok(substitute_private_key(&parsed.config, private_key))
}

/// Locate the template string in the first container
fn extract_template<'a>(document: &'a Value, protocol: &str) -> Result<&'a str, AssemblyError> {
    let containers = document
        .get("containers")
        .and_then(Value::as_array)
        .ok_or(AssemblyError::NoContainers)?;
    let first = containers.first().ok_or(AssemblyError::NoContainers)?;
    if containers.len() > 1 {
        debug!("Server returned {} containers, using the first", containers.len());
    }

    first
        .get(protocol)
        .and_then(|entry| entry.get(TEMPLATE_KEY))
        .and_then(Value::as_str)
        .filter(|template| !template.trim().is_empty())
        .ok_or_else(|| AssemblyError::MissingTemplate {
            protocol: protocol.to_string(),
        })
}

/// Replace every occurrence of the placeholder with the private key
pub fn substitute_private_key(template: &str, private_key: &str) -> String {
    let occurrences = template.matches(PRIVATE_KEY_PLACEHOLDER).count();
    match occurrences {
        0 => warn!("Template contains no private key placeholder"),
        1 => {}
        n => debug!("Template contains {} private key placeholders", n),
    }
    template.replace(PRIVATE_KEY_PLACEHOLDER, private_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEMPLATE: &str = "[Interface]\nPrivateKey = $WIREGUARD_CLIENT_PRIVATE_KEY\nAddress = 10.8.1.2/32\n";

    fn server_config(document: &Value) -> String {
        link::encode(document.to_string().as_bytes()).unwrap()
    }

    fn awg_document(template: &str) -> Value {
        let last_config = json!({ "config": template, "mtu": "1280" }).to_string();
        json!({
            "containers": [{ "awg": { "last_config": last_config, "port": "51820" } }],
            "defaultContainer": "amnezia-awg",
        })
    }

    #[test]
    fn test_substitute_private_key() {
        assert_eq!(
            substitute_private_key("key = $WIREGUARD_CLIENT_PRIVATE_KEY\n", "abc123="),
            "key = abc123=\n"
        );
    }

    #[test]
    fn test_substitute_without_placeholder_is_identity() {
        let template = "[Interface]\nAddress = 10.0.0.2/32\n";
        assert_eq!(substitute_private_key(template, "abc123="), template);
    }

    #[test]
    fn test_substitute_replaces_all_occurrences() {
        let out = substitute_private_key(
            "$WIREGUARD_CLIENT_PRIVATE_KEY $WIREGUARD_CLIENT_PRIVATE_KEY",
            "k",
        );
        assert_eq!(out, "k k");
    }

    #[test]
    fn test_assemble_full_document() {
        let encoded = server_config(&awg_document(TEMPLATE));
        let out = assemble(&encoded, "cHJpdmF0ZQ==").unwrap();

        assert!(out.contains("PrivateKey = cHJpdmF0ZQ=="));
        assert!(!out.contains(PRIVATE_KEY_PLACEHOLDER));
        assert!(out.contains("Address = 10.8.1.2/32"));
    }

    #[test]
    fn test_assemble_uses_first_container() {
        let first = json!({ "config": "first $WIREGUARD_CLIENT_PRIVATE_KEY" }).to_string();
        let second = json!({ "config": "second $WIREGUARD_CLIENT_PRIVATE_KEY" }).to_string();
        let document = json!({
            "containers": [
                { "awg": { "last_config": first } },
                { "awg": { "last_config": second } },
            ]
        });

        let out = assemble(&server_config(&document), "K").unwrap();
        assert_eq!(out, "first K");
    }

    #[test]
    fn test_assemble_custom_protocol() {
        let last_config = json!({ "config": "wg $WIREGUARD_CLIENT_PRIVATE_KEY" }).to_string();
        let document = json!({ "containers": [{ "wireguard": { "last_config": last_config } }] });
        let encoded = server_config(&document);

        assert_eq!(assemble_with_protocol(&encoded, "K", "wireguard").unwrap(), "wg K");
        assert!(matches!(
            assemble(&encoded, "K"),
            Err(AssemblyError::MissingTemplate { .. })
        ));
    }

    #[test]
    fn test_no_containers() {
        for document in [json!({}), json!({ "containers": [] }), json!({ "containers": "x" })] {
            let err = assemble(&server_config(&document), "K").unwrap_err();
            assert!(matches!(err, AssemblyError::NoContainers), "{document}");
        }
    }

    #[test]
    fn test_missing_template() {
        let documents = [
            json!({ "containers": [{}] }),
            json!({ "containers": [{ "awg": {} }] }),
            json!({ "containers": [{ "awg": { "last_config": "" } }] }),
            json!({ "containers": [{ "awg": { "last_config": 7 } }] }),
        ];
        for document in documents {
            let err = assemble(&server_config(&document), "K").unwrap_err();
            assert!(matches!(err, AssemblyError::MissingTemplate { .. }), "{document}");
        }
    }

    #[test]
    fn test_missing_config_field() {
        let templates = [r#"{"mtu":"1280"}"#, r#"{"config":42}"#, "not json"];
        for template in templates {
            let document = json!({ "containers": [{ "awg": { "last_config": template } }] });
            let err = assemble(&server_config(&document), "K").unwrap_err();
            assert!(matches!(err, AssemblyError::MissingConfigField(_)), "{template}");
        }
    }

    #[test]
    fn test_undecodable_response() {
        let err = assemble("%%%", "K").unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::Decode(DecodeError::EncodingError(_))
        ));

        let not_json = link::encode(b"plain text").unwrap();
        let err = assemble(&not_json, "K").unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::Decode(DecodeError::StructureError(_))
        ));
    }
}
