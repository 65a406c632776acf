//! Validation functions for manifest schemas
//!
//! JSON Schema checks for envelopes read from untrusted storage. They run
//! before deserialization so that structural problems are reported with the
//! offending JSON path rather than as a serde error.

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use jsonschema::{ValidationError, Validator};
use serde_json::{json, Value};

/// Validate a decoded envelope document against its JSON Schema
pub fn validate_envelope(value: &Value) -> Result<()> {
    run(&get_envelope_schema(), value, "Envelope")
}

/// Validate a manifest payload against its JSON Schema
pub fn validate_manifest(manifest: &Manifest) -> Result<()> {
    let value = serde_json::to_value(manifest)?;
    run(&get_signed_schema(), &value, "Manifest")
}

/// Parse raw bytes and validate them as an envelope
pub fn validate_envelope_bytes(bytes: &[u8]) -> Result<Value> {
    let value: Value = serde_json::from_slice(bytes)?;
    validate_envelope(&value)?;
    Ok(value)
}

fn run(schema: &Value, value: &Value, what: &str) -> Result<()> {
    let compiled = Validator::new(schema)
        .map_err(|e| Error::validation(format!("Failed to compile schema: {}", e)))?;

    if let Err(errors) = compiled.validate(value) {
        let error_messages: Vec<String> = errors.map(|e| format_validation_error(&e)).collect();

        return Err(Error::validation(format!(
            "{} validation failed:\n  - {}",
            what,
            error_messages.join("\n  - ")
        )));
    }

    Ok(())
}

/// Format a validation error into a readable string
fn format_validation_error(error: &ValidationError) -> String {
    format!("{}: {}", error.instance_path, error)
}

/// Get the envelope JSON Schema
fn get_envelope_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["signatures", "signed"],
        "properties": {
            "signatures": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "required": ["key_id", "sig"],
                    "properties": {
                        "key_id": {
                            "type": "string",
                            "pattern": "^[0-9a-f]{64}$"
                        },
                        "sig": {
                            "type": "string",
                            "minLength": 1
                        }
                    }
                }
            },
            "signed": get_signed_schema()
        }
    })
}

/// Get the signed payload JSON Schema
fn get_signed_schema() -> Value {
    json!({
        "type": "object",
        "required": ["_type", "spec_version", "expires", "version"],
        "properties": {
            "_type": {
                "type": "string",
                "enum": ["root", "index", "snapshot", "timestamp"]
            },
            "spec_version": {
                "type": "string",
                "minLength": 1
            },
            "expires": {
                "type": "string",
                "pattern": "^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}Z$"
            },
            "version": {
                "type": "integer",
                "minimum": 0
            }
        },
        "allOf": [
            {
                "if": { "properties": { "_type": { "const": "root" } } },
                "then": { "required": ["roles"] }
            },
            {
                "if": { "properties": { "_type": { "enum": ["snapshot", "timestamp"] } } },
                "then": { "required": ["meta"] }
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{encode_set, Bootstrap};
    use crate::keys::KeyStore;
    use crate::registry::Registry;
    use chrono::{TimeZone, Utc};

    fn bootstrapped() -> Vec<(String, Vec<u8>)> {
        let registry = Registry::standard();
        let keys = KeyStore::generate(registry).unwrap();
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let set = Bootstrap::new(registry, &keys).build(t0).unwrap();
        encode_set(&set, &keys, registry).unwrap()
    }

    #[test]
    fn test_schema_compilation() {
        assert!(Validator::new(&get_envelope_schema()).is_ok());
        assert!(Validator::new(&get_signed_schema()).is_ok());
    }

    #[test]
    fn test_bootstrapped_files_validate() {
        for (name, bytes) in bootstrapped() {
            let result = validate_envelope_bytes(&bytes);
            assert!(result.is_ok(), "{} should validate: {:?}", name, result.err());
        }
    }

    #[test]
    fn test_unsigned_envelope_rejected() {
        let (_, bytes) = bootstrapped().remove(0);
        let mut value: Value = serde_json::from_slice(&bytes).unwrap();
        value["signatures"] = json!([]);

        let err = validate_envelope(&value).unwrap_err();
        assert!(err.to_string().contains("signatures"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let value = json!({
            "signatures": [{"key_id": "a".repeat(64), "sig": "00"}],
            "signed": {
                "_type": "mirrors",
                "spec_version": "0.1.0",
                "expires": "2020-01-02T00:00:00Z",
                "version": 1
            }
        });
        assert!(validate_envelope(&value).is_err());
    }

    #[test]
    fn test_negative_version_and_bad_expiry_rejected() {
        let schema = get_signed_schema();
        let compiled = Validator::new(&schema).unwrap();

        let negative = json!({
            "_type": "index",
            "spec_version": "0.1.0",
            "expires": "2020-01-02T00:00:00Z",
            "version": -1
        });
        assert!(compiled.validate(&negative).is_err());

        let local_time = json!({
            "_type": "index",
            "spec_version": "0.1.0",
            "expires": "2020-01-02 00:00:00",
            "version": 1
        });
        assert!(compiled.validate(&local_time).is_err());
    }

    #[test]
    fn test_snapshot_requires_meta() {
        let value = json!({
            "_type": "snapshot",
            "spec_version": "0.1.0",
            "expires": "2020-01-02T00:00:00Z",
            "version": 0
        });
        let compiled = Validator::new(&get_signed_schema()).unwrap();
        assert!(compiled.validate(&value).is_err());
    }

    #[test]
    fn test_validate_manifest() {
        let registry = Registry::standard();
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let set = Bootstrap::new(registry, &KeyStore::new()).build(t0).unwrap();
        for manifest in set.iter() {
            validate_manifest(manifest).unwrap();
        }
    }
}
