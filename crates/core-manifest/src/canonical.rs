//! Canonical encoding
//!
//! Signatures and the timestamp binding are computed over the same bytes:
//! compact JSON, object keys sorted by byte value at every level, no
//! whitespace. Payloads only carry strings, integers, booleans, arrays and
//! objects, so the encoding is fully determined by the value.

use crate::error::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Name recorded for the digest algorithm
pub const SHA256: &str = "sha256";

/// Encode a value canonically
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&sort_keys(value))?)
}

/// Hex SHA-256 of raw bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Canonical bytes plus their digest
pub fn digest<T: Serialize + ?Sized>(value: &T) -> Result<(Vec<u8>, [u8; 32])> {
    let bytes = encode(value)?;
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(&bytes));
    Ok((bytes, digest))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, sort_keys(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Unordered {
        zeta: u32,
        alpha: Vec<Inner>,
    }

    #[derive(Serialize)]
    struct Inner {
        y: bool,
        b: &'static str,
    }

    #[test]
    fn test_keys_sorted_and_compact() {
        let value = Unordered {
            zeta: 1,
            alpha: vec![Inner { y: true, b: "x" }],
        };
        let bytes = encode(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"alpha":[{"b":"x","y":true}],"zeta":1}"#
        );
    }

    #[test]
    fn test_same_value_same_bytes() {
        let a = json!({"b": {"d": 1, "c": 2}, "a": []});
        let b = json!({"a": [], "b": {"c": 2, "d": 1}});
        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn test_non_string_keys_fail() {
        let mut map = HashMap::new();
        map.insert((1u8, 2u8), 3u8);
        assert!(matches!(encode(&map), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_matches_bytes() {
        let (bytes, digest) = digest(&json!({"k": "v"})).unwrap();
        assert_eq!(hex::encode(digest), sha256_hex(&bytes));
    }
}
