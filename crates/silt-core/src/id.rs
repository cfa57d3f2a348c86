//! Element identity: canonical encodings hashed to stable [`ElementId`]s.
//!
//! Every element type used with the set must provide a canonical byte
//! encoding via [`Identify`]. Two semantically equal elements MUST produce
//! identical bytes; the 256-bit BLAKE3 hash of those bytes is the element's
//! identity everywhere in this crate (log keys, snapshots, errors).
//!
//! Identity is never derived from a language-level stringification; the
//! encoding is an explicit, documented contract per element type:
//!
//! - `str` / `String`: the UTF-8 bytes.
//! - Integers and `bool`: decimal / `true` / `false` ASCII.
//! - `[u8]` / `Vec<u8>`: the raw bytes.
//! - `serde_json::Value`: canonical JSON (compact, object keys sorted
//!   lexicographically at every nesting level).
//!
//! Hash format: `blake3:<lowercase hex>`, 64 hex chars.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

// ---------------------------------------------------------------------------
// ElementId
// ---------------------------------------------------------------------------

/// A stable, deterministic element identifier: the BLAKE3 hash of the
/// element's canonical byte encoding.
///
/// Collisions between distinct elements are assumed not to occur; no
/// collision chaining exists anywhere in this crate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId([u8; 32]);

impl ElementId {
    /// Hash arbitrary canonical bytes into an id.
    #[must_use]
    pub fn hash(canonical: &[u8]) -> Self {
        Self(*blake3::hash(canonical).as_bytes())
    }

    /// Build an id from raw hash bytes (e.g. received over the wire).
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw hash bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash any `Serialize` value through the canonical-JSON route.
    ///
    /// This is the escape hatch for user-defined element types that don't
    /// want to hand-write a byte encoding: the value is serialized to JSON,
    /// canonicalized (sorted keys, compact), and hashed.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Serialize`] if the value cannot be
    /// represented as JSON (e.g. a map with non-string keys).
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, IdentityError> {
        let json = serde_json::to_value(value)?;
        Ok(Self::hash(canonical_json(&json).as_bytes()))
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", blake3::Hash::from_bytes(self.0).to_hex())
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({self})")
    }
}

impl FromStr for ElementId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix("blake3:").ok_or(ParseIdError::MissingPrefix)?;
        let hash = blake3::Hash::from_hex(hex).map_err(|_| ParseIdError::MalformedHex)?;
        Ok(Self(*hash.as_bytes()))
    }
}

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from parsing a textual element id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    /// The string does not start with the `blake3:` prefix.
    #[error("element id must start with `blake3:`")]
    MissingPrefix,

    /// The hex payload is not 64 lowercase hex characters.
    #[error("element id payload is not 64 hex characters")]
    MalformedHex,
}

/// Errors from the canonical-JSON identity route.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The element could not be serialized to JSON.
    #[error("failed to serialize element to canonical JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Identify
// ---------------------------------------------------------------------------

/// The identity capability every element type must provide.
///
/// `canonical_bytes` must be injective and stable: equal elements encode
/// identically, across processes and across crate versions. The provided
/// `element_id` hashes that encoding; implementors rarely override it.
pub trait Identify {
    /// The element's canonical byte encoding.
    fn canonical_bytes(&self) -> Vec<u8>;

    /// The element's identity: BLAKE3 over [`Self::canonical_bytes`].
    fn element_id(&self) -> ElementId {
        ElementId::hash(&self.canonical_bytes())
    }
}

impl Identify for str {
    fn canonical_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Identify for String {
    fn canonical_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Identify for [u8] {
    fn canonical_bytes(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl Identify for Vec<u8> {
    fn canonical_bytes(&self) -> Vec<u8> {
        self.clone()
    }
}

impl Identify for bool {
    fn canonical_bytes(&self) -> Vec<u8> {
        if *self { b"true".to_vec() } else { b"false".to_vec() }
    }
}

macro_rules! identify_integers {
    ($($ty:ty),*) => {
        $(
            impl Identify for $ty {
                fn canonical_bytes(&self) -> Vec<u8> {
                    self.to_string().into_bytes()
                }
            }
        )*
    };
}

identify_integers!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

impl Identify for Value {
    fn canonical_bytes(&self) -> Vec<u8> {
        canonical_json(self).into_bytes()
    }
}

impl<T: Identify + ?Sized> Identify for &T {
    fn canonical_bytes(&self) -> Vec<u8> {
        (**self).canonical_bytes()
    }
}

// ---------------------------------------------------------------------------
// Canonical JSON
// ---------------------------------------------------------------------------

/// Render a [`Value`] as canonical JSON: compact, with object keys sorted
/// lexicographically at every nesting level. The same logical payload always
/// produces the same byte sequence; array element order is preserved.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    render(value, &mut out);
    out
}

fn render(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => render_str(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render(item, out);
            }
            out.push(']');
        }
        Value::Object(fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort_unstable();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render_str(key, out);
                out.push(':');
                if let Some(field) = fields.get(*key) {
                    render(field, out);
                }
            }
            out.push('}');
        }
    }
}

fn render_str(s: &str, out: &mut String) {
    // serde_json's escaping of a bare string is already canonical.
    out.push_str(&Value::String(s.to_owned()).to_string());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === Canonical JSON ===

    #[test]
    fn scalars_render_plainly() {
        assert_eq!(canonical_json(&json!(null)), "null");
        assert_eq!(canonical_json(&json!(true)), "true");
        assert_eq!(canonical_json(&json!(false)), "false");
        assert_eq!(canonical_json(&json!(42)), "42");
        assert_eq!(canonical_json(&json!("hi")), "\"hi\"");
    }

    #[test]
    fn object_keys_sorted_recursively() {
        let v = json!({"z": 1, "a": {"c": 3, "b": 2}});
        assert_eq!(canonical_json(&v), r#"{"a":{"b":2,"c":3},"z":1}"#);
    }

    #[test]
    fn arrays_preserve_order() {
        assert_eq!(canonical_json(&json!([3, 1, 2])), "[3,1,2]");
    }

    #[test]
    fn output_is_compact() {
        let rendered = canonical_json(&json!({"key": ["value", 1]}));
        assert!(!rendered.contains(' '));
        assert!(!rendered.contains('\n'));
    }

    #[test]
    fn string_escapes_survive() {
        assert_eq!(
            canonical_json(&json!("she said \"go\"")),
            "\"she said \\\"go\\\"\""
        );
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let v = json!({"b": [1, {"y": 2, "x": 3}], "a": null});
        let once = canonical_json(&v);
        let reparsed: Value = serde_json::from_str(&once).expect("valid JSON");
        assert_eq!(once, canonical_json(&reparsed));
    }

    // === ElementId ===

    #[test]
    fn equal_elements_hash_identically() {
        assert_eq!("cat".element_id(), String::from("cat").element_id());
        assert_eq!(json!({"a": 1, "b": 2}).element_id(), json!({"b": 2, "a": 1}).element_id());
    }

    #[test]
    fn distinct_elements_hash_differently() {
        assert_ne!("cat".element_id(), "dog".element_id());
        assert_ne!(1u64.element_id(), 2u64.element_id());
    }

    #[test]
    fn key_order_does_not_change_identity() {
        let a = json!({"name": "ada", "age": 36});
        let b = json!({"age": 36, "name": "ada"});
        assert_eq!(a.element_id(), b.element_id());
    }

    #[test]
    fn display_and_parse_round_trip() {
        let id = "cat".element_id();
        let text = id.to_string();
        assert!(text.starts_with("blake3:"));
        assert_eq!(text.len(), "blake3:".len() + 64);
        assert_eq!(text.parse::<ElementId>().expect("parses"), id);
    }

    #[test]
    fn parse_rejects_missing_prefix() {
        let err = "cafebabe".parse::<ElementId>().expect_err("no prefix");
        assert_eq!(err, ParseIdError::MissingPrefix);
    }

    #[test]
    fn parse_rejects_short_hex() {
        let err = "blake3:abcd".parse::<ElementId>().expect_err("short hex");
        assert_eq!(err, ParseIdError::MalformedHex);
    }

    #[test]
    fn serde_round_trip() {
        let id = "cat".element_id();
        let json = serde_json::to_string(&id).expect("serialize");
        let back: ElementId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn from_serialize_matches_value_identity() {
        #[derive(Serialize)]
        struct Track {
            title: String,
            plays: u64,
        }

        let track = Track {
            title: "statics".into(),
            plays: 7,
        };
        let via_helper = ElementId::from_serialize(&track).expect("serializes");
        let via_value = json!({"title": "statics", "plays": 7}).element_id();
        assert_eq!(via_helper, via_value);
    }

    #[test]
    fn integer_identity_uses_decimal_encoding() {
        assert_eq!(42u64.element_id(), ElementId::hash(b"42"));
        assert_eq!((-3i32).element_id(), ElementId::hash(b"-3"));
    }
}
