//! Field codec: text and integers to and from the ledger's typed scalars
//!
//! Every scalar on the wire is a literal followed by its type suffix, e.g.
//! `42u8`, `1234field`. Plaintext never leaves the client: text is committed
//! as a bounded big-endian integer rendered as a `field` literal.

use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Organization names are committed as at most this many bytes
pub const ORG_NAME_MAX_BYTES: usize = 16;

/// Report content is committed as at most this many bytes (fits one field element)
pub const REPORT_CONTENT_MAX_BYTES: usize = 31;

/// Local excerpts of report content keep at most this many characters
pub const EXCERPT_MAX_CHARS: usize = 100;

const VISIBILITY_QUALIFIERS: [&str; 2] = [".public", ".private"];

/// Primitive kind of a ledger scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Field,
    Scalar,
    Group,
    U8,
    U16,
    U32,
    U64,
    U128,
    Address,
    Boolean,
}

impl ScalarKind {
    /// Kinds that carry a textual suffix, in match order
    const SUFFIXED: [ScalarKind; 8] = [
        ScalarKind::Field,
        ScalarKind::Scalar,
        ScalarKind::Group,
        ScalarKind::U128,
        ScalarKind::U64,
        ScalarKind::U32,
        ScalarKind::U16,
        ScalarKind::U8,
    ];

    /// Type suffix appended to literals of this kind
    ///
    /// Addresses and booleans are self-describing and have no suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            ScalarKind::Field => "field",
            ScalarKind::Scalar => "scalar",
            ScalarKind::Group => "group",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::U128 => "u128",
            ScalarKind::Address | ScalarKind::Boolean => "",
        }
    }
}

/// An encoded ledger value together with its declared kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScalarValue {
    encoded: String,
    kind: ScalarKind,
}

impl ScalarValue {
    /// The `0field` sentinel used for empty text
    pub fn zero_field() -> Self {
        Self {
            encoded: "0field".to_string(),
            kind: ScalarKind::Field,
        }
    }

    /// Build an integer-kinded scalar from a number
    pub fn from_u64(value: u64, kind: ScalarKind) -> Self {
        Self {
            encoded: format!("{}{}", value, kind.suffix()),
            kind,
        }
    }

    /// Parse a raw ledger literal, tolerating a visibility qualifier
    ///
    /// Returns `None` if no recognized kind matches.
    pub fn parse(raw: &str) -> Option<Self> {
        let stripped = strip_visibility(raw);

        if stripped == "true" || stripped == "false" {
            return Some(Self {
                encoded: stripped.to_string(),
                kind: ScalarKind::Boolean,
            });
        }
        if stripped.starts_with("aleo1")
            && stripped.len() > 5
            && stripped.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Some(Self {
                encoded: stripped.to_string(),
                kind: ScalarKind::Address,
            });
        }

        ScalarKind::SUFFIXED.iter().find_map(|kind| {
            let digits = stripped.strip_suffix(kind.suffix())?;
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                Some(Self {
                    encoded: stripped.to_string(),
                    kind: *kind,
                })
            } else {
                None
            }
        })
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Whether the literal parses back to this same value
    ///
    /// [`normalize_scalar`] accepts any input, so values built from user
    /// text may not be.
    pub fn is_canonical(&self) -> bool {
        Self::parse(&self.encoded).as_ref() == Some(self)
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Literal with the type suffix removed
    pub fn payload(&self) -> &str {
        self.encoded
            .strip_suffix(self.kind.suffix())
            .unwrap_or(&self.encoded)
    }

    /// Numeric payload, if it fits in a `u64`
    pub fn as_u64(&self) -> Option<u64> {
        match self.kind {
            ScalarKind::Address | ScalarKind::Boolean => None,
            _ => self.payload().parse().ok(),
        }
    }

    /// Boolean payload for boolean scalars
    pub fn as_bool(&self) -> Option<bool> {
        match (self.kind, self.encoded.as_str()) {
            (ScalarKind::Boolean, "true") => Some(true),
            (ScalarKind::Boolean, "false") => Some(false),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl From<ScalarValue> for String {
    fn from(value: ScalarValue) -> Self {
        value.encoded
    }
}

impl TryFrom<String> for ScalarValue {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        ScalarValue::parse(&raw).ok_or_else(|| format!("not a ledger scalar: {raw:?}"))
    }
}

/// Encode text as a `field` literal
///
/// The text is cut to at most `max_bytes` UTF-8 bytes (backing off to a
/// character boundary), then read as a big-endian unsigned integer.
/// Empty input yields `0field`.
pub fn encode_text(text: &str, max_bytes: usize) -> ScalarValue {
    field_from_bytes(truncate_utf8(text, max_bytes).as_bytes())
}

/// Read bytes as a big-endian unsigned integer and render it as a `field`
///
/// Callers keep the input under 32 bytes so the value stays below the
/// field modulus.
pub fn field_from_bytes(bytes: &[u8]) -> ScalarValue {
    if bytes.is_empty() {
        return ScalarValue::zero_field();
    }
    let value = BigUint::from_bytes_be(bytes);
    ScalarValue {
        encoded: format!("{}{}", value, ScalarKind::Field.suffix()),
        kind: ScalarKind::Field,
    }
}

/// Recover the text committed by [`encode_text`]
///
/// Leading NUL bytes do not survive the integer encoding.
pub fn decode_text(scalar: &ScalarValue) -> Option<String> {
    if scalar.kind() != ScalarKind::Field {
        return None;
    }
    let value = BigUint::parse_bytes(scalar.payload().as_bytes(), 10)?;
    if value == BigUint::from(0u8) {
        return Some(String::new());
    }
    String::from_utf8(value.to_bytes_be()).ok()
}

/// Strip a `.public` / `.private` qualifier the network attaches to values
pub fn strip_visibility(raw: &str) -> &str {
    let trimmed = raw.trim();
    VISIBILITY_QUALIFIERS
        .iter()
        .find_map(|q| trimmed.strip_suffix(q))
        .unwrap_or(trimmed)
}

/// Ensure user input carries the expected type suffix
///
/// Already-suffixed input passes through unchanged.
pub fn normalize_scalar(input: &str, kind: ScalarKind) -> ScalarValue {
    let trimmed = input.trim();
    let encoded = if trimmed.ends_with(kind.suffix()) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, kind.suffix())
    };
    ScalarValue { encoded, kind }
}

/// Prefix of `text` no longer than `max_bytes`, on a char boundary
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// First `max_chars` characters of `text`
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
