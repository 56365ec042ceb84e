//! Props decoding from `data-props-*` attributes.
//!
//! `data-props-<kebab-name>` becomes the camelCase key `<kebabName>`. Values
//! are coerced in strict precedence order:
//!
//! 1. `"true"` / `"false"` become booleans.
//! 2. The empty string stays an empty string.
//! 3. Anything numeric becomes a number.
//! 4. Text starting with `{` or `[` is parsed as JSON, falling back to the
//!    raw string when it does not parse.
//! 5. Everything else is kept as a string.

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use super::element::Element;

/// Attribute prefix marking a prop.
pub const PROPS_PREFIX: &str = "data-props-";

/// Decoded props of one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(Map<String, Value>);

impl Props {
    /// Decode every `data-props-*` attribute of `element`.
    pub fn from_element(element: &Element) -> Self {
        let mut props = Map::new();
        for (name, raw) in element.attributes() {
            if let Some(suffix) = name.strip_prefix(PROPS_PREFIX) {
                props.insert(kebab_to_camel_case(suffix), parse_value(&raw));
            }
        }
        Self(props)
    }

    /// Raw decoded value for `key`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Typed value for `key`; `None` when missing or of the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|value| T::deserialize(value).ok())
    }

    /// Deserialize all props into a struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&Value::Object(self.0.clone()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// `"foo-bar-baz"` to `"fooBarBaz"`. Only a dash followed by a lowercase
/// ASCII letter is folded.
pub fn kebab_to_camel_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_lowercase() {
                    out.push(next.to_ascii_uppercase());
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Coerce one attribute value.
pub fn parse_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "" => return Value::String(String::new()),
        _ => {}
    }
    if let Some(number) = parse_number(raw) {
        return number;
    }
    if raw.starts_with('{') || raw.starts_with('[') {
        return serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    }
    Value::String(raw.to_string())
}

/// Numeric coercion: surrounding whitespace is ignored, whitespace-only text
/// is zero, and `0x`/`0o`/`0b` prefixes are accepted. Integral values become
/// integers. Values without a finite JSON representation (`Infinity`) are
/// left to the string fallback.
fn parse_number(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(Value::from(0));
    }

    let radix = match trimmed.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&trimmed[2..], radix).ok().map(Value::from);
    }

    // Rust's float grammar accepts "inf"/"nan" spellings; keep those strings.
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    let number: f64 = trimmed.parse().ok()?;
    if number.fract() == 0.0 && number.abs() < 9_007_199_254_740_992.0 && number != 0.0 {
        return Some(Value::from(number as i64));
    }
    if number == 0.0 && number.is_sign_positive() {
        return Some(Value::from(0));
    }
    Number::from_f64(number).map(Value::Number)
}
