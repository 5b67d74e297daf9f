//! Secret addressing and value decoding
//!
//! A secret reference has the form `name#key.path`: the part before the first
//! `#` names the stored secret, the part after it selects a nested value when
//! the secret holds a JSON object.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Base path used when no prefix is configured
pub const DEFAULT_BASE_PATH: &str = "harness";

/// Separator between prefix and secret name
pub const PATH_SEPARATOR: char = '/';

const KEY_SEPARATOR: char = '#';

/// Split a reference into the base secret name and the JSON key path
pub fn extract_secret_info(path: &str) -> (&str, &str) {
    path.split_once(KEY_SEPARATOR).unwrap_or((path, ""))
}

/// Whether `input` parses as any JSON value
pub fn is_valid_json(input: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(input).is_ok()
}

/// Read the value at a dotted key path out of a JSON object
///
/// Input that is not a JSON object comes back unchanged. An empty path
/// returns the whole object; a missing key returns an empty string.
pub fn get_value_from_json(input: &str, key_path: &str) -> String {
    let Ok(mut current) = serde_json::from_str::<Map<String, Value>>(input) else {
        return input.to_string();
    };

    if key_path.is_empty() {
        return Value::Object(current).to_string();
    }

    for part in key_path.split('.') {
        match current.remove(part) {
            Some(Value::Object(nested)) => current = nested,
            Some(leaf) => return stringify(leaf),
            None => return String::new(),
        }
    }

    Value::Object(current).to_string()
}

fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Base64-decode a secret value when requested
pub fn decode(value: &str, should_decode: bool, name: &str) -> Result<String, DecodeError> {
    if !should_decode {
        return Ok(value.to_string());
    }

    tracing::info!(secret = %name, "Decoding secret");
    let bytes = STANDARD.decode(value).map_err(|source| DecodeError {
        name: name.to_string(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// How a configured prefix is trimmed before joining
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixRule {
    /// `/team/` becomes `team`
    #[default]
    TrimBoth,
    /// `/team/` becomes `/team`
    TrimTrailing,
}

/// Computes fully-qualified secret names from a prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretNaming {
    pub default_base_path: String,
    pub rule: PrefixRule,
}

impl Default for SecretNaming {
    fn default() -> Self {
        Self {
            default_base_path: DEFAULT_BASE_PATH.to_string(),
            rule: PrefixRule::default(),
        }
    }
}

impl SecretNaming {
    pub fn qualify(&self, prefix: &str, name: &str) -> String {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return format!("{}{}{}", self.default_base_path, PATH_SEPARATOR, name);
        }

        let prefix = match self.rule {
            PrefixRule::TrimBoth => prefix.trim_matches(PATH_SEPARATOR),
            PrefixRule::TrimTrailing => prefix.trim_end_matches(PATH_SEPARATOR),
        };
        format!("{}{}{}", prefix, PATH_SEPARATOR, name)
    }
}
