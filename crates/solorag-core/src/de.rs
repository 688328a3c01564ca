//! Serde helpers for configuration values.
//!
//! Environment overlays deliver every value as a string, so numeric and
//! boolean settings accept either their native TOML form or a string.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NativeOrString<T> {
    Native(T),
    String(String),
}

/// Deserialize a value from its native form or from a string.
///
/// Use with `#[serde(deserialize_with = "solorag_core::de::lenient")]`.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match NativeOrString::<T>::deserialize(deserializer)? {
        NativeOrString::Native(value) => Ok(value),
        NativeOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
