//! Serde helpers for exchange payloads that mix JSON numbers and numeric strings.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn into_f64<E: de::Error>(self) -> Result<f64, E> {
        match self {
            Self::Number(value) => Ok(value),
            Self::String(value) => value
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("'{value}' is not a number"))),
        }
    }
}

pub(crate) fn f64_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    NumberOrString::deserialize(deserializer)?.into_f64()
}

pub(crate) fn opt_f64_lenient<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::String(value)) if value.trim().is_empty() => Ok(None),
        Some(value) => value.into_f64().map(Some),
    }
}

/// Renders a decimal without float noise or trailing zeros.
pub(crate) fn format_decimal(value: f64) -> String {
    let rendered = format!("{value:.10}");
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        String::from("0")
    } else {
        trimmed.to_owned()
    }
}
