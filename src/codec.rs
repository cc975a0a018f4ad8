// src/codec.rs - Raw value decoding
//
// Purpose:
// --------
// Turns the as-received value text of an observation into a structured
// payload, using the payload shape of the owning data item.
//
// Key Responsibilities:
// ---------------------
// 1. Numeric-or-text decoding of sample and event values (with unit
//    normalization from the catalog)
// 2. Splitting `|`-delimited alarm and condition payloads into named fields
// 3. Tolerating short payloads: missing trailing fields decode as empty

use crate::data_item::{DataItem, Shape};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Field delimiter for alarm and condition payloads
pub const FIELD_DELIMITER: char = '|';

/// Decoded alarm payload: `CODE|NATIVE_CODE|SEVERITY|STATE`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmFields {
    /// Alarm code
    pub code: String,
    /// Controller-specific code
    pub native_code: String,
    /// Severity token as reported
    pub severity: String,
    /// Alarm state, e.g. ACTIVE or CLEARED
    pub state: String,
}

/// Decoded condition payload: `SEVERITY|NATIVE_CODE|[SUB_TYPE]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionFields {
    /// Severity token as reported
    pub severity: String,
    /// Controller-specific code
    pub native_code: String,
    /// Optional sub-type, empty when absent
    pub sub_type: String,
}

/// Structured view of an observation value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "fields", rename_all = "snake_case")]
pub enum Payload {
    /// Sample or event value
    Scalar(Value),
    /// Alarm sub-fields
    Alarm(AlarmFields),
    /// Condition sub-fields
    Condition(ConditionFields),
}

impl Payload {
    /// Native code of an alarm or condition, `None` for scalars
    pub fn native_code(&self) -> Option<&str> {
        match self {
            Payload::Scalar(_) => None,
            Payload::Alarm(a) => Some(&a.native_code),
            Payload::Condition(c) => Some(&c.native_code),
        }
    }

    /// Severity token of an alarm or condition, `None` for scalars
    pub fn severity(&self) -> Option<&str> {
        match self {
            Payload::Scalar(_) => None,
            Payload::Alarm(a) => Some(&a.severity),
            Payload::Condition(c) => Some(&c.severity),
        }
    }
}

/// Split a delimited payload into exactly `N` trimmed fields
///
/// Missing trailing fields are empty; fields past `N` are dropped.
fn split_fields<const N: usize>(raw: &str) -> [String; N] {
    let mut fields: [String; N] = std::array::from_fn(|_| String::new());
    let mut parts = raw.split(FIELD_DELIMITER);
    for slot in fields.iter_mut() {
        match parts.next() {
            Some(part) => *slot = part.trim().to_string(),
            None => break,
        }
    }
    if parts.next().is_some() {
        debug!(raw, expected = N, "extra payload fields ignored");
    }
    fields
}

/// Decode an alarm payload
pub fn decode_alarm(raw: &str) -> AlarmFields {
    let [code, native_code, severity, state] = split_fields::<4>(raw);
    AlarmFields {
        code,
        native_code,
        severity,
        state,
    }
}

/// Decode a condition payload
pub fn decode_condition(raw: &str) -> ConditionFields {
    let [severity, native_code, sub_type] = split_fields::<3>(raw);
    ConditionFields {
        severity,
        native_code,
        sub_type,
    }
}

/// Decode raw observation text for the given data item
///
/// Never fails. Non-numeric sample text stays textual, and short
/// alarm/condition payloads come back with empty trailing fields.
pub fn decode(raw: &str, item: &DataItem) -> Payload {
    match item.shape() {
        Shape::Scalar => {
            let value = Value::parse(raw);
            if !value.is_numeric() && item.conversion_required() {
                debug!(data_item = %item.id, raw, "non-numeric sample kept as text");
            }
            Payload::Scalar(item.normalize(value))
        }
        Shape::Alarm => Payload::Alarm(decode_alarm(raw)),
        Shape::Condition => Payload::Condition(decode_condition(raw)),
    }
}

/// Value view of a decoded payload
///
/// Alarm and condition payloads are exposed as their raw text.
pub fn value_view(payload: &Payload, raw: &str) -> Value {
    match payload {
        Payload::Scalar(value) => value.clone(),
        Payload::Alarm(_) | Payload::Condition(_) => Value::Text(raw.to_string()),
    }
}
