//! Toggle evaluations returned by the toggle service.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Declared type of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// `true` or `false`.
    Boolean,
    /// A string.
    String,
    /// A number, integer or floating point.
    Number,
    /// A JSON object.
    Object,
    /// A type tag this client does not know about, or no type tag at all.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Value of an evaluated toggle.
///
/// The value is untagged on the wire; [`Evaluation::value_type`] tells which variant is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvaluationValue {
    /// A boolean value.
    Boolean(bool),
    /// A numerical value.
    Number(f64),
    /// A string value.
    String(String),
    /// Any other JSON value (objects, arrays and null).
    Json(serde_json::Value),
}

impl EvaluationValue {
    /// Returns the boolean value, if the value is a boolean.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            EvaluationValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the numeric value, if the value is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EvaluationValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string value, if the value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EvaluationValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the JSON value, if the value is neither a boolean, a number, nor a string.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            EvaluationValue::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Type tag matching this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            EvaluationValue::Boolean(_) => ValueType::Boolean,
            EvaluationValue::Number(_) => ValueType::Number,
            EvaluationValue::String(_) => ValueType::String,
            EvaluationValue::Json(serde_json::Value::Object(_)) => ValueType::Object,
            EvaluationValue::Json(_) => ValueType::Unknown,
        }
    }
}

impl Default for EvaluationValue {
    fn default() -> Self {
        EvaluationValue::Json(serde_json::Value::Null)
    }
}

impl From<bool> for EvaluationValue {
    fn from(value: bool) -> Self {
        EvaluationValue::Boolean(value)
    }
}

impl From<f64> for EvaluationValue {
    fn from(value: f64) -> Self {
        EvaluationValue::Number(value)
    }
}

impl From<&str> for EvaluationValue {
    fn from(value: &str) -> Self {
        EvaluationValue::String(value.to_owned())
    }
}

impl From<String> for EvaluationValue {
    fn from(value: String) -> Self {
        EvaluationValue::String(value)
    }
}

/// Result of evaluating a single toggle.
///
/// If `error_message` is set, `value` and `value_type` are not authoritative and should not be
/// used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Toggle key.
    #[serde(default)]
    pub key: String,
    /// Evaluated value.
    #[serde(default)]
    pub value: EvaluationValue,
    /// Declared type of the toggle.
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    /// Reason code, e.g. `DEFAULT`, `TARGETING_MATCH` or `ERROR`.
    #[serde(default)]
    pub reason: String,
    /// Error reported by the service for this toggle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Evaluation {
    /// Create an evaluation for `value`, deriving the type tag from the value.
    pub fn new(
        key: impl Into<String>,
        value: impl Into<EvaluationValue>,
        reason: impl Into<String>,
    ) -> Evaluation {
        let value = value.into();
        Evaluation {
            key: key.into(),
            value_type: value.value_type(),
            value,
            reason: reason.into(),
            error_message: None,
        }
    }

    /// Returns `true` if the service reported an error for this toggle.
    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }
}

/// Evaluations of all toggles for a context, keyed by toggle key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    /// Evaluated toggles.
    #[serde(default)]
    pub toggles: HashMap<String, Evaluation>,
}

impl EvaluationResponse {
    /// Look up evaluation of `flag_key`.
    pub fn get(&self, flag_key: &str) -> Option<&Evaluation> {
        self.toggles.get(flag_key)
    }

    /// Look up evaluation of `flag_key`, failing if it's missing or carries an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EvaluationMissing`] with the service-provided error message (if any).
    pub fn require(&self, flag_key: &str) -> Result<&Evaluation> {
        match self.toggles.get(flag_key) {
            Some(evaluation) if !evaluation.is_error() => Ok(evaluation),
            evaluation => Err(Error::EvaluationMissing {
                flag_key: flag_key.to_owned(),
                message: evaluation.and_then(|it| it.error_message.clone()),
            }),
        }
    }
}
