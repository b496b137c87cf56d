use crate::services::prompt::DIMENSION_COUNT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use validator::{Validate, ValidationError, ValidationErrors};

/// Client-facing message for every malformed `percentages` payload.
pub const INVALID_PERCENTAGES_MESSAGE: &str =
    "Invalid input: percentages must be an array of 10 numbers";

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    /// Only the array shape is checked; elements are taken as sent.
    #[validate(
        required(message = "percentages is required"),
        length(equal = 10, message = "percentages must contain exactly 10 values")
    )]
    pub percentages: Option<Vec<Value>>,

    /// Raw questionnaire answers. Accepted as-is and not used for the prompt.
    #[serde(default)]
    pub answers: Option<Value>,
}

impl AnalyzeRequest {
    /// Validate the payload shape and take the ten scores out of it.
    pub fn into_percentages(self) -> Result<Percentages, ValidationErrors> {
        self.validate()?;

        let values = self.percentages.unwrap_or_default();
        let scores: [Value; DIMENSION_COUNT] = values.try_into().map_err(|_| {
            let mut errors = ValidationErrors::new();
            errors.add("percentages", ValidationError::new("length"));
            errors
        })?;

        Ok(Percentages(scores.map(Score)))
    }
}

/// One submitted score. Usually a number, but any JSON value the client sent
/// is kept and rendered as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Score(Value);

impl Score {
    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl From<f64> for Score {
    fn from(score: f64) -> Self {
        Self(Value::from(score))
    }
}

/// Numbers go through `f64` so `80` and `80.0` both print as `80`. Strings are
/// unquoted, arrays are comma-joined, objects print as `[object Object]`.
impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_value(&self.0))
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map(|v| v.to_string()).unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => render_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Test scores, one per dimension, in dimension order. Values are not range-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Percentages([Score; DIMENSION_COUNT]);

impl Percentages {
    pub fn new(scores: [f64; DIMENSION_COUNT]) -> Self {
        Self(scores.map(Score::from))
    }

    pub fn as_array(&self) -> &[Score; DIMENSION_COUNT] {
        &self.0
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: String,
}

impl AnalyzeResponse {
    pub fn new(analysis: String) -> Self {
        Self {
            success: true,
            analysis,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
