//! Shape checks for raw model output.
//!
//! Each parser either recovers the whole expected shape or fails with
//! [`DistillError::InvalidOutput`] carrying the offending text.

use serde::{Deserialize, Deserializer, Serialize};

use distill_core::{DistillError, Value};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub classification: String,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub field: String,
    pub issue: String,
    pub description: String,
    pub suggestion: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub corrections: Vec<Correction>,
    pub text_analysis: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericOutput {
    pub output: String,
}

/// Strips a surrounding Markdown code fence, tagged `json` or untagged.
pub fn strip_code_fence(text: &str) -> &str {
    let cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        rest.trim_end_matches("```").trim()
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        rest.trim_end_matches("```").trim()
    } else {
        cleaned
    }
}

pub fn parse_json_object(text: &str) -> Result<Value, DistillError> {
    let value: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|err| DistillError::invalid_output(text, err.to_string()))?;
    if !value.is_object() {
        return Err(DistillError::invalid_output(text, "expected a JSON object"));
    }
    Ok(value)
}

pub fn parse_classification(text: &str) -> Result<Classification, DistillError> {
    let classification: Classification = parse_shape(text)?;
    if classification.classification.trim().is_empty() {
        return Err(DistillError::invalid_output(text, "classification is empty"));
    }
    Ok(classification)
}

pub fn parse_analysis(text: &str) -> Result<Analysis, DistillError> {
    parse_shape(text)
}

/// Free-form output has no shape to check.
pub fn generic_output(text: impl Into<String>) -> GenericOutput {
    GenericOutput {
        output: text.into(),
    }
}

fn parse_shape<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, DistillError> {
    let value = parse_json_object(text)?;
    serde_json::from_value(value).map_err(|err| DistillError::invalid_output(text, err.to_string()))
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Confidence {
        Number(f64),
        Text(String),
    }

    match Confidence::deserialize(deserializer)? {
        Confidence::Number(number) => Ok(number),
        Confidence::Text(text) => text
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("confidence '{text}' is not a number"))),
    }
}
