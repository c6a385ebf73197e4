use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use distill_core::{DistillError, ExecutionTrace, ModelRequest, ModelResolver, Value};
use distill_text::ChunkParams;

use crate::structured::{self, Analysis, Classification, Correction};
use crate::{prompts, Generator};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub input: String,
    pub output: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SchemaExtraction {
    pub json: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<ExecutionTrace>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRecap {
    pub chunk_size: usize,
    pub overlap: usize,
    pub call_count: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedExtraction {
    pub json: Value,
    pub refine_recap: RefineRecap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<ExecutionTrace>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisOutput {
    pub analysis: Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<ExecutionTrace>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClassificationOutput {
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<ExecutionTrace>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GenericPromptOutput {
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<ExecutionTrace>,
}

/// Extraction, analysis and classification over a [`Generator`].
#[derive(Clone, Debug)]
pub struct JsonService<R> {
    generator: Generator<R>,
    default_chunk_params: ChunkParams,
}

impl<R: ModelResolver> JsonService<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            generator: Generator::new(resolver),
            default_chunk_params: ChunkParams::default(),
        }
    }

    /// Chunking used by refined extraction when the caller passes none.
    pub fn with_default_chunk_params(mut self, params: ChunkParams) -> Self {
        self.default_chunk_params = params;
        self
    }

    pub fn generator(&self) -> &Generator<R> {
        &self.generator
    }

    pub async fn extract_with_schema(
        &self,
        text: &str,
        model: &ModelRequest,
        json_schema: &str,
        debug: bool,
    ) -> Result<SchemaExtraction, DistillError> {
        let values = values([("context", text), ("json_schema", json_schema)]);
        let generation = self
            .generator
            .generate(model, &prompts::schema_extraction(), &values, debug)
            .await?;

        let json = structured::parse_json_object(&generation.text)
            .map_err(|err| {
                tracing::warn!(model = %model.name, "schema extraction output is not valid JSON");
                err
            })?;
        Ok(SchemaExtraction {
            json,
            trace: generation.trace,
        })
    }

    pub async fn extract_with_schema_and_refine(
        &self,
        text: &str,
        model: &ModelRequest,
        json_schema: &str,
        chunk_params: Option<ChunkParams>,
        debug: bool,
    ) -> Result<RefinedExtraction, DistillError> {
        let params = chunk_params.unwrap_or(self.default_chunk_params);
        if params.overlap >= params.chunk_size {
            return Err(DistillError::InvalidRequest(format!(
                "overlap ({}) must be smaller than chunk size ({})",
                params.overlap, params.chunk_size
            )));
        }
        let chunks = params.splitter()?.split_text(text);

        let values = values([("json_schema", json_schema)]);
        let generation = self
            .generator
            .generate_refine(
                model,
                &prompts::schema_extraction(),
                &prompts::schema_extraction_refine(),
                &chunks,
                &values,
                debug,
            )
            .await?;

        let json = structured::parse_json_object(&generation.text)
            .map_err(|err| {
                tracing::warn!(model = %model.name, "refined extraction output is not valid JSON");
                err
            })?;
        Ok(RefinedExtraction {
            json,
            refine_recap: RefineRecap {
                chunk_size: params.chunk_size,
                overlap: params.overlap,
                call_count: generation.call_count,
            },
            trace: generation.trace,
        })
    }

    pub async fn extract_with_example(
        &self,
        text: &str,
        model: &ModelRequest,
        example: &Example,
        debug: bool,
    ) -> Result<SchemaExtraction, DistillError> {
        let values = values([
            ("context", text),
            ("example_input", example.input.as_str()),
            ("example_output", example.output.as_str()),
        ]);
        let generation = self
            .generator
            .generate(model, &prompts::example_extraction(), &values, debug)
            .await?;

        let json = structured::parse_json_object(&generation.text)
            .map_err(|err| {
                tracing::warn!(model = %model.name, "example extraction output is not valid JSON");
                err
            })?;
        Ok(SchemaExtraction {
            json,
            trace: generation.trace,
        })
    }

    pub async fn analyze(
        &self,
        model: &ModelRequest,
        json_output: &str,
        original_text: &str,
        json_schema: &str,
        debug: bool,
    ) -> Result<AnalysisOutput, DistillError> {
        let output_format = serde_json::to_string(&analysis_format())?;
        let values = values([
            ("json_schema", json_schema),
            ("original_text", original_text),
            ("json_output", json_output),
            ("output_format", output_format.as_str()),
        ]);
        let generation = self
            .generator
            .generate(model, &prompts::analysis(), &values, debug)
            .await?;

        let analysis = structured::parse_analysis(&generation.text)
            .map_err(|err| {
                tracing::warn!(model = %model.name, "analysis output does not match the expected shape");
                err
            })?;
        Ok(AnalysisOutput {
            analysis,
            trace: generation.trace,
        })
    }

    pub async fn classify(
        &self,
        model: &ModelRequest,
        text: &str,
        categories: &[String],
        debug: bool,
    ) -> Result<ClassificationOutput, DistillError> {
        let output_format = serde_json::json!({
            "classification": "classification of the text",
            "confidence": "number representing your confidence of the classification in percentage. display only the number, not the percentage sign",
        })
        .to_string();
        let categories = categories.join("\n");
        let values = values([
            ("categories", categories.as_str()),
            ("text", text),
            ("output_format", output_format.as_str()),
        ]);
        let generation = self
            .generator
            .generate(model, &prompts::classification(), &values, debug)
            .await?;

        let classification = structured::parse_classification(&generation.text)
            .map_err(|err| {
                tracing::warn!(model = %model.name, "classification output does not match the expected shape");
                err
            })?;
        Ok(ClassificationOutput {
            classification,
            trace: generation.trace,
        })
    }

    pub async fn generic_prompt(
        &self,
        model: &ModelRequest,
        prompt: &str,
        debug: bool,
    ) -> Result<GenericPromptOutput, DistillError> {
        let values = values([("prompt", prompt)]);
        let generation = self
            .generator
            .generate(model, &prompts::generic(), &values, debug)
            .await?;

        Ok(GenericPromptOutput {
            output: structured::generic_output(generation.text).output,
            trace: generation.trace,
        })
    }
}

fn values<const N: usize>(pairs: [(&str, &str); N]) -> HashMap<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect()
}

/// The example shape shown to the model in the analysis prompt.
fn analysis_format() -> Analysis {
    Analysis {
        corrections: vec![Correction {
            field: "the field in the generated JSON that needs to be corrected".to_string(),
            issue: "the issue you identified".to_string(),
            description:
                "your description of the issue, give your full reasoning for why it is an issue"
                    .to_string(),
            suggestion: "your suggestion for correction".to_string(),
        }],
        text_analysis: "Your detailed and precise analysis, exposing your whole thought process, step by step. Do not provide a corrected JSON output in this field. Generate a readable text in markdown.".to_string(),
    }
}
