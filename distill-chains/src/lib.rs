//! Prompt chains that turn free text into validated JSON.
//!
//! [`Generator`] runs a single prompt or a [`RefineChain`] fold over chunks,
//! [`structured`] checks what the model produced, and [`JsonService`] wires
//! both into the extraction, analysis and classification operations.

mod generator;
mod llm_chain;
pub mod prompts;
mod refine;
mod service;
pub mod structured;

pub use generator::{Generation, Generator, RefineGeneration};
pub use llm_chain::{translate_provider_error, LlmChain, LLM_CHAIN_NAME};
pub use refine::{RefineChain, RefineOutput, CONTEXT_KEY, EXISTING_ANSWER_KEY, REFINE_CHAIN_NAME};
pub use service::{
    AnalysisOutput, ClassificationOutput, Example, GenericPromptOutput, JsonService,
    RefineRecap, RefinedExtraction, SchemaExtraction,
};
pub use structured::{Analysis, Classification, Correction, GenericOutput};
