//! OpenAI-compatible provider client and the model resolver built on it.

pub mod openai_compatible;
mod resolver;

pub use openai_compatible::{OpenAiCompatibleBuilder, OpenAiCompatibleClient};
pub use resolver::{OpenAiModelResolver, OpenAiModelResolverBuilder, SUPPORTED_MODELS};
