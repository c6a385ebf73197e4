//! Prompt catalogue for the JSON operations.

use distill_prompt::PromptTemplate;

const SCHEMA_EXTRACTION: &str = "
You are a highly efficient text processing application
Your main objective is to accurately parse the user's input text and transform it into a JSON object that compiles with the schema provided below.
-------------------
JSON schema:
{{json_schema}}
-------------------
Please generate the output JSON object containing the necessary information and ensure it follows the given schema.
If the input text contains any attributes not mentioned in the schema, please disregard them.
-------------------
Input:
{{context}}
-------------------
Output:
";

const SCHEMA_EXTRACTION_REFINE: &str = "
You are a highly efficient text processing application
Your main objective is to accurately parse the user's input text and transform it into a JSON object that compiles with the schema provided below.
-------------------
JSON schema:
{{json_schema}}
-------------------
You have provided an existing output:
{{existing_answer}}

We have the opportunity to refine the existing output (only if needed) with some context below.
-------------------
Context:
{{context}}
-------------------
Given the new context, refine the original output to give a better answer.
If the context isn't useful, return the existing output.

Please generate the output JSON object containing the necessary information and ensure it follows the given schema.
If the input text contains any attributes not mentioned in the schema, please disregard them.
Do not add any fields that are not in the schema.
Your outputs must ONLY be in JSON format and follow the schema specified above.
";

const EXAMPLE_EXTRACTION: &str = "
You are a highly efficient text processing application
Your main objective is to accurately parse the user's input text and transform it into a JSON object that compiles with the schema provided below.
------------------
Example Input:
{{example_input}}

Example Output:
{{example_output}}
-------------------
Please generate the output JSON object containing the necessary information and ensure it follows the given schema.
If the input text contains any attributes not mentioned in the schema, please disregard them.
-------------------
Input:
{{context}}
-------------------
Output:
";

const ANALYSIS: &str = "
You are a highly efficient text processing application

Given the original unstructured text, the JSON schema, and the generated JSON output, analyze and identify any discrepancies, errors, or inconsistences.
Specifically, pinpoint the parts in the original text that may have led to incorrect output in the generated JSON.
Please provide a list of fields in the generated JSON that need to be corrected, and the corresponding suggestions for corrections.
If you think the generated JSON is correct, please do not provide any suggestions.
-------------------
JSON schema:
{{json_schema}}
------------------
Original text:
{{original_text}}
-------------------
Generated JSON output:
{{json_output}}
-------------------

Please output your analysis in the following json format

{{output_format}}

Your analysis:
";

const CLASSIFICATION: &str = "
Given a list of possible categories and the text to classify, use your capabilities to determine the most fitting category for the provided text.
If the category cannot be determined with high confidence, classify the text as \"other\".
The categories you may choose from are STRICTLY limited to the given list.
-------------------
List of possible categories with their descriptions:
{{categories}}
------------------
Text to classify:
{{text}}
-------------------
For your output, provide a JSON object that contains the 'classification' field representing the determined category and the 'confidence' field
indicating the confidence level of the classification.

Please provide your output in the following format:

{{output_format}}

Your Classification:
";

/// Zero-shot extraction of the first chunk, or of the whole text.
pub fn schema_extraction() -> PromptTemplate {
    PromptTemplate::new(SCHEMA_EXTRACTION)
}

/// Refines an earlier extraction with the next chunk.
pub fn schema_extraction_refine() -> PromptTemplate {
    PromptTemplate::new(SCHEMA_EXTRACTION_REFINE)
}

pub fn example_extraction() -> PromptTemplate {
    PromptTemplate::new(EXAMPLE_EXTRACTION)
}

pub fn analysis() -> PromptTemplate {
    PromptTemplate::new(ANALYSIS)
}

pub fn classification() -> PromptTemplate {
    PromptTemplate::new(CLASSIFICATION)
}

/// Passes the caller's prompt through untouched.
pub fn generic() -> PromptTemplate {
    PromptTemplate::new("{{prompt}}")
}
