use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use distill_chains::{Example, JsonService};
use distill_core::{
    DistillError, ErrorClass, LlmRequest, LlmResponse, ModelHandle, ModelRequest, ModelResolver,
    Runnable,
};
use distill_text::ChunkParams;

/// Stands in for the provider: replies in order, remembers prompts, and
/// rejects the key "invalid" the way the provider does.
#[derive(Default)]
struct FakeProvider {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn replying(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|reply| reply.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

struct KeyedLlm {
    provider: Arc<FakeProvider>,
    api_key: String,
}

#[async_trait::async_trait]
impl Runnable<LlmRequest, LlmResponse> for KeyedLlm {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, DistillError> {
        if self.api_key == "invalid" {
            return Err(DistillError::ProviderStatus {
                status: 401,
                message: "Incorrect API key provided".into(),
            });
        }
        self.provider
            .prompts
            .lock()
            .unwrap()
            .push(input.messages[0].content.clone());
        let reply = self.provider.replies.lock().unwrap().pop_front();
        reply
            .map(LlmResponse::text)
            .ok_or_else(|| DistillError::LlmProvider("no reply scripted".into()))
    }
}

struct FakeResolver {
    provider: Arc<FakeProvider>,
}

impl ModelResolver for FakeResolver {
    fn resolve(&self, request: &ModelRequest) -> Result<ModelHandle, DistillError> {
        if !["gpt-3.5-turbo", "gpt-3.5-turbo-16k", "gpt-4"].contains(&request.name.as_str()) {
            return Err(DistillError::ModelUnavailable {
                model: request.name.clone(),
            });
        }
        let api_key = request
            .api_key()
            .ok_or_else(|| DistillError::CredentialMissing {
                model: request.name.clone(),
            })?;
        let llm = KeyedLlm {
            provider: self.provider.clone(),
            api_key: api_key.to_string(),
        };
        Ok(ModelHandle::new(request.name.clone(), Arc::new(llm)))
    }
}

fn setup(replies: &[&str]) -> (JsonService<FakeResolver>, Arc<FakeProvider>) {
    let provider = FakeProvider::replying(replies);
    let service = JsonService::new(FakeResolver {
        provider: provider.clone(),
    });
    (service, provider)
}

fn model(api_key: Option<&str>) -> ModelRequest {
    let request = ModelRequest::new("gpt-3.5-turbo");
    match api_key {
        Some(key) => request.with_api_key(key),
        None => request,
    }
}

const SCHEMA: &str = r#"{"title":"string","description":"string"}"#;

#[tokio::test]
async fn schema_extraction_returns_the_parsed_object() {
    let (service, provider) =
        setup(&[r#"{"title":"A text","description":"This is a text"}"#]);

    let extraction = service
        .extract_with_schema("This is a text", &model(Some("sk-valid")), SCHEMA, false)
        .await
        .unwrap();

    assert!(extraction.json["title"].is_string());
    assert!(extraction.json["description"].is_string());
    assert!(extraction.trace.is_none());

    let prompt = &provider.prompts()[0];
    assert!(prompt.contains(SCHEMA));
    assert!(prompt.contains("Input:\nThis is a text\n"));
}

#[tokio::test]
async fn missing_key_is_reported_before_any_call() {
    let (service, provider) = setup(&[]);

    let err = service
        .extract_with_schema("This is a text", &model(None), SCHEMA, false)
        .await
        .unwrap_err();

    assert!(matches!(err, DistillError::CredentialMissing { .. }));
    assert_eq!(err.class(), ErrorClass::InvalidInput);
    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn rejected_key_is_reported_as_invalid() {
    let (service, _) = setup(&[]);

    let err = service
        .extract_with_schema("This is a text", &model(Some("invalid")), SCHEMA, false)
        .await
        .unwrap_err();

    assert!(matches!(err, DistillError::CredentialInvalid { ref model } if model == "gpt-3.5-turbo"));
}

#[tokio::test]
async fn unsupported_model_is_unavailable() {
    let (service, _) = setup(&[]);

    let err = service
        .generic_prompt(&ModelRequest::new("llama").with_api_key("k"), "hi", false)
        .await
        .unwrap_err();
    assert!(matches!(err, DistillError::ModelUnavailable { .. }));
}

#[tokio::test]
async fn truncated_json_is_invalid_output() {
    let (service, _) = setup(&[r#"{"title": "x""#]);

    let err = service
        .extract_with_schema("This is a text", &model(Some("sk-valid")), SCHEMA, false)
        .await
        .unwrap_err();

    assert!(matches!(err, DistillError::InvalidOutput { ref output, .. } if output == r#"{"title": "x""#));
    assert_eq!(err.class(), ErrorClass::Unprocessable);
}

#[tokio::test]
async fn refined_extraction_keeps_an_unchanged_answer() {
    let answer = r#"{"title":"x","description":"y"}"#;
    let (service, provider) = setup(&[answer, answer]);
    let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));

    let extraction = service
        .extract_with_schema_and_refine(
            &text,
            &model(Some("sk-valid")),
            SCHEMA,
            Some(ChunkParams::new(40, 0)),
            true,
        )
        .await
        .unwrap();

    assert_eq!(extraction.json, serde_json::json!({"title": "x", "description": "y"}));
    assert_eq!(extraction.refine_recap.call_count, 2);
    assert_eq!(extraction.refine_recap.chunk_size, 40);
    assert_eq!(extraction.refine_recap.overlap, 0);

    let prompts = provider.prompts();
    assert!(prompts[1].contains(&format!("You have provided an existing output:\n{answer}\n")));

    let trace = extraction.trace.unwrap();
    assert_eq!(trace.model_call_count, 2);
    assert!(trace.is_complete());
}

#[tokio::test]
async fn refined_extraction_defaults_to_a_single_chunk_for_short_text() {
    let (service, _) = setup(&[r#"{"title":"x"}"#]);

    let extraction = service
        .extract_with_schema_and_refine("short", &model(Some("sk-valid")), SCHEMA, None, false)
        .await
        .unwrap();

    assert_eq!(extraction.refine_recap.chunk_size, 2000);
    assert_eq!(extraction.refine_recap.overlap, 100);
    assert_eq!(extraction.refine_recap.call_count, 1);

    let recap = serde_json::to_value(extraction.refine_recap).unwrap();
    assert_eq!(recap, serde_json::json!({"chunkSize": 2000, "overlap": 100, "callCount": 1}));
}

#[tokio::test]
async fn refined_extraction_rejects_unusable_chunking() {
    let (service, provider) = setup(&[]);

    let err = service
        .extract_with_schema_and_refine(
            "text",
            &model(Some("sk-valid")),
            SCHEMA,
            Some(ChunkParams::new(0, 0)),
            false,
        )
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidInput);

    let err = service
        .extract_with_schema_and_refine(
            "text",
            &model(Some("sk-valid")),
            SCHEMA,
            Some(ChunkParams::new(100, 100)),
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DistillError::InvalidRequest(_)));
    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn example_extraction_renders_the_example_pair() {
    let (service, provider) = setup(&["```json\n{\"name\":\"Bob\"}\n```"]);
    let example = Example {
        input: "Alice is 30".into(),
        output: r#"{"name":"Alice"}"#.into(),
    };

    let extraction = service
        .extract_with_example("Bob is 40", &model(Some("sk-valid")), &example, false)
        .await
        .unwrap();

    assert_eq!(extraction.json["name"], "Bob");
    let prompt = &provider.prompts()[0];
    assert!(prompt.contains("Example Input:\nAlice is 30\n"));
    assert!(prompt.contains("Example Output:\n{\"name\":\"Alice\"}\n"));
}

#[tokio::test]
async fn analysis_requires_complete_corrections() {
    let good = r#"{"corrections":[{"field":"title","issue":"wrong","description":"d","suggestion":"s"}],"textAnalysis":"ok"}"#;
    let (service, provider) = setup(&[good]);

    let output = service
        .analyze(&model(Some("sk-valid")), r#"{"title":"y"}"#, "text", SCHEMA, false)
        .await
        .unwrap();
    assert_eq!(output.analysis.corrections[0].field, "title");
    assert_eq!(output.analysis.text_analysis, "ok");
    assert!(provider.prompts()[0].contains("\"textAnalysis\""));

    let missing = r#"{"corrections":[{"field":"title","issue":"wrong","description":"d"}],"textAnalysis":"ok"}"#;
    let (service, _) = setup(&[missing]);
    let err = service
        .analyze(&model(Some("sk-valid")), "{}", "text", SCHEMA, false)
        .await
        .unwrap_err();
    assert!(matches!(err, DistillError::InvalidOutput { .. }));
}

#[tokio::test]
async fn classification_lists_categories_one_per_line() {
    let (service, provider) = setup(&[r#"{"classification":"invoice","confidence":"92"}"#]);
    let categories = vec!["invoice".to_string(), "receipt".to_string()];

    let output = service
        .classify(&model(Some("sk-valid")), "Total due: 10", &categories, true)
        .await
        .unwrap();

    assert_eq!(output.classification.classification, "invoice");
    assert_eq!(output.classification.confidence, 92.0);
    assert!(output.trace.is_some());
    assert!(provider.prompts()[0].contains("descriptions:\ninvoice\nreceipt\n"));
}

#[tokio::test]
async fn classification_without_confidence_is_invalid() {
    let (service, _) = setup(&[r#"{"classification":"invoice"}"#]);

    let err = service
        .classify(&model(Some("sk-valid")), "text", &["invoice".to_string()], false)
        .await
        .unwrap_err();
    assert!(matches!(err, DistillError::InvalidOutput { .. }));
}

#[tokio::test]
async fn generic_prompt_passes_text_through() {
    let (service, provider) = setup(&["not json at all"]);

    let output = service
        .generic_prompt(&model(Some("sk-valid")), "Tell me a joke", false)
        .await
        .unwrap();

    assert_eq!(output.output, "not json at all");
    assert_eq!(provider.prompts(), vec!["Tell me a joke".to_string()]);
}
