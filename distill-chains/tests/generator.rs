use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use distill_chains::{translate_provider_error, Generator, LlmChain};
use distill_core::{
    DistillError, ErrorClass, LlmRequest, LlmResponse, ModelHandle, ModelRequest, ModelResolver,
    Runnable, Value,
};
use distill_prompt::PromptTemplate;

struct EchoLlm {
    calls: AtomicUsize,
    failure: Mutex<Option<DistillError>>,
}

impl EchoLlm {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
        })
    }

    fn failing(error: DistillError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failure: Mutex::new(Some(error)),
        })
    }
}

#[async_trait::async_trait]
impl Runnable<LlmRequest, LlmResponse> for EchoLlm {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, DistillError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().unwrap().take() {
            return Err(error);
        }
        Ok(LlmResponse::text(format!("echo: {}", input.messages[0].content)))
    }
}

struct FixedResolver {
    llm: Arc<EchoLlm>,
    resolutions: AtomicUsize,
}

impl FixedResolver {
    fn new(llm: Arc<EchoLlm>) -> Self {
        Self {
            llm,
            resolutions: AtomicUsize::new(0),
        }
    }
}

impl ModelResolver for FixedResolver {
    fn resolve(&self, request: &ModelRequest) -> Result<ModelHandle, DistillError> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        if request.name != "gpt-4" {
            return Err(DistillError::ModelUnavailable {
                model: request.name.clone(),
            });
        }
        if request.api_key().is_none() {
            return Err(DistillError::CredentialMissing {
                model: request.name.clone(),
            });
        }
        Ok(ModelHandle::new(request.name.clone(), self.llm.clone()))
    }
}

fn model() -> ModelRequest {
    ModelRequest::new("gpt-4").with_api_key("sk-test")
}

fn greeting() -> (PromptTemplate, HashMap<String, Value>) {
    (
        PromptTemplate::new("Hello {{name}}"),
        HashMap::from([("name".to_string(), Value::from("Ada"))]),
    )
}

#[tokio::test]
async fn generate_returns_raw_text_without_trace() {
    let generator = Generator::new(FixedResolver::new(EchoLlm::ok()));
    let (prompt, values) = greeting();

    let generation = generator
        .generate(&model(), &prompt, &values, false)
        .await
        .unwrap();

    assert_eq!(generation.text, "echo: Hello Ada");
    assert!(generation.trace.is_none());
}

#[tokio::test]
async fn debug_generation_records_one_chain_and_one_call() {
    let generator = Generator::new(FixedResolver::new(EchoLlm::ok()));
    let (prompt, values) = greeting();

    let trace = generator
        .generate(&model(), &prompt, &values, true)
        .await
        .unwrap()
        .trace
        .unwrap();

    assert_eq!(trace.chain_call_count, 1);
    assert_eq!(trace.model_call_count, 1);
    assert!(trace.is_complete());
    assert_eq!(trace.chains[0].chain_name, "LLMChain");
    assert_eq!(trace.calls[0].model_name, "gpt-4");
    assert_eq!(trace.calls[0].prompts, vec!["Hello Ada".to_string()]);
    assert_eq!(
        trace.calls[0].outputs.as_ref().unwrap().generations,
        vec!["echo: Hello Ada".to_string()]
    );
    assert_eq!(trace.calls[0].parent_run_id, Some(trace.chains[0].run_id));
}

#[tokio::test]
async fn template_mismatch_fails_before_resolution() {
    let resolver = FixedResolver::new(EchoLlm::ok());
    let generator = Generator::new(resolver);
    let prompt = PromptTemplate::new("Hello {{name}}");
    let values = HashMap::from([("nickname".to_string(), Value::from("Ada"))]);

    let err = generator
        .generate(&ModelRequest::new("unknown"), &prompt, &values, false)
        .await
        .unwrap_err();

    assert!(matches!(err, DistillError::TemplateFormat(_)));
    assert_eq!(err.class(), ErrorClass::Internal);
    assert_eq!(generator.resolver().resolutions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn resolver_errors_surface_without_calls() {
    let llm = EchoLlm::ok();
    let generator = Generator::new(FixedResolver::new(llm.clone()));
    let (prompt, values) = greeting();

    let err = generator
        .generate(&ModelRequest::new("gpt-4"), &prompt, &values, false)
        .await
        .unwrap_err();

    assert!(matches!(err, DistillError::CredentialMissing { .. }));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn provider_status_codes_are_translated() {
    let cases = [
        (401, ErrorClass::InvalidInput),
        (400, ErrorClass::Unprocessable),
        (500, ErrorClass::Internal),
    ];
    for (status, class) in cases {
        let llm = EchoLlm::failing(DistillError::ProviderStatus {
            status,
            message: "rejected".into(),
        });
        let generator = Generator::new(FixedResolver::new(llm));
        let (prompt, values) = greeting();

        let err = generator
            .generate(&model(), &prompt, &values, true)
            .await
            .unwrap_err();
        assert_eq!(err.class(), class, "status {status}");
    }
}

#[test]
fn translation_maps_only_auth_and_bad_request() {
    let invalid = translate_provider_error(
        "gpt-4",
        DistillError::ProviderStatus {
            status: 401,
            message: "no".into(),
        },
    );
    assert_eq!(invalid.to_string(), "API key for model gpt-4 is invalid");

    let rejected = translate_provider_error(
        "gpt-4",
        DistillError::ProviderStatus {
            status: 400,
            message: "too long".into(),
        },
    );
    assert!(matches!(rejected, DistillError::RequestRejected { .. }));

    let passthrough = translate_provider_error("gpt-4", DistillError::LlmProvider("io".into()));
    assert!(matches!(passthrough, DistillError::LlmProvider(_)));
}

#[tokio::test]
async fn llm_chain_runs_as_a_plain_runnable() {
    let handle = ModelHandle::new("gpt-4", EchoLlm::ok());
    let chain = LlmChain::new(handle, PromptTemplate::new("Say {{word}}"));

    let text = chain
        .invoke(HashMap::from([("word".to_string(), Value::from("hi"))]))
        .await
        .unwrap();
    assert_eq!(text, "echo: Say hi");
}

#[tokio::test]
async fn generate_refine_reports_call_count_and_trace() {
    let generator = Generator::new(FixedResolver::new(EchoLlm::ok()));
    let initial = PromptTemplate::new("{{context}}");
    let refine = PromptTemplate::new("{{existing_answer}}|{{context}}");
    let chunks = vec!["a".to_string(), "b".to_string()];

    let generation = generator
        .generate_refine(&model(), &initial, &refine, &chunks, &HashMap::new(), true)
        .await
        .unwrap();

    assert_eq!(generation.text, "echo: echo: a|b");
    assert_eq!(generation.call_count, 2);
    let trace = generation.trace.unwrap();
    assert_eq!(trace.model_call_count, 2);
    assert_eq!(trace.chain_call_count, 3);
}

/// Replies only once every party of the barrier has a call in flight.
struct RendezvousLlm {
    barrier: tokio::sync::Barrier,
}

#[async_trait::async_trait]
impl Runnable<LlmRequest, LlmResponse> for RendezvousLlm {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, DistillError> {
        self.barrier.wait().await;
        Ok(LlmResponse::text(format!("echo: {}", input.messages[0].content)))
    }
}

struct RendezvousResolver {
    llm: Arc<RendezvousLlm>,
}

impl ModelResolver for RendezvousResolver {
    fn resolve(&self, request: &ModelRequest) -> Result<ModelHandle, DistillError> {
        Ok(ModelHandle::new(request.name.clone(), self.llm.clone()))
    }
}

#[tokio::test]
async fn concurrent_debug_generations_keep_separate_traces() {
    let generator = Arc::new(Generator::new(RendezvousResolver {
        llm: Arc::new(RendezvousLlm {
            barrier: tokio::sync::Barrier::new(2),
        }),
    }));
    let prompt = PromptTemplate::new("Hello {{name}}");
    let ada = HashMap::from([("name".to_string(), Value::from("Ada"))]);
    let alan = HashMap::from([("name".to_string(), Value::from("Alan"))]);

    let model = model();
    let (first, second) = tokio::join!(
        generator.generate(&model, &prompt, &ada, true),
        generator.generate(&model, &prompt, &alan, true),
    );

    for (generation, expected) in [(first.unwrap(), "Hello Ada"), (second.unwrap(), "Hello Alan")] {
        let trace = generation.trace.unwrap();
        assert_eq!(generation.text, format!("echo: {expected}"));
        assert_eq!(trace.chain_call_count, 1);
        assert_eq!(trace.model_call_count, 1);
        assert_eq!(trace.calls.len(), 1);
        assert_eq!(trace.calls[0].prompts, vec![expected.to_string()]);
        assert!(trace.is_complete());
    }
}
