//! Shared primitive behind every flow: validate input, render the prompt
//! template, ask the provider for schema-constrained output and parse it.

use std::sync::Arc;

use minijinja::{Environment, UndefinedBehavior};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument};

use crate::error::FlowError;
use crate::llm_interaction::{CompletionRequest, LlmProvider};
use crate::schema::{parse_output, ObjectSchema};

/// A named prompt: its template and the shapes going in and coming out.
#[derive(Debug, Clone, Copy)]
pub struct PromptDefinition {
    pub name: &'static str,
    pub template: &'static str,
    pub input: ObjectSchema,
    pub output: ObjectSchema,
}

pub struct PromptInvoker {
    provider: Arc<dyn LlmProvider>,
    env: Environment<'static>,
}

impl PromptInvoker {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let mut env = Environment::new();
        // A field the template expects but the input lacks is an input error,
        // not an empty string.
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { provider, env }
    }

    /// Single attempt; no retries and no caching.
    #[instrument(skip(self, prompt, input), fields(prompt = prompt.name))]
    pub async fn invoke<I, O>(&self, prompt: &PromptDefinition, input: &I) -> Result<O, FlowError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let rendered = self.render(prompt, input)?;
        debug!(?rendered, "Rendered prompt");

        let raw = self
            .provider
            .complete(CompletionRequest {
                prompt_name: prompt.name.to_string(),
                prompt: rendered,
                output_schema: prompt.output.to_json_schema(),
            })
            .await?;

        Ok(parse_output(&prompt.output, raw.as_deref())?)
    }

    /// Validates `input` against the prompt's input schema and renders the
    /// template with its fields.
    pub fn render<I>(&self, prompt: &PromptDefinition, input: &I) -> Result<String, FlowError>
    where
        I: Serialize + ?Sized,
    {
        let value = serde_json::to_value(input)
            .map_err(|e| FlowError::Validation(format!("input is not serializable: {}", e)))?;
        prompt.input.check(&value).map_err(FlowError::Validation)?;
        self.env
            .render_named_str(prompt.name, prompt.template, &value)
            .map_err(|e| FlowError::Validation(format!("failed to render `{}`: {}", prompt.name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, SchemaError};
    use crate::schema::Field;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Mutex;

    const ECHO: PromptDefinition = PromptDefinition {
        name: "echoPrompt",
        template: "Say <{{ word }}> back.",
        input: ObjectSchema::new(&[Field {
            name: "word",
            description: "word to echo",
        }]),
        output: ObjectSchema::new(&[Field {
            name: "echo",
            description: "the echoed word",
        }]),
    };

    #[derive(Debug, Deserialize)]
    struct Echo {
        echo: String,
    }

    struct Canned {
        reply: Result<Option<String>, ()>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl Canned {
        fn new(reply: Result<Option<&str>, ()>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(|r| r.map(str::to_string)),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for Canned {
        async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, ProviderError> {
            self.seen.lock().unwrap().push(request);
            match &self.reply {
                Ok(r) => Ok(r.clone()),
                Err(()) => Err(ProviderError::Timeout {
                    url: "http://model".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_invoke_renders_and_parses() {
        let provider = Canned::new(Ok(Some(r#"{"echo":"<abracadabra>"}"#)));
        let invoker = PromptInvoker::new(provider.clone());

        let out: Echo = invoker
            .invoke(&ECHO, &json!({ "word": "abracadabra" }))
            .await
            .unwrap();
        assert_eq!(out.echo, "<abracadabra>");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].prompt_name, "echoPrompt");
        // No HTML escaping of interpolated input.
        assert_eq!(seen[0].prompt, "Say <abracadabra> back.");
        assert_eq!(seen[0].output_schema["required"], json!(["echo"]));
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_provider() {
        let provider = Canned::new(Ok(Some(r#"{"echo":"x"}"#)));
        let invoker = PromptInvoker::new(provider.clone());

        let err = invoker
            .invoke::<_, Echo>(&ECHO, &json!({ "word": 42 }))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Validation(_)));
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let invoker = PromptInvoker::new(Canned::new(Err(())));
        let err = invoker
            .invoke::<_, Echo>(&ECHO, &json!({ "word": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Provider(ProviderError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_missing_and_malformed_output_are_distinct() {
        let invoker = PromptInvoker::new(Canned::new(Ok(None)));
        let err = invoker
            .invoke::<_, Echo>(&ECHO, &json!({ "word": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Schema(SchemaError::MissingOutput)));

        let invoker = PromptInvoker::new(Canned::new(Ok(Some("x"))));
        let err = invoker
            .invoke::<_, Echo>(&ECHO, &json!({ "word": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Schema(SchemaError::Malformed(_))));
    }

    #[test]
    fn test_template_variables_are_strict() {
        const BROKEN: PromptDefinition = PromptDefinition {
            name: "brokenPrompt",
            template: "{{ word }} and {{ missing }}",
            input: ECHO.input,
            output: ECHO.output,
        };
        let invoker = PromptInvoker::new(Canned::new(Ok(None)));
        let err = invoker.render(&BROKEN, &json!({ "word": "x" })).unwrap_err();
        assert!(matches!(err, FlowError::Validation(msg) if msg.contains("brokenPrompt")));
    }
}
