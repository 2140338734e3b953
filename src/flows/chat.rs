use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::constants::STYLE_GUIDE;
use crate::error::FlowError;
use crate::prompt::{PromptDefinition, PromptInvoker};
use crate::schema::{Field, ObjectSchema};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInput<'a> {
    pub query: &'a str,
    pub style_guide: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatOutput {
    pub response: String,
}

pub const CHAT_PROMPT: PromptDefinition = PromptDefinition {
    name: "chatResponsePrompt",
    template: "You are Makama AI, a chatbot with a magical style.

Your responses should follow this style guide: {{ styleGuide }}

Respond to the following query:
{{ query }}",
    input: ObjectSchema::new(&[
        Field {
            name: "query",
            description: "The user query to respond to.",
        },
        Field {
            name: "styleGuide",
            description: "Style guide to evoke feeling of magic.",
        },
    ]),
    output: ObjectSchema::new(&[Field {
        name: "response",
        description: "The AI generated response to the query.",
    }]),
};

#[derive(Clone)]
pub struct ChatFlow {
    invoker: Arc<PromptInvoker>,
}

impl ChatFlow {
    pub fn new(invoker: Arc<PromptInvoker>) -> Self {
        Self { invoker }
    }

    /// Answers `query` in Makama's tone and returns the model's `response`
    /// field verbatim.
    #[instrument(skip(self))]
    pub async fn chat(&self, query: &str) -> Result<String, FlowError> {
        let input = ChatInput {
            query,
            style_guide: STYLE_GUIDE,
        };
        let output: ChatOutput = self.invoker.invoke(&CHAT_PROMPT, &input).await?;
        Ok(output.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::llm_interaction::{CompletionRequest, LlmProvider};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for Recorder {
        async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, ProviderError> {
            self.prompts.lock().unwrap().push(request.prompt);
            Ok(Some(self.reply.clone()))
        }
    }

    #[tokio::test]
    async fn test_chat_returns_response_verbatim() {
        let provider = Arc::new(Recorder {
            reply: r#"{"response":"  I am Makama, keeper of small secrets.  "}"#.to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let flow = ChatFlow::new(Arc::new(PromptInvoker::new(provider.clone())));

        let reply = flow.chat("What is your name?").await.unwrap();
        assert_eq!(reply, "  I am Makama, keeper of small secrets.  ");

        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("What is your name?"));
        assert!(prompts[0].contains(STYLE_GUIDE));
        assert!(prompts[0].starts_with("You are Makama AI"));
    }

    #[tokio::test]
    async fn test_chat_propagates_schema_failure() {
        let provider = Arc::new(Recorder {
            reply: r#"{"answer":"wrong field"}"#.to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let flow = ChatFlow::new(Arc::new(PromptInvoker::new(provider)));
        assert!(matches!(
            flow.chat("hello").await,
            Err(FlowError::Schema(_))
        ));
    }
}
