use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::error::FlowError;
use crate::prompt::{PromptDefinition, PromptInvoker};
use crate::schema::{Field, ObjectSchema};
use crate::state::Theme;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleInput<'a> {
    pub user_input: &'a str,
}

pub const THEME_SCHEMA: ObjectSchema = ObjectSchema::new(&[
    Field {
        name: "primaryColor",
        description: "The primary color for the chatbot.",
    },
    Field {
        name: "backgroundColor",
        description: "The background color for the chatbot.",
    },
    Field {
        name: "accentColor",
        description: "The accent color for the chatbot.",
    },
    Field {
        name: "fontHeadline",
        description: "The font for headlines and shorter text chunks.",
    },
    Field {
        name: "fontBody",
        description: "The font for larger bodies of text.",
    },
    Field {
        name: "iconography",
        description: "The style of icons to use.",
    },
    Field {
        name: "animation",
        description: "The animation style for new messages.",
    },
]);

pub const STYLE_PROMPT: PromptDefinition = PromptDefinition {
    name: "styleAdjustmentsPrompt",
    template: "You are a style expert who can interpret user input and adjust the visual style of a chatbot to evoke a magical feel.

Based on the following user input, suggest appropriate styles for the chatbot, including colors, fonts, iconography, and animation.

User Input: {{ userInput }}

Consider the following:
* Primary color: A color to evoke mystery and magic.
* Background color: A color for a sophisticated and magical feel.
* Accent color: A color for highlights and interactive elements.
* Font for headlines: A sans-serif font for headlines and shorter text chunks.
* Font for body: A serif font for larger bodies of text.
* Iconography: A whimsical style referencing magical items (stars, wands, hats).
* Animation: Subtle transitions and shimmering effects to give a magical feel.

Output your style suggestions in JSON format.
",
    input: ObjectSchema::new(&[Field {
        name: "userInput",
        description: "The user input to interpret for style adjustments.",
    }]),
    output: THEME_SCHEMA,
};

#[derive(Clone)]
pub struct StyleFlow {
    invoker: Arc<PromptInvoker>,
}

impl StyleFlow {
    pub fn new(invoker: Arc<PromptInvoker>) -> Self {
        Self { invoker }
    }

    #[instrument(skip(self))]
    pub async fn style(&self, user_input: &str) -> Result<Theme, FlowError> {
        self.invoker
            .invoke(&STYLE_PROMPT, &StyleInput { user_input })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, SchemaError};
    use crate::llm_interaction::{CompletionRequest, LlmProvider};
    use async_trait::async_trait;
    use serde_json::json;

    struct Fixed(Option<String>);

    #[async_trait]
    impl LlmProvider for Fixed {
        async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, ProviderError> {
            assert!(request.prompt.contains("User Input: enchanted forest at twilight"));
            assert_eq!(request.output_schema["required"].as_array().unwrap().len(), 7);
            Ok(self.0.clone())
        }
    }

    fn flow(reply: Option<serde_json::Value>) -> StyleFlow {
        let provider = Arc::new(Fixed(reply.map(|v| v.to_string())));
        StyleFlow::new(Arc::new(PromptInvoker::new(provider)))
    }

    #[tokio::test]
    async fn test_style_parses_theme() {
        let flow = flow(Some(json!({
            "primaryColor": "#2f6b4f",
            "backgroundColor": "#0e1a14",
            "accentColor": "#d4a5ff",
            "fontHeadline": "Cinzel",
            "fontBody": "Lora",
            "iconography": "Glowing mushrooms and fireflies",
            "animation": "Soft firefly drift"
        })));
        let theme = flow.style("enchanted forest at twilight").await.unwrap();
        assert_eq!(theme.font_headline, "Cinzel");
        assert_eq!(theme.font_body, "Lora");
        assert_eq!(theme.primary_color, "#2f6b4f");
    }

    #[tokio::test]
    async fn test_partial_theme_is_rejected() {
        let flow = flow(Some(json!({ "primaryColor": "#2f6b4f" })));
        assert!(matches!(
            flow.style("enchanted forest at twilight").await,
            Err(FlowError::Schema(SchemaError::Mismatch(_)))
        ));
    }

    #[tokio::test]
    async fn test_no_output_is_missing_output() {
        let flow = flow(None);
        assert!(matches!(
            flow.style("enchanted forest at twilight").await,
            Err(FlowError::Schema(SchemaError::MissingOutput))
        ));
    }
}
