//! Entry points the UI layers call. This is the only place flow failures are
//! caught: every error kind degrades to the same fallback and a log line.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::constants::CHAT_FALLBACK;
use crate::flows::{ChatFlow, StyleFlow};
use crate::llm_interaction::LlmProvider;
use crate::prompt::PromptInvoker;
use crate::state::Theme;

#[derive(Clone)]
pub struct Actions {
    chat: ChatFlow,
    style: StyleFlow,
}

impl Actions {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let invoker = Arc::new(PromptInvoker::new(provider));
        Self {
            chat: ChatFlow::new(invoker.clone()),
            style: StyleFlow::new(invoker),
        }
    }

    /// Never fails: a broken flow yields [`CHAT_FALLBACK`].
    #[instrument(skip(self))]
    pub async fn get_ai_response(&self, query: &str) -> String {
        match self.chat.chat(query).await {
            Ok(response) => response,
            Err(e) => {
                error!(kind = e.kind(), error = %e, "Chat flow failed, answering with fallback");
                CHAT_FALLBACK.to_string()
            }
        }
    }

    /// `None` when the style flow failed for any reason.
    #[instrument(skip(self))]
    pub async fn get_ai_style(&self, user_input: &str) -> Option<Theme> {
        match self.style.style(user_input).await {
            Ok(theme) => {
                info!(headline = %theme.font_headline, body = %theme.font_body, "Style flow produced a theme");
                Some(theme)
            }
            Err(e) => {
                error!(kind = e.kind(), error = %e, "Style flow failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::llm_interaction::CompletionRequest;
    use async_trait::async_trait;

    enum Script {
        Reply(&'static str),
        Empty,
        Timeout,
        Status,
    }

    struct Scripted(Script);

    #[async_trait]
    impl LlmProvider for Scripted {
        async fn complete(&self, _request: CompletionRequest) -> Result<Option<String>, ProviderError> {
            match self.0 {
                Script::Reply(r) => Ok(Some(r.to_string())),
                Script::Empty => Ok(None),
                Script::Timeout => Err(ProviderError::Timeout {
                    url: "http://127.0.0.1:11434/api/generate".to_string(),
                }),
                Script::Status => Err(ProviderError::Status {
                    status: 500,
                    body: "boom".to_string(),
                }),
            }
        }
    }

    fn actions(script: Script) -> Actions {
        Actions::new(Arc::new(Scripted(script)))
    }

    #[test_log::test(tokio::test)]
    async fn test_response_passes_through() {
        let reply = actions(Script::Reply(r#"{"response":"I am Makama, keeper of small secrets."}"#))
            .get_ai_response("What is your name?")
            .await;
        assert_eq!(reply, "I am Makama, keeper of small secrets.");
    }

    #[test_log::test(tokio::test)]
    async fn test_every_chat_failure_degrades_to_fallback() {
        for script in [
            Script::Timeout,
            Script::Status,
            Script::Empty,
            Script::Reply("not json"),
            Script::Reply(r#"{"reply":"wrong"}"#),
        ] {
            assert_eq!(actions(script).get_ai_response("hello").await, CHAT_FALLBACK);
        }
    }

    #[tokio::test]
    async fn test_style_failure_is_none() {
        for script in [
            Script::Timeout,
            Script::Empty,
            Script::Reply(r#"{"primaryColor":"red"}"#),
        ] {
            assert!(actions(script).get_ai_style("celestial starlight").await.is_none());
        }
    }

    #[tokio::test]
    async fn test_style_success_has_all_fields() {
        let theme = actions(Script::Reply(
            r##"{"primaryColor":"#c9b6ff","backgroundColor":"#0b0c2a","accentColor":"#ffe08a",
                "fontHeadline":"Josefin Sans","fontBody":"Cormorant Garamond",
                "iconography":"Constellation glyphs","animation":"Twinkling fade-in"}"##,
        ))
        .get_ai_style("celestial starlight")
        .await
        .unwrap();
        assert_eq!(theme.font_body, "Cormorant Garamond");
        assert_eq!(theme.animation, "Twinkling fade-in");
    }
}
