// Defaults loaded from the environment (after dotenvy has read any .env file).
// Command-line flags in main.rs take precedence over these values.

use std::env;

lazy_static::lazy_static! {
    pub static ref OLLAMA_URL: String = env::var("OLLAMA_URL").unwrap_or_else(|_| "http://127.0.0.1:11434".to_string());
    pub static ref MAKAMA_MODEL: String = env::var("MAKAMA_MODEL").unwrap_or_else(|_| "gemma3:12b".to_string());
    pub static ref MAKAMA_PROVIDER: String = env::var("MAKAMA_PROVIDER").unwrap_or_else(|_| "ollama".to_string());
    pub static ref OPENAI_BASE_URL: String = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    pub static ref OPENAI_API_KEY: String = env::var("OPENAI_API_KEY").unwrap_or_default();
    pub static ref MAKAMA_TIMEOUT_SECS: u64 = env::var("MAKAMA_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(120);
}

/// Tone handed to every chat prompt. Not user-controlled.
pub const STYLE_GUIDE: &str = "A magical, whimsical, and mysterious tone. Be helpful but enigmatic.";

/// Reply shown in place of the assistant's answer when the chat flow fails.
pub const CHAT_FALLBACK: &str = "Oops! My magic spell failed. Could you try asking again?";

pub const DEFAULT_HEADLINE_FONT: &str = "Belleza";
pub const DEFAULT_BODY_FONT: &str = "Alegreya";

pub const MIN_STYLE_PROMPT_CHARS: usize = 3;
