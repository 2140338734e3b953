//! Makama AI: a chat interface whose replies and visual theme come from an
//! LLM through two prompt flows.

pub mod actions;
pub mod chat;
pub mod constants;
pub mod controller;
pub mod error;
pub mod flows;
pub mod fonts;
pub mod llm_interaction;
pub mod prompt;
pub mod schema;
pub mod state;
pub mod web_server;

pub use actions::Actions;
pub use controller::{ChatController, ControllerError, Notifier, StyleOutcome};
pub use error::{FlowError, ProviderError, SchemaError};
pub use llm_interaction::{build_provider, LlmProvider, ProviderConfig, ProviderKind};
pub use state::{Form, FormState, Message, Notice, Role, Theme};
