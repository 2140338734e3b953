//! Chat UI state machine.
//!
//! The controller owns the message list, the active theme and the state of
//! the two forms (chat and style). Each form is `Idle` or `Submitting` and
//! the forms are independent of each other.
//!
//! A submission is split in two steps so a driver can release the
//! controller while the provider call is pending:
//!
//! 1. `begin_*` validates the text, performs the synchronous state change
//!    and returns a pending ticket;
//! 2. `complete_*` consumes the ticket and applies the result.
//!
//! [`ChatController::submit_chat`] and [`ChatController::submit_style`] run
//! both steps around the action call for drivers that own the controller
//! outright, like the terminal chat.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actions::Actions;
use crate::constants::MIN_STYLE_PROMPT_CHARS;
use crate::fonts::FontLoader;
use crate::state::{Form, FormState, Message, Notice, Theme};

pub const EMPTY_MESSAGE: &str = "Message cannot be empty.";
pub const PROMPT_TOO_SHORT: &str = "Prompt is too short.";

/// Receives transient user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// Local validation failed; nothing changed.
    #[error("{0}")]
    Invalid(&'static str),
    #[error("the {0} form is already submitting")]
    Busy(Form),
}

/// A chat submission awaiting the assistant's reply.
#[must_use = "a pending chat keeps the chat form submitting until completed"]
#[derive(Debug)]
pub struct PendingChat {
    query: String,
}

impl PendingChat {
    pub fn query(&self) -> &str {
        &self.query
    }
}

/// A style submission awaiting a theme.
#[must_use = "a pending style keeps the style form submitting until completed"]
#[derive(Debug)]
pub struct PendingStyle {
    prompt: String,
}

impl PendingStyle {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleOutcome {
    Applied(Theme),
    Unchanged,
}

/// Serializable view of the controller, as served to the page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub messages: Vec<Message>,
    pub theme: Theme,
    pub chat: FormState,
    pub style: FormState,
    pub style_panel_open: bool,
}

pub struct ChatController {
    messages: Vec<Message>,
    theme: Theme,
    chat_form: FormState,
    style_form: FormState,
    style_panel_open: bool,
    fonts: Arc<dyn FontLoader>,
    notifier: Arc<dyn Notifier>,
}

impl ChatController {
    pub fn new(fonts: Arc<dyn FontLoader>, notifier: Arc<dyn Notifier>) -> Self {
        let theme = Theme::default();
        fonts.load(&theme.fonts());
        Self {
            messages: Vec::new(),
            theme,
            chat_form: FormState::Idle,
            style_form: FormState::Idle,
            style_panel_open: false,
            fonts,
            notifier,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Replaces the active theme wholesale and loads its fonts.
    pub fn set_theme(&mut self, theme: Theme) {
        self.fonts.load(&theme.fonts());
        self.theme = theme;
    }

    pub fn form_state(&self, form: Form) -> FormState {
        match form {
            Form::Chat => self.chat_form,
            Form::Style => self.style_form,
        }
    }

    pub fn is_style_panel_open(&self) -> bool {
        self.style_panel_open
    }

    pub fn open_style_panel(&mut self) {
        self.style_panel_open = true;
    }

    pub fn close_style_panel(&mut self) {
        self.style_panel_open = false;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            messages: self.messages.clone(),
            theme: self.theme.clone(),
            chat: self.chat_form,
            style: self.style_form,
            style_panel_open: self.style_panel_open,
        }
    }

    /// Appends the user's message and marks the chat form submitting.
    pub fn begin_chat(&mut self, text: &str) -> Result<PendingChat, ControllerError> {
        if text.is_empty() {
            return Err(ControllerError::Invalid(EMPTY_MESSAGE));
        }
        if self.chat_form == FormState::Submitting {
            return Err(ControllerError::Busy(Form::Chat));
        }
        self.messages.push(Message::user(text));
        self.chat_form = FormState::Submitting;
        debug!(messages = self.messages.len(), "Chat submitted");
        Ok(PendingChat {
            query: text.to_string(),
        })
    }

    pub fn complete_chat(&mut self, pending: PendingChat, reply: String) -> &Message {
        debug!(query = %pending.query, "Chat answered");
        self.messages.push(Message::assistant(reply));
        self.chat_form = FormState::Idle;
        &self.messages[self.messages.len() - 1]
    }

    pub fn begin_style(&mut self, text: &str) -> Result<PendingStyle, ControllerError> {
        if text.chars().count() < MIN_STYLE_PROMPT_CHARS {
            return Err(ControllerError::Invalid(PROMPT_TOO_SHORT));
        }
        if self.style_form == FormState::Submitting {
            return Err(ControllerError::Busy(Form::Style));
        }
        self.style_form = FormState::Submitting;
        self.notifier.notify(Notice::info(
            "Conjuring new styles...",
            "Please wait while we weave some magic.",
        ));
        Ok(PendingStyle {
            prompt: text.to_string(),
        })
    }

    pub fn complete_style(&mut self, pending: PendingStyle, result: Option<Theme>) -> StyleOutcome {
        self.style_form = FormState::Idle;
        match result {
            Some(theme) => {
                info!(prompt = %pending.prompt, "Applying new theme");
                self.set_theme(theme.clone());
                self.close_style_panel();
                self.notifier.notify(Notice::info(
                    "Style Updated!",
                    "The chatbot has a new magical look.",
                ));
                StyleOutcome::Applied(theme)
            }
            None => {
                warn!(prompt = %pending.prompt, "No theme returned, keeping the current one");
                self.notifier.notify(Notice::failure(
                    "Style Magic Failed",
                    "Could not apply the new style. Please try a different prompt.",
                ));
                StyleOutcome::Unchanged
            }
        }
    }

    /// Clears the conversation. Refused while a chat reply is pending, since
    /// the reply would land in the cleared list.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        if self.chat_form == FormState::Submitting {
            return Err(ControllerError::Busy(Form::Chat));
        }
        self.messages.clear();
        self.notifier.notify(Notice::info(
            "Chat Reset",
            "The conversation has been cleared.",
        ));
        Ok(())
    }

    /// Runs a whole chat submission and returns the assistant's message.
    pub async fn submit_chat(&mut self, actions: &Actions, text: &str) -> Result<Message, ControllerError> {
        let pending = self.begin_chat(text)?;
        let reply = actions.get_ai_response(pending.query()).await;
        Ok(self.complete_chat(pending, reply).clone())
    }

    pub async fn submit_style(&mut self, actions: &Actions, text: &str) -> Result<StyleOutcome, ControllerError> {
        let pending = self.begin_style(text)?;
        let theme = actions.get_ai_style(pending.prompt()).await;
        Ok(self.complete_style(pending, theme))
    }
}
