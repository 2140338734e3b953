//! UI-agnostic state types shared by the web server and the terminal chat.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BODY_FONT, DEFAULT_HEADLINE_FONT};

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// The seven-field visual style applied to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub primary_color: String,
    pub background_color: String,
    pub accent_color: String,
    pub font_headline: String,
    pub font_body: String,
    pub iconography: String,
    pub animation: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: "#9b6bf2".to_string(),
            background_color: "#17142b".to_string(),
            accent_color: "#e9c46a".to_string(),
            font_headline: DEFAULT_HEADLINE_FONT.to_string(),
            font_body: DEFAULT_BODY_FONT.to_string(),
            iconography: "Whimsical line icons of stars, wands and hats".to_string(),
            animation: "Subtle shimmer on new messages".to_string(),
        }
    }
}

/// Drops characters that could end a declaration or the quoted font name,
/// so each model-written value stays inside its own property.
fn css_value(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '\'' | '"' | '\\' | '<' | '>') && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

impl Theme {
    /// CSS custom properties the page template binds to.
    pub fn css_variables(&self) -> Vec<(&'static str, String)> {
        vec![
            ("--primary", css_value(&self.primary_color)),
            ("--background", css_value(&self.background_color)),
            ("--accent", css_value(&self.accent_color)),
            ("--font-headline", format!("'{}'", css_value(&self.font_headline))),
            ("--font-body", format!("'{}'", css_value(&self.font_body))),
        ]
    }

    pub fn fonts(&self) -> [&str; 2] {
        [self.font_headline.as_str(), self.font_body.as_str()]
    }
}

/// Submission state of one form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormState {
    #[default]
    Idle,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Form {
    Chat,
    Style,
}

impl std::fmt::Display for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Form::Chat => write!(f, "chat"),
            Form::Style => write!(f, "style"),
        }
    }
}

/// A transient user-facing notification (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

impl Notice {
    pub fn info(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            variant: NoticeVariant::Default,
        }
    }

    pub fn failure(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            variant: NoticeVariant::Destructive,
        }
    }
}
