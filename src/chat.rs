// Terminal front end for the chat controller: `makama chat` and
// `makama style <PROMPT>`.

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::actions::Actions;
use crate::controller::{ChatController, ControllerError, Notifier, StyleOutcome};
use crate::fonts::FontLinks;
use crate::state::{Notice, NoticeVariant};

struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        match notice.variant {
            NoticeVariant::Default => println!("* {}: {}", notice.title, notice.description),
            NoticeVariant::Destructive => eprintln!("! {}: {}", notice.title, notice.description),
        }
    }
}

/// Sends every notice to stderr so stdout carries only the command's output.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        let marker = match notice.variant {
            NoticeVariant::Default => '*',
            NoticeVariant::Destructive => '!',
        };
        eprintln!("{} {}: {}", marker, notice.title, notice.description);
    }
}

fn terminal_controller(notifier: Arc<dyn Notifier>) -> ChatController {
    ChatController::new(Arc::new(FontLinks::new()), notifier)
}

#[derive(Debug, PartialEq, Eq)]
pub enum TerminalCommand {
    Chat(String),
    Style(String),
    Theme,
    Reset,
    Help,
    Quit,
}

/// Lines starting with `/` are commands; anything else is a chat message.
pub fn parse_command(line: &str) -> TerminalCommand {
    let Some(rest) = line.strip_prefix('/') else {
        return TerminalCommand::Chat(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest.trim(), ""),
    };
    match name {
        "style" => TerminalCommand::Style(arg.to_string()),
        "theme" => TerminalCommand::Theme,
        "reset" => TerminalCommand::Reset,
        "help" => TerminalCommand::Help,
        "quit" | "exit" => TerminalCommand::Quit,
        _ => TerminalCommand::Chat(line.to_string()),
    }
}

const HELP: &str = "Commands: /style <prompt>, /theme, /reset, /help, /quit";

pub async fn run_terminal_chat(actions: Actions) -> Result<()> {
    info!("Starting terminal chat...");
    let mut controller = terminal_controller(Arc::new(TerminalNotifier));
    println!("Makama AI");
    println!("The magic begins now. What secrets do you wish to uncover?");
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            TerminalCommand::Chat(text) => match controller.submit_chat(&actions, &text).await {
                Ok(reply) => println!("Makama: {}", reply.content),
                Err(e) => eprintln!("{}", e),
            },
            TerminalCommand::Style(prompt) => {
                if let Err(e) = controller.submit_style(&actions, &prompt).await {
                    eprintln!("{}", e);
                }
            }
            TerminalCommand::Theme => {
                println!("{}", serde_json::to_string_pretty(controller.theme())?);
            }
            TerminalCommand::Reset => {
                if let Err(e) = controller.reset() {
                    eprintln!("{}", e);
                }
            }
            TerminalCommand::Help => println!("{}", HELP),
            TerminalCommand::Quit => break,
        }
    }
    info!("Terminal chat finished.");
    Ok(())
}

/// Runs the style flow once and prints the resulting theme as JSON.
pub async fn run_style_once(actions: Actions, prompt: &str) -> Result<()> {
    let mut controller = terminal_controller(Arc::new(StderrNotifier));
    match controller.submit_style(&actions, prompt).await {
        Ok(StyleOutcome::Applied(theme)) => {
            println!("{}", serde_json::to_string_pretty(&theme)?);
            Ok(())
        }
        Ok(StyleOutcome::Unchanged) => bail!("No theme was produced"),
        Err(ControllerError::Invalid(msg)) => bail!("{}", msg),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            parse_command("What is your name?"),
            TerminalCommand::Chat("What is your name?".to_string())
        );
        assert_eq!(parse_command(""), TerminalCommand::Chat(String::new()));
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            parse_command("/style  celestial starlight "),
            TerminalCommand::Style("celestial starlight".to_string())
        );
        assert_eq!(parse_command("/style"), TerminalCommand::Style(String::new()));
        assert_eq!(parse_command("/reset"), TerminalCommand::Reset);
        assert_eq!(parse_command("/theme"), TerminalCommand::Theme);
        assert_eq!(parse_command("/exit"), TerminalCommand::Quit);
    }

    #[test]
    fn test_unknown_command_is_sent_as_chat() {
        assert_eq!(
            parse_command("/shrug"),
            TerminalCommand::Chat("/shrug".to_string())
        );
    }
}
