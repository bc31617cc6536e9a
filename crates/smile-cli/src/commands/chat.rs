//! Interactive chat loop

use super::IncrementalPrinter;
use crate::console::CliConsole;
use crate::signal_handler::SignalHandler;
use colored::*;
use smile_core::chat::ChatSession;
use smile_core::config::Config;
use smile_core::error::{SmileError, SmileResult};
use smile_core::llm::StreamOutcome;
use smile_core::storage::{Conversation, StoredRole};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Slash commands understood at the prompt
#[derive(Debug, PartialEq, Eq)]
enum SlashCommand<'a> {
    Exit,
    Help,
    New,
    Think,
    History,
    Regenerate,
    Unknown(&'a str),
}

impl<'a> SlashCommand<'a> {
    fn parse(input: &'a str) -> Option<Self> {
        let command = input.strip_prefix('/')?.split_whitespace().next().unwrap_or_default();
        Some(match command {
            "exit" | "quit" | "q" => Self::Exit,
            "help" | "?" => Self::Help,
            "new" | "clear" => Self::New,
            "think" => Self::Think,
            "history" => Self::History,
            "regenerate" | "retry" => Self::Regenerate,
            other => Self::Unknown(other),
        })
    }
}

/// What a streamed turn does
pub(crate) enum Turn<'a> {
    Submit(&'a str),
    Regenerate(&'a str),
}

/// Stream one answer to stdout. Ctrl+C cancels it.
pub(crate) async fn stream_answer(
    session: &ChatSession,
    signals: &SignalHandler,
    console: &CliConsole,
    turn: Turn<'_>,
) -> SmileResult<StreamOutcome> {
    let spinner = console.spinner("Thinking...");
    let token = signals.begin_turn();
    let mut printer = IncrementalPrinter::default();
    let progress = spinner.clone();
    let mut on_update = |text: &str| {
        if !progress.is_finished() {
            progress.finish_and_clear();
        }
        printer.update(text);
    };

    let result = match turn {
        Turn::Submit(text) => session.submit_user_message(text, &token, &mut on_update).await,
        Turn::Regenerate(id) => session.regenerate(id, &token, &mut on_update).await,
    };
    signals.end_turn();
    spinner.finish_and_clear();
    if printer.has_output() {
        println!();
    }
    result
}

fn report(console: &CliConsole, result: SmileResult<StreamOutcome>) {
    match result {
        Ok(StreamOutcome::Completed { .. }) => println!(),
        Ok(StreamOutcome::Cancelled { .. }) => {
            console.warn("Answer cancelled; nothing was saved");
        }
        Err(error) => console.error_friendly(&error),
    }
}

pub(crate) fn print_conversation(conversation: &Conversation) {
    for message in &conversation.messages {
        let label = match message.role {
            StoredRole::User => "you".cyan().bold(),
            StoredRole::Assistant => "smile".green().bold(),
            StoredRole::System => "system".dimmed(),
        };
        println!("{} {}", label, message.content);
        println!();
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  /new         start a new conversation");
    println!("  /regenerate  answer the last question again");
    println!("  /history     print this conversation");
    println!("  /think       toggle think mode");
    println!("  /exit        quit");
}

pub async fn run(config: &Config, resume: Option<&str>) -> SmileResult<()> {
    let console = CliConsole::new(true);
    let orchestrator = super::orchestrator(config)?;
    let store = super::file_store(config);
    let prompt = super::prompt_settings(config);

    let mut session =
        ChatSession::open(orchestrator.clone(), store.clone(), prompt.clone(), resume).await?;
    let mut signals = SignalHandler::new();
    signals.start()?;

    console.print_header(&format!("Smile chat ({})", config.model));
    if resume.is_some() {
        print_conversation(&session.snapshot().conversation);
    }
    println!(
        "{}",
        "Type /help for commands. Ctrl+C cancels an answer, or quits at the prompt.".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".cyan().bold());
        let _ = std::io::stdout().flush();

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| SmileError::io(format!("Failed to read input: {}", e)))?
        else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match SlashCommand::parse(input) {
            Some(SlashCommand::Exit) => break,
            Some(SlashCommand::Help) => print_help(),
            Some(SlashCommand::New) => {
                session = ChatSession::new(orchestrator.clone(), store.clone(), prompt.clone());
                console.success("Started a new conversation");
            }
            Some(SlashCommand::Think) => {
                let enabled = session.toggle_think_mode();
                console.success(&format!("Think mode {}", if enabled { "on" } else { "off" }));
            }
            Some(SlashCommand::History) => print_conversation(&session.snapshot().conversation),
            Some(SlashCommand::Regenerate) => {
                let last_answer = session
                    .snapshot()
                    .conversation
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.role == StoredRole::Assistant)
                    .map(|m| m.id.clone());
                match last_answer {
                    Some(id) => {
                        let result =
                            stream_answer(&session, &signals, &console, Turn::Regenerate(&id)).await;
                        report(&console, result);
                    }
                    None => console.warn("Nothing to regenerate yet"),
                }
            }
            Some(SlashCommand::Unknown(other)) => {
                console.warn(&format!("Unknown command '/{}'. Try /help", other));
            }
            None => {
                let result = stream_answer(&session, &signals, &console, Turn::Submit(input)).await;
                report(&console, result);
            }
        }
    }

    signals.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slash_commands() {
        assert_eq!(SlashCommand::parse("/quit"), Some(SlashCommand::Exit));
        assert_eq!(SlashCommand::parse("/retry now"), Some(SlashCommand::Regenerate));
        assert_eq!(SlashCommand::parse("/nope"), Some(SlashCommand::Unknown("nope")));
        assert_eq!(SlashCommand::parse("hello /new"), None);
    }
}
