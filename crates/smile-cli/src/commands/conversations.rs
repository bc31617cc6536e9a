//! Saved conversation commands

use super::chat::print_conversation;
use crate::console::CliConsole;
use chrono::{Local, TimeZone};
use colored::*;
use smile_core::config::Config;
use smile_core::error::{SmileError, SmileResult};

fn format_timestamp(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub async fn list(config: &Config) -> SmileResult<()> {
    let console = CliConsole::new(true);
    let conversations = super::file_store(config).get().await?;
    if conversations.is_empty() {
        console.info("No saved conversations");
        return Ok(());
    }

    console.print_header("Conversations");
    for conversation in &conversations {
        let title = if conversation.title.is_empty() {
            "(untitled)"
        } else {
            conversation.title.as_str()
        };
        println!(
            "{}  {}  {} {}",
            format_timestamp(conversation.timestamp).dimmed(),
            conversation.id.cyan(),
            title.bold(),
            format!("({} messages)", conversation.messages.len()).dimmed()
        );
    }
    Ok(())
}

pub async fn show(config: &Config, id: &str) -> SmileResult<()> {
    let conversation = super::file_store(config).get_by_id(id).await?.ok_or_else(|| {
        SmileError::not_found_resource(format!("Conversation {} does not exist", id), "conversation")
    })?;

    let console = CliConsole::new(true);
    console.print_header(if conversation.title.is_empty() {
        "(untitled)"
    } else {
        &conversation.title
    });
    print_conversation(&conversation);
    Ok(())
}

pub async fn delete(config: &Config, id: &str) -> SmileResult<()> {
    super::file_store(config).delete(id).await?;
    CliConsole::new(true).success(&format!("Deleted conversation {}", id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_timestamp_is_a_dash() {
        assert_eq!(format_timestamp(i64::MAX), "-");
    }
}
