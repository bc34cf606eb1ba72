//! Chat command - interactive mode.

use anyhow::Result;
use clap::Args;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use agent_core::Agent;
use agent_runtime::Settings;

use super::{build_agent, render_response, truncate};

const HISTORY_PREVIEW_CHARS: usize = 100;

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Skip the welcome banner
    #[arg(short, long)]
    pub quiet: bool,
}

/// A line typed at the prompt
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    Reset,
    History,
    Empty,
    Message(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => Self::Empty,
            "quit" | "exit" | "bye" => Self::Quit,
            "reset" => Self::Reset,
            "history" => Self::History,
            _ => Self::Message(line),
        }
    }
}

/// Run the chat command.
pub async fn run(args: &ChatArgs, settings: &Settings) -> Result<()> {
    let mut agent = build_agent(settings)?;

    if !args.quiet {
        println!("🤖 Interactive chat ({})", settings.model_name);
        println!("Type 'quit', 'exit' or 'bye' to leave, 'reset' to clear history,");
        println!("'history' to show the conversation.");
        println!("{}", "-".repeat(50));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all("\n👤 You: ".as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Input::parse(&line) {
            Input::Quit => {
                println!("👋 Goodbye!");
                break;
            }
            Input::Reset => {
                agent.reset();
                println!("🔄 Conversation history reset.");
            }
            Input::History => print_history(&agent),
            Input::Empty => {}
            Input::Message(text) => {
                let response = agent.chat(text).await;
                println!("{}", render_response(&response));
            }
        }
    }
    Ok(())
}

fn print_history(agent: &Agent) {
    let history = agent.history();
    if history.is_empty() {
        println!("📝 No conversation history yet.");
        return;
    }

    println!("📝 Conversation history:");
    for (i, message) in history.iter().enumerate() {
        println!(
            "  {}. {}: {}",
            i + 1,
            message.role,
            truncate(&message.content, HISTORY_PREVIEW_CHARS)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_parse() {
        assert_eq!(Input::parse("quit"), Input::Quit);
        assert_eq!(Input::parse("  EXIT "), Input::Quit);
        assert_eq!(Input::parse("bye"), Input::Quit);
        assert_eq!(Input::parse("reset"), Input::Reset);
        assert_eq!(Input::parse("History"), Input::History);
        assert_eq!(Input::parse("   "), Input::Empty);
        assert_eq!(Input::parse(" What is 2 + 2? "), Input::Message("What is 2 + 2?"));
    }
}
