//! Demo command - a short scripted conversation.

use anyhow::Result;
use clap::Args;

use agent_runtime::Settings;

use super::{build_agent, render_response};

const DEMO_QUESTIONS: [&str; 3] = [
    "Hello! What can you help me with?",
    "What is 25 * 4?",
    "Can you search for information about Python programming?",
];

/// Arguments for the demo command.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Ask your own questions instead of the built-in ones
    #[arg(short, long = "question")]
    pub questions: Vec<String>,
}

/// Run the demo command.
pub async fn run(args: &DemoArgs, settings: &Settings) -> Result<()> {
    let mut agent = build_agent(settings)?;

    let questions: Vec<&str> = if args.questions.is_empty() {
        DEMO_QUESTIONS.to_vec()
    } else {
        args.questions.iter().map(String::as_str).collect()
    };

    println!("🤖 Agent demo ({})", settings.model_name);
    println!("{}", "=".repeat(50));

    for (i, question) in questions.iter().enumerate() {
        println!("\n{}. 👤 User: {question}", i + 1);
        let response = agent.chat(question).await;
        println!("{}", render_response(&response));
    }

    println!("\n{}", "=".repeat(50));
    println!("✅ Demo completed ({} messages in history)", agent.history().len());
    Ok(())
}
