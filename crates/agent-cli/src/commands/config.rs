//! Config command - show the effective settings.

use anyhow::{Result, bail};
use clap::Args;

use agent_runtime::Settings;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Exit with an error when the API key is missing
    #[arg(long)]
    pub check: bool,
}

/// Run the config command.
pub fn run(args: &ConfigArgs, settings: &Settings) -> Result<()> {
    println!("{}", describe(settings));

    if settings.has_valid_api_key() {
        println!("✅ OpenRouter API key is configured");
    } else {
        println!("❌ OpenRouter API key is not configured");
        println!("   Copy .env.example to .env and set OPENROUTER_API_KEY");
        if args.check {
            bail!("OPENROUTER_API_KEY is missing");
        }
    }
    Ok(())
}

fn describe(settings: &Settings) -> String {
    [
        ("Model", settings.model_name.clone()),
        ("Base URL", settings.base_url.clone()),
        ("Max tokens", settings.max_tokens.to_string()),
        ("Temperature", settings.temperature.to_string()),
        ("Max iterations", settings.max_iterations.to_string()),
        ("Timeout (s)", settings.timeout.as_secs_f64().to_string()),
        ("History window", settings.history_window.to_string()),
        ("Parallel tools", settings.parallel_tool_calls.to_string()),
        ("Site", format!("{} <{}>", settings.site_name, settings.site_url)),
        ("Log level", settings.log_level.clone()),
    ]
    .iter()
    .map(|(label, value)| format!("{label:<16} {value}"))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_never_prints_key() {
        let settings = Settings {
            api_key: "sk-or-secret".into(),
            ..Settings::default()
        };
        let text = describe(&settings);
        assert!(text.contains("deepseek/deepseek-r1-0528:free"));
        assert!(text.contains("History window   5"));
        assert!(!text.contains("sk-or-secret"));
    }

    #[test]
    fn test_check_fails_without_key() {
        let settings = Settings::default();
        assert!(run(&ConfigArgs { check: true }, &settings).is_err());
        assert!(run(&ConfigArgs { check: false }, &settings).is_ok());
    }
}
