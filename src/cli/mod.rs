pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "social")]
#[command(about = "Social CLI - operate the Social API server and its database")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API server")]
    Serve,

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "User account management")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Access token helpers")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Check a running server's /health endpoint")]
    Ping {
        #[arg(long, help = "Server base URL (defaults to the configured bind address)")]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    /// Render a command result. JSON merges `details` next to the message;
    /// text prints the message alone.
    pub fn render_success(&self, message: &str, details: Map<String, Value>) -> String {
        match self {
            OutputFormat::Json => {
                let mut body = Map::new();
                body.insert("success".into(), json!(true));
                body.insert("message".into(), json!(message));
                body.extend(details);
                Value::Object(body).to_string()
            }
            OutputFormat::Text => format!("✓ {}", message),
        }
    }

    pub fn render_error(&self, message: &str) -> String {
        match self {
            OutputFormat::Json => json!({ "success": false, "error": message }).to_string(),
            OutputFormat::Text => format!("Error: {}", message),
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::config();

    match cli.command {
        Commands::Serve => crate::serve(config).await,
        Commands::Migrate => commands::migrate::handle(config, output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, config, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, config, output_format).await,
        Commands::Ping { url } => commands::ping::handle(url, config, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_success_merges_details() {
        let mut details = Map::new();
        details.insert("user_id".into(), json!(7));
        let out: Value = serde_json::from_str(&OutputFormat::Json.render_success("Token issued", details)).unwrap();
        assert_eq!(out, json!({"success": true, "message": "Token issued", "user_id": 7}));
    }

    #[test]
    fn text_output_is_one_line() {
        assert_eq!(OutputFormat::Text.render_success("done", Map::new()), "✓ done");
        assert_eq!(OutputFormat::Text.render_error("boom"), "Error: boom");
        let err: Value = serde_json::from_str(&OutputFormat::Json.render_error("boom")).unwrap();
        assert_eq!(err["success"], false);
    }
}
