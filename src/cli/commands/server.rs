use anyhow::Context;
use clap::Subcommand;

use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check server health status from the /health endpoint")]
    Health {
        #[arg(long, default_value = "http://localhost:3000")]
        url: String,
    },
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Health { url } => {
            let endpoint = format!("{}/health", url.trim_end_matches('/'));
            let response = reqwest::get(&endpoint)
                .await
                .with_context(|| format!("failed to reach {}", endpoint))?;

            let status = response.status();
            let body: serde_json::Value = response
                .json()
                .await
                .context("health endpoint returned non-JSON body")?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&body)?),
                OutputFormat::Text => {
                    let health = body["data"]["status"].as_str().unwrap_or("unknown");
                    println!("{} -> {} ({})", endpoint, health, status);
                }
            }

            if !status.is_success() {
                anyhow::bail!("server reports degraded health");
            }
            Ok(())
        }
    }
}
