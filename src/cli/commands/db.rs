use anyhow::Context;
use clap::Subcommand;

use crate::cli::OutputFormat;
use crate::database::{migrations, DatabaseManager};

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Apply pending migrations")]
    Migrate,

    #[command(about = "List applied and pending migrations")]
    Status,
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool()
        .await
        .context("failed to connect to the database")?;

    match cmd {
        DbCommands::Migrate => {
            let applied = migrations::run(&pool).await.context("migration failed")?;
            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "applied": applied }));
                }
                OutputFormat::Text => {
                    if applied.is_empty() {
                        println!("Schema is up to date");
                    } else {
                        for version in applied {
                            println!("Applied migration {}", version);
                        }
                    }
                }
            }
            Ok(())
        }
        DbCommands::Status => {
            let statuses = migrations::status(&pool).await?;
            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&statuses)?);
                }
                OutputFormat::Text => {
                    for status in statuses {
                        let mark = if status.applied { "applied" } else { "pending" };
                        println!("{:>4}  {:<40} {}", status.version, status.name, mark);
                    }
                }
            }
            Ok(())
        }
    }
}
