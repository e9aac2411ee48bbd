use anyhow::{bail, Context};
use clap::Subcommand;
use uuid::Uuid;

use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Clear an account's lockout state")]
    Unlock {
        #[arg(help = "Username of the account to unlock")]
        username: String,
    },

    #[command(about = "Mark an account's email as verified (no mail transport)")]
    Verify {
        #[arg(help = "Username of the account to verify")]
        username: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool()
        .await
        .context("failed to connect to the database")?;

    match cmd {
        UserCommands::Unlock { username } => {
            let user_id = find_user(&pool, &username).await?;
            sqlx::query(
                r#"
                UPDATE users
                SET failed_login_count = 0, locked_until = NULL, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .execute(&pool)
            .await?;

            report(&output_format, &username, user_id, "unlocked");
            Ok(())
        }
        UserCommands::Verify { username } => {
            let user_id = find_user(&pool, &username).await?;
            sqlx::query("UPDATE users SET is_verified = true, updated_at = now() WHERE id = $1")
                .bind(user_id)
                .execute(&pool)
                .await?;

            report(&output_format, &username, user_id, "verified");
            Ok(())
        }
    }
}

async fn find_user(pool: &sqlx::PgPool, username: &str) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE lower(username) = lower($1)")
            .bind(username)
            .fetch_optional(pool)
            .await?;

    match row {
        Some((id,)) => Ok(id),
        None => bail!("no user named '{}'", username),
    }
}

fn report(output_format: &OutputFormat, username: &str, user_id: Uuid, action: &str) {
    match output_format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "id": user_id, "username": username, "action": action })
        ),
        OutputFormat::Text => println!("User '{}' {}", username, action),
    }
}
