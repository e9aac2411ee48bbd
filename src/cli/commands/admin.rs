use anyhow::{bail, Context};
use clap::Subcommand;
use uuid::Uuid;

use crate::auth::password;
use crate::cli::OutputFormat;
use crate::database::models::role::is_known_role;
use crate::database::DatabaseManager;
use crate::services::auth_service::{validate_email, validate_username};

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Create a verified account directly in the database")]
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "admin")]
        role: String,
    },
}

pub async fn handle(cmd: AdminCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AdminCommands::Create { username, email, password: raw_password, role } => {
            if let Err(msg) = validate_username(&username) {
                bail!("invalid username: {}", msg);
            }
            if let Err(msg) = validate_email(&email) {
                bail!("invalid email: {}", msg);
            }
            if let Err(msg) = password::check_policy(&raw_password) {
                bail!("invalid password: {}", msg);
            }
            if !is_known_role(&role) {
                bail!("unknown role: {} (expected employee, manager, or admin)", role);
            }

            let pool = DatabaseManager::pool()
                .await
                .context("failed to connect to the database")?;

            let password_hash = password::hash_password(&raw_password)
                .await
                .context("failed to hash password")?;

            // Bootstrap accounts skip the verification flow entirely
            let created: (Uuid,) = sqlx::query_as(
                r#"
                INSERT INTO users (username, email, password_hash, role_id, is_verified)
                VALUES ($1, $2, $3, (SELECT id FROM roles WHERE name = $4), true)
                RETURNING id
                "#,
            )
            .bind(&username)
            .bind(&email)
            .bind(&password_hash)
            .bind(&role)
            .fetch_one(&pool)
            .await
            .context("failed to create account (duplicate username/email?)")?;

            match output_format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "id": created.0, "username": username, "role": role })
                ),
                OutputFormat::Text => {
                    println!("Created {} account '{}' ({})", role, username, created.0);
                }
            }
            Ok(())
        }
    }
}
