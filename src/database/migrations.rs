//! Embedded schema migrations.
//!
//! The full DDL for the application lives here, applied in order and recorded
//! in `schema_migrations`. The runner is idempotent: already-applied versions
//! are skipped, and each migration runs inside its own transaction.

use sqlx::{PgPool, Row};
use tracing::info;

use super::manager::DatabaseError;

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_roles_and_permissions",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS roles (
                id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
                name text UNIQUE NOT NULL,
                description text NOT NULL DEFAULT '',
                created_at timestamptz NOT NULL DEFAULT now()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS permissions (
                id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
                name text UNIQUE NOT NULL,
                description text NOT NULL DEFAULT ''
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS role_permissions (
                role_id uuid NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
                permission_id uuid NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
                PRIMARY KEY (role_id, permission_id)
            )
            "#,
            r#"
            INSERT INTO roles (name, description) VALUES
                ('employee', 'Regular employee: own profile and training needs'),
                ('manager', 'Manager: decides training needs and manages courses'),
                ('admin', 'Administrator: full access including user management')
            ON CONFLICT (name) DO NOTHING
            "#,
            r#"
            INSERT INTO permissions (name, description) VALUES
                ('profile:read', 'Read own profile and dashboard'),
                ('profile:edit', 'Edit own profile'),
                ('training:read', 'Read own training needs and the course catalog'),
                ('training:manage', 'Review and decide training needs for all users'),
                ('courses:manage', 'Create and maintain courses'),
                ('users:manage', 'Administer user accounts and roles')
            ON CONFLICT (name) DO NOTHING
            "#,
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT r.id, p.id FROM roles r CROSS JOIN permissions p
            WHERE r.name = 'employee'
              AND p.name IN ('profile:read', 'profile:edit', 'training:read')
            ON CONFLICT DO NOTHING
            "#,
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT r.id, p.id FROM roles r CROSS JOIN permissions p
            WHERE r.name = 'manager'
              AND p.name IN ('profile:read', 'profile:edit', 'training:read',
                             'training:manage', 'courses:manage')
            ON CONFLICT DO NOTHING
            "#,
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT r.id, p.id FROM roles r CROSS JOIN permissions p
            WHERE r.name = 'admin'
            ON CONFLICT DO NOTHING
            "#,
        ],
    },
    Migration {
        version: 2,
        name: "create_users",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
                username text UNIQUE NOT NULL,
                email text UNIQUE NOT NULL,
                password_hash text NOT NULL,
                role_id uuid NOT NULL REFERENCES roles(id),
                is_active boolean NOT NULL DEFAULT true,
                is_verified boolean NOT NULL DEFAULT false,
                failed_login_count integer NOT NULL DEFAULT 0,
                locked_until timestamptz,
                last_login_at timestamptz,
                deactivated_at timestamptz,
                created_at timestamptz NOT NULL DEFAULT now(),
                updated_at timestamptz NOT NULL DEFAULT now()
            )
            "#,
            // Logins match case-insensitively; the expression indexes make that
            // both fast and unique.
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS users_username_lower_idx
                ON users (lower(username))
            "#,
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_idx
                ON users (lower(email))
            "#,
        ],
    },
    Migration {
        version: 3,
        name: "create_refresh_tokens",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS refresh_tokens (
                id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
                user_id uuid NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                token_hash text UNIQUE NOT NULL,
                expires_at timestamptz NOT NULL,
                revoked_at timestamptz,
                created_at timestamptz NOT NULL DEFAULT now()
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS refresh_tokens_user_id_idx
                ON refresh_tokens (user_id)
            "#,
        ],
    },
    Migration {
        version: 4,
        name: "create_email_verification_tokens",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS email_verification_tokens (
                id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
                user_id uuid NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                token_hash text UNIQUE NOT NULL,
                expires_at timestamptz NOT NULL,
                used_at timestamptz,
                created_at timestamptz NOT NULL DEFAULT now()
            )
            "#,
        ],
    },
    Migration {
        version: 5,
        name: "create_courses",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS courses (
                id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
                code text UNIQUE NOT NULL,
                title text NOT NULL,
                description text NOT NULL DEFAULT '',
                delivery text NOT NULL DEFAULT 'self_paced',
                duration_hours integer NOT NULL DEFAULT 0,
                is_active boolean NOT NULL DEFAULT true,
                created_at timestamptz NOT NULL DEFAULT now(),
                updated_at timestamptz NOT NULL DEFAULT now()
            )
            "#,
        ],
    },
    Migration {
        version: 6,
        name: "create_training_needs",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS training_needs (
                id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
                user_id uuid NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                course_id uuid REFERENCES courses(id),
                title text NOT NULL,
                description text NOT NULL DEFAULT '',
                priority text NOT NULL DEFAULT 'medium',
                status text NOT NULL DEFAULT 'pending',
                decided_by uuid REFERENCES users(id),
                decided_at timestamptz,
                created_at timestamptz NOT NULL DEFAULT now(),
                updated_at timestamptz NOT NULL DEFAULT now()
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS training_needs_user_id_idx
                ON training_needs (user_id)
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS training_needs_status_idx
                ON training_needs (status)
            "#,
        ],
    },
];

#[derive(Debug, Clone, serde::Serialize)]
pub struct MigrationStatus {
    pub version: i64,
    pub name: String,
    pub applied: bool,
}

async fn ensure_migrations_table(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version bigint PRIMARY KEY,
            name text NOT NULL,
            applied_at timestamptz NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn applied_versions(pool: &PgPool) -> Result<Vec<i64>, DatabaseError> {
    let rows = sqlx::query("SELECT version FROM schema_migrations ORDER BY version")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|r| r.get::<i64, _>("version")).collect())
}

/// Apply all pending migrations, returning the versions applied in this run
pub async fn run(pool: &PgPool) -> Result<Vec<i64>, DatabaseError> {
    ensure_migrations_table(pool).await?;
    let applied = applied_versions(pool).await?;

    let mut newly_applied = Vec::new();
    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|e| {
                DatabaseError::MigrationError(format!(
                    "migration {} ({}) failed: {}",
                    migration.version, migration.name, e
                ))
            })?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, name) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Applied migration {} ({})", migration.version, migration.name);
        newly_applied.push(migration.version);
    }

    Ok(newly_applied)
}

/// Report applied vs. pending migrations without changing anything
pub async fn status(pool: &PgPool) -> Result<Vec<MigrationStatus>, DatabaseError> {
    ensure_migrations_table(pool).await?;
    let applied = applied_versions(pool).await?;

    Ok(MIGRATIONS
        .iter()
        .map(|m| MigrationStatus {
            version: m.version,
            name: m.name.to_string(),
            applied: applied.contains(&m.version),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_strictly_increasing() {
        for pair in MIGRATIONS.windows(2) {
            assert!(
                pair[0].version < pair[1].version,
                "migration {} must come before {}",
                pair[0].version,
                pair[1].version
            );
        }
    }

    #[test]
    fn names_are_unique_and_nonempty() {
        let mut names: Vec<&str> = MIGRATIONS.iter().map(|m| m.name).collect();
        assert!(names.iter().all(|n| !n.is_empty()));
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MIGRATIONS.len());
    }

    #[test]
    fn every_migration_has_statements() {
        for migration in MIGRATIONS {
            assert!(!migration.statements.is_empty(), "{} is empty", migration.name);
        }
    }
}
