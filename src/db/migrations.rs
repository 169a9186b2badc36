//! Cache database bootstrap: file creation, pragmas and schema.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info};

const SCHEMA: &str = include_str!("schema.sql");

/// Open (creating if needed) the cache database and apply the schema.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    match Path::new(db_path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)?,
        _ => {}
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { apply_pragmas(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    apply_schema(&pool).await?;

    info!("Cache database ready at {}", db_path);
    Ok(pool)
}

/// Execute every statement of the schema. All statements are `IF NOT EXISTS`.
async fn apply_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements: Vec<&str> = SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    info!("Applying cache schema ({} statements)", statements.len());

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

async fn apply_pragmas(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    // journal_mode answers with the mode actually in effect.
    let journal_mode: String = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?
        .get(0);

    for pragma in ["PRAGMA busy_timeout = 5000", "PRAGMA synchronous = NORMAL"] {
        sqlx::query(pragma).execute(&mut *conn).await?;
    }

    debug!(journal_mode = %journal_mode, "SQLite connection configured");
    Ok(())
}
