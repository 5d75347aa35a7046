// src/db.rs
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations").run(pool).await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    const INITIAL_SCHEMA: &str = include_str!("../migrations/20240601000000_initial.sql");

    fn column_type(table: &str, column: &str) -> String {
        let body = INITIAL_SCHEMA
            .split(&format!("CREATE TABLE {} (", table))
            .nth(1)
            .and_then(|rest| rest.split(");").next())
            .unwrap_or_else(|| panic!("table {} not found", table));
        body.lines()
            .map(str::trim)
            .find(|line| line.starts_with(&format!("{} ", column)))
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or_else(|| panic!("column {}.{} not found", table, column))
            .to_string()
    }

    // Titles and audiences come from LLM output and users; any length must fit.
    #[test]
    fn free_text_columns_are_unbounded() {
        assert_eq!(column_type("video_scripts", "title"), "TEXT");
        assert_eq!(column_type("video_scripts", "target_audience"), "TEXT");
        assert_eq!(column_type("voice_audios", "voice_id"), "TEXT");
        assert!(!INITIAL_SCHEMA.contains("VARCHAR"));
    }
}
