//! Database schema management for `airquality-service`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates `city_observations` (one row per city per fetch),
/// `pollutant_readings` (one row per pollutant per fetch) and the
/// `city_summary` aggregation table. Safe to call on every startup; no-op if
/// objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // City-level snapshot rows written by `/cities`
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS city_observations (
            id               SERIAL PRIMARY KEY,
            fetch_id         UUID        NOT NULL,
            fetched_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
            city             TEXT        NOT NULL,
            query_city       TEXT        NOT NULL,
            country          TEXT        NOT NULL,
            aqi              INTEGER,
            aqi_category     TEXT        NOT NULL,
            latitude         DOUBLE PRECISION,
            longitude        DOUBLE PRECISION,
            observed_at      TIMESTAMP,
            url              TEXT
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pollutant_readings (
            id               SERIAL PRIMARY KEY,
            fetch_id         UUID             NOT NULL,
            city             TEXT             NOT NULL,
            query_city       TEXT             NOT NULL,
            parameter        TEXT             NOT NULL,
            value            DOUBLE PRECISION,
            unit             TEXT             NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Summary table for per-city aggregations
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS city_summary (
            city              TEXT PRIMARY KEY,
            country           TEXT             NOT NULL,
            avg_aqi           DOUBLE PRECISION NOT NULL,
            min_aqi           INTEGER          NOT NULL,
            max_aqi           INTEGER          NOT NULL,
            observation_count BIGINT           NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Basic indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_city_observations_city
            ON city_observations (city);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_pollutant_readings_fetch_id
            ON pollutant_readings (fetch_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
