use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub async fn connect_pg(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .with_context(|| "failed to connect to database; check DATABASE_URL")?;
    Ok(pool)
}

// Doctor deletion cascades to schedules and appointments through the foreign keys.
// The partial unique index makes "one live booking per doctor slot" hold under
// concurrent inserts.
const SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
          id            BIGSERIAL PRIMARY KEY,
          name          VARCHAR(100) NOT NULL,
          email         VARCHAR(100) NOT NULL UNIQUE,
          password_hash VARCHAR(255) NOT NULL,
          role          VARCHAR(16)  NOT NULL DEFAULT 'PATIENT'
                        CHECK (role IN ('ADMIN', 'PATIENT'))
        )
        "#,
    ),
    (
        "doctors",
        r#"
        CREATE TABLE IF NOT EXISTS doctors (
          id               BIGSERIAL PRIMARY KEY,
          name             VARCHAR(100) NOT NULL,
          email            VARCHAR(100) NOT NULL UNIQUE,
          specialty        VARCHAR(100) NOT NULL,
          bio              TEXT,
          duration_minutes INTEGER NOT NULL DEFAULT 60
        )
        "#,
    ),
    (
        "doctor_schedules",
        r#"
        CREATE TABLE IF NOT EXISTS doctor_schedules (
          id         BIGSERIAL PRIMARY KEY,
          doctor_id  BIGINT NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
          day        VARCHAR(16) NOT NULL
                     CHECK (day IN ('SUNDAY','MONDAY','TUESDAY','WEDNESDAY','THURSDAY','FRIDAY','SATURDAY')),
          start_time TIME NOT NULL,
          end_time   TIME NOT NULL,
          CHECK (end_time > start_time),
          UNIQUE (doctor_id, day)
        )
        "#,
    ),
    (
        "appointments",
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
          id         BIGSERIAL PRIMARY KEY,
          doctor_id  BIGINT NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
          patient_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
          date       DATE NOT NULL,
          time       TIME NOT NULL,
          status     VARCHAR(20) NOT NULL DEFAULT 'PENDING'
        )
        "#,
    ),
    (
        "appointments_active_slot",
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS appointments_active_slot
          ON appointments (doctor_id, date, time)
          WHERE status <> 'CANCELLED'
        "#,
    ),
    (
        "appointments_patient_idx",
        r#"
        CREATE INDEX IF NOT EXISTS appointments_patient_idx
          ON appointments (patient_id)
        "#,
    ),
];

/// Creates missing tables. Failures are logged and startup continues.
pub async fn ensure_schema(pool: &PgPool) {
    for &(name, ddl) in SCHEMA {
        match sqlx::query(ddl).execute(pool).await {
            Ok(_) => tracing::debug!(object = name, "schema object ready"),
            Err(e) => tracing::error!(object = name, error = %e, "failed to create schema object"),
        }
    }
}
