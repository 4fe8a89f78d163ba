use anyhow::Context;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS schedule_types (
        id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(120) NOT NULL,
        weekly_hours DOUBLE NOT NULL,
        kind VARCHAR(16) NOT NULL,
        details TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS clients (
        id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(160) NOT NULL,
        UNIQUE KEY uq_clients_name (name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(120) COLLATE utf8mb4_bin NOT NULL,
        pin_hash VARCHAR(255) NOT NULL,
        avatar_url VARCHAR(512) NULL,
        schedule_id BIGINT UNSIGNED NULL,
        role_id TINYINT UNSIGNED NOT NULL,
        vacation_days INT UNSIGNED NOT NULL,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at DATETIME(3) NOT NULL,
        KEY ix_employees_name (name),
        CONSTRAINT fk_employees_schedule FOREIGN KEY (schedule_id)
            REFERENCES schedule_types (id) ON DELETE RESTRICT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS clock_events (
        id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
        employee_id BIGINT UNSIGNED NOT NULL,
        client_id BIGINT UNSIGNED NOT NULL,
        kind VARCHAR(16) NOT NULL,
        recorded_at DATETIME(3) NOT NULL,
        KEY ix_clock_events_employee_time (employee_id, recorded_at),
        KEY ix_clock_events_time (recorded_at),
        CONSTRAINT fk_clock_events_employee FOREIGN KEY (employee_id)
            REFERENCES employees (id) ON DELETE RESTRICT,
        CONSTRAINT fk_clock_events_client FOREIGN KEY (client_id)
            REFERENCES clients (id) ON DELETE RESTRICT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance_status (
        employee_id BIGINT UNSIGNED PRIMARY KEY,
        last_event_id BIGINT UNSIGNED NULL,
        session_client_id BIGINT UNSIGNED NULL,
        session_started_at DATETIME(3) NULL,
        CONSTRAINT fk_attendance_status_employee FOREIGN KEY (employee_id)
            REFERENCES employees (id) ON DELETE RESTRICT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS requests (
        id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
        employee_id BIGINT UNSIGNED NOT NULL,
        kind VARCHAR(32) NOT NULL,
        start_date DATE NOT NULL,
        end_date DATE NOT NULL,
        comments TEXT NULL,
        status VARCHAR(16) NOT NULL,
        created_at DATETIME(3) NOT NULL,
        decided_at DATETIME(3) NULL,
        KEY ix_requests_status (status),
        CONSTRAINT fk_requests_employee FOREIGN KEY (employee_id)
            REFERENCES employees (id) ON DELETE RESTRICT
    )
    "#,
];

pub async fn init_db(database_url: &str) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .context("Failed to apply schema")?;
    }
    info!(tables = SCHEMA.len(), "Database schema ready");

    Ok(pool)
}
