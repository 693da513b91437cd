use std::{fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    models::{AppointmentRow, CustomerRow, STATUS_CONFIRMED},
};

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> Result<String, sqlx::Error> {
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO users (id, email, password_hash, active, created_at)
           VALUES (?, ?, ?, 1, ?)"#,
    )
    .bind(&id)
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(id)
}

/// A missing row is a normal outcome here, not an error: it routes the
/// signed-in user to the profile form.
pub async fn find_customer_by_subject(
    pool: &SqlitePool,
    auth_user_id: &str,
) -> Result<Option<CustomerRow>, sqlx::Error> {
    sqlx::query_as::<_, CustomerRow>(
        r#"SELECT id, auth_user_id, email, first_name, last_name, phone, referral_source,
                  created_at, updated_at
           FROM customers
           WHERE auth_user_id = ?
           LIMIT 1"#,
    )
    .bind(auth_user_id)
    .fetch_optional(pool)
    .await
}

pub struct CustomerInput<'a> {
    pub auth_user_id: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: Option<&'a str>,
    pub referral_source: Option<&'a str>,
}

/// Creates or updates the profile keyed by the auth subject id and returns
/// the stored row. At most one customer row exists per subject.
pub async fn upsert_customer(
    pool: &SqlitePool,
    input: CustomerInput<'_>,
) -> Result<CustomerRow, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO customers
           (id, auth_user_id, email, first_name, last_name, phone, referral_source, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(auth_user_id) DO UPDATE SET
             email = excluded.email,
             first_name = excluded.first_name,
             last_name = excluded.last_name,
             phone = excluded.phone,
             referral_source = excluded.referral_source,
             updated_at = excluded.updated_at"#,
    )
    .bind(new_id())
    .bind(input.auth_user_id)
    .bind(input.email)
    .bind(input.first_name)
    .bind(input.last_name)
    .bind(input.phone)
    .bind(input.referral_source)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    find_customer_by_subject(pool, input.auth_user_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub struct NewAppointment<'a> {
    pub customer_id: &'a str,
    pub service_name: &'a str,
    pub provider_name: &'a str,
    pub appointment_date: String,
    pub appointment_time: &'a str,
    pub duration_minutes: i64,
    pub price: i64,
    pub special_preferences: Option<&'a str>,
}

pub async fn insert_appointment(
    pool: &SqlitePool,
    new: NewAppointment<'_>,
) -> Result<AppointmentRow, sqlx::Error> {
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO appointments
           (id, customer_id, service_name, provider_name, appointment_date, appointment_time,
            duration_minutes, price, special_preferences, status, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(new.customer_id)
    .bind(new.service_name)
    .bind(new.provider_name)
    .bind(&new.appointment_date)
    .bind(new.appointment_time)
    .bind(new.duration_minutes)
    .bind(new.price)
    .bind(new.special_preferences)
    .bind(STATUS_CONFIRMED)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    fetch_appointment(pool, &id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn fetch_appointment(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<AppointmentRow>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, customer_id, service_name, provider_name, appointment_date,
                  appointment_time, duration_minutes, price, special_preferences,
                  status, created_at
           FROM appointments
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn appointments_for_customer(
    pool: &SqlitePool,
    customer_id: &str,
) -> Result<Vec<AppointmentRow>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, customer_id, service_name, provider_name, appointment_date,
                  appointment_time, duration_minutes, price, special_preferences,
                  status, created_at
           FROM appointments
           WHERE customer_id = ?
           ORDER BY appointment_date DESC, created_at DESC"#,
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    pub async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        super::run_migrations(&pool).await.expect("migrations");
        pool
    }
}
