use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::any::AnyRow;
use sqlx::Row;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{group::DbGroup, person::DbPerson, user::DbUser};

// Ids and timestamps are stored as TEXT so the same schema and queries run
// on both backends; these parsers lift AnyRow columns into typed structs.

pub fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s).map_err(|e| AppError::internal(format!("invalid uuid: {}", e)))
}

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    // RFC3339 first (e.g. 2025-11-19T12:34:56Z)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQL timestamp format: "YYYY-MM-DD HH:MM:SS" (optional fractional seconds)
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    // Date-only: "YYYY-MM-DD"
    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            AppError::internal("invalid datetime: date out of range".to_string())
        })?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

pub fn parse_opt_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    match s {
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(parse_datetime(trimmed)?))
            }
        }
        None => Ok(None),
    }
}

fn get_text(row: &AnyRow, column: &str) -> Result<String, AppError> {
    row.try_get(column)
        .map_err(|e| AppError::internal(format!("missing {}: {}", column, e)))
}

fn get_opt_text(row: &AnyRow, column: &str) -> Result<Option<String>, AppError> {
    row.try_get(column)
        .map_err(|e| AppError::internal(format!("missing {}: {}", column, e)))
}

pub fn db_user_from_row(row: &AnyRow) -> Result<DbUser, AppError> {
    Ok(DbUser {
        id: parse_uuid(&get_text(row, "id")?)?,
        account_id: parse_uuid(&get_text(row, "account_id")?)?,
        name: get_text(row, "name")?,
        email: get_text(row, "email")?,
        credential_hash: get_text(row, "credential_hash")?,
        created_at: parse_datetime(&get_text(row, "created_at")?)?,
        updated_at: parse_datetime(&get_text(row, "updated_at")?)?,
        deleted_at: parse_opt_datetime(get_opt_text(row, "deleted_at")?)?,
    })
}

pub fn db_group_from_row(row: &AnyRow) -> Result<DbGroup, AppError> {
    Ok(DbGroup {
        id: parse_uuid(&get_text(row, "id")?)?,
        owner_id: parse_uuid(&get_text(row, "owner_id")?)?,
        name: get_text(row, "name")?,
        created_at: parse_datetime(&get_text(row, "created_at")?)?,
        updated_at: parse_datetime(&get_text(row, "updated_at")?)?,
        deleted_at: parse_opt_datetime(get_opt_text(row, "deleted_at")?)?,
    })
}

pub fn db_person_from_row(row: &AnyRow) -> Result<DbPerson, AppError> {
    Ok(DbPerson {
        id: parse_uuid(&get_text(row, "id")?)?,
        group_id: parse_uuid(&get_text(row, "group_id")?)?,
        first_name: get_text(row, "first_name")?,
        last_name: get_text(row, "last_name")?,
        created_at: parse_datetime(&get_text(row, "created_at")?)?,
        updated_at: parse_datetime(&get_text(row, "updated_at")?)?,
        deleted_at: parse_opt_datetime(get_opt_text(row, "deleted_at")?)?,
    })
}
