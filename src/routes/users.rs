use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::Json;
use sqlx::AnyPool;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{AuthUser, Credential, Principal};
use crate::db::row_parsers;
use crate::errors::{AppError, AppResult};
use crate::events::RequestContext;
use crate::models::user::{CreateUserRequest, DbUser, User};
use crate::security::sanitize;
use crate::utils::utc_now;

/// Signup: creates the account, its first user, and the session credential
/// in one transaction. The credential travels back only in the Set-Cookie
/// header; storage keeps nothing but its hash.
///
/// This path runs under the System principal; there is no session yet.
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, [(HeaderName, String); 1], Json<User>)> {
    let name = sanitize::display_name("name", &payload.name)?;
    let email = sanitize::email_address(&payload.email)?;

    ensure_email_available(&state.pool, &email).await?;

    let account_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let credential = Credential::issue();
    let now = utc_now().to_rfc3339();

    let mut tx = state.pool.begin().await?;

    sqlx::query("INSERT INTO accounts (id, created_at, updated_at) VALUES ($1, $2, $3)")
        .bind(account_id.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO users (id, account_id, name, email, credential_hash, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(user_id.to_string())
    .bind(account_id.to_string())
    .bind(&name)
    .bind(&email)
    .bind(credential.hash().as_str())
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let db_user = fetch_user_by_id(&state.pool, user_id).await?;
    let user: User = db_user.try_into()?;

    let principal = Principal::System;
    let ctx = RequestContext::from_headers(&headers).with_endpoint("POST /users");
    crate::events::record_audit(
        &state.event_bus,
        "created",
        principal.actor_id(),
        &user,
        None,
        Some(ctx),
    );

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, credential.to_set_cookie())],
        Json(user),
    ))
}

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<User>> {
    let db_user = fetch_user_by_id(&state.pool, auth.user_id).await?;
    let user: User = db_user.try_into()?;
    Ok(Json(user))
}

async fn ensure_email_available(pool: &AnyPool, email: &str) -> AppResult<()> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1 AND deleted_at IS NULL")
            .bind(email)
            .fetch_one(pool)
            .await?;

    if count > 0 {
        return Err(AppError::EmailInUse);
    }

    Ok(())
}

pub(crate) async fn fetch_user_by_id(pool: &AnyPool, user_id: Uuid) -> AppResult<DbUser> {
    let row = sqlx::query(
        "SELECT id, account_id, name, email, credential_hash, created_at, updated_at, deleted_at \
         FROM users WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => row_parsers::db_user_from_row(&row),
        None => Err(AppError::UserNotFound),
    }
}
