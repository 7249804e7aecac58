use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::AnyPool;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{authorize_ownership, AuthUser};
use crate::db::row_parsers;
use crate::errors::{AppError, AppResult};
use crate::events::RequestContext;
use crate::models::group::{CreateGroupRequest, DbGroup, Group, RenameGroupRequest};
use crate::security::sanitize;
use crate::utils::utc_now;

pub async fn list_groups(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Group>>> {
    let rows = sqlx::query(
        "SELECT id, owner_id, name, created_at, updated_at, deleted_at \
         FROM contact_groups WHERE owner_id = $1 AND deleted_at IS NULL ORDER BY created_at DESC",
    )
    .bind(auth.account_id.to_string())
    .fetch_all(&state.pool)
    .await?;

    let groups: Vec<Group> = rows
        .iter()
        .map(|row| row_parsers::db_group_from_row(row)?.try_into())
        .collect::<Result<_, _>>()?;

    Ok(Json(groups))
}

pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<CreateGroupRequest>,
) -> AppResult<(StatusCode, Json<Group>)> {
    let name = sanitize::display_name("name", &payload.name)?;

    let group_id = Uuid::new_v4();
    let now = utc_now().to_rfc3339();

    sqlx::query(
        "INSERT INTO contact_groups (id, owner_id, name, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(group_id.to_string())
    .bind(auth.account_id.to_string())
    .bind(&name)
    .bind(&now)
    .bind(&now)
    .execute(&state.pool)
    .await?;

    let group: Group = load_group(&state.pool, group_id).await?.try_into()?;

    let ctx = RequestContext::from_headers(&headers).with_endpoint("POST /groups");
    crate::events::record_audit(
        &state.event_bus,
        "created",
        Some(auth.user_id),
        &group,
        None,
        Some(ctx),
    );

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<Group>> {
    let group = load_group(&state.pool, group_id).await?;
    authorize_ownership(&auth.principal(), group.owner_id)?;
    Ok(Json(group.try_into()?))
}

pub async fn rename_group(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<RenameGroupRequest>,
) -> AppResult<Json<Group>> {
    let name = sanitize::display_name("name", &payload.name)?;

    // Load first, then authorize: a missing group is GroupNotFound, an
    // existing group owned by someone else is an opaque Unauthorized.
    let old = load_group(&state.pool, group_id).await?;
    authorize_ownership(&auth.principal(), old.owner_id)?;

    let now = utc_now();

    sqlx::query("UPDATE contact_groups SET name = $1, updated_at = $2 WHERE id = $3")
        .bind(&name)
        .bind(now.to_rfc3339())
        .bind(group_id.to_string())
        .execute(&state.pool)
        .await?;

    let old_dto: Group = old.try_into()?;
    let mut group = old_dto.clone();
    group.name = name;
    group.updated_at = now;

    let ctx = RequestContext::from_headers(&headers).with_endpoint("PATCH /groups/:id");
    crate::events::record_audit(
        &state.event_bus,
        "renamed",
        Some(auth.user_id),
        &group,
        Some(&old_dto),
        Some(ctx),
    );

    Ok(Json(group))
}

pub async fn delete_group(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(group_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let group = load_group(&state.pool, group_id).await?;
    authorize_ownership(&auth.principal(), group.owner_id)?;

    let now = utc_now().to_rfc3339();
    sqlx::query(
        "UPDATE contact_groups SET deleted_at = $1, updated_at = $2 \
         WHERE id = $3 AND deleted_at IS NULL",
    )
    .bind(&now)
    .bind(&now)
    .bind(group_id.to_string())
    .execute(&state.pool)
    .await?;

    let group_dto: Group = group.try_into()?;
    let ctx = RequestContext::from_headers(&headers).with_endpoint("DELETE /groups/:id");
    crate::events::record_audit(
        &state.event_bus,
        "deleted",
        Some(auth.user_id),
        &group_dto,
        None,
        Some(ctx),
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Load a group without any ownership filter. Callers must run
/// `authorize_ownership` against `owner_id` before acting on the result.
pub(crate) async fn load_group(pool: &AnyPool, group_id: Uuid) -> AppResult<DbGroup> {
    let row = sqlx::query(
        "SELECT id, owner_id, name, created_at, updated_at, deleted_at \
         FROM contact_groups WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(group_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => row_parsers::db_group_from_row(&row),
        None => Err(AppError::GroupNotFound),
    }
}
