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
use crate::models::person::{CreatePersonRequest, DbPerson, Person};
use crate::routes::groups::load_group;
use crate::security::sanitize;
use crate::utils::utc_now;

// Every person operation resolves the ownership chain
// person.group_id -> group.owner_id -> account before touching the person.

pub async fn create_person(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<CreatePersonRequest>,
) -> AppResult<(StatusCode, Json<Person>)> {
    let first_name = sanitize::display_name("first_name", &payload.first_name)?;
    let last_name = sanitize::display_name("last_name", &payload.last_name)?;

    let group = load_group(&state.pool, group_id).await?;
    authorize_ownership(&auth.principal(), group.owner_id)?;

    let person_id = Uuid::new_v4();
    let now = utc_now().to_rfc3339();

    sqlx::query(
        "INSERT INTO people (id, group_id, first_name, last_name, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(person_id.to_string())
    .bind(group_id.to_string())
    .bind(&first_name)
    .bind(&last_name)
    .bind(&now)
    .bind(&now)
    .execute(&state.pool)
    .await?;

    let person: Person = load_person(&state.pool, person_id).await?.try_into()?;

    let ctx = RequestContext::from_headers(&headers).with_endpoint("POST /groups/:id/people");
    crate::events::record_audit(
        &state.event_bus,
        "created",
        Some(auth.user_id),
        &person,
        None,
        Some(ctx),
    );

    Ok((StatusCode::CREATED, Json(person)))
}

pub async fn list_people(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<Vec<Person>>> {
    let group = load_group(&state.pool, group_id).await?;
    authorize_ownership(&auth.principal(), group.owner_id)?;

    let rows = sqlx::query(
        "SELECT id, group_id, first_name, last_name, created_at, updated_at, deleted_at \
         FROM people WHERE group_id = $1 AND deleted_at IS NULL ORDER BY created_at DESC",
    )
    .bind(group_id.to_string())
    .fetch_all(&state.pool)
    .await?;

    let people: Vec<Person> = rows
        .iter()
        .map(|row| row_parsers::db_person_from_row(row)?.try_into())
        .collect::<Result<_, _>>()?;

    Ok(Json(people))
}

pub async fn get_person(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(person_id): Path<Uuid>,
) -> AppResult<Json<Person>> {
    let person = load_person(&state.pool, person_id).await?;

    // A person whose parent group is gone reports GroupNotFound, not a
    // partial record.
    let group = load_group(&state.pool, person.group_id).await?;
    authorize_ownership(&auth.principal(), group.owner_id)?;

    Ok(Json(person.try_into()?))
}

async fn load_person(pool: &AnyPool, person_id: Uuid) -> AppResult<DbPerson> {
    let row = sqlx::query(
        "SELECT id, group_id, first_name, last_name, created_at, updated_at, deleted_at \
         FROM people WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(person_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => row_parsers::db_person_from_row(&row),
        None => Err(AppError::PersonNotFound),
    }
}
