use std::sync::Arc;

use axum::http::Method;
use axum::middleware;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use sqlx::AnyPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::SessionResolver;
use crate::errors::AppError;
use crate::events::{self, EventBus};
use crate::routes::{groups, health, people, users};
use crate::security::{self, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub pool: AnyPool,
    pub sessions: Arc<SessionResolver>,
    pub event_bus: EventBus,
    pub limiter: Arc<RateLimiter>,
}

pub async fn create_app(pool: AnyPool) -> Result<Router, AppError> {
    let sessions = Arc::new(SessionResolver::new(Arc::new(pool.clone())));
    let limiter = Arc::new(RateLimiter::from_env()?);

    let (event_bus, audit_rx) = events::init_event_bus();
    tokio::spawn(events::start_audit_listener(audit_rx, pool.clone()));

    let state = AppState {
        pool,
        sessions,
        event_bus,
        limiter,
    };

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(Any)
        .allow_headers(Any);

    let user_routes = Router::new()
        .route("/", post(users::create_user))
        .route("/me", get(users::me));

    let group_routes = Router::new()
        .route("/", get(groups::list_groups))
        .route("/", post(groups::create_group))
        .route("/:id", get(groups::get_group))
        .route("/:id", patch(groups::rename_group))
        .route("/:id", delete(groups::delete_group));

    // People are scoped to a group for writes and listing; reads by id go
    // through /people and re-resolve the ownership chain.
    let person_routes = Router::new()
        .route("/", get(people::list_people))
        .route("/", post(people::create_person));

    let router = Router::new()
        .nest("/users", user_routes)
        .nest("/groups", group_routes)
        .nest("/groups/:group_id/people", person_routes)
        .route("/people/:person_id", get(people::get_person))
        .route("/api/health", get(health::health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state,
            security::rate_limit::enforce,
        ))
        .layer(middleware::from_fn(security::headers::apply))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
