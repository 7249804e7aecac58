use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tempfile::tempdir;
use tower::util::ServiceExt;

use rolodex::{create_app, db};

async fn setup(dir: &tempfile::TempDir) -> Result<axum::Router> {
    let pool = db::connect(&db::sqlite_url(&dir.path().join("test.db"))).await?;
    Ok(create_app(pool).await?)
}

#[tokio::test]
async fn responses_carry_security_headers() -> Result<()> {
    let dir = tempdir()?;
    let app = setup(&dir).await?;

    let req = Request::builder()
        .uri("/api/health")
        .header("x-forwarded-for", "198.51.100.1")
        .body(Body::empty())?;
    let resp = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let headers = resp.headers();
    let get = |name: &str| -> Result<&str> {
        Ok(headers
            .get(name)
            .with_context(|| format!("missing header {name}"))?
            .to_str()?)
    };

    assert_eq!(get("x-content-type-options")?, "nosniff");
    assert_eq!(get("x-frame-options")?, "DENY");
    assert_eq!(get("referrer-policy")?, "no-referrer");
    assert_eq!(get("cache-control")?, "no-store");
    assert_eq!(get("content-security-policy")?, "default-src 'none'");

    Ok(())
}

#[tokio::test]
async fn requests_over_the_window_limit_get_429() -> Result<()> {
    std::env::set_var("RATE_LIMIT_MAX_REQUESTS", "3");
    std::env::set_var("RATE_LIMIT_WINDOW_SECS", "60");

    let dir = tempdir()?;
    let app = setup(&dir).await?;

    for _ in 0..3 {
        let req = Request::builder()
            .uri("/api/health")
            .header("x-forwarded-for", "198.51.100.7")
            .body(Body::empty())?;
        let resp = app.clone().oneshot(req).await?;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = Request::builder()
        .uri("/api/health")
        .header("x-forwarded-for", "198.51.100.7")
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let bytes = axum::body::to_bytes(resp.into_body(), 1_048_576).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["_tag"], "RateLimited");

    // other clients are unaffected
    let req = Request::builder()
        .uri("/api/health")
        .header("x-forwarded-for", "198.51.100.8")
        .body(Body::empty())?;
    let resp = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    Ok(())
}
