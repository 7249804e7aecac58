use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::util::ServiceExt; // for `oneshot`

use rolodex::{create_app, db};

async fn setup(dir: &tempfile::TempDir) -> Result<Router> {
    let pool = db::connect(&db::sqlite_url(&dir.path().join("test.db"))).await?;
    Ok(create_app(pool).await?)
}

fn session_cookie(resp: &Response) -> Result<String> {
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .context("missing set-cookie header")?
        .to_str()?;
    let token = set_cookie
        .split(';')
        .next()
        .context("empty set-cookie")?
        .to_string();
    assert!(token.starts_with("token="));
    Ok(token)
}

async fn json_body(resp: Response) -> Result<Value> {
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn full_api_flow() -> Result<()> {
    let dir = tempdir().context("failed to create tempdir")?;
    let app = setup(&dir).await?;

    // -- signup
    let signup = json!({ "name": "Ada Lovelace", "email": "ada@example.com" });
    let req = Request::builder()
        .method("POST")
        .uri("/users")
        .header("content-type", "application/json")
        .body(Body::from(signup.to_string()))?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let cookie = session_cookie(&resp)?;
    let user = json_body(resp).await?;
    let account_id = user
        .get("account_id")
        .and_then(|v| v.as_str())
        .context("missing account_id")?
        .to_string();
    // the credential hash must never appear in a response
    assert!(user.get("credential_hash").is_none());

    // -- current user
    let req = Request::builder()
        .method("GET")
        .uri("/users/me")
        .header("cookie", &cookie)
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = json_body(resp).await?;
    assert_eq!(me.get("email").and_then(|v| v.as_str()), Some("ada@example.com"));

    // -- create group
    let req = Request::builder()
        .method("POST")
        .uri("/groups")
        .header("content-type", "application/json")
        .header("cookie", &cookie)
        .body(Body::from(json!({ "name": "Friends" }).to_string()))?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let group = json_body(resp).await?;
    let group_id = group
        .get("id")
        .and_then(|v| v.as_str())
        .context("missing group id")?
        .to_string();
    assert_eq!(
        group.get("owner_id").and_then(|v| v.as_str()),
        Some(account_id.as_str())
    );

    // -- list groups
    let req = Request::builder()
        .method("GET")
        .uri("/groups")
        .header("cookie", &cookie)
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let groups = json_body(resp).await?;
    assert_eq!(groups.as_array().map(|a| a.len()), Some(1));

    // -- rename group
    let req = Request::builder()
        .method("PATCH")
        .uri(format!("/groups/{}", group_id))
        .header("content-type", "application/json")
        .header("cookie", &cookie)
        .body(Body::from(json!({ "name": "Close Friends" }).to_string()))?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let renamed = json_body(resp).await?;
    assert_eq!(
        renamed.get("name").and_then(|v| v.as_str()),
        Some("Close Friends")
    );

    // -- add a person to the group
    let person_body = json!({ "first_name": "Grace", "last_name": "Hopper" });
    let req = Request::builder()
        .method("POST")
        .uri(format!("/groups/{}/people", group_id))
        .header("content-type", "application/json")
        .header("cookie", &cookie)
        .body(Body::from(person_body.to_string()))?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let person = json_body(resp).await?;
    let person_id = person
        .get("id")
        .and_then(|v| v.as_str())
        .context("missing person id")?
        .to_string();
    assert_eq!(
        person.get("group_id").and_then(|v| v.as_str()),
        Some(group_id.as_str())
    );

    // -- list people in the group
    let req = Request::builder()
        .method("GET")
        .uri(format!("/groups/{}/people", group_id))
        .header("cookie", &cookie)
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let people = json_body(resp).await?;
    assert_eq!(people.as_array().map(|a| a.len()), Some(1));

    // -- read the person back through its own route
    let req = Request::builder()
        .method("GET")
        .uri(format!("/people/{}", person_id))
        .header("cookie", &cookie)
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched = json_body(resp).await?;
    assert_eq!(
        fetched.get("first_name").and_then(|v| v.as_str()),
        Some("Grace")
    );

    // -- soft delete the group
    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/groups/{}", group_id))
        .header("cookie", &cookie)
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // gone from reads afterwards
    let req = Request::builder()
        .method("GET")
        .uri(format!("/groups/{}", group_id))
        .header("cookie", &cookie)
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err = json_body(resp).await?;
    assert_eq!(
        err.get("_tag").and_then(|v| v.as_str()),
        Some("GroupNotFound")
    );

    Ok(())
}
