use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use uuid::Uuid;

use super::credential::{Credential, SESSION_COOKIE};
use super::principal::Principal;
use crate::app::AppState;
use crate::errors::AppError;

/// Authenticated request extractor.
///
/// Reads the session cookie and resolves it through the state's
/// [`SessionResolver`](super::SessionResolver). A missing cookie is rejected
/// before any repository lookup happens.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub account_id: Uuid,
}

impl AuthUser {
    pub fn principal(&self) -> Principal {
        Principal::user(self.user_id, self.account_id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = cookie_value(&parts.headers, SESSION_COOKIE).ok_or(AppError::Unauthorized)?;
        let credential = Credential::from_raw(raw);

        match state.sessions.resolve_principal(Some(&credential)).await? {
            Principal::User {
                user_id,
                account_id,
            } => Ok(AuthUser {
                user_id,
                account_id,
            }),
            // System never arrives via an inbound credential.
            Principal::System => Err(AppError::Unauthorized),
        }
    }
}

pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn finds_the_named_cookie_among_several() {
        let headers = headers_with_cookie("theme=dark; token=abc123; lang=en");
        assert_eq!(cookie_value(&headers, "token").as_deref(), Some("abc123"));
    }

    #[test]
    fn absent_cookie_yields_none() {
        let headers = headers_with_cookie("theme=dark");
        assert_eq!(cookie_value(&headers, "token"), None);
        assert_eq!(cookie_value(&HeaderMap::new(), "token"), None);
    }

    #[test]
    fn does_not_match_cookie_name_prefixes() {
        let headers = headers_with_cookie("token2=nope; token=yes");
        assert_eq!(cookie_value(&headers, "token").as_deref(), Some("yes"));
    }
}
