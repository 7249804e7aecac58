use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use super::credential::{Credential, CredentialHash};
use super::principal::Principal;
use crate::db::row_parsers::parse_uuid;
use crate::errors::{AppError, AppResult};

/// The user record a credential resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub account_id: Uuid,
}

/// Credential-hash lookup seam, implemented for the database pool and for
/// in-memory stores in tests.
#[async_trait]
pub trait CredentialDirectory: Send + Sync {
    async fn find_by_credential_hash(
        &self,
        hash: &CredentialHash,
    ) -> AppResult<Option<SessionUser>>;
}

#[async_trait]
impl CredentialDirectory for AnyPool {
    async fn find_by_credential_hash(
        &self,
        hash: &CredentialHash,
    ) -> AppResult<Option<SessionUser>> {
        let row = sqlx::query(
            "SELECT id, account_id FROM users WHERE credential_hash = $1 AND deleted_at IS NULL",
        )
        .bind(hash.as_str())
        .fetch_optional(self)
        .await?;

        row.map(|row| {
            let user_id: String = row
                .try_get("id")
                .map_err(|e| AppError::internal(format!("missing id: {}", e)))?;
            let account_id: String = row
                .try_get("account_id")
                .map_err(|e| AppError::internal(format!("missing account_id: {}", e)))?;
            Ok(SessionUser {
                user_id: parse_uuid(&user_id)?,
                account_id: parse_uuid(&account_id)?,
            })
        })
        .transpose()
    }
}

/// Resolves inbound credentials into principals.
#[derive(Clone)]
pub struct SessionResolver {
    directory: Arc<dyn CredentialDirectory>,
}

impl SessionResolver {
    pub fn new(directory: Arc<dyn CredentialDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve an optional credential into a principal.
    ///
    /// An absent credential short-circuits before any directory access. A
    /// lookup miss yields the same opaque `Unauthorized` as a missing
    /// credential, so callers cannot probe for credential existence.
    pub async fn resolve_principal(&self, credential: Option<&Credential>) -> AppResult<Principal> {
        let Some(credential) = credential else {
            return Err(AppError::Unauthorized);
        };

        match self
            .directory
            .find_by_credential_hash(&credential.hash())
            .await?
        {
            Some(session) => {
                tracing::debug!(user_id = %session.user_id, "session resolved");
                Ok(Principal::user(session.user_id, session.account_id))
            }
            None => Err(AppError::Unauthorized),
        }
    }
}

/// Check that the principal holds authority over the owning account.
///
/// `System` always passes; a `User` passes iff its account matches. Pure:
/// repeated calls with the same inputs always produce the same outcome.
pub fn authorize_ownership(principal: &Principal, owner_account_id: Uuid) -> AppResult<()> {
    match principal {
        Principal::System => Ok(()),
        Principal::User {
            account_id,
            user_id,
        } => {
            if *account_id == owner_account_id {
                Ok(())
            } else {
                tracing::debug!(
                    user_id = %user_id,
                    owner_account_id = %owner_account_id,
                    "ownership check denied"
                );
                Err(AppError::Unauthorized)
            }
        }
    }
}
