use uuid::Uuid;

/// The resolved identity acting on a request.
///
/// `System` is only constructed by trusted internal paths (user creation
/// before a session exists); it is never the result of resolving an inbound
/// credential. A `User` principal's account id is fixed for the lifetime of
/// the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    System,
    User { user_id: Uuid, account_id: Uuid },
}

impl Principal {
    pub fn user(user_id: Uuid, account_id: Uuid) -> Self {
        Principal::User {
            user_id,
            account_id,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Principal::System)
    }

    pub fn account_id(&self) -> Option<Uuid> {
        match self {
            Principal::System => None,
            Principal::User { account_id, .. } => Some(*account_id),
        }
    }

    /// Actor id recorded in the audit log; `None` for the system principal.
    pub fn actor_id(&self) -> Option<Uuid> {
        match self {
            Principal::System => None,
            Principal::User { user_id, .. } => Some(*user_id),
        }
    }
}
