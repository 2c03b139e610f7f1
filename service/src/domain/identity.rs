use coursehub_common::Role;

use crate::domain::ids::UserId;
use crate::domain::repository::{RepositoryError, UserRepository};

/// The authenticated user on whose behalf a request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

/// Proof that the caller holds the admin role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admin(UserId);

impl Admin {
    pub fn id(&self) -> UserId {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Unauthorized")]
    Unauthenticated,
    #[error("Unauthorized")]
    NotPermitted,
    #[error("Account is banned")]
    Banned,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl Caller {
    pub fn require_admin(&self) -> Result<Admin, AccessError> {
        match self.role {
            Role::Admin => Ok(Admin(self.id)),
            _ => Err(AccessError::NotPermitted),
        }
    }

    pub fn require_author(&self) -> Result<(), AccessError> {
        if self.role.can_author() {
            Ok(())
        } else {
            Err(AccessError::NotPermitted)
        }
    }
}

/// Resolves the user behind an identity asserted by the authentication gateway.
pub async fn identify<U: UserRepository>(users: &U, user_id: UserId) -> Result<Caller, AccessError> {
    let user = users
        .find_user(user_id)
        .await?
        .ok_or(AccessError::Unauthenticated)?;

    if user.is_banned {
        return Err(AccessError::Banned);
    }

    Ok(Caller {
        id: user.id,
        role: user.role,
    })
}
