//! Ownership rules for mutations. There are no roles and no overrides:
//! an identity may change itself and the records it owns, nothing else.

use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;

/// A record with an immutable owning user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

pub fn can_mutate_self(acting: Uuid, target: Uuid) -> bool {
    acting == target
}

pub fn can_mutate_owned<R: Owned>(acting: Uuid, resource: &R) -> bool {
    acting == resource.owner_id()
}

pub fn ensure_self(acting: Uuid, target: Uuid, denial: &str) -> Result<(), AppError> {
    if can_mutate_self(acting, target) {
        Ok(())
    } else {
        warn!(%acting, %target, "self-mutation denied");
        Err(AppError::Unauthorized(denial.to_string()))
    }
}

pub fn ensure_owner<R: Owned>(acting: Uuid, resource: &R, denial: &str) -> Result<(), AppError> {
    if can_mutate_owned(acting, resource) {
        Ok(())
    } else {
        warn!(%acting, owner = %resource.owner_id(), "owner-mutation denied");
        Err(AppError::Unauthorized(denial.to_string()))
    }
}
