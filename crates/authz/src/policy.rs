//! Role and ownership guards.

use staybook_kernel::model::{Role, UserId};
use thiserror::Error;

use crate::Identity;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("{0}")]
    Forbidden(&'static str),
}

pub fn require_role(identity: &Identity, allowed: &[Role]) -> Result<(), AuthzError> {
    if identity.is_admin() || allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden("role not permitted for this action"))
    }
}

pub fn require_admin(identity: &Identity) -> Result<(), AuthzError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::Forbidden("admin role required"))
    }
}

/// The account holder or an admin.
pub fn require_self_or_admin(identity: &Identity, user_id: UserId) -> Result<(), AuthzError> {
    if identity.is_admin() || identity.user_id == user_id {
        Ok(())
    } else {
        Err(AuthzError::Forbidden("only the account holder may do this"))
    }
}

/// The listing owner or an admin.
pub fn require_owner_or_admin(identity: &Identity, owner_id: UserId) -> Result<(), AuthzError> {
    if identity.is_admin() || identity.user_id == owner_id {
        Ok(())
    } else {
        Err(AuthzError::Forbidden("only the property owner may do this"))
    }
}

/// Confirming a booking is the property owner's call alone.
pub fn require_owner(identity: &Identity, owner_id: UserId) -> Result<(), AuthzError> {
    if identity.user_id == owner_id {
        Ok(())
    } else {
        Err(AuthzError::Forbidden("only the property owner may confirm"))
    }
}

/// Cancelling is open to either party of the booking.
pub fn require_party(
    identity: &Identity,
    requester_id: UserId,
    owner_id: UserId,
) -> Result<(), AuthzError> {
    if identity.user_id == requester_id || identity.user_id == owner_id {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(
            "only the requester or the property owner may cancel",
        ))
    }
}

/// Reading a booking: either party or an admin.
pub fn require_party_or_admin(
    identity: &Identity,
    requester_id: UserId,
    owner_id: UserId,
) -> Result<(), AuthzError> {
    if identity.is_admin() {
        return Ok(());
    }
    require_party(identity, requester_id, owner_id)
        .map_err(|_| AuthzError::Forbidden("not a party to this booking"))
}
