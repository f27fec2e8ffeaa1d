//! Authentication and authorization hooks.
//!
//! Bearer tokens are opaque: a [`TokenVerifier`] resolves them to a verified
//! [`Identity`], and the guards in [`policy`] decide what that identity may do.

pub mod policy;
mod session;

use serde::Serialize;
use staybook_kernel::model::{Role, UserId};

pub use policy::AuthzError;
pub use session::SessionStore;

/// A caller whose token has been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Resolves a bearer token to the identity it was issued for.
pub trait TokenVerifier: Send + Sync {
    /// `None` when the token is unknown or expired.
    fn verify(&self, token: &str) -> Option<Identity>;
}
