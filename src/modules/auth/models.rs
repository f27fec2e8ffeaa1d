use garde::Validate;
use serde::{Deserialize, Serialize};
use staybook_kernel::model::{Role, User};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    /// Customer unless stated; admins cannot self-register.
    #[serde(default)]
    #[garde(skip)]
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[garde(length(min = 1))]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}
