use garde::Validate;
use serde::Deserialize;
use staybook_kernel::model::Role;

/// Admin-side account creation; any role may be assigned.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[garde(length(min = 1, max = 100))]
    pub name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    #[garde(skip)]
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[garde(inner(length(min = 1, max = 100)))]
    pub name: Option<String>,
    #[garde(inner(email))]
    pub email: Option<String>,
    #[garde(inner(length(min = 8, max = 128)))]
    pub password: Option<String>,
    /// Admin only.
    #[garde(skip)]
    pub role: Option<Role>,
}
