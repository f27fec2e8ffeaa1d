pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use staybook_authz::{policy, AuthzError};
use staybook_http::error::AppError;
use staybook_http::extract::{AuthUser, ValidJson};
use staybook_kernel::clock::Clock;
use staybook_kernel::model::{Role, User, UserId, UserRecord};
use staybook_kernel::Module;

use crate::modules::auth::password;
use crate::state::AppState;
use crate::utils::{
    bearer, error_response, json_response, schema_list, schema_ref, uuid_path_param,
};

use self::models::{CreateUser, UpdateUser};

/// Account fields shared by self-registration and admin creation.
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Hash the password and store the account. Emails are kept lowercase.
pub async fn create_account(state: &AppState, account: NewAccount) -> Result<User, AppError> {
    let password_hash = password::hash(account.password, state.settings.auth.bcrypt_cost).await?;
    let now = state.clock.now();
    let user = state
        .stores
        .users
        .insert(UserRecord {
            user: User {
                id: UserId::new(),
                name: account.name,
                email: normalize_email(&account.email),
                role: account.role,
                created_at: now,
                updated_at: now,
            },
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "account created");
    Ok(user)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UsersModule {
    state: AppState,
}

impl UsersModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_users).post(create_user))
            .route("/{id}", get(get_user).put(update_user).delete(delete_user))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }
}

async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<User>>, AppError> {
    policy::require_admin(&user.identity)?;
    Ok(Json(state.stores.users.list().await?))
}

async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(body): ValidJson<CreateUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    policy::require_admin(&user.identity)?;
    let created = create_account(
        &state,
        NewAccount {
            name: body.name,
            email: body.email,
            password: body.password,
            role: body.role,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<UserId>,
) -> Result<Json<User>, AppError> {
    policy::require_self_or_admin(&user.identity, id)?;
    Ok(Json(state.stores.users.get(id).await?.user))
}

async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<UserId>,
    ValidJson(body): ValidJson<UpdateUser>,
) -> Result<Json<User>, AppError> {
    policy::require_self_or_admin(&user.identity, id)?;
    let mut record = state.stores.users.get(id).await?;

    let role_changed = body.role.is_some_and(|role| role != record.user.role);
    if role_changed && !user.identity.is_admin() {
        return Err(AuthzError::Forbidden("only admins may change roles").into());
    }

    if let Some(name) = body.name {
        record.user.name = name;
    }
    if let Some(email) = body.email {
        record.user.email = normalize_email(&email);
    }
    if let Some(role) = body.role {
        record.user.role = role;
    }
    if let Some(new_password) = body.password {
        record.password_hash =
            password::hash(new_password, state.settings.auth.bcrypt_cost).await?;
    }
    record.user.updated_at = state.clock.now();

    let updated = state.stores.users.update(record).await?;
    if role_changed {
        // Sessions carry the role they were issued with.
        let revoked = state.sessions.revoke_user(id);
        tracing::info!(user_id = %id, role = updated.role.as_str(), revoked, "role changed");
    }
    Ok(Json(updated))
}

async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    policy::require_self_or_admin(&user.identity, id)?;
    state.stores.users.delete(id).await?;
    let revoked = state.sessions.revoke_user(id);
    tracing::info!(user_id = %id, deleted_by = %user.identity.user_id, revoked, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn openapi_fragment() -> Value {
    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List accounts (admin)",
                    "tags": ["Users"],
                    "security": bearer(),
                    "responses": {
                        "200": json_response("Accounts", schema_list("User")),
                        "403": error_response("Admin role required")
                    }
                },
                "post": {
                    "summary": "Create an account (admin)",
                    "tags": ["Users"],
                    "security": bearer(),
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": schema_ref("CreateUser") } }
                    },
                    "responses": {
                        "201": json_response("Created account", schema_ref("User")),
                        "403": error_response("Admin role required"),
                        "409": error_response("Email already registered"),
                        "422": error_response("Validation error")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get an account (self or admin)",
                    "tags": ["Users"],
                    "security": bearer(),
                    "parameters": [uuid_path_param("id")],
                    "responses": {
                        "200": json_response("Account", schema_ref("User")),
                        "403": error_response("Not permitted"),
                        "404": error_response("User not found")
                    }
                },
                "put": {
                    "summary": "Update an account (self or admin; roles by admin only)",
                    "tags": ["Users"],
                    "security": bearer(),
                    "parameters": [uuid_path_param("id")],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": schema_ref("UpdateUser") } }
                    },
                    "responses": {
                        "200": json_response("Updated account", schema_ref("User")),
                        "403": error_response("Not permitted"),
                        "404": error_response("User not found"),
                        "409": error_response("Email already registered")
                    }
                },
                "delete": {
                    "summary": "Delete an account (self or admin)",
                    "tags": ["Users"],
                    "security": bearer(),
                    "parameters": [uuid_path_param("id")],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "403": error_response("Not permitted"),
                        "404": error_response("User not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "User": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "name": { "type": "string" },
                        "email": { "type": "string", "format": "email" },
                        "role": { "type": "string", "enum": ["customer", "seller", "admin"] },
                        "created_at": { "type": "string", "format": "date-time" },
                        "updated_at": { "type": "string", "format": "date-time" }
                    },
                    "required": ["id", "name", "email", "role", "created_at", "updated_at"]
                },
                "CreateUser": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "email": { "type": "string", "format": "email" },
                        "password": { "type": "string", "minLength": 8 },
                        "role": { "type": "string", "enum": ["customer", "seller", "admin"] }
                    },
                    "required": ["name", "email", "password"]
                },
                "UpdateUser": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "email": { "type": "string", "format": "email" },
                        "password": { "type": "string", "minLength": 8 },
                        "role": { "type": "string", "enum": ["customer", "seller", "admin"] }
                    }
                }
            }
        }
    })
}

/// Create a new instance of the users module
pub fn create_module(state: AppState) -> Arc<dyn Module> {
    Arc::new(UsersModule::new(state))
}
