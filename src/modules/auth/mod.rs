pub mod models;
pub mod password;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use staybook_authz::{AuthzError, Identity};
use staybook_http::error::AppError;
use staybook_http::extract::{AuthUser, ValidJson};
use staybook_kernel::model::{Role, User};
use staybook_kernel::Module;

use crate::modules::users::{create_account, NewAccount};
use crate::state::AppState;
use crate::utils::{bearer, error_response, json_response, schema_ref};

use self::models::{AuthResponse, LoginRequest, RegisterRequest};

pub struct AuthModule {
    state: AppState,
}

impl AuthModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/me", get(me))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }
}

async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    if body.role == Role::Admin {
        return Err(AuthzError::Forbidden("admin accounts cannot self-register").into());
    }

    let user = create_account(
        &state,
        NewAccount {
            name: body.name,
            email: body.email,
            password: body.password,
            role: body.role,
        },
    )
    .await?;
    let token = state.sessions.issue(Identity::new(user.id, user.role));

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

async fn login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let rejected = || AppError::unauthorized("invalid email or password");

    let record = state
        .stores
        .users
        .find_by_email(&body.email)
        .await?
        .ok_or_else(rejected)?;
    if !password::verify(body.password, record.password_hash).await? {
        tracing::warn!(user_id = %record.user.id, "login rejected");
        return Err(rejected());
    }

    let user = record.user;
    let token = state.sessions.issue(Identity::new(user.id, user.role));
    tracing::info!(user_id = %user.id, "login succeeded");
    Ok(Json(AuthResponse { token, user }))
}

async fn logout(State(state): State<AppState>, user: AuthUser) -> StatusCode {
    state.sessions.revoke(&user.token);
    StatusCode::NO_CONTENT
}

async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Json<User>, AppError> {
    let record = state.stores.users.get(user.identity.user_id).await?;
    Ok(Json(record.user))
}

fn openapi_fragment() -> Value {
    json!({
        "paths": {
            "/register": {
                "post": {
                    "summary": "Create an account and sign in",
                    "tags": ["Auth"],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": schema_ref("RegisterRequest") } }
                    },
                    "responses": {
                        "201": json_response("Account and session token", schema_ref("AuthResponse")),
                        "403": error_response("Admin role requested"),
                        "409": error_response("Email already registered"),
                        "422": error_response("Validation error")
                    }
                }
            },
            "/login": {
                "post": {
                    "summary": "Exchange credentials for a session token",
                    "tags": ["Auth"],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": schema_ref("LoginRequest") } }
                    },
                    "responses": {
                        "200": json_response("Session token", schema_ref("AuthResponse")),
                        "401": error_response("Invalid email or password")
                    }
                }
            },
            "/logout": {
                "post": {
                    "summary": "Revoke the current session",
                    "tags": ["Auth"],
                    "security": bearer(),
                    "responses": {
                        "204": { "description": "Session revoked" },
                        "401": error_response("Missing or invalid token")
                    }
                }
            },
            "/me": {
                "get": {
                    "summary": "Current account",
                    "tags": ["Auth"],
                    "security": bearer(),
                    "responses": {
                        "200": json_response("Account", schema_ref("User")),
                        "401": error_response("Missing or invalid token")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "RegisterRequest": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "email": { "type": "string", "format": "email" },
                        "password": { "type": "string", "minLength": 8 },
                        "role": { "type": "string", "enum": ["customer", "seller"] }
                    },
                    "required": ["name", "email", "password"]
                },
                "LoginRequest": {
                    "type": "object",
                    "properties": {
                        "email": { "type": "string", "format": "email" },
                        "password": { "type": "string" }
                    },
                    "required": ["email", "password"]
                },
                "AuthResponse": {
                    "type": "object",
                    "properties": {
                        "token": { "type": "string" },
                        "user": schema_ref("User")
                    },
                    "required": ["token", "user"]
                }
            }
        }
    })
}

/// Create a new instance of the auth module
pub fn create_module(state: AppState) -> Arc<dyn Module> {
    Arc::new(AuthModule::new(state))
}
