pub mod models;
pub mod service;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use staybook_http::error::AppError;
use staybook_http::extract::{AuthUser, ValidJson};
use staybook_kernel::model::{Booking, BookingId};
use staybook_kernel::{InitCtx, Module};
use tokio::task::JoinHandle;

use crate::state::AppState;
use crate::utils::{
    bearer, error_response, json_response, schema_list, schema_ref, uuid_path_param,
};

use self::models::{CreateBooking, MAX_IDEMPOTENCY_KEY_LEN};
use self::service::{BookingError, BookingRequest, BookingService};

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// Booking requests, confirmation, cancellation, and the completion sweeper.
pub struct BookingsModule {
    state: AppState,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl BookingsModule {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            sweeper: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Module for BookingsModule {
    fn name(&self) -> &'static str {
        "bookings"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_mine).post(request_booking))
            .route("/all", get(list_all))
            .route("/{id}", get(get_booking))
            .route("/{id}/confirm", post(confirm_booking))
            .route("/{id}/cancel", post(cancel_booking))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let every = ctx.settings.bookings.completion_sweep_secs;
        if every == 0 {
            tracing::info!(module = self.name(), "completion sweep disabled");
            return Ok(());
        }

        let handle = tokio::spawn(run_sweeper(
            self.state.bookings.clone(),
            Duration::from_secs(every),
        ));
        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
        tracing::info!(module = self.name(), every_secs = every, "completion sweep started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let handle = match self.sweeper.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            handle.abort();
            tracing::info!(module = self.name(), "completion sweep stopped");
        }
        Ok(())
    }
}

async fn run_sweeper(service: Arc<BookingService>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = service.complete_elapsed().await {
            tracing::warn!(error = %e, "completion sweep failed");
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::InvalidRange(_) => {
                AppError::bad_request(message).with_code("invalid_range")
            }
            BookingError::PropertyNotFound(_) => {
                AppError::not_found(message).with_code("property_not_found")
            }
            BookingError::BookingConflict(id) => {
                AppError::conflict(vec![json!({ "conflicting_booking": id })], message)
                    .with_code("booking_conflict")
            }
            BookingError::InvalidTransition { from, to } => {
                AppError::conflict(vec![json!({ "from": from, "to": to })], message)
                    .with_code("invalid_transition")
            }
            BookingError::IdempotencyKeyReused(id) => {
                AppError::conflict(vec![json!({ "booking": id })], message)
                    .with_code("idempotency_key_reused")
            }
            BookingError::InvalidPrice => AppError::bad_request(message).with_code("invalid_price"),
            BookingError::Unauthorized(e) => e.into(),
            BookingError::NotFound { .. } => AppError::not_found(message),
            BookingError::Storage(e) => e.into(),
        }
    }
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(IDEMPOTENCY_HEADER) else {
        return Ok(None);
    };
    let key = value
        .to_str()
        .map_err(|_| AppError::bad_request("Idempotency-Key must be visible ASCII"))?
        .trim();
    if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(AppError::bad_request(format!(
            "Idempotency-Key must be 1 to {MAX_IDEMPOTENCY_KEY_LEN} characters"
        )));
    }
    Ok(Some(key.to_string()))
}

async fn request_booking(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    ValidJson(body): ValidJson<CreateBooking>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state
        .bookings
        .request_booking(BookingRequest {
            property_id: body.property_id,
            requester_id: user.identity.user_id,
            check_in: body.check_in,
            check_out: body.check_out,
            idempotency_key: idempotency_key(&headers)?,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_mine(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list_mine(&user.identity).await?))
}

async fn list_all(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list_all(&user.identity).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<BookingId>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get(id, &user.identity).await?))
}

async fn confirm_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<BookingId>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.confirm(id, &user.identity).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<BookingId>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.cancel(id, &user.identity).await?))
}

fn openapi_fragment() -> Value {
    let transition = |summary: &str| {
        json!({
            "post": {
                "summary": summary,
                "tags": ["Bookings"],
                "security": bearer(),
                "parameters": [uuid_path_param("id")],
                "responses": {
                    "200": json_response("Updated booking", schema_ref("Booking")),
                    "401": error_response("Missing or invalid token"),
                    "403": error_response("Caller may not change this booking"),
                    "404": error_response("Booking not found"),
                    "409": error_response("Transition not allowed from the current status")
                }
            }
        })
    };

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List the caller's bookings",
                    "tags": ["Bookings"],
                    "security": bearer(),
                    "responses": {
                        "200": json_response("Bookings, newest first", schema_list("Booking")),
                        "401": error_response("Missing or invalid token")
                    }
                },
                "post": {
                    "summary": "Request a booking",
                    "tags": ["Bookings"],
                    "security": bearer(),
                    "parameters": [{
                        "name": "Idempotency-Key",
                        "in": "header",
                        "required": false,
                        "schema": { "type": "string", "maxLength": MAX_IDEMPOTENCY_KEY_LEN }
                    }],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": schema_ref("CreateBooking") } }
                    },
                    "responses": {
                        "201": json_response("Pending booking", schema_ref("Booking")),
                        "400": error_response("Invalid stay range or total"),
                        "401": error_response("Missing or invalid token"),
                        "404": error_response("Property missing or inactive"),
                        "409": error_response("Overlaps an active booking or reuses an idempotency key")
                    }
                }
            },
            "/all": {
                "get": {
                    "summary": "List every booking (admin)",
                    "tags": ["Bookings"],
                    "security": bearer(),
                    "responses": {
                        "200": json_response("All bookings", schema_list("Booking")),
                        "403": error_response("Admin role required")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a booking",
                    "tags": ["Bookings"],
                    "security": bearer(),
                    "parameters": [uuid_path_param("id")],
                    "responses": {
                        "200": json_response("Booking", schema_ref("Booking")),
                        "403": error_response("Not a party to this booking"),
                        "404": error_response("Booking not found")
                    }
                }
            },
            "/{id}/confirm": transition("Confirm a pending booking (property owner)"),
            "/{id}/cancel": transition("Cancel a booking (requester or property owner)")
        },
        "components": {
            "schemas": {
                "Booking": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "property_id": { "type": "string", "format": "uuid" },
                        "requester_id": { "type": "string", "format": "uuid" },
                        "check_in": { "type": "string", "format": "date" },
                        "check_out": { "type": "string", "format": "date" },
                        "status": {
                            "type": "string",
                            "enum": ["pending", "confirmed", "cancelled", "completed"]
                        },
                        "total_price": { "type": "number" },
                        "idempotency_key": { "type": "string" },
                        "created_at": { "type": "string", "format": "date-time" },
                        "updated_at": { "type": "string", "format": "date-time" }
                    },
                    "required": [
                        "id", "property_id", "requester_id", "check_in", "check_out",
                        "status", "total_price", "created_at", "updated_at"
                    ]
                },
                "CreateBooking": {
                    "type": "object",
                    "properties": {
                        "property_id": { "type": "string", "format": "uuid" },
                        "check_in": { "type": "string", "format": "date" },
                        "check_out": { "type": "string", "format": "date" }
                    },
                    "required": ["property_id", "check_in", "check_out"]
                }
            }
        }
    })
}

/// Create a new instance of the bookings module
pub fn create_module(state: AppState) -> Arc<dyn Module> {
    Arc::new(BookingsModule::new(state))
}

#[cfg(test)]
mod tests;
