pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use staybook_authz::policy;
use staybook_http::error::AppError;
use staybook_http::extract::{AuthUser, ValidJson};
use staybook_kernel::clock::Clock;
use staybook_kernel::model::{Booking, Property, PropertyFilter, PropertyId, Role};
use staybook_kernel::Module;

use crate::state::AppState;
use crate::utils::{
    bearer, error_response, json_response, schema_list, schema_ref, uuid_path_param,
};

use self::models::{CreateProperty, UpdateProperty, MAX_NIGHTLY_PRICE};

/// Property listings: public browsing, seller-managed writes.
pub struct PropertiesModule {
    state: AppState,
}

impl PropertiesModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for PropertiesModule {
    fn name(&self) -> &'static str {
        "properties"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_properties).post(create_property))
            .route(
                "/{id}",
                get(get_property)
                    .put(update_property)
                    .delete(delete_property),
            )
            .route("/{id}/bookings", get(property_bookings))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }
}

async fn list_properties(
    State(state): State<AppState>,
    filter: Result<Query<PropertyFilter>, QueryRejection>,
) -> Result<Json<Vec<Property>>, AppError> {
    let Query(filter) = filter.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    Ok(Json(state.stores.properties.list(&filter).await?))
}

async fn create_property(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(body): ValidJson<CreateProperty>,
) -> Result<(StatusCode, Json<Property>), AppError> {
    policy::require_role(&user.identity, &[Role::Seller])?;

    let now = state.clock.now();
    let property = state
        .stores
        .properties
        .insert(Property {
            id: PropertyId::new(),
            owner_id: user.identity.user_id,
            name: body.name,
            location: body.location,
            description: body.description,
            price: body.price,
            status: body.status,
            created_at: now,
            updated_at: now,
        })
        .await?;

    tracing::info!(property_id = %property.id, owner_id = %property.owner_id, "property listed");
    Ok((StatusCode::CREATED, Json(property)))
}

async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<PropertyId>,
) -> Result<Json<Property>, AppError> {
    Ok(Json(state.stores.properties.get(id).await?))
}

async fn update_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<PropertyId>,
    ValidJson(body): ValidJson<UpdateProperty>,
) -> Result<Json<Property>, AppError> {
    let mut property = state.stores.properties.get(id).await?;
    policy::require_owner_or_admin(&user.identity, property.owner_id)?;

    if let Some(name) = body.name {
        property.name = name;
    }
    if let Some(location) = body.location {
        property.location = location;
    }
    if let Some(description) = body.description {
        property.description = description;
    }
    if let Some(price) = body.price {
        property.price = price;
    }
    if let Some(status) = body.status {
        property.status = status;
    }
    property.updated_at = state.clock.now();

    Ok(Json(state.stores.properties.update(property).await?))
}

async fn delete_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<PropertyId>,
) -> Result<StatusCode, AppError> {
    let property = state.stores.properties.get(id).await?;
    policy::require_owner_or_admin(&user.identity, property.owner_id)?;

    if state.bookings.has_active_bookings(id).await? {
        return Err(AppError::conflict(
            vec![json!({ "property_id": id })],
            "property still has pending or confirmed bookings",
        )
        .with_code("property_has_bookings"));
    }

    state.stores.properties.delete(id).await?;
    tracing::info!(property_id = %id, deleted_by = %user.identity.user_id, "property deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn property_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<PropertyId>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list_for_property(id, &user.identity).await?))
}

fn openapi_fragment() -> Value {
    let property_schema = json!({
        "type": "object",
        "properties": {
            "id": { "type": "string", "format": "uuid" },
            "owner_id": { "type": "string", "format": "uuid" },
            "name": { "type": "string" },
            "location": { "type": "string" },
            "description": { "type": "string" },
            "price": { "type": "number", "minimum": 0, "maximum": MAX_NIGHTLY_PRICE },
            "status": { "type": "string", "enum": ["active", "inactive"] },
            "created_at": { "type": "string", "format": "date-time" },
            "updated_at": { "type": "string", "format": "date-time" }
        },
        "required": [
            "id", "owner_id", "name", "location", "price", "status", "created_at", "updated_at"
        ]
    });

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "Browse properties",
                    "tags": ["Properties"],
                    "parameters": [
                        { "name": "owner_id", "in": "query", "schema": { "type": "string", "format": "uuid" } },
                        { "name": "status", "in": "query", "schema": { "type": "string", "enum": ["active", "inactive"] } },
                        { "name": "location", "in": "query", "schema": { "type": "string" } }
                    ],
                    "responses": {
                        "200": json_response("Properties, newest first", schema_list("Property")),
                        "400": error_response("Malformed filter")
                    }
                },
                "post": {
                    "summary": "List a property (seller)",
                    "tags": ["Properties"],
                    "security": bearer(),
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": schema_ref("CreateProperty") } }
                    },
                    "responses": {
                        "201": json_response("Created property", schema_ref("Property")),
                        "403": error_response("Seller role required"),
                        "422": error_response("Validation error")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a property",
                    "tags": ["Properties"],
                    "parameters": [uuid_path_param("id")],
                    "responses": {
                        "200": json_response("Property", schema_ref("Property")),
                        "404": error_response("Property not found")
                    }
                },
                "put": {
                    "summary": "Update a property (owner or admin)",
                    "tags": ["Properties"],
                    "security": bearer(),
                    "parameters": [uuid_path_param("id")],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": schema_ref("UpdateProperty") } }
                    },
                    "responses": {
                        "200": json_response("Updated property", schema_ref("Property")),
                        "403": error_response("Not the owner"),
                        "404": error_response("Property not found"),
                        "422": error_response("Validation error")
                    }
                },
                "delete": {
                    "summary": "Delete a property (owner or admin)",
                    "tags": ["Properties"],
                    "security": bearer(),
                    "parameters": [uuid_path_param("id")],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "403": error_response("Not the owner"),
                        "404": error_response("Property not found"),
                        "409": error_response("Property has active bookings")
                    }
                }
            },
            "/{id}/bookings": {
                "get": {
                    "summary": "Bookings of a property (owner or admin)",
                    "tags": ["Properties"],
                    "security": bearer(),
                    "parameters": [uuid_path_param("id")],
                    "responses": {
                        "200": json_response("Bookings, newest first", schema_list("Booking")),
                        "403": error_response("Not the owner"),
                        "404": error_response("Property not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Property": property_schema,
                "CreateProperty": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "location": { "type": "string", "minLength": 1 },
                        "description": { "type": "string" },
                        "price": { "type": "number", "minimum": 0, "maximum": MAX_NIGHTLY_PRICE },
                        "status": { "type": "string", "enum": ["active", "inactive"] }
                    },
                    "required": ["name", "location", "price"]
                },
                "UpdateProperty": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "location": { "type": "string", "minLength": 1 },
                        "description": { "type": "string" },
                        "price": { "type": "number", "minimum": 0, "maximum": MAX_NIGHTLY_PRICE },
                        "status": { "type": "string", "enum": ["active", "inactive"] }
                    }
                }
            }
        }
    })
}

/// Create a new instance of the properties module
pub fn create_module(state: AppState) -> Arc<dyn Module> {
    Arc::new(PropertiesModule::new(state))
}
