//! Small helpers shared by the HTTP modules.

use serde_json::{json, Value};

/// OpenAPI response object carrying a JSON body of `schema`.
pub fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

/// OpenAPI `$ref` to a component schema.
pub fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

/// OpenAPI array of a component schema.
pub fn schema_list(name: &str) -> Value {
    json!({ "type": "array", "items": schema_ref(name) })
}

/// OpenAPI response object for the shared error envelope.
pub fn error_response(description: &str) -> Value {
    json_response(description, schema_ref("ErrorResponse"))
}

/// OpenAPI path parameter `{name}` holding a UUID.
pub fn uuid_path_param(name: &str) -> Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "schema": { "type": "string", "format": "uuid" }
    })
}

/// Security requirement for bearer-authenticated operations.
pub fn bearer() -> Value {
    json!([{ "bearer": [] }])
}
