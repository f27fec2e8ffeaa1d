//! Staybook application library
//!
//! Wires the stores, the booking service, and the HTTP modules into a
//! runnable server.

pub mod modules;
pub mod state;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use anyhow::Context;
use staybook_db::Stores;
use staybook_kernel::clock::SystemClock;
use staybook_kernel::settings::Settings;
use staybook_kernel::{InitCtx, ModuleRegistry};

pub use state::AppState;

/// Build a registry holding every application module
pub fn build_registry(state: &AppState) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, state)?;
    Ok(registry)
}

/// Open the stores, run the module lifecycle, and serve until shutdown.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let stores = Stores::open(&settings.database).context("failed to open stores")?;
    let state = AppState::new(settings.clone(), stores, Arc::new(SystemClock));
    let registry = build_registry(&state)?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served =
        staybook_http::start_server(&registry, &settings, staybook_http::shutdown_signal()).await;

    if let Err(e) = registry.stop_all().await {
        tracing::error!(error = %e, "module shutdown failed");
    }
    served
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn health_and_merged_openapi_document() {
        let app = TestApp::new();

        let (status, body) = app.call(Method::GET, "/healthz", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");

        let (status, doc) = app.call(Method::GET, "/docs/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        for path in [
            "/api/auth/register",
            "/api/users/{id}",
            "/api/properties",
            "/api/properties/{id}/bookings",
            "/api/bookings",
            "/api/bookings/{id}/confirm",
            "/api/bookings/{id}/cancel",
        ] {
            assert!(doc["paths"].get(path).is_some(), "missing {path}");
        }
        for schema in ["Booking", "Property", "User", "ErrorResponse"] {
            assert!(doc["components"]["schemas"].get(schema).is_some());
        }
    }

    #[test]
    fn registry_holds_every_module_once() {
        let app = TestApp::new();
        let registry = crate::build_registry(&app.state).unwrap();
        let names: Vec<_> = registry.modules().iter().map(|m| m.name()).collect();
        assert_eq!(names, ["auth", "users", "properties", "bookings"]);
    }
}
