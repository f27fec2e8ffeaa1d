use async_trait::async_trait;
use axum::Router;

/// Read-only context handed to `init` and `start`.
///
/// Modules receive their collaborators at construction; this only carries
/// the loaded settings.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Core module trait that all Staybook modules implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module; routes mount under `/api/{name}`
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment with `paths` relative to the module prefix and
    /// `components.schemas`; merged into one document at startup
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Spawn background work, such as periodic sweeps.
    /// Called once every module has initialized.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop background tasks and release resources
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
