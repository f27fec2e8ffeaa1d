pub mod auth;
pub mod bookings;
pub mod properties;
pub mod users;

use staybook_kernel::ModuleRegistry;

use crate::state::AppState;

/// Register all application modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, state: &AppState) -> anyhow::Result<()> {
    registry.register(auth::create_module(state.clone()))?;
    registry.register(users::create_module(state.clone()))?;
    registry.register(properties::create_module(state.clone()))?;
    registry.register(bookings::create_module(state.clone()))?;
    Ok(())
}
