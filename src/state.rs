//! Shared handler state.

use std::sync::Arc;

use axum::extract::FromRef;
use staybook_authz::{SessionStore, TokenVerifier};
use staybook_db::Stores;
use staybook_kernel::clock::Clock;
use staybook_kernel::settings::Settings;

use crate::modules::bookings::service::BookingService;

/// Everything a request handler may touch, passed explicitly through axum state.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub stores: Stores,
    pub sessions: Arc<SessionStore>,
    pub clock: Arc<dyn Clock>,
    pub bookings: Arc<BookingService>,
}

impl AppState {
    pub fn new(settings: Settings, stores: Stores, clock: Arc<dyn Clock>) -> Self {
        let sessions = Arc::new(SessionStore::new(
            settings.auth.session_ttl_secs,
            clock.clone(),
        ));
        let bookings = Arc::new(BookingService::new(
            stores.properties.clone(),
            stores.bookings.clone(),
            clock.clone(),
        ));
        Self {
            settings: Arc::new(settings),
            stores,
            sessions,
            clock,
            bookings,
        }
    }
}

impl FromRef<AppState> for Arc<dyn TokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
