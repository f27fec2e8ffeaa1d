//! In-process harness: real router and stores, pinned clock, no sockets.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use staybook_authz::Identity;
use staybook_db::Stores;
use staybook_kernel::clock::FixedClock;
use staybook_kernel::model::{
    Property, PropertyId, PropertyStatus, Role, User, UserId, UserRecord,
};
use staybook_kernel::settings::Settings;
use tower::ServiceExt;

use crate::state::AppState;

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(crate) struct TestApp {
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    router: Router,
}

impl TestApp {
    /// Fresh app whose clock reads 2025-05-01.
    pub fn new() -> Self {
        let mut settings = Settings::default();
        settings.auth.bcrypt_cost = 4;
        settings.bookings.completion_sweep_secs = 0;

        let clock = Arc::new(FixedClock::at_date(date(2025, 5, 1)));
        let state = AppState::new(settings.clone(), Stores::in_memory(), clock.clone());
        let registry = crate::build_registry(&state).expect("modules register");
        let router = staybook_http::build_router(&registry, &settings);

        Self {
            state,
            clock,
            router,
        }
    }

    /// Store an account directly and open a session for it.
    pub async fn account(&self, name: &str, role: Role) -> (String, User) {
        let now = Utc::now();
        let user = self
            .state
            .stores
            .users
            .insert(UserRecord {
                user: User {
                    id: UserId::new(),
                    name: name.to_string(),
                    email: format!("{}@example.test", name.to_lowercase()),
                    role,
                    created_at: now,
                    updated_at: now,
                },
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .expect("account inserted");
        let token = self.state.sessions.issue(Identity::new(user.id, role));
        (token, user)
    }

    /// Store an active listing owned by `owner` at `price` a night.
    pub async fn listing(&self, owner: &User, price: f64) -> Property {
        let now = Utc::now();
        self.state
            .stores
            .properties
            .insert(Property {
                id: PropertyId::new(),
                owner_id: owner.id,
                name: format!("{}'s place", owner.name),
                location: "Lisbon".to_string(),
                description: String::new(),
                price,
                status: PropertyStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("listing inserted")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(request(method, uri, token, body)).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }
}

pub(crate) fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request builds")
}
