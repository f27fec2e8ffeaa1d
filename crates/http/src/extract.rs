//! Request extractors shared by every module.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::Json;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use serde::de::DeserializeOwned;
use staybook_authz::{Identity, TokenVerifier};

use crate::error::AppError;

/// Caller authenticated through an `Authorization: Bearer` header.
///
/// The state must hand out the token verifier via `FromRef`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
    pub token: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<dyn TokenVerifier>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized("missing or malformed bearer token"))?;

        let verifier = <Arc<dyn TokenVerifier> as FromRef<S>>::from_ref(state);
        let identity = verifier
            .verify(bearer.token())
            .ok_or_else(|| AppError::unauthorized("invalid or expired token"))?;

        Ok(Self {
            identity,
            token: bearer.token().to_string(),
        })
    }
}

/// JSON body that is deserialized and then checked with `garde`.
///
/// Malformed JSON is a 400; a body that parses but breaks a field rule is a 422.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + garde::Validate + Send,
    <T as garde::Validate>::Context: Default,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}
