//! `AuthUser` extractor: pulls the JWT from the Authorization header, validates it, and injects context.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use defdrive_core::error::AppError;
use defdrive_service::RequestContext;

use crate::error::ApiError;
use crate::state::AppState;

/// Extracted authenticated user context available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub RequestContext);

impl AuthUser {
    /// Returns the inner `RequestContext`.
    pub fn context(&self) -> &RequestContext {
        &self.0
    }
}

impl std::ops::Deref for AuthUser {
    type Target = RequestContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))?;

        let claims = state.jwt_decoder.decode_access_token(token.trim())?;
        let user_id = claims.user_id();

        Ok(AuthUser(RequestContext::new(user_id, claims.username)))
    }
}

/// The caller's identity when one is presented, for endpoints that also
/// serve anonymous callers.
///
/// A missing header yields `None`. So does an invalid or expired token:
/// such a caller is treated as anonymous, which only narrows what it may do.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<RequestContext>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(OptionalAuthUser(None));
        }

        match AuthUser::from_request_parts(parts, state).await {
            Ok(AuthUser(ctx)) => Ok(OptionalAuthUser(Some(ctx))),
            Err(ApiError(e)) => {
                tracing::debug!(error = %e, "Ignoring unusable bearer token");
                Ok(OptionalAuthUser(None))
            }
        }
    }
}
