//! Authentication extractor.
//!
//! Requests carry an HS256 bearer token with `{sub, admin, exp, iat}` claims.
//! Handlers that mutate another user's wallet additionally require the
//! `admin` claim.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use coin_ledger_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// JWT claims carried by bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Elevated-caller flag.
    #[serde(default)]
    pub admin: bool,
    /// Expiration time (unix seconds).
    pub exp: i64,
    /// Issued at (unix seconds).
    pub iat: i64,
}

/// An authenticated user extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
    /// Whether the caller carries the elevated `admin` claim.
    pub admin: bool,
}

impl AuthUser {
    /// Check the capability rule for operating on `target`: the caller must
    /// be the target user or an admin.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` otherwise.
    pub fn authorize_for(&self, target: &UserId) -> Result<(), ApiError> {
        if self.admin || self.user_id == *target {
            Ok(())
        } else {
            Err(ApiError::PermissionDenied(
                "caller may not operate on another user's wallet".into(),
            ))
        }
    }

    /// Require the elevated `admin` claim.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for non-admin callers.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.admin {
            Ok(())
        } else {
            Err(ApiError::PermissionDenied("admin claim required".into()))
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let auth_header = parts
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthenticated)?;

            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(ApiError::Unauthenticated)?;

            let key = DecodingKey::from_secret(state.config.auth_secret.as_bytes());
            let mut validation = Validation::default();
            validation.validate_aud = false;

            let data = decode::<Claims>(token, &key, &validation).map_err(|e| {
                tracing::debug!(error = %e, "Bearer token rejected");
                ApiError::Unauthenticated
            })?;

            let user_id = data
                .claims
                .sub
                .parse::<UserId>()
                .map_err(|_| ApiError::Unauthenticated)?;

            Ok(AuthUser {
                user_id,
                admin: data.claims.admin,
            })
        })
    }
}
