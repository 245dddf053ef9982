//! Bearer token identities.
//!
//! The storefront's identity provider signs in customers and administrators, and hands them a stateless access token.
//! The server only ever needs to answer one question about a token: who does it belong to? That is the job of
//! [`IdentityResolver`].
//!
//! The bundled resolver, [`HmacTokenResolver`], accepts tokens of the form
//!
//! ```text
//!    base64url(json(UserRef)) "." hex(hmac_sha256(secret, base64url(json(UserRef))))
//! ```
//!
//! where `secret` is shared with the identity provider (`BB_AUTH_TOKEN_SECRET`). Tokens carry their own expiry.
use std::fmt::Display;

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use bb_common::Secret;
use bb_payment_engine::helpers::{sign, verify};
use chrono::Utc;
use futures::future::{ready, Ready};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

/// The signed-in user making a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// The identity provider's id for the user
    pub subject: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Unix timestamp after which the token is no longer accepted
    pub exp: i64,
}

impl UserRef {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_roles(&self, roles: &[Role]) -> bool {
        roles.iter().all(|r| self.has_role(*r))
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }

    /// The user's email address, if the identity provider supplied a usable one.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Extracts the user placed in the request extensions by [`crate::middleware::BearerAuthFactory`].
///
/// Use `Option<UserRef>` in handlers that also serve anonymous requests.
impl FromRequest for UserRef {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<UserRef>().cloned();
        ready(user.ok_or(ServerError::AuthenticationError(AuthError::MissingToken)))
    }
}

/// Resolves an access token to the user it was issued to.
pub trait IdentityResolver {
    fn resolve_current_user(&self, token: &str) -> Result<UserRef, AuthError>;
}

#[derive(Clone)]
pub struct HmacTokenResolver {
    secret: Secret<String>,
}

impl HmacTokenResolver {
    pub fn new(config: &AuthConfig) -> Self {
        Self { secret: config.token_secret.clone() }
    }
}

impl IdentityResolver for HmacTokenResolver {
    fn resolve_current_user(&self, token: &str) -> Result<UserRef, AuthError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a payload and a signature".into()))?;
        if !verify(self.secret.reveal().as_bytes(), payload.as_bytes(), signature) {
            return Err(AuthError::ValidationError("Signature does not match".into()));
        }
        let json = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let user = serde_json::from_slice::<UserRef>(&json).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        if user.is_expired() {
            debug!("🔐️ Token for {} expired at {}", user.subject, user.exp);
            return Err(AuthError::TokenExpired);
        }
        trace!("🔐️ Token resolved to {}", user.subject);
        Ok(user)
    }
}

/// Signs access tokens in the format [`HmacTokenResolver`] accepts. The identity provider does the same with its copy
/// of the secret; the server uses this in tools and tests.
pub struct TokenIssuer {
    secret: Secret<String>,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { secret: config.token_secret.clone() }
    }

    pub fn issue_token(&self, user: &UserRef) -> Result<String, AuthError> {
        let json = serde_json::to_vec(user).map_err(|e| AuthError::ValidationError(e.to_string()))?;
        let payload = base64::encode_config(json, base64::URL_SAFE_NO_PAD);
        let signature = sign(self.secret.reveal().as_bytes(), payload.as_bytes())
            .ok_or_else(|| AuthError::ValidationError("The token secret is empty".into()))?;
        Ok(format!("{payload}.{signature}"))
    }
}
