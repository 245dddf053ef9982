//! Bearer token middleware.
//!
//! Reads the `Authorization: Bearer <token>` header, if there is one, and resolves it to a [`UserRef`] with the
//! configured [`IdentityResolver`]. The user is stored in the request extensions for handlers and the
//! [`super::AclMiddlewareFactory`] to use.
//!
//! The middleware never rejects a request by itself. Storefront routes serve anonymous shoppers too, so a missing or
//! bad token only means that no user is attached. When resolution fails, the [`AuthError`] is stored in the extensions
//! instead, so that routes that do need a user can report why there isn't one.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    auth::{IdentityResolver, UserRef},
    errors::AuthError,
};

pub struct BearerAuthFactory<R> {
    resolver: Rc<R>,
}

impl<R> BearerAuthFactory<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver: Rc::new(resolver) }
    }
}

impl<S, B, R> Transform<S, ServiceRequest> for BearerAuthFactory<R>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    R: IdentityResolver + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = BearerAuthService<S, R>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthService { resolver: Rc::clone(&self.resolver), service: Rc::new(service) }))
    }
}

pub struct BearerAuthService<S, R> {
    resolver: Rc<R>,
    service: Rc<S>,
}

impl<S, B, R> Service<ServiceRequest> for BearerAuthService<S, R>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    R: IdentityResolver + 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match bearer_token(&req).map(|token| self.resolver.resolve_current_user(token)) {
            Some(Ok(user)) => {
                trace!("🔐️ Request made by {}", user.subject);
                req.extensions_mut().insert::<UserRef>(user);
            },
            Some(Err(e)) => {
                debug!("🔐️ Bearer token was not accepted. {e}");
                req.extensions_mut().insert::<AuthError>(e);
            },
            None => trace!("🔐️ Anonymous request"),
        }
        let service = Rc::clone(&self.service);
        Box::pin(async move { service.call(req).await })
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim()).filter(|t| !t.is_empty())
}
