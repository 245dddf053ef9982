//! Access control list middleware for the BharatBartan payment server.
//! This middleware can be placed on any route or service.
//!
//! It checks the user resolved by [`super::BearerAuthFactory`] against the required roles for the route. If there is
//! no user, a 401 Unauthorized response is returned. If the user lacks any of the roles, a 403 Forbidden response is
//! returned. Otherwise, the request is allowed to continue.
//!
//! Setting `BB_ADMIN_AUTH=false` (see [`ServerOptions`]) switches the check off.

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
};
use futures::future::{ok, Ready};
use log::*;

use crate::{
    auth::{Role, UserRef},
    config::ServerOptions,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let enforce = req.app_data::<web::Data<ServerOptions>>().map_or(true, |o| o.admin_auth);
            if !enforce {
                trace!("🔐️ ACL checks are disabled. Allowing {}", req.path());
                return service.call(req).await;
            }
            let user = req.extensions().get::<UserRef>().cloned();
            let Some(user) = user else {
                let reason = req.extensions().get::<AuthError>().cloned().unwrap_or(AuthError::MissingToken);
                warn!("🔐️ Unauthenticated request for {} denied. {reason}", req.path());
                return Err(ServerError::AuthenticationError(reason).into());
            };
            if user.has_roles(&required_roles) {
                service.call(req).await
            } else {
                warn!("🔐️ {} does not have the roles {required_roles:?} needed for {}", user.subject, req.path());
                let reason = AuthError::InsufficientPermissions(format!("Required roles: {required_roles:?}"));
                Err(ServerError::AuthenticationError(reason).into())
            }
        })
    }
}
