//! Admin token middleware.
//!
//! Admin routes must carry the configured token in the `x-admin-token` header. If no token is configured, admin routes
//! are switched off and answer 403.
use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{config::AdminToken, errors::ServerError, helpers::header_value};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Default)]
pub struct AdminTokenMiddlewareFactory;

impl AdminTokenMiddlewareFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminTokenMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminTokenMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminTokenMiddlewareService { service: Rc::new(service) })
    }
}

pub struct AdminTokenMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminTokenMiddlewareService<S>
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
        Box::pin(async move {
            let token = req.app_data::<web::Data<AdminToken>>().map(|t| t.0.clone()).unwrap_or_default();
            if token.is_empty() {
                warn!("🔐️ Admin request to {} refused. No admin token is configured", req.path());
                return Err(ServerError::AdminDisabled.into());
            }
            let authorised = header_value(&req, ADMIN_TOKEN_HEADER).map(|t| token.matches(t)).unwrap_or(false);
            if authorised {
                trace!("🔐️ Admin token accepted for {}", req.path());
                service.call(req).await
            } else {
                warn!("🔐️ Admin request to {} refused. Missing or invalid token", req.path());
                Err(ServerError::InvalidAdminToken.into())
            }
        })
    }
}
