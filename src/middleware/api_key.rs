use crate::errors::AppError;
use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

pub const API_KEY_HEADER: &str = "apikey";

/// Rejects requests whose `apikey` header is missing or does not match the
/// configured client key.
pub struct ApiKeyMiddleware {
    key: Arc<str>,
}

impl ApiKeyMiddleware {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        ApiKeyMiddleware { key: key.into() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyMiddlewareService {
            service,
            key: self.key.clone(),
        }))
    }
}

pub struct ApiKeyMiddlewareService<S> {
    service: S,
    key: Arc<str>,
}

impl<S> ApiKeyMiddlewareService<S> {
    fn accepts(&self, req: &ServiceRequest) -> bool {
        match req.headers().get(API_KEY_HEADER) {
            Some(value) => value.as_bytes().ct_eq(self.key.as_bytes()).into(),
            None => false,
        }
    }
}

impl<S, B> Service<ServiceRequest> for ApiKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !self.accepts(&req) {
            warn!(path = %req.path(), "Rejected request without a valid API key");
            let (req, _pl) = req.into_parts();
            let res = AppError::Unauthorized("Invalid or missing API key".to_string()).error_response();
            return Box::pin(async move { Ok(ServiceResponse::new(req, res).map_into_right_body()) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}
