/// Session Inactivity Guard
///
/// Runs once per authenticated request, after JWT validation and before any
/// handler. A session idle past the configured timeout is rejected and every
/// refresh token the user holds is invalidated; otherwise the request
/// advances the activity timestamp and proceeds.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;
use std::rc::Rc;

use crate::auth::{enforce_activity, Claims};
use crate::configuration::SessionSettings;
use crate::error::{AppError, AuthError};
use crate::request_logging::{AuditLog, RequestFailureLogger};

pub struct SessionGuard {
    pool: PgPool,
    settings: SessionSettings,
}

impl SessionGuard {
    pub fn new(pool: PgPool, settings: SessionSettings) -> Self {
        Self { pool, settings }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SessionGuardService {
            service: Rc::new(service),
            pool: self.pool.clone(),
            settings: self.settings.clone(),
        }))
    }
}

pub struct SessionGuardService<S> {
    service: Rc<S>,
    pool: PgPool,
    settings: SessionSettings,
}

impl<S, B> Service<ServiceRequest> for SessionGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Claims were injected by the JWT middleware running ahead of this guard
        let claims = req.extensions().get::<Claims>().cloned();

        let pool = self.pool.clone();
        let timeout_minutes = self.settings.inactivity_timeout_minutes;
        let service = self.service.clone();

        Box::pin(async move {
            let user_id = match claims {
                Some(claims) => claims.user_id()?,
                None => {
                    tracing::error!("Session guard reached without authenticated claims");
                    return Err(AppError::Auth(AuthError::MissingToken).into());
                }
            };

            match enforce_activity(&pool, user_id, timeout_minutes).await {
                Ok(()) => service.call(req).await,
                Err(e) => {
                    if matches!(e, AppError::Auth(AuthError::SessionExpired)) {
                        RequestFailureLogger::log_audit(
                            &AuditLog::new(
                                "EXPIRE_SESSION",
                                "session",
                                "FAILURE",
                                "Inactivity timeout exceeded, all refresh tokens invalidated",
                            )
                            .with_resource_id(user_id.to_string()),
                        );
                    }
                    Err(e.into())
                }
            }
        })
    }
}
