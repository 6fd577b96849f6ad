//! HMAC middleware for Actix Web.
//!
//! The email webhook can trigger a payout, so only the mail relay that shares `SOLUPI_WEBHOOK_SECRET` with the server
//! may call it. The relay signs the raw request body with HMAC-SHA256 and sends the base64-encoded signature in the
//! `X-Solupi-Hmac-SHA256` header. Requests without a valid signature are rejected with `403 Forbidden` before they
//! reach the route handler.
//!
//! An empty secret never validates, so a server that has not been given one rejects every webhook call.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use solupi_common::Secret;

use crate::{errors::ServerError, helpers::verify_hmac};

pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Solupi-Hmac-SHA256";

pub struct HmacMiddlewareFactory {
    hmac_header: String,
    key: Secret<String>,
    // If false, then the middleware will not check the HMAC signature and always allow the call
    enabled: bool,
}

impl HmacMiddlewareFactory {
    pub fn new(hmac_header: &str, key: Secret<String>, enabled: bool) -> Self {
        HmacMiddlewareFactory { hmac_header: hmac_header.into(), key, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService {
            hmac_header: self.hmac_header.clone(),
            key: self.key.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct HmacMiddlewareService<S> {
    hmac_header: String,
    key: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.key.reveal().clone();
        let hmac_header = self.hmac_header.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            if !enabled {
                trace!("🔐️ Webhook signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract webhook request body: {e:?}");
                ServerError::InvalidRequestBody("Failed to read the request body".into())
            })?;
            let signature = req.headers().get(&hmac_header).and_then(|v| v.to_str().ok()).ok_or_else(|| {
                warn!("🔐️ No webhook signature found in request from {:?}. Denying access.", req.peer_addr());
                ServerError::InsufficientPermissions("No webhook signature found".into())
            })?;
            if secret.is_empty() || !verify_hmac(&secret, data.as_ref(), signature) {
                warn!("🔐️ Invalid webhook signature in request from {:?}. Denying access.", req.peer_addr());
                return Err(ServerError::InsufficientPermissions("Invalid webhook signature".into()).into());
            }
            trace!("🔐️ Webhook signature check ✅️");
            req.set_payload(bytes_to_payload(data));
            service.call(req).await
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
