//! HMAC middleware for Actix Web.
//!
//! Shopify signs every webhook body with the app's webhook secret (`SSG_SHOPIFY_HMAC_SECRET`) and sends the base64
//! HMAC-SHA256 in the `X-Shopify-Hmac-Sha256` header. This middleware verifies it over the exact body bytes before
//! the request reaches a handler, and then puts the body back so that the handler can read it again.
//!
//! Requests are rejected without touching any state:
//! * a missing required header (topic, webhook id) gives 400,
//! * a missing or invalid signature gives 401.

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
use ssg_common::Secret;

use crate::{
    errors::{ServerError, WebhookAuthError},
    helpers::verify_hmac,
};

pub struct HmacMiddlewareFactory {
    hmac_header: String,
    required_headers: Vec<&'static str>,
    key: Secret<String>,
    // If false, then the middleware will not check the HMAC signature. Required headers are still enforced.
    enabled: bool,
}

impl HmacMiddlewareFactory {
    pub fn new(hmac_header: &str, key: Secret<String>, enabled: bool) -> Self {
        HmacMiddlewareFactory { hmac_header: hmac_header.into(), required_headers: vec![], key, enabled }
    }

    /// Headers that must be present before the signature is even looked at.
    pub fn require_headers(mut self, headers: &[&'static str]) -> Self {
        self.required_headers.extend_from_slice(headers);
        self
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
            required_headers: self.required_headers.clone(),
            key: self.key.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct HmacMiddlewareService<S> {
    hmac_header: String,
    required_headers: Vec<&'static str>,
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
        let required_headers = self.required_headers.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            trace!("🔐️ Checking HMAC for request");
            if let Some(&missing) = required_headers.iter().find(|h| !req.headers().contains_key(**h)) {
                warn!("🔐️ Webhook request is missing the {missing} header. Rejecting.");
                return Err(ServerError::from(WebhookAuthError::MissingHeader(missing)).into());
            }
            if !enabled {
                trace!("🔐️ HMAC checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let signature = match req.headers().get(&hmac_header).and_then(|v| v.to_str().ok()) {
                Some(s) => s.to_string(),
                None => {
                    warn!("🔐️ No HMAC signature found in request. Denying access.");
                    return Err(ServerError::from(WebhookAuthError::MissingSignature).into());
                },
            };
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ServerError::InvalidRequestBody("Failed to extract request data.".into())
            })?;
            if verify_hmac(&secret, data.as_ref(), &signature) {
                trace!("🔐️ HMAC check for request ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid HMAC signature found in request. Denying access.");
                Err(ServerError::from(WebhookAuthError::InvalidSignature).into())
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
