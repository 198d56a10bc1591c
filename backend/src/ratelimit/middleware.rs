use super::limiter::{RateLimiter, Rejection};
use actix_web::{
    Error, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use futures::future::{Ready, ok};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Rejects requests with 429 once a client has used up any of the limiter's
/// windows. Clients are identified by the peer IP of the connection unless
/// proxy headers are trusted.
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
    trust_proxy_headers: bool,
}

impl RateLimitMiddleware {
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            limiter: Arc::new(limiter),
            trust_proxy_headers: false,
        }
    }

    /// Key clients on `Forwarded`/`X-Forwarded-For`. Only safe behind a proxy
    /// that overwrites those headers.
    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimitMiddlewareService {
            service: Arc::new(service),
            limiter: self.limiter.clone(),
            trust_proxy_headers: self.trust_proxy_headers,
        })
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Arc<S>,
    limiter: Arc<RateLimiter>,
    trust_proxy_headers: bool,
}

fn is_exempt(path: &str) -> bool {
    path == "/health" || path.starts_with("/static/")
}

fn client_identity(req: &ServiceRequest, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(addr) = req.connection_info().realip_remote_addr() {
            return addr.to_string();
        }
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn rejection_response(rejection: &Rejection) -> HttpResponse {
    // Round up so clients never retry a moment too early.
    let retry_after = rejection.retry_after.as_secs()
        + u64::from(rejection.retry_after.subsec_nanos() > 0);
    HttpResponse::TooManyRequests()
        .insert_header((header::RETRY_AFTER, retry_after.to_string()))
        .json(serde_json::json!({
            "error": format!("Rate limit exceeded: {}", rejection.limit)
        }))
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();
        let trust_proxy_headers = self.trust_proxy_headers;

        Box::pin(async move {
            if is_exempt(req.path()) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let client = client_identity(&req, trust_proxy_headers);
            match limiter.check(&client, req.path()) {
                Ok(()) => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(rejection) => {
                    log::warn!(
                        "Rate limit {} exceeded by {} on {}",
                        rejection.limit,
                        client,
                        req.path()
                    );
                    let (http_req, _payload) = req.into_parts();
                    let response = rejection_response(&rejection).map_into_right_body();
                    Ok(ServiceResponse::new(http_req, response))
                }
            }
        })
    }
}
