use crate::candidates::{build_candidates, rewrite_port};
use crate::errors::PreviewError;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use crate::relay::{RelayContext, json_error, relay};
use crate::resolver::Resolver;
use crate::routes::{RouteError, parse_preview_path};
use bytes::Bytes;
use http::request::Parts;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use project_access::{Credentials, ProjectAccess};
use shared::http::into_boxed_response;
use shared::{gauge, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Serves one preview request end to end: route, authorize, resolve, relay.
pub struct PreviewHandler {
    access: ProjectAccess,
    resolver: Resolver,
    session_cookie: Option<String>,
    cache_max_age_secs: u64,
}

impl PreviewHandler {
    pub fn new(
        access: ProjectAccess,
        resolver: Resolver,
        session_cookie: Option<String>,
        cache_max_age_secs: u64,
    ) -> Self {
        Self {
            access,
            resolver,
            session_cookie,
            cache_max_age_secs,
        }
    }

    pub async fn handle(&self, parts: &Parts) -> Response<Bytes> {
        let mut guard = InflightGuard::start();
        let response = self.serve(parts).await;
        guard.status = Some(response.status());
        response
    }

    async fn serve(&self, parts: &Parts) -> Response<Bytes> {
        if parts.method != Method::GET {
            return json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
        }

        let request = match parse_preview_path(parts.uri.path()) {
            Ok(request) => request,
            Err(e @ RouteError::NotFound) => return json_error(StatusCode::NOT_FOUND, &e.to_string()),
            Err(e @ RouteError::InvalidPort(_)) => {
                return json_error(StatusCode::BAD_REQUEST, &e.to_string());
            }
        };

        // Session cookies are only used here and never forwarded upstream.
        let credentials = Credentials::from_headers(&parts.headers, self.session_cookie.as_deref());
        let grant = match self
            .access
            .authorize(&request.project_id, credentials.as_ref())
            .await
        {
            Ok(grant) => grant,
            Err(denial) => return json_error(denial.status(), &denial.to_string()),
        };

        let Some(sandbox_url) = grant.project.sandbox_url() else {
            return json_error(StatusCode::NOT_FOUND, "Sandbox not found");
        };

        let base_url = match request.port {
            Some(port) => rewrite_port(sandbox_url, port),
            None => sandbox_url.to_string(),
        };
        let candidates = build_candidates(
            &base_url,
            &request.path,
            request.directory_request,
            parts.uri.query(),
        );
        tracing::debug!(
            project_id = %request.project_id,
            port = ?request.port,
            candidates = ?candidates,
            "Resolving preview"
        );

        let resolution = self.resolver.resolve(&candidates).await;
        relay(
            resolution,
            &RelayContext {
                project_id: &request.project_id,
                port: request.port,
                cache_max_age_secs: self.cache_max_age_secs,
            },
        )
    }
}

/// Counts a request as in flight until dropped, then records its duration.
/// Requests abandoned by the client are recorded with status `cancelled`.
struct InflightGuard {
    start: Instant,
    status: Option<StatusCode>,
}

impl InflightGuard {
    fn start() -> Self {
        gauge!(REQUESTS_INFLIGHT).increment(1.0);
        InflightGuard {
            start: Instant::now(),
            status: None,
        }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        gauge!(REQUESTS_INFLIGHT).decrement(1.0);
        let status = match self.status {
            Some(status) => status.as_str().to_string(),
            None => "cancelled".to_string(),
        };
        histogram!(REQUEST_DURATION, "status" => status)
            .record(self.start.elapsed().as_secs_f64());
    }
}

#[derive(Clone)]
pub struct PreviewService {
    handler: Arc<PreviewHandler>,
}

impl PreviewService {
    pub fn new(handler: PreviewHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl Service<Request<Incoming>> for PreviewService {
    type Response = Response<BoxBody<Bytes, PreviewError>>;
    type Error = PreviewError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let handler = self.handler.clone();
        // Preview requests are GETs; the body is never read.
        let (parts, _body) = req.into_parts();

        Box::pin(async move { Ok(into_boxed_response(handler.handle(&parts).await)) })
    }
}
