//! hyper adapter: converts wire requests to [`ApiRequest`] and back

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use souq_types::{Error, Result};

use super::handlers::AppState;
use super::middleware::Pipeline;
use super::request::{ApiRequest, Method};
use super::response::{
    ApiResponse, STATUS_INTERNAL, STATUS_METHOD_NOT_ALLOWED, STATUS_PAYLOAD_TOO_LARGE,
};

/// Request bodies above this size are refused
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
    pipeline: Arc<Pipeline<AppState>>,
}

impl Server {
    pub async fn bind(addr: &str, state: AppState, pipeline: Pipeline<AppState>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Http(format!("failed to bind {}: {}", addr, e)))?;
        Ok(Self {
            listener,
            state: Arc::new(state),
            pipeline: Arc::new(pipeline),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tracing::info!(addr = %self.local_addr()?, "listening");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (tcp, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    let io = TokioIo::new(tcp);
                    let state = self.state.clone();
                    let pipeline = self.pipeline.clone();

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            handle(req, state.clone(), pipeline.clone())
                        });
                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            tracing::debug!(%peer, error = %err, "connection error");
                        }
                    });
                }
                _ = &mut shutdown => {
                    tracing::info!("shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<AppState>,
    pipeline: Arc<Pipeline<AppState>>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let api_req = match to_api_request(req).await {
        Ok(r) => r,
        Err(resp) => return Ok(to_hyper_response(&resp)),
    };
    let response = tokio::task::spawn_blocking(move || pipeline.dispatch(&state, api_req))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "handler panicked");
            ApiResponse::error(STATUS_INTERNAL, "internal server error")
        });
    Ok(to_hyper_response(&response))
}

async fn to_api_request(req: Request<Incoming>) -> std::result::Result<ApiRequest, ApiResponse> {
    let method: Method = req.method().as_str().parse().map_err(|_| {
        ApiResponse::error(
            STATUS_METHOD_NOT_ALLOWED,
            format!("method {} not allowed", req.method()),
        )
    })?;
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let mut api_req = ApiRequest::new(method, &target);
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            api_req = api_req.with_header(name.as_str(), value);
        }
    }

    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "failed to read body");
            ApiResponse::error(STATUS_PAYLOAD_TOO_LARGE, "request body too large or unreadable")
        })?
        .to_bytes();
    Ok(api_req.with_body(body.to_vec()))
}

fn to_hyper_response(resp: &ApiResponse) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(resp.to_bytes())));
    *response.status_mut() =
        StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in &resp.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }
    response
}
