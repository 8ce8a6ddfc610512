//! HTTP API
//!
//! Requests pass through an ordered middleware pipeline (request logging,
//! then bearer-token auth) into an explicit route table. Only
//! [`server`] knows about hyper; everything else works on
//! [`ApiRequest`] and [`ApiResponse`].

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use auth::{AuthMiddleware, Claims, TokenIssuer, TokenKind, TokenPair};
pub use handlers::AppState;
pub use middleware::{Middleware, Next, Pipeline, RequestLog};
pub use request::{ApiRequest, Method};
pub use response::{ApiResponse, Envelope};
pub use router::Router;
pub use server::Server;

/// The API route table behind logging and auth
pub fn build_pipeline(issuer: TokenIssuer) -> Pipeline<AppState> {
    Pipeline::new(handlers::routes())
        .with(RequestLog)
        .with(AuthMiddleware::new(issuer))
}
