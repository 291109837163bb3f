//! HTTP boundary: welcome, health and the signed webhook endpoint.

pub mod auth;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod http;
pub mod models;

pub use auth::{sign_payload, verify_signature, AuthenticationError, SignatureVerifier};
pub use error::{GatewayError, HandlerError};
pub use gateway::{APIGateway, APIGatewayConfig};
pub use handler::RequestHandler;
pub use http::{build_router, GatewayState};
pub use models::{HealthStatus, WebhookRequest, WebhookResponse, WelcomeResponse};
