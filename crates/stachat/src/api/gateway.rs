use std::{net::SocketAddr, sync::Arc};

use axum::{serve, Router};
use chrono::Utc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{
    api::{
        auth::SignatureVerifier,
        error::GatewayError,
        handler::RequestHandler,
        http::{build_router, GatewayState},
    },
    config::ServerConfig,
    pipeline::AnswerPipeline,
};

#[derive(Debug, Clone)]
pub struct APIGatewayConfig {
    pub bind_addr: SocketAddr,
    pub verifier: SignatureVerifier,
    pub max_question_chars: Option<usize>,
}

impl APIGatewayConfig {
    pub fn from_server_config(server: &ServerConfig) -> Result<Self, GatewayError> {
        let bind_addr = format!("{}:{}", server.host, server.port)
            .parse()
            .map_err(|err| GatewayError::Internal(format!("invalid bind address: {}", err)))?;
        Ok(Self {
            bind_addr,
            verifier: SignatureVerifier::new(
                server.webhook_secret.clone(),
                server.signature_header.as_str(),
                server.allow_unsigned,
            ),
            max_question_chars: server.max_question_chars,
        })
    }
}

pub struct APIGateway {
    config: APIGatewayConfig,
    state: GatewayState,
}

impl APIGateway {
    pub fn new(config: APIGatewayConfig, pipeline: Arc<AnswerPipeline>) -> Self {
        let state = GatewayState {
            handler: RequestHandler::new(pipeline)
                .with_max_question_chars(config.max_question_chars),
            verifier: Arc::new(config.verifier.clone()),
            started_at: Utc::now(),
        };
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn start(&self) -> Result<(), GatewayError> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|err| GatewayError::Internal(err.to_string()))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until Ctrl-C.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GatewayError> {
        let address = listener
            .local_addr()
            .map_err(|err| GatewayError::Internal(err.to_string()))?;
        let verifier = &self.config.verifier;
        if verifier.allows_unsigned() {
            warn!("Webhook signature verification is disabled");
        } else if !verifier.has_secret() {
            warn!("No webhook secret configured; every webhook request will be rejected");
        }
        info!(address = %address, "starting API gateway");

        serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|err| GatewayError::Internal(err.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
