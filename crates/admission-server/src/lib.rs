mod api;
pub mod certs;
pub mod cli;
pub mod config;
pub mod tracing;

use ::tracing::{info, warn};
use anyhow::{Result, anyhow};
use axum::{Router, routing::post};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use gateway_validator::AdmissionEngine;
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    metrics::in_flight_requests::{InFlightRequestsCounter, InFlightRequestsLayer},
    trace::TraceLayer,
};

use crate::api::{
    handlers::{method_not_allowed_handler, validate_handler},
    state::ApiServerState,
};
use crate::config::Config;

pub const VALIDATE_PATH: &str = "/validate";

pub struct AdmissionServer {
    router: Router,
    addr: SocketAddr,
    tls_config: RustlsConfig,
    shutdown_timeout: Duration,
    handle: Handle,
    in_flight: InFlightRequestsCounter,
}

impl AdmissionServer {
    /// Loads the serving keypair and builds the router. Fails when the
    /// keypair cannot be used.
    pub async fn new_from_config(config: Config) -> Result<Self> {
        let tls_config = certs::create_tls_config(&config.tls_config).await?;
        let engine = AdmissionEngine::gateway_api();
        info!(
            resources = engine.registry().len(),
            "admission engine ready"
        );

        let (in_flight_layer, in_flight) = InFlightRequestsLayer::pair();

        Ok(Self {
            router: router(engine).layer(in_flight_layer),
            addr: config.addr,
            tls_config,
            shutdown_timeout: config.shutdown_timeout,
            handle: Handle::new(),
            in_flight,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle of the HTTPS listener, resolves the bound address once
    /// serving started
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Number of requests currently being served
    pub fn in_flight_requests(&self) -> InFlightRequestsCounter {
        self.in_flight.clone()
    }

    /// Serves HTTPS until SIGTERM or SIGINT is received.
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves HTTPS until `shutdown` resolves, then stops accepting
    /// connections and waits for the requests in flight.
    ///
    /// Only requests count against the shutdown timeout: once it expires
    /// with no request in flight, the connections left (idle or still in the
    /// TLS handshake) are closed and the shutdown is clean. A request still
    /// running at that point is an error.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let handle = self.handle;
        let server = axum_server::bind_rustls(self.addr, self.tls_config)
            .handle(handle.clone())
            .serve(self.router.into_make_service());
        tokio::pin!(server);

        info!(address = %self.addr, "starting HTTPS server");
        tokio::select! {
            result = &mut server => {
                return result.map_err(|e| anyhow!("HTTPS server error: {e}"));
            }
            signal = shutdown => signal?,
        }

        info!(
            timeout_seconds = self.shutdown_timeout.as_secs(),
            requests = self.in_flight.get(),
            "shutdown signal received, waiting for in-flight requests"
        );
        handle.graceful_shutdown(None);

        let deadline = tokio::time::sleep(self.shutdown_timeout);
        tokio::pin!(deadline);
        tokio::select! {
            result = &mut server => {
                result.map_err(|e| anyhow!("HTTPS server error: {e}"))?;
                info!("server stopped");
                return Ok(());
            }
            _ = &mut deadline => {}
        }

        let pending = self.in_flight.get();
        if pending > 0 {
            warn!(requests = pending, "shutdown timeout expired");
            return Err(anyhow!(
                "in-flight requests did not complete within {} seconds",
                self.shutdown_timeout.as_secs()
            ));
        }

        info!(
            connections = handle.connection_count(),
            "closing connections without requests"
        );
        handle.shutdown();
        Ok(())
    }
}

/// Router of the webhook, independent of the transport
pub fn router(engine: AdmissionEngine) -> Router {
    let state = Arc::new(ApiServerState { engine });

    Router::new()
        .route(
            VALIDATE_PATH,
            post(validate_handler).fallback(method_not_allowed_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())
            .map_err(|e| anyhow!("cannot install SIGTERM handler: {e}"))?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.map_err(|e| anyhow!("cannot install SIGINT handler: {e}"))?
            }
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow!("cannot install SIGINT handler: {e}"))?;

    Ok(())
}
