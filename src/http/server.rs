//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the gated API routes
//! - Order the gate: attestation, then rate limiting, then the handler
//! - Wire up cross-cutting layers (timeout, request id, tracing, headers)
//! - Serve plain or TLS with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::attestation::TokenVerifier;
use crate::completion::CompletionService;
use crate::config::{ServiceConfig, TlsConfig};
use crate::http::handlers;
use crate::http::middleware::attestation_middleware;
use crate::lifecycle::{assemble, shutdown_signal, Components, StartupError};
use crate::outbound::SafeFetcher;
use crate::security::headers::{no_store_layer, nosniff_layer};
use crate::security::rate_limit::rate_limit_middleware;
use crate::security::store::MemoryStore;
use crate::security::RateLimiter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub limiter: Arc<RateLimiter>,
    pub fetcher: Arc<SafeFetcher>,
    pub completion: Arc<dyn CompletionService>,
    pub max_body_bytes: usize,
    pub max_page_text_chars: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    memory_store: Option<Arc<MemoryStore>>,
}

impl HttpServer {
    /// Build all collaborators from configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, StartupError> {
        let components = assemble(&config)?;
        Ok(Self::with_components(config, components))
    }

    /// Build around pre-made collaborators (stub completion, fixed resolver).
    pub fn with_components(config: ServiceConfig, components: Components) -> Self {
        let router = Self::build_router(&config, components.state);
        Self {
            router,
            config,
            memory_store: components.memory_store,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let mut gated = Router::new()
            .route("/api/parse", post(handlers::parse))
            .route("/api/enrich", post(handlers::enrich));

        // Layers added later run first: attestation wraps the limiter.
        if config.rate_limit.enabled {
            gated = gated.route_layer(middleware::from_fn_with_state(
                state.limiter.clone(),
                rate_limit_middleware,
            ));
        } else {
            tracing::warn!("Rate limiting disabled by configuration");
        }
        gated = gated.route_layer(middleware::from_fn_with_state(
            state.verifier.clone(),
            attestation_middleware,
        ));

        let mut router = Router::new()
            .route("/healthz", get(handlers::health))
            .merge(gated)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        if config.security.enable_headers {
            router = router.layer(no_store_layer()).layer(nosniff_layer());
        }

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    fn spawn_sweeper(&self, shutdown: &broadcast::Receiver<()>) {
        let every = self.config.rate_limit.sweep_interval_secs;
        if let (Some(store), true) = (&self.memory_store, every > 0) {
            store
                .clone()
                .spawn_sweeper(Duration::from_secs(every), shutdown.resubscribe());
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.spawn_sweeper(&shutdown);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run with TLS termination.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
        tracing::info!(address = %addr, "HTTPS server starting");

        self.spawn_sweeper(&shutdown);

        let handle = axum_server::Handle::new();
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let signal_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal(shutdown).await;
            signal_handle.graceful_shutdown(Some(grace));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// The assembled router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::attestation::AttestationToken;
    use crate::completion::CompletionError;
    use crate::outbound::StaticResolver;

    struct EchoCompletion;

    #[async_trait]
    impl CompletionService for EchoCompletion {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            Ok(r#"{"firstName":"Anna"}"#.to_string())
        }
    }

    fn test_server(config: ServiceConfig) -> HttpServer {
        let limiter = RateLimiter::new(
            Arc::new(MemoryStore::new()),
            config.rate_limit.limit,
            config.rate_limit.window(),
            config.rate_limit.on_store_error,
        );
        let state = AppState {
            verifier: crate::attestation::build_verifier(&config.attestation).unwrap(),
            limiter: Arc::new(limiter),
            fetcher: Arc::new(SafeFetcher::new(&config.outbound, Arc::new(StaticResolver::new()))),
            completion: Arc::new(EchoCompletion),
            max_body_bytes: config.security.max_body_bytes,
            max_page_text_chars: config.outbound.max_page_text_chars,
        };
        HttpServer::with_components(
            config,
            Components {
                state,
                memory_store: None,
            },
        )
    }

    fn token() -> String {
        AttestationToken {
            device_id: "unit-device".into(),
            bundle_id: "s.Wizytowki.Test1234".into(),
            issuer: "JK6DX9TLGX".into(),
            timestamp: crate::attestation::unix_seconds(std::time::SystemTime::now()),
        }
        .encode()
    }

    fn parse_request(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::post("/api/parse").header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("x-attest-token", token);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let router = test_server(ServiceConfig::default()).router();
        let res = router
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_gate_order_without_peer_address() {
        let router = test_server(ServiceConfig::default()).router();

        let res = router
            .clone()
            .oneshot(parse_request(None, "{broken"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = router
            .clone()
            .oneshot(parse_request(Some(&token()), "{broken"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = router
            .oneshot(parse_request(Some(&token()), r#"{"text":"Anna Nowak"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["firstName"], "Anna");
    }

    #[tokio::test]
    async fn test_headers_can_be_disabled() {
        let mut config = ServiceConfig::default();
        config.security.enable_headers = false;
        config.rate_limit.enabled = false;
        let router = test_server(config).router();

        let res = router
            .oneshot(parse_request(Some(&token()), r#"{"text":"Anna"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(!res.headers().contains_key("cache-control"));
        assert!(!res.headers().contains_key("x-ratelimit-remaining"));
    }
}
