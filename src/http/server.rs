//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the public submission surface
//! - Wire up middleware (request ID, tracing, timeouts, body limit, metrics)
//! - Seed configured forms into the repository
//! - Apply hot-reloaded configuration
//! - Start the admin listener when enabled
//! - Persist the repository snapshot on shutdown

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::config::FormforgeConfig;
use crate::http::request::MakeRequestUuidV4;
use crate::http::submit::{health_handler, preflight_handler, submit_handler};
use crate::intake::IntakeService;
use crate::notifier;
use crate::observability::metrics;
use crate::security::RateLimiter;
use crate::storage::{MemoryRepository, Repository, StorageError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<IntakeService>,
    pub repository: Arc<dyn Repository>,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<ArcSwap<FormforgeConfig>>,
}

/// HTTP server for the submission endpoint.
pub struct HttpServer {
    router: Router,
    state: AppState,
    repository: Arc<MemoryRepository>,
}

impl HttpServer {
    /// Create a server, restoring the snapshot if one is configured and present.
    pub fn new(config: FormforgeConfig) -> Result<Self, StorageError> {
        let repository = match config.storage.snapshot_path.as_deref() {
            Some(path) if Path::new(path).exists() => MemoryRepository::load_from_file(Path::new(path))?,
            Some(path) => MemoryRepository::new(Some(path.into())),
            None => MemoryRepository::new(None),
        };
        Ok(Self::with_repository(config, Arc::new(repository)))
    }

    /// Create a server around an existing repository.
    pub fn with_repository(config: FormforgeConfig, repository: Arc<MemoryRepository>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.submissions_per_minute));
        let notifier = notifier::from_config(&config.notifications);
        let intake = Arc::new(IntakeService::new(
            repository.clone(),
            limiter.clone(),
            notifier,
        ));

        let state = AppState {
            intake,
            repository: repository.clone(),
            limiter,
            config: Arc::new(ArcSwap::from_pointee(config.clone())),
        };
        seed_forms(&state, &config);

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            state,
            repository,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &FormforgeConfig, state: AppState) -> Router {
        let submit_path = format!(
            "{}/{{public_id}}",
            config.listener.submit_prefix.trim_end_matches('/')
        );

        Router::new()
            .route(&submit_path, post(submit_handler).options(preflight_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(middleware::from_fn(track_requests))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Router for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<FormforgeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let config = self.state.config.load_full();
        tracing::info!(
            address = %addr,
            prefix = %config.listener.submit_prefix,
            forms = config.forms.len(),
            "HTTP server starting"
        );

        let sweep_every = Duration::from_secs(config.rate_limit.sweep_interval_secs);
        tokio::spawn(
            self.state
                .limiter
                .clone()
                .run_sweeper(sweep_every, shutdown.resubscribe()),
        );

        let reload_state = self.state.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                apply_config(&reload_state, new_config);
            }
        });

        if config.admin.enabled {
            let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
            let admin_addr = admin_listener.local_addr()?;
            let admin_app = admin::setup_admin_router(self.state.clone());
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %admin_addr, "Admin API starting");
            tokio::spawn(async move {
                let served = axum::serve(admin_listener, admin_app)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        if let Err(e) = self.repository.save_to_file() {
            tracing::error!(error = %e, "Failed to save snapshot");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Upsert every configured form into the repository.
fn seed_forms(state: &AppState, config: &FormforgeConfig) {
    for form in &config.forms {
        match state.repository.upsert_form(form) {
            Ok(policy) => tracing::debug!(form = %policy.public_id, id = policy.id, "Form registered"),
            Err(e) => tracing::error!(form = %form.public_id, error = %e, "Failed to register form"),
        }
    }
}

/// Apply a reloaded configuration to the running server.
///
/// Listener addresses, timeouts and the body limit are fixed at startup.
pub fn apply_config(state: &AppState, config: FormforgeConfig) {
    let previous = state.limiter.limit();
    state.limiter.set_limit(config.rate_limit.submissions_per_minute);
    seed_forms(state, &config);

    tracing::info!(
        forms = config.forms.len(),
        previous_limit = previous,
        limit = config.rate_limit.submissions_per_minute,
        "Configuration reloaded"
    );
    state.config.store(Arc::new(config));
}

async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
