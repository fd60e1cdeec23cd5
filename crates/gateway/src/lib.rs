//! HTTP API gateway for CuraLink.
//!
//! Exposes `/health` and the JSON v1 API (flows, accounts, prescriptions,
//! intake, testimonials, directory). Built on Axum.

pub mod api_v1;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use curalink_config::{AppConfig, GatewayConfig};
use curalink_core::SystemClock;
use curalink_flows::{FlowRunner, FlowSet, FlowSettings};

pub use api_v1::{ApiState, SharedApiState};

/// Request bodies up to 10 MB, enough for a recorded consultation.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Build the full router: `/health`, `/v1/*`, and the cross-cutting layers.
///
/// Layers applied:
/// - CORS restricted to the configured origins
/// - Request body size limit
/// - Per-client rate limiting (`/health` exempt)
/// - HTTP trace logging
pub fn build_router(state: SharedApiState, gateway: &GatewayConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state.clone()))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES));

    if gateway.rate_limit_per_minute > 0 {
        let limiter = Arc::new(RateLimiter::new(
            gateway.rate_limit_per_minute,
            Duration::from_secs(60),
        ));
        app = app.layer(middleware::from_fn(move |req, next| {
            let limiter = limiter.clone();
            let state = state.clone();
            rate_limit_middleware(limiter, state, req, next)
        }));
    }

    app.layer(cors_layer(&gateway.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}

/// Build every shared subsystem once from config.
pub fn build_state(config: &AppConfig) -> Result<SharedApiState, Box<dyn std::error::Error>> {
    let router = curalink_providers::build_from_config(config);
    let provider = router
        .default()
        .ok_or_else(|| format!("Provider '{}' is not configured", config.default_provider))?;

    let runner = Arc::new(FlowRunner::new(provider, FlowSettings::from_config(config)));
    let flows = Arc::new(FlowSet::new(runner, config.directory.doctors.clone())?);
    let store = curalink_store::open_store(&config.storage)?;

    Ok(Arc::new(ApiState::new(
        flows,
        store,
        Arc::new(SystemClock),
        config.directory.clone(),
    )))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = build_state(&config)?;
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, provider = %config.default_provider, model = %config.default_model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

// --- Rate Limiter ---

/// In-memory sliding-window rate limiter keyed by client.
///
/// Each client may make `max_requests` within any `window`-long span.
struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: std::sync::Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the client is within its budget.
    fn check(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() > 10_000 {
            clients.retain(|_, stamps| {
                stamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let stamps = clients.entry(client_key.to_string()).or_default();
        stamps.retain(|t| now.duration_since(*t) < self.window);
        if stamps.len() >= self.max_requests {
            return false;
        }
        stamps.push(now);
        true
    }
}

/// Signed-in clients are keyed by their session token, everyone else by
/// peer IP. Tokens that match no session count as anonymous. `/health` is
/// exempt.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    state: SharedApiState,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let client_key = match token {
        Some(token) if state.has_session(&token).await => format!("session:{token}"),
        _ => format!("peer:{}", peer.as_deref().unwrap_or("unknown")),
    };

    if !limiter.check(&client_key) {
        let kind = client_key.split(':').next().unwrap_or("peer");
        warn!(client = kind, peer = peer.as_deref().unwrap_or("unknown"), "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(req).await)
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(gateway: &GatewayConfig) -> Router {
        let state = api_v1::tests::test_state(vec![]);
        build_router(state, gateway)
    }

    fn limited(per_minute: usize) -> GatewayConfig {
        GatewayConfig {
            rate_limit_per_minute: per_minute,
            ..GatewayConfig::default()
        }
    }

    fn directory_request(peer: [u8; 4], token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/v1/directory");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let mut req = builder.body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 40_000))));
        req
    }

    #[tokio::test]
    async fn health_endpoint() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app(&GatewayConfig::default()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limit_applies_to_v1_only() {
        let gateway = GatewayConfig {
            rate_limit_per_minute: 2,
            ..GatewayConfig::default()
        };
        let app = app(&gateway);

        for _ in 0..2 {
            let req = Request::builder().uri("/v1/directory").body(Body::empty()).unwrap();
            let response = app.clone().oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let req = Request::builder().uri("/v1/directory").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_tokens_share_the_peer_budget() {
        let app = app(&limited(2));
        let mut statuses = Vec::new();
        for i in 0..5 {
            let req = directory_request([10, 0, 0, 7], Some(&format!("made-up-{i}")));
            statuses.push(app.clone().oneshot(req).await.unwrap().status());
        }
        assert_eq!(&statuses[..2], &[StatusCode::OK, StatusCode::OK]);
        assert!(statuses[2..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
    }

    #[tokio::test]
    async fn anonymous_peers_have_separate_budgets() {
        let app = app(&limited(1));
        let first = app.clone().oneshot(directory_request([10, 0, 0, 1], None)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let again = app.clone().oneshot(directory_request([10, 0, 0, 1], None)).await.unwrap();
        assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = app.oneshot(directory_request([10, 0, 0, 2], None)).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signed_in_session_has_its_own_budget() {
        let state = api_v1::tests::test_state(vec![]);
        let token = state
            .open_session(curalink_store::CurrentUser {
                email: "jane@example.com".into(),
                role: curalink_store::AccountRole::Patient,
            })
            .await;
        let app = build_router(state, &limited(1));

        let peer = [192, 168, 1, 9];
        let anonymous = app.clone().oneshot(directory_request(peer, None)).await.unwrap();
        assert_eq!(anonymous.status(), StatusCode::OK);
        let blocked = app.clone().oneshot(directory_request(peer, None)).await.unwrap();
        assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

        let session = app.oneshot(directory_request(peer, Some(&token))).await.unwrap();
        assert_eq!(session.status(), StatusCode::OK);
    }

    #[test]
    fn rate_limiter_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    #[test]
    fn state_builds_from_default_config() {
        let mut config = AppConfig::default();
        config.storage.backend = "memory".into();
        let state = build_state(&config).unwrap();
        assert_eq!(state.flows.names().len(), 5);
        assert_eq!(state.directory.departments, config.directory.departments);
    }
}
