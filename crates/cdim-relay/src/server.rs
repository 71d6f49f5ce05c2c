//! HTTP listener: one axum router serves the WebSocket upgrade and the
//! plain-HTTP liveness check on the same port.

use std::net::SocketAddr;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::Method;
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use cdim_common::Result;
use cdim_config::RelayConfig;
use tokio::net::TcpListener;

use crate::connection::handle_connection;
use crate::health;
use crate::registry::{HistoryLimits, PairRegistry};

pub struct RelayServer {
    listener: TcpListener,
    registry: PairRegistry,
    outbox_capacity: usize,
}

impl RelayServer {
    /// Bind the configured address with a fresh registry.
    pub async fn bind(config: &RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.server.bind_addr()).await?;
        Ok(Self {
            listener,
            registry: PairRegistry::new(HistoryLimits::from(&config.history)),
            outbox_capacity: config.server.outbox_capacity as usize,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    /// Serve until the listener fails.
    pub async fn run(self) -> Result<()> {
        let app = router(self.registry, self.outbox_capacity);
        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    registry: PairRegistry,
    outbox_capacity: usize,
}

/// Routes: `GET /` is the liveness check, anything else is 404. A WebSocket
/// upgrade is accepted on any path.
pub fn router(registry: PairRegistry, outbox_capacity: usize) -> Router {
    Router::new()
        .route("/", any(root))
        .fallback(fallback)
        .with_state(AppState {
            registry,
            outbox_capacity,
        })
}

async fn root(
    method: Method,
    upgrade: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    match upgrade {
        Ok(ws) => accept(ws, addr, state),
        Err(_) if method == Method::GET => health::ok(),
        Err(_) => health::not_found(),
    }
}

async fn fallback(
    upgrade: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    match upgrade {
        Ok(ws) => accept(ws, addr, state),
        Err(_) => health::not_found(),
    }
}

fn accept(ws: WebSocketUpgrade, addr: SocketAddr, state: AppState) -> Response {
    ws.on_failed_upgrade(move |e| {
        tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
    })
    .on_upgrade(move |socket| {
        handle_connection(socket, addr, state.registry, state.outbox_capacity)
    })
}
