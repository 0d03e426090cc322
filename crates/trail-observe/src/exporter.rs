use crate::errors::{ObserveError, ObserveResult};
use crate::metrics::{ensure_metrics, render_prometheus};
use crate::policy::current_policy;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::OnceCell as TokioOnceCell;
use tokio::task::JoinHandle;

static PROM_SERVER: TokioOnceCell<SocketAddr> = TokioOnceCell::const_new();

pub fn metrics_router() -> Router {
    Router::new().route("/metrics", get(scrape_handler))
}

/// Binds first so callers learn the real address (port 0 included) before
/// the server task starts.
pub async fn spawn_exporter(bind: SocketAddr) -> ObserveResult<(SocketAddr, JoinHandle<()>)> {
    ensure_metrics();
    let listener = TcpListener::bind(bind).await?;
    let local = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, metrics_router().into_make_service()).await {
            tracing::warn!(%err, "prometheus server exited unexpectedly");
        }
    });
    tracing::info!(addr = %local, "serving metrics at /metrics");
    Ok((local, handle))
}

/// Starts the exporter described by the current policy, at most once per
/// process. Returns the bound address, or `None` when disabled.
pub async fn ensure_prometheus() -> ObserveResult<Option<SocketAddr>> {
    let policy = current_policy();
    if !policy.prom_enable {
        return Ok(None);
    }
    let bind: SocketAddr = policy
        .prom_bind
        .parse()
        .map_err(|err: std::net::AddrParseError| ObserveError::BadBind {
            addr: policy.prom_bind.clone(),
            reason: err.to_string(),
        })?;
    let addr = PROM_SERVER
        .get_or_try_init(|| async move { spawn_exporter(bind).await.map(|(addr, _)| addr) })
        .await?;
    Ok(Some(*addr))
}

async fn scrape_handler() -> String {
    render_prometheus()
}
