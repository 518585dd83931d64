//! API listeners
//!
//! The router is served on a TCP address and, when configured, on a unix
//! socket. Both listeners stop accepting when the shutdown future resolves.

use super::router::{create_router, ApiServerConfig};
use super::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UnixListener, UnixStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower::Service;
use tracing::{debug, error, info, warn};

/// How long listeners get to wind down after the shutdown signal
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause before accepting again after a failed accept
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Serve the API until `shutdown` resolves
pub async fn serve<F>(state: Arc<AppState>, config: ApiServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let tcp = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;
    info!("API listening on http://{}", tcp.local_addr()?);

    let unix = match &config.unix_socket {
        Some(path) => {
            let listener = bind_unix(path)?;
            info!("API listening on unix://{}", path.display());
            Some(listener)
        }
        None => None,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::new();

    let tcp_app = app.clone();
    let tcp_shutdown = shutdown_rx.clone();
    handles.push(tokio::spawn(async move {
        if let Err(e) = axum::serve(tcp, tcp_app)
            .with_graceful_shutdown(wait_for_shutdown(tcp_shutdown))
            .await
        {
            error!("TCP listener failed: {}", e);
        }
    }));

    if let Some(listener) = unix {
        handles.push(tokio::spawn(serve_unix(listener, app, shutdown_rx)));
    }

    shutdown.await;
    info!("Stopping API listeners");
    let _ = shutdown_tx.send(true);

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, futures::future::join_all(handles))
        .await
        .is_err()
    {
        warn!(
            "API listeners did not stop within {}s",
            SHUTDOWN_TIMEOUT.as_secs()
        );
    }

    if let Some(path) = &config.unix_socket {
        remove_socket(path);
    }

    Ok(())
}

/// Bind a unix listener, replacing a stale socket file
fn bind_unix(path: &Path) -> Result<UnixListener> {
    remove_socket(path);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    UnixListener::bind(path).with_context(|| format!("Failed to bind {}", path.display()))
}

fn remove_socket(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove socket {}: {}", path.display(), e);
        }
    }
}

/// Accept unix connections until shutdown, then drain the open ones
///
/// Open connections finish their in-flight request and close. The caller
/// bounds the drain with [`SHUTDOWN_TIMEOUT`].
async fn serve_unix(listener: UnixListener, app: Router, shutdown: watch::Receiver<bool>) {
    let mut connections = JoinSet::new();

    loop {
        let stream = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!("Failed to accept unix connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    warn!("Unix connection task failed: {}", e);
                }
                continue;
            }
            _ = wait_for_shutdown(shutdown.clone()) => break,
        };

        connections.spawn(serve_unix_connection(stream, app.clone(), shutdown.clone()));
    }

    if !connections.is_empty() {
        debug!(open = connections.len(), "Draining unix connections");
    }
    while let Some(joined) = connections.join_next().await {
        if let Err(e) = joined {
            warn!("Unix connection task failed: {}", e);
        }
    }
}

async fn serve_unix_connection(
    stream: UnixStream,
    tower_service: Router,
    shutdown: watch::Receiver<bool>,
) {
    let hyper_service = hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
        tower_service.clone().call(request)
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), hyper_service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = wait_for_shutdown(shutdown) => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(err) = result {
        let err_str = err.to_string().to_lowercase();
        if !err_str.contains("connection reset") && !err_str.contains("broken pipe") {
            error!("Error serving connection: {}", err);
        }
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_missing_socket_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        remove_socket(&dir.path().join("absent.sock"));
    }

    #[tokio::test]
    async fn test_bind_unix_replaces_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("netalloc.sock");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"stale").unwrap();

        let listener = bind_unix(&path).unwrap();
        drop(listener);

        assert!(path.exists());
        assert!(!std::fs::metadata(&path).unwrap().is_file());
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_returns_on_signal() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_shutdown(rx));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
