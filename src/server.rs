//! Listener lifecycle.
//!
//! `unstarted -> listening -> serving` until the process exits. Binding is
//! the only fatal step; per-connection errors are logged and dropped.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::time::Instant;
use tower::ServiceExt;
use tracing::{debug, info, warn};

use crate::error::ServerError;

/// Time allowed to receive a request's headers.
pub const READ_TIMEOUT: Duration = Duration::from_secs(15);
/// A connection with no request activity for this long is gracefully closed.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
/// Cap on the connection read buffer, which bounds request header size.
pub const MAX_HEADER_BYTES: usize = 1 << 20;

/// Bind the listener.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!("HTTP server listening on {}", addr);
    Ok(listener)
}

/// Accept connections forever, each served on its own task.
pub async fn serve(listener: TcpListener, app: Router) {
    serve_with_idle_timeout(listener, app, IDLE_TIMEOUT).await
}

async fn serve_with_idle_timeout(listener: TcpListener, app: Router, idle_timeout: Duration) {
    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let app = app.clone();
        tokio::spawn(serve_connection(stream, remote, app, idle_timeout));
    }
}

async fn serve_connection(stream: TcpStream, remote: SocketAddr, app: Router, idle_timeout: Duration) {
    let io = TokioIo::new(stream);
    let activity = Arc::new(Notify::new());

    let service = {
        let activity = Arc::clone(&activity);
        hyper::service::service_fn(move |mut request: Request<Incoming>| {
            request.extensions_mut().insert(ConnectInfo(remote));
            let app = app.clone();
            let activity = Arc::clone(&activity);
            async move {
                activity.notify_one();
                let response = app.oneshot(request).await;
                activity.notify_one();
                response
            }
        })
    };

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(READ_TIMEOUT)
        .max_buf_size(MAX_HEADER_BYTES)
        .keep_alive(true);

    let connection = builder.serve_connection(io, service);
    tokio::pin!(connection);

    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    let result = loop {
        tokio::select! {
            result = connection.as_mut() => break result,
            () = activity.notified() => idle.as_mut().reset(Instant::now() + idle_timeout),
            () = idle.as_mut() => {
                debug!(remote = %remote, "Closing idle connection");
                connection.as_mut().graceful_shutdown();
                break connection.as_mut().await;
            }
        }
    };

    if let Err(e) = result {
        debug!(remote = %remote, "Connection closed with error: {}", e);
    }
}
