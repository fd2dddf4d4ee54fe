//! TCP server for the booking service
//!
//! Each accepted connection gets its own task and its own database
//! connection. Requests on one connection are answered in order; different
//! connections run concurrently and meet only in SQLite, whose active-slot
//! index settles booking races.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use roombook_core::Database;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ErrorKind, Request, Response};
use crate::session::ConnectionSession;

/// What every connection needs to serve requests
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Migrated database file shared by all connections
    pub db_path: PathBuf,
    pub session_hours: i64,
}

/// Server handle
pub struct Server {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind and start accepting connections
    pub async fn start(listen_addr: &str, options: ServerOptions) -> Result<Self> {
        let listener = TcpListener::bind(listen_addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, db = %options.db_path.display(), "Server started");

        let (shutdown_tx, _) = broadcast::channel(1);

        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(accept_loop(
            listener,
            Arc::new(options),
            shutdown_tx.clone(),
            shutdown_rx,
        ));

        Ok(Server {
            addr: bound_addr,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting and close open connections
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    options: Arc<ServerOptions>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            options.clone(),
                            shutdown_tx.subscribe(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Serve one client until it hangs up or the server stops
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    options: Arc<ServerOptions>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (mut reader, mut writer) = tokio::io::split(stream);

    let path = options.db_path.clone();
    let db = match tokio::task::spawn_blocking(move || Database::connect(path)).await {
        Ok(Ok(db)) => db,
        Ok(Err(e)) => {
            error!(addr = %addr, error = %e, "Failed to open database for connection");
            let _ = write_frame(&mut writer, &Response::from_error(&e)).await;
            return;
        }
        Err(e) => {
            error!(addr = %addr, error = %e, "Database task failed");
            return;
        }
    };
    let mut session = Some(ConnectionSession::new(db, options.session_hours));

    loop {
        let request: Request = tokio::select! {
            result = read_frame(&mut reader) => match result {
                Ok(request) => request,
                Err(Error::ConnectionClosed) => {
                    debug!(addr = %addr, "Connection closed");
                    break;
                }
                Err(Error::Decode(e)) => {
                    warn!(addr = %addr, error = %e, "Malformed request");
                    let reply = Response::Error {
                        kind: ErrorKind::Validation,
                        message: format!("malformed request: {}", e),
                    };
                    if write_frame(&mut writer, &reply).await.is_err() {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    warn!(addr = %addr, error = %e, "Read error");
                    break;
                }
            },
            _ = shutdown_rx.recv() => {
                debug!(addr = %addr, "Closing connection for shutdown");
                break;
            }
        };

        // The session moves onto the blocking pool for the duration of one request
        let Some(mut current) = session.take() else {
            break;
        };
        let outcome = tokio::task::spawn_blocking(move || {
            let response = current.handle(request);
            (current, response)
        })
        .await;

        let response = match outcome {
            Ok((current, response)) => {
                session = Some(current);
                response
            }
            Err(e) => {
                error!(addr = %addr, error = %e, "Request handler panicked");
                let _ = write_frame(
                    &mut writer,
                    &Response::Error {
                        kind: ErrorKind::Internal,
                        message: "internal error".into(),
                    },
                )
                .await;
                break;
            }
        };

        if let Err(e) = write_frame(&mut writer, &response).await {
            debug!(addr = %addr, error = %e, "Write failed");
            break;
        }
    }

    info!(addr = %addr, "Client disconnected");
}
