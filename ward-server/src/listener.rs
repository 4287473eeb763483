//! TCP accept loop and per-connection program execution.
//!
//! A `tokio::select!` shutdown pattern adapted from an HTTP router to a
//! line-oriented protocol: a connection sends a ward program terminated
//! by a `***` line, the server runs it against the shared `Database`
//! and writes back one JSON object per command result, then keeps
//! reading further programs on the same connection until it closes or
//! a program exits the whole server.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use ward_engine::Database;

use crate::error::ListenError;

const TERMINATOR: &str = "***";

/// Binds `port` and serves connections until `shutdown` fires or a
/// program issues `exit`, which cancels `shutdown` itself.
pub async fn serve(
    port: u16,
    db: Database,
    read_timeout: Duration,
    write_timeout: Duration,
    shutdown: CancellationToken,
) -> Result<(), ListenError> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|source| ListenError::Bind { port, source })?;
    tracing::info!(%port, "listening");

    let db = Arc::new(Mutex::new(db));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("shutting down listener");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        tracing::warn!(%err, "accept failed");
                        continue;
                    }
                };
                let db = Arc::clone(&db);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let span = tracing::info_span!("connection", peer = %peer);
                    let _enter = span.enter();
                    if let Err(err) = handle_connection(socket, db, read_timeout, write_timeout, shutdown).await {
                        tracing::warn!(%err, "connection ended with an error");
                    }
                });
            }
        }
    }
}

async fn handle_connection(
    socket: TcpStream,
    db: Arc<Mutex<Database>>,
    read_timeout: Duration,
    write_timeout: Duration,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let mut program = String::new();
        let mut saw_any_line = false;
        loop {
            let next = tokio::time::timeout(read_timeout, lines.next_line()).await;
            let line = match next {
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => return Ok(()),
                Ok(Err(err)) => return Err(err),
                Err(_) => {
                    tracing::info!("connection idle past the read deadline");
                    return Ok(());
                }
            };
            saw_any_line = true;
            let terminated = line.trim_end() == TERMINATOR;
            program.push_str(&line);
            program.push('\n');
            if terminated {
                break;
            }
        }
        if !saw_any_line {
            return Ok(());
        }

        let outcome = {
            let mut db = db.lock().await;
            ward_engine::run_program(&mut db, &program)
        };

        for result in &outcome.results {
            let line = serde_json::to_string(result).unwrap_or_else(|_| "{}".to_string());
            let write = tokio::time::timeout(write_timeout, async {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await
            })
            .await;
            match write {
                Ok(result) => result?,
                Err(_) => {
                    tracing::info!("connection idle past the write deadline");
                    return Ok(());
                }
            }
        }

        if outcome.should_exit {
            tracing::info!("program issued exit, shutting down server");
            shutdown.cancel();
            return Ok(());
        }
    }
}
