//! Process-level error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListenError {
    #[error("failed to bind to port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },
}
