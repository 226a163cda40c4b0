use crate::poll::WaitReport;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to connect to Chrome: {0}")]
    ConnectionFailed(String),

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Script evaluation failed: {0}")]
    ScriptFailed(String),

    #[error("No page available")]
    NoPage,

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out: {0}")]
    Timeout(WaitReport),

    #[error("Recovery exhausted: {0}")]
    RecoveryExhausted(WaitReport),

    #[error("Other error: {0}")]
    Other(String),
}

impl BrowserError {
    /// True for the two "condition never held" outcomes, false for faults.
    pub fn is_wait_failure(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::RecoveryExhausted(_))
    }
}

pub type Result<T> = std::result::Result<T, BrowserError>;
