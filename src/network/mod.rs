//! Network collaborator seam
//!
//! The cache never talks to the backend directly; everything goes through
//! the [`Backend`] trait so the orchestrator can be driven by a test double.

mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{PendingAction, Product, QaItem, Vlog};

pub use http::HttpBackend;

// == Network Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned status {code}")]
    Status { code: u16 },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl NetworkError {
    /// True when retrying the same request can never succeed.
    ///
    /// Client errors are permanent except request timeout (408) and rate
    /// limiting (429).
    pub fn is_permanent(&self) -> bool {
        match self {
            NetworkError::Status { code } => {
                (400..500).contains(code) && *code != 408 && *code != 429
            }
            NetworkError::Decode(_) => true,
            NetworkError::Timeout | NetworkError::Transport(_) => false,
        }
    }
}

// == Backend ==
#[async_trait]
pub trait Backend: Send + Sync {
    /// Lightweight reachability check.
    async fn probe(&self) -> Result<(), NetworkError>;

    async fn fetch_vlogs(&self) -> Result<Vec<Vlog>, NetworkError>;

    async fn fetch_products(&self) -> Result<Vec<Product>, NetworkError>;

    async fn fetch_qa(&self) -> Result<Vec<QaItem>, NetworkError>;

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, NetworkError>;

    /// Sends one queued user action to the backend.
    async fn replay(&self, action: &PendingAction) -> Result<(), NetworkError>;
}
