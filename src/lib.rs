//! Offline Cache - local persistence for a storefront that keeps working
//! without a network
//!
//! Records with per-type expiry, a byte-budgeted LRU image cache and a
//! durable outbox of user actions, coordinated by a connectivity-aware
//! orchestrator.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{ImageSource, OfflineCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use network::{Backend, HttpBackend, NetworkError};
pub use store::Store;
pub use tasks::{spawn_connectivity_monitor, spawn_sweep_task, Lifecycle, Orchestrator};
