//! API Module
//!
//! HTTP handlers and routing for the local status surface. The cache itself
//! is an in-process library; this router exposes its state to an admin or
//! PWA status screen.
//!
//! # Endpoints
//! - `GET /health`, `GET /status`, `GET /storage`, `GET /stats`
//! - `GET /records`, `GET /records/:id`, `DELETE /records/:id`
//! - `GET /pending`, `POST /pending/drain`, `POST /actions`
//! - `GET /images`, `POST /images`, `POST /optimize`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
