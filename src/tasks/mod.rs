//! Background Tasks Module
//!
//! The orchestrator and the work it schedules.
//!
//! # Tasks
//! - Expiry sweep: removes expired records at a fixed interval
//! - Connectivity monitor: probes the backend and reports transitions
//! - Outbox replay and bulk populate, run on reconnect

mod cleanup;
mod connectivity;
mod orchestrator;
pub mod populate;
pub mod replay;

pub use cleanup::spawn_sweep_task;
pub use connectivity::spawn_connectivity_monitor;
pub use orchestrator::{Lifecycle, Orchestrator, SubmitOutcome};
pub use populate::PopulateReport;
