//! Data models for the offline cache
//!
//! Record and pending-action shapes stored in the partitions, plus the
//! DTOs used by the status API.

pub mod action;
pub mod record;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use action::{ActionKind, ActionPayload, PendingAction};
pub use record::{Product, QaItem, Record, RecordPayload, RecordType, UserData, Vlog};
pub use requests::{ImageRequest, ListRecordsQuery};
pub use responses::{
    CachedImageResponse, DeleteResponse, DrainReport, HealthResponse, OptimizeReport,
    PendingResponse, RecordsResponse, StatsResponse, StatusResponse, StorageSize, SubmitResponse,
};
