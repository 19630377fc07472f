//! Record models for the general offline-data partition
//!
//! Every record carries a typed payload; the record type and id prefix are
//! derived from the payload variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

// == Record Type ==
/// Category of a cached record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Vlog,
    Product,
    Qa,
    UserData,
}

impl RecordType {
    pub const ALL: [RecordType; 4] = [
        RecordType::Vlog,
        RecordType::Product,
        RecordType::Qa,
        RecordType::UserData,
    ];

    /// Column value and id prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Vlog => "vlog",
            RecordType::Product => "product",
            RecordType::Qa => "qa",
            RecordType::UserData => "user_data",
        }
    }

    /// Builds the primary key for a source identifier of this type.
    pub fn record_id(&self, source_id: &str) -> String {
        format!("{}_{}", self.as_str(), source_id)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vlog" => Ok(RecordType::Vlog),
            "product" => Ok(RecordType::Product),
            "qa" => Ok(RecordType::Qa),
            "user_data" => Ok(RecordType::UserData),
            other => Err(CacheError::InvalidRequest(format!(
                "Unknown record type: {}",
                other
            ))),
        }
    }
}

// == Payload Schemas ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vlog {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Price in the smallest currency unit
    pub price: u64,
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub in_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaItem {
    pub id: String,
    pub question: String,
    pub answer: Option<String>,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub key: String,
    pub value: serde_json::Value,
}

// == Record Payload ==
/// Typed record contents, one variant per [`RecordType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RecordPayload {
    Vlog(Vlog),
    Product(Product),
    Qa(QaItem),
    UserData(UserData),
}

impl RecordPayload {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordPayload::Vlog(_) => RecordType::Vlog,
            RecordPayload::Product(_) => RecordType::Product,
            RecordPayload::Qa(_) => RecordType::Qa,
            RecordPayload::UserData(_) => RecordType::UserData,
        }
    }

    /// Identifier of the item at its source.
    pub fn source_id(&self) -> &str {
        match self {
            RecordPayload::Vlog(v) => &v.id,
            RecordPayload::Product(p) => &p.id,
            RecordPayload::Qa(q) => &q.id,
            RecordPayload::UserData(u) => &u.key,
        }
    }
}

// == Record ==
/// A stored unit of cached application data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub record_type: RecordType,
    pub payload: RecordPayload,
    /// Write timestamp (Unix milliseconds)
    pub stored_at: i64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<i64>,
}

impl Record {
    /// Boundary condition: a record is expired once `now >= expires_at`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        is_expired(self.expires_at, now_ms)
    }

    /// Checks that id and type agree with the payload variant.
    pub fn validate(&self) -> Result<(), CacheError> {
        let expected_type = self.payload.record_type();
        if self.record_type != expected_type {
            return Err(CacheError::InvalidRequest(format!(
                "Record {} declares type {} but carries a {} payload",
                self.id, self.record_type, expected_type
            )));
        }
        let prefix = format!("{}_", expected_type.as_str());
        if !self.id.starts_with(&prefix) || self.id.len() == prefix.len() {
            return Err(CacheError::InvalidRequest(format!(
                "Record id '{}' must be '{}<source id>'",
                self.id, prefix
            )));
        }
        Ok(())
    }
}

pub(crate) fn is_expired(expires_at: Option<i64>, now_ms: i64) -> bool {
    match expires_at {
        Some(expires) => now_ms >= expires,
        None => false,
    }
}
