//! Request DTOs for the status API
//!
//! Defines the structure of incoming query strings and request bodies.

use serde::Deserialize;

use crate::models::RecordType;

/// Upper bound on records returned by one GET /records call.
pub const MAX_LIST_LIMIT: usize = 500;

/// Query string for GET /records
///
/// # Fields
/// - `type`: Record type to scan
/// - `limit`: Optional cap on live records returned
#[derive(Debug, Clone, Deserialize)]
pub struct ListRecordsQuery {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ListRecordsQuery {
    /// Validates the query
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match self.limit {
            Some(0) => Some("limit must be at least 1".to_string()),
            Some(n) if n > MAX_LIST_LIMIT => Some(format!(
                "limit exceeds maximum of {}",
                MAX_LIST_LIMIT
            )),
            _ => None,
        }
    }
}

/// Image URL, as a query string (GET /images) or body (POST /images)
#[derive(Debug, Clone, Deserialize)]
pub struct ImageRequest {
    pub url: String,
}

impl ImageRequest {
    pub fn validate(&self) -> Option<String> {
        if self.url.trim().is_empty() {
            Some("url cannot be empty".to_string())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_deserialize() {
        let json = r#"{"type": "product", "limit": 5}"#;
        let query: ListRecordsQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.record_type, RecordType::Product);
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_list_query_without_limit() {
        let json = r#"{"type": "user_data"}"#;
        let query: ListRecordsQuery = serde_json::from_str(json).unwrap();
        assert!(query.limit.is_none());
        assert!(query.validate().is_none());
    }

    #[test]
    fn test_validate_limits() {
        let zero = ListRecordsQuery {
            record_type: RecordType::Vlog,
            limit: Some(0),
        };
        assert!(zero.validate().is_some());

        let huge = ListRecordsQuery {
            record_type: RecordType::Vlog,
            limit: Some(MAX_LIST_LIMIT + 1),
        };
        assert!(huge.validate().is_some());
    }

    #[test]
    fn test_image_request_validate() {
        let blank = ImageRequest {
            url: "  ".to_string(),
        };
        assert!(blank.validate().is_some());

        let ok: ImageRequest =
            serde_json::from_str(r#"{"url": "https://cdn.test/a.png"}"#).unwrap();
        assert!(ok.validate().is_none());
    }
}
