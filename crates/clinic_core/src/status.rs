//! Outcome codes and the response envelope shared with the HTTP layer.
//!
//! # Invariants
//! - `success` is true exactly for `Success` and `Created`.
//! - `data` is present only on success.

use serde::{Deserialize, Serialize};

/// Coarse outcome of a use-case call, translated to HTTP by controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusResponse {
    Success,
    Created,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Error,
}

impl StatusResponse {
    pub fn http_code(self) -> u16 {
        match self {
            Self::Success => 200,
            Self::Created => 201,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Error => 500,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Created)
    }
}

/// `{ success, status, message, data }` envelope returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseValue<T> {
    pub success: bool,
    pub status: StatusResponse,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ResponseValue<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_data(StatusResponse::Success, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::with_data(StatusResponse::Created, data, message)
    }

    pub fn failure(status: StatusResponse, message: impl Into<String>) -> Self {
        Self {
            success: status.is_success(),
            status,
            message: message.into(),
            data: None,
        }
    }

    fn with_data(status: StatusResponse, data: T, message: impl Into<String>) -> Self {
        Self {
            success: status.is_success(),
            status,
            message: message.into(),
            data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ResponseValue, StatusResponse};

    #[test]
    fn failure_envelope_serializes_without_data() {
        let value: ResponseValue<u32> =
            ResponseValue::failure(StatusResponse::NotFound, "patient not found");
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["status"], "not_found");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn created_maps_to_201() {
        let value = ResponseValue::created(7_u32, "created");
        assert!(value.success);
        assert_eq!(value.status.http_code(), 201);
    }
}
