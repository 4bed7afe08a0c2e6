//! Envelope construction and error logging at the HTTP boundary.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use axum::http::StatusCode;
use clinic_core::model::validation::ValidationError;
use clinic_core::{ResponseValue, ServiceError, ServiceResult, StatusResponse};
use log::{error, warn};

/// Every handler answers with an HTTP code plus the JSON envelope.
pub type Reply<T> = (StatusCode, Json<ResponseValue<T>>);

pub fn status_code(status: StatusResponse) -> StatusCode {
    StatusCode::from_u16(status.http_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// `Success` reply for `Ok`, mapped failure otherwise.
pub fn ok<T>(action: &'static str, message: &str, result: ServiceResult<T>) -> Reply<T> {
    finish(action, StatusResponse::Success, message, result)
}

/// `Created` reply for `Ok`, mapped failure otherwise.
pub fn created<T>(action: &'static str, message: &str, result: ServiceResult<T>) -> Reply<T> {
    finish(action, StatusResponse::Created, message, result)
}

fn finish<T>(
    action: &'static str,
    success: StatusResponse,
    message: &str,
    result: ServiceResult<T>,
) -> Reply<T> {
    match result {
        Ok(data) => {
            let envelope = if success == StatusResponse::Created {
                ResponseValue::created(data, message)
            } else {
                ResponseValue::ok(data, message)
            };
            (status_code(success), Json(envelope))
        }
        Err(err) => failure(action, &err),
    }
}

pub fn failure<T>(action: &'static str, err: &ServiceError) -> Reply<T> {
    let status = err.status();
    if status == StatusResponse::Error {
        error!(
            "event={action} module=api status=error error_code={} error={err}",
            err.error_code()
        );
        return (
            status_code(status),
            Json(ResponseValue::failure(status, "internal server error")),
        );
    }
    warn!(
        "event={action} module=api status=rejected error_code={}",
        err.error_code()
    );
    (status_code(status), Json(ResponseValue::failure(status, err.to_string())))
}

/// Unwraps a JSON body, turning malformed input into a validation error.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ServiceResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| malformed("body", rejection.body_text()))
}

/// Unwraps a query string, turning malformed input into a validation error.
pub fn query<T>(params: Result<Query<T>, QueryRejection>) -> ServiceResult<T> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| malformed("query", rejection.body_text()))
}

fn malformed(field: &'static str, detail: String) -> ServiceError {
    ValidationError::InvalidFormat {
        field,
        value: detail,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::{created, ok, status_code};
    use axum::http::StatusCode;
    use clinic_core::{ServiceError, StatusResponse};
    use uuid::Uuid;

    #[test]
    fn every_status_maps_to_its_http_code() {
        assert_eq!(status_code(StatusResponse::Success), StatusCode::OK);
        assert_eq!(status_code(StatusResponse::Created), StatusCode::CREATED);
        assert_eq!(status_code(StatusResponse::BadRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_code(StatusResponse::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_code(StatusResponse::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_code(StatusResponse::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_code(StatusResponse::Error),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn created_reply_carries_data() {
        let (code, envelope) = created("test_action", "done", Ok(7_u32));
        assert_eq!(code, StatusCode::CREATED);
        assert!(envelope.success);
        assert_eq!(envelope.data, Some(7));
        assert_eq!(envelope.message, "done");
    }

    #[test]
    fn not_found_reply_has_no_data() {
        let err = ServiceError::NotFound {
            entity: "patient",
            id: Uuid::nil(),
        };
        let (code, envelope) = ok::<u32>("test_action", "unused", Err(err));
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert!(!envelope.success);
        assert_eq!(envelope.status, StatusResponse::NotFound);
        assert!(envelope.message.contains("patient not found"));
        assert_eq!(envelope.data, None);
    }
}
