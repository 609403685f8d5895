//! Request Extractors
//!
//! Wrappers around axum's `Json`, `Path` and `Query` whose rejections are
//! turned into [`ApiError::Validation`], so malformed input gets the same
//! JSON error body as every other failure.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
};
use serde::de::DeserializeOwned;

use crate::api::error::{ApiError, ApiResult};

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// URL path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query string parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Decode a body that may be left empty. An empty or blank body is `None`;
/// anything else must be valid JSON for `T`.
pub fn optional_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ApiError::Validation(format!("Invalid JSON body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Body {
        guru_id: Option<i64>,
    }

    #[test]
    fn test_optional_json() {
        assert_eq!(optional_json::<Body>(&Bytes::new()).unwrap(), None);
        assert_eq!(optional_json::<Body>(&Bytes::from_static(b" \n")).unwrap(), None);
        assert_eq!(
            optional_json::<Body>(&Bytes::from_static(br#"{"guru_id": 3}"#)).unwrap(),
            Some(Body { guru_id: Some(3) })
        );
        assert!(matches!(
            optional_json::<Body>(&Bytes::from_static(br#"{"guru_id": "three"}"#)),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            optional_json::<Body>(&Bytes::from_static(b"{not json")),
            Err(ApiError::Validation(_))
        ));
    }
}
