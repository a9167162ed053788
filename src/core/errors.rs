use http::StatusCode;
use spin_sdk::http::Response;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of the response body.
    fn public_message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::InternalError(msg) => msg,
            ApiError::Unauthorized => "Unauthorized",
            ApiError::Forbidden => "Forbidden",
        }
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let body = serde_json::json!({ "error": err.public_message() });
        Response::builder()
            .status(err.status().as_u16())
            .header("Content-Type", "application/json")
            .body(body.to_string().into_bytes())
            .build()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Malformed JSON body: {}", err))
    }
}

/// Turns a handler failure into a response. `ApiError`s raised with `?`
/// keep their status; anything else is logged and reported as a 500.
pub fn into_response(err: anyhow::Error) -> Response {
    match err.downcast::<ApiError>() {
        Ok(api_err) => api_err.into(),
        Err(other) => {
            tracing::error!(error = %other, "request failed");
            ApiError::InternalError("Internal server error".to_string()).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_keeps_status_through_anyhow() {
        let err: anyhow::Error = ApiError::Forbidden.into();
        let resp = into_response(err);
        assert_eq!(*resp.status(), 403);
    }

    #[test]
    fn unknown_errors_become_500() {
        let resp = into_response(anyhow::anyhow!("disk on fire"));
        assert_eq!(*resp.status(), 500);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }
}
