use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;

/// Caller identity from the `X-User-Id` header, injected into extensions.
#[derive(Debug, Clone)]
pub struct UserId(pub String);

/// Middleware that extracts `X-User-Id` into a [`UserId`] extension.
pub async fn identity_middleware(mut req: Request, next: Next) -> Response {
    match extract_user(&req) {
        Ok(user_id) => {
            req.extensions_mut().insert(user_id);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

fn extract_user(req: &Request) -> Result<UserId, ApiError> {
    let user_id = req
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing or invalid X-User-Id header".into()))?;

    Ok(UserId(user_id.to_string()))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request_with(header: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/defaults");
        if let Some(value) = header {
            builder = builder.header("X-User-Id", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn missing_header_is_rejected() {
        let err = extract_user(&request_with(None)).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn blank_header_is_rejected() {
        let err = extract_user(&request_with(Some("   "))).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn header_value_is_trimmed() {
        let UserId(user) = extract_user(&request_with(Some("  alice  "))).unwrap();
        assert_eq!(user, "alice");
    }
}
