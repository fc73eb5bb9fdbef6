use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use qm_core::catalog::ResourceRef;
use qm_core::provider::ProviderError;
use qm_core::provision::{CreateError, LookupError, PreviewError};
use qm_core::resolver::{ResolveError, ResourceKind};
use qm_core::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("multiple {kind} candidates and no usable default; set one first")]
    Ambiguous {
        kind: ResourceKind,
        candidates: Vec<ResourceRef>,
    },

    #[error("{0}")]
    LimitExceeded(String),

    #[error("{0}")]
    Provider(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NoneAvailable { .. } => ApiError::Conflict(e.to_string()),
            ResolveError::Ambiguous { kind, candidates } => {
                ApiError::Ambiguous { kind, candidates }
            }
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::ServerNotFound(_) => ApiError::NotFound(e.to_string()),
            ProviderError::ResourceLimit => ApiError::LimitExceeded(e.to_string()),
            ProviderError::Api(_) => ApiError::Provider(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateName(_) => ApiError::Conflict(e.to_string()),
            StoreError::Backend(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<CreateError> for ApiError {
    fn from(e: CreateError) -> Self {
        match e {
            CreateError::InvalidCount(_)
            | CreateError::EmptyName
            | CreateError::UnknownLocation { .. }
            | CreateError::UnknownImage { .. }
            | CreateError::ImageNotX86 { .. } => ApiError::BadRequest(e.to_string()),
            CreateError::QuotaExceeded { .. } => ApiError::LimitExceeded(e.to_string()),
            CreateError::ServerTypeUnavailable(_) => ApiError::Provider(e.to_string()),
            CreateError::Resolve(e) => e.into(),
            CreateError::Provider(e) => e.into(),
            CreateError::Store(e) => e.into(),
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::NotFound(_) => ApiError::NotFound(e.to_string()),
            LookupError::Store(e) => e.into(),
            LookupError::Provider(e) => e.into(),
        }
    }
}

impl From<PreviewError> for ApiError {
    fn from(e: PreviewError) -> Self {
        match e {
            PreviewError::Resolve(e) => e.into(),
            PreviewError::Store(e) => e.into(),
            PreviewError::Provider(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Ambiguous { .. } => StatusCode::CONFLICT,
            ApiError::LimitExceeded(_) => StatusCode::FORBIDDEN,
            ApiError::Provider(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = serde_json::json!({ "error": self.to_string() });
        if let ApiError::Ambiguous { kind, candidates } = &self {
            body["kind"] = serde_json::json!(kind);
            body["candidates"] = serde_json::json!(candidates);
        }
        (status, axum::Json(body)).into_response()
    }
}
