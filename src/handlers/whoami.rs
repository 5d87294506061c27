// handlers/whoami.rs - GET /api/auth/whoami handler

use axum::Extension;

use crate::access::Identity;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/auth/whoami - identity attached by the gatekeeper
pub async fn whoami(identity: Option<Extension<Identity>>) -> ApiResult<Identity> {
    let Extension(identity) =
        identity.ok_or_else(|| ApiError::unauthorized("No authenticated identity on request"))?;

    Ok(ApiResponse::success(identity))
}
