// handlers/logout.rs - POST /auth/logout handler

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::extract::cookie::CookieJar;

use crate::access::Identity;
use crate::gatekeeper::RedirectTarget;
use crate::state::AppState;

/// POST /auth/logout - revoke the caller's sessions, drop the cookies, back to login
pub async fn logout(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    jar: CookieJar,
) -> Response {
    if let Some(Extension(identity)) = identity {
        match state.gatekeeper.sessions().invalidate(&identity).await {
            Ok(()) => tracing::info!(user_id = %identity.id, "signed out"),
            Err(e) => tracing::warn!(user_id = %identity.id, "sign-out failed: {}", e),
        }
    }

    let jar = state.cookies.clear(jar);
    (jar, Redirect::to(RedirectTarget::Login.location())).into_response()
}
