use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::access::canonical_path;
use crate::error::ApiError;
use crate::gatekeeper::Decision;
use crate::state::AppState;

/// Runs the gatekeeper in front of every route it wraps.
///
/// The path is canonicalized first and the request URI rewritten to it, so the
/// path that is authorized is the path the inner service (and the application
/// server behind the proxy) receives. The verdict's cookie change is applied to
/// the jar before branching, and the jar is part of every response below,
/// redirects included. Requests that go through also carry the change as an
/// extension so the proxy can forward the rotated session.
pub async fn gatekeeper_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = match canonical_path(request.uri().path()) {
        Ok(path) => path,
        Err(e) => return ApiError::from(e).into_response(),
    };
    if path != request.uri().path() {
        match rewrite_path(request.uri(), &path) {
            Ok(uri) => *request.uri_mut() = uri,
            Err(e) => return e.into_response(),
        }
    }

    let credential = state.cookies.read(&jar);
    let verdict = state.gatekeeper.evaluate(&path, &credential).await;
    let jar = state.cookies.apply(jar, &verdict.credential);

    match verdict.decision {
        Decision::Redirect { to } => (jar, Redirect::temporary(to.location())).into_response(),
        Decision::PassThrough => {
            request.extensions_mut().insert(verdict.credential);
            (jar, next.run(request).await).into_response()
        }
        Decision::Forward { identity } => {
            request.extensions_mut().insert(identity);
            request.extensions_mut().insert(verdict.credential);
            (jar, next.run(request).await).into_response()
        }
    }
}

fn rewrite_path(uri: &Uri, path: &str) -> Result<Uri, ApiError> {
    let target = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };

    target
        .parse()
        .map_err(|_| ApiError::bad_request("Malformed request path"))
}
