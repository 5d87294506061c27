// handlers/proxy.rs - fallback handler forwarding gated requests to the application server

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Uri},
    response::Response,
};

use crate::access::Identity;
use crate::error::ApiError;
use crate::gatekeeper::{CredentialChange, SessionCookies};
use crate::state::AppState;

/// Header carrying the forwarded identity to the application server
pub const USER_ID_HEADER: &str = "x-qm-user-id";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// HTTP client bound to the application server's base URL
#[derive(Clone, Debug)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: String,
    max_body_bytes: usize,
}

impl Upstream {
    pub fn new(base_url: &str, max_body_bytes: usize) -> Result<Self, reqwest::Error> {
        // Redirects from the application belong to the browser, not to us
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_body_bytes,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute upstream URL for an incoming request URI, query string included
    pub fn url_for(&self, uri: &Uri) -> String {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        format!("{}{}", self.base_url, path_and_query)
    }
}

/// Fallback - forward the request upstream and relay the answer unchanged
pub async fn forward(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let identity = request.extensions().get::<Identity>().cloned();
    let change = request
        .extensions()
        .get::<CredentialChange>()
        .cloned()
        .unwrap_or_default();
    let (parts, body) = request.into_parts();
    let upstream = &state.upstream;

    let body = axum::body::to_bytes(body, upstream.max_body_bytes)
        .await
        .map_err(|_| {
            ApiError::payload_too_large(format!(
                "Request body exceeds {} bytes",
                upstream.max_body_bytes
            ))
        })?;

    let url = upstream.url_for(&parts.uri);
    let headers = outbound_headers(&parts.headers, identity.as_ref(), &state.cookies, &change);

    tracing::debug!(method = %parts.method, %url, "forwarding request");

    let reply = upstream
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await?;

    let status = reply.status();
    let reply_headers = reply.headers().clone();
    let bytes: Bytes = reply.bytes().await?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    for (name, value) in reply_headers.iter() {
        if !is_hop_by_hop(name) && *name != header::CONTENT_LENGTH {
            response.headers_mut().append(name.clone(), value.clone());
        }
    }

    Ok(response)
}

/// Request headers sent upstream. Any client-supplied identity header is
/// replaced, and the session cookies are the ones the verdict settled on.
fn outbound_headers(
    incoming: &HeaderMap,
    identity: Option<&Identity>,
    cookies: &SessionCookies,
    change: &CredentialChange,
) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(incoming.len() + 1);

    for (name, value) in incoming.iter() {
        if is_hop_by_hop(name)
            || *name == header::HOST
            || *name == header::CONTENT_LENGTH
            || *name == header::COOKIE
            || name.as_str() == USER_ID_HEADER
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if let Some(cookie) = cookies.outbound_header(incoming, change) {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.insert(header::COOKIE, value);
        }
    }

    if let Some(identity) = identity {
        if let Ok(value) = HeaderValue::from_str(&identity.id.to_string()) {
            headers.insert(HeaderName::from_static(USER_ID_HEADER), value);
        }
    }

    headers
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}
