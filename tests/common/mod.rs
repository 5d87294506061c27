#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use serde_json::{json, Value};
use uuid::Uuid;

use qm_gatekeeper::access::{Identity, PermissionLevel, ResourceCategory};
use qm_gatekeeper::config::{SecurityConfig, SessionConfig};
use qm_gatekeeper::gatekeeper::{Gatekeeper, SessionCredential};
use qm_gatekeeper::handlers::Upstream;
use qm_gatekeeper::store::MemoryStore;
use qm_gatekeeper::{build_router, AppState};

/// Request body limit the test gatekeeper forwards upstream
pub const BODY_LIMIT: usize = 1024;

/// A gatekeeper in front of a stub application server, both on ephemeral ports
pub struct TestApp {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub upstream_hits: Arc<AtomicUsize>,
    pub session: SessionConfig,
    client: reqwest::Client,
}

async fn serve(app: Router) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test listener")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

/// Stub application server: echoes what it received and counts hits
fn upstream_router(hits: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route("/reports/legacy", get(moved))
        .fallback(echo)
        .with_state(hits)
}

async fn echo(State(hits): State<Arc<AtomicUsize>>, request: Request) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);

    let (user_id, cookie) = {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        (header("x-qm-user-id"), header("cookie"))
    };
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    Json(json!({
        "method": parts.method.as_str(),
        "uri": parts.uri.to_string(),
        "user_id": user_id,
        "cookie": cookie,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn moved(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::FOUND,
        [("location", "/reports"), ("x-app-version", "7")],
        "moved",
    )
}

pub async fn spawn_app() -> Result<TestApp> {
    let upstream_hits = Arc::new(AtomicUsize::new(0));
    let upstream_addr = serve(upstream_router(upstream_hits.clone())).await?;

    let store = Arc::new(MemoryStore::new());
    let session = SessionConfig::default();
    let gatekeeper = Gatekeeper::new(store.clone(), store.clone());
    let upstream = Upstream::new(&format!("http://{}", upstream_addr), BODY_LIMIT)?;

    let state = AppState::new(gatekeeper, &session, upstream);
    let security = SecurityConfig {
        cors_origins: Vec::new(),
    };
    let addr = serve(build_router(state, &security)).await?;

    // Redirects are what we assert on; never follow them
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    Ok(TestApp {
        base_url: format!("http://{}", addr),
        store,
        upstream_hits,
        session,
        client,
    })
}

impl TestApp {
    /// Active account with the given grants and a freshly opened session
    pub fn user(&self, grants: &[(ResourceCategory, PermissionLevel)]) -> (Identity, SessionCredential) {
        let identity = Identity::new(Uuid::new_v4()).with_email("user@qm.local");
        self.store.set_active(identity.id, true);
        for (category, level) in grants {
            self.store.grant(identity.id, *category, *level);
        }
        let credential = self.store.open_session(&identity);
        (identity, credential)
    }

    pub fn hits(&self) -> usize {
        self.upstream_hits.load(Ordering::SeqCst)
    }

    pub fn cookie_header(&self, credential: &SessionCredential) -> String {
        let mut pairs = Vec::new();
        if let Some(token) = &credential.access_token {
            pairs.push(format!("{}={}", self.session.access_cookie, token));
        }
        if let Some(token) = &credential.refresh_token {
            pairs.push(format!("{}={}", self.session.refresh_cookie, token));
        }
        pairs.join("; ")
    }

    pub async fn get(&self, path: &str, credential: Option<&SessionCredential>) -> Result<reqwest::Response> {
        self.request(reqwest::Method::GET, path, credential, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        credential: Option<&SessionCredential>,
        body: impl Into<String>,
    ) -> Result<reqwest::Response> {
        self.request(reqwest::Method::POST, path, credential, Some(body.into()))
            .await
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        credential: Option<&SessionCredential>,
        body: Option<String>,
    ) -> Result<reqwest::Response> {
        let mut builder = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(credential) = credential {
            builder = builder.header(COOKIE, self.cookie_header(credential));
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        Ok(builder.send().await?)
    }
}

/// Response to a request written byte for byte on a fresh connection
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

impl TestApp {
    /// GET with the request target sent verbatim; no client-side URL normalization
    pub async fn raw_get(&self, target: &str, credential: Option<&SessionCredential>) -> Result<RawResponse> {
        let addr = self.base_url.trim_start_matches("http://");
        let mut stream = TcpStream::connect(addr).await?;

        let mut request = format!("GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n", target, addr);
        if let Some(credential) = credential {
            request.push_str(&format!("Cookie: {}\r\n", self.cookie_header(credential)));
        }
        request.push_str("\r\n");
        stream.write_all(request.as_bytes()).await?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await?;
        let raw = String::from_utf8_lossy(&raw).into_owned();

        let (head, body) = raw
            .split_once("\r\n\r\n")
            .context("response has no header terminator")?;
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .context("response has no status line")?;
        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        Ok(RawResponse {
            status,
            headers,
            body: body.to_string(),
        })
    }
}

pub fn location(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn set_cookies(res: &reqwest::Response) -> Vec<String> {
    res.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Value of a `Set-Cookie` for `name`, if the response sets one
pub fn set_cookie_value(res: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    set_cookies(res).into_iter().find_map(|cookie| {
        cookie
            .strip_prefix(&prefix)
            .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
    })
}
