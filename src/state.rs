use sqlx::PgPool;

use crate::config::SessionConfig;
use crate::gatekeeper::{Gatekeeper, SessionCookies};
use crate::handlers::proxy::Upstream;

/// Handles shared by the middleware and handlers; built once by the binary
#[derive(Clone)]
pub struct AppState {
    pub gatekeeper: Gatekeeper,
    pub cookies: SessionCookies,
    pub upstream: Upstream,
    /// Absent when running against in-memory stores
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(gatekeeper: Gatekeeper, session: &SessionConfig, upstream: Upstream) -> Self {
        Self {
            gatekeeper,
            cookies: SessionCookies::from_config(session),
            upstream,
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }
}
