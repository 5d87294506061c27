//! Per-request authorization decision.
//!
//! [`Gatekeeper::evaluate`] runs the ordered checks (identity, public route,
//! account active flag, category permission, login bounce) and returns a
//! [`Verdict`]. The verdict always carries the cookie change accumulated along
//! the way, so whichever branch terminates the request still ships refreshed
//! or cleared credentials to the client.

pub mod credential;

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::access::routes::{LOGIN_PATH, ROOT_PATH};
use crate::access::{Identity, PermissionLevel, ResourceCategory, RouteTable, STANDARD_ROUTES};
use crate::store::{AccessStore, SessionStore};

pub use credential::{CredentialChange, SessionCookies, SessionCredential};

/// Where a refused request is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectTarget {
    Login,
    Deactivated,
    Dashboard,
    Qmrl,
}

impl RedirectTarget {
    pub fn location(&self) -> &'static str {
        match self {
            RedirectTarget::Login => LOGIN_PATH,
            RedirectTarget::Deactivated => "/login?reason=deactivated",
            RedirectTarget::Dashboard => "/dashboard",
            RedirectTarget::Qmrl => "/qmrl",
        }
    }

    /// Blocked from the dashboard itself, fall back somewhere that is not the dashboard
    pub fn fallback_for(category: ResourceCategory) -> Self {
        match category {
            ResourceCategory::SystemDashboard => RedirectTarget::Qmrl,
            _ => RedirectTarget::Dashboard,
        }
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.location())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// Public route, anonymous caller; the request goes through untouched
    PassThrough,
    Forward { identity: Identity },
    Redirect { to: RedirectTarget },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub credential: CredentialChange,
}

impl Verdict {
    pub fn is_forwarded(&self) -> bool {
        !matches!(self.decision, Decision::Redirect { .. })
    }

    pub fn redirect_target(&self) -> Option<RedirectTarget> {
        match self.decision {
            Decision::Redirect { to } => Some(to),
            _ => None,
        }
    }
}

/// Accumulates the credential change while the checks run
struct Outcome {
    credential: CredentialChange,
}

impl Outcome {
    fn pass_through(self) -> Verdict {
        self.finish(Decision::PassThrough)
    }

    fn forward(self, identity: Identity) -> Verdict {
        self.finish(Decision::Forward { identity })
    }

    fn redirect(self, to: RedirectTarget) -> Verdict {
        self.finish(Decision::Redirect { to })
    }

    fn finish(self, decision: Decision) -> Verdict {
        Verdict {
            decision,
            credential: self.credential,
        }
    }
}

#[derive(Clone)]
pub struct Gatekeeper {
    sessions: Arc<dyn SessionStore>,
    access: Arc<dyn AccessStore>,
    routes: Arc<RouteTable>,
}

impl Gatekeeper {
    pub fn new(sessions: Arc<dyn SessionStore>, access: Arc<dyn AccessStore>) -> Self {
        Self {
            sessions,
            access,
            routes: Arc::new(STANDARD_ROUTES.clone()),
        }
    }

    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = Arc::new(routes);
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// `path` must already be in [`canonical_path`](crate::access::canonical_path) form.
    pub async fn evaluate(&self, path: &str, credential: &SessionCredential) -> Verdict {
        let mut outcome = Outcome {
            credential: CredentialChange::Keep,
        };

        let identity = self.resolve_identity(credential, &mut outcome).await;
        let public = self.routes.is_public(path);

        let Some(identity) = identity else {
            if public {
                return outcome.pass_through();
            }
            tracing::debug!(path, "anonymous request to protected path");
            return outcome.redirect(RedirectTarget::Login);
        };

        if self.is_deactivated(&identity).await {
            tracing::info!(user_id = %identity.id, path, "deactivated account signed out");
            if let Err(e) = self.sessions.invalidate(&identity).await {
                tracing::warn!(user_id = %identity.id, "failed to invalidate session: {}", e);
            }
            outcome.credential = CredentialChange::Clear;
            return outcome.redirect(RedirectTarget::Deactivated);
        }

        if !public && path != ROOT_PATH {
            if let Some(category) = self.routes.category_for(path) {
                let level = self.permission_level(&identity, category).await;
                if level.is_blocked() {
                    let fallback = RedirectTarget::fallback_for(category);
                    tracing::info!(
                        user_id = %identity.id,
                        path,
                        category = %category,
                        fallback = %fallback,
                        "access blocked"
                    );
                    return outcome.redirect(fallback);
                }
            }
        }

        if path == LOGIN_PATH {
            return outcome.redirect(RedirectTarget::Dashboard);
        }

        tracing::debug!(user_id = %identity.id, path, "request forwarded");
        outcome.forward(identity)
    }

    async fn resolve_identity(
        &self,
        credential: &SessionCredential,
        outcome: &mut Outcome,
    ) -> Option<Identity> {
        if credential.is_empty() {
            return None;
        }

        match self.sessions.resolve(credential).await {
            Ok(Some(resolved)) => {
                if let Some(refreshed) = resolved.refreshed {
                    outcome.credential = CredentialChange::Refresh(refreshed);
                }
                Some(resolved.identity)
            }
            Ok(None) => {
                // Stale or revoked tokens; drop them from the client
                outcome.credential = CredentialChange::Clear;
                None
            }
            Err(e) => {
                tracing::warn!("session resolution failed, treating caller as anonymous: {}", e);
                None
            }
        }
    }

    async fn is_deactivated(&self, identity: &Identity) -> bool {
        match self.access.is_active(identity.id).await {
            Ok(active) => active == Some(false),
            Err(e) => {
                tracing::warn!(user_id = %identity.id, "active flag lookup failed: {}", e);
                false
            }
        }
    }

    async fn permission_level(&self, identity: &Identity, category: ResourceCategory) -> PermissionLevel {
        match self.access.permission_level(identity.id, category).await {
            Ok(level) => level.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    user_id = %identity.id,
                    category = %category,
                    "permission lookup failed, blocking: {}",
                    e
                );
                PermissionLevel::Block
            }
        }
    }
}
