use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{AccessStore, ResolvedSession, SessionStore, StoreError};
use crate::access::{Identity, PermissionLevel, ResourceCategory};
use crate::auth::new_refresh_token;
use crate::gatekeeper::SessionCredential;

struct MemorySession {
    identity: Identity,
    access_token: String,
    refresh_token: String,
    access_valid: bool,
}

#[derive(Default)]
struct State {
    sessions: HashMap<Uuid, MemorySession>,
    by_access: HashMap<String, Uuid>,
    by_refresh: HashMap<String, Uuid>,
    accounts: HashMap<Uuid, bool>,
    grants: HashMap<(Uuid, ResourceCategory), PermissionLevel>,
}

impl State {
    fn insert_session(&mut self, identity: Identity) -> SessionCredential {
        let sid = Uuid::new_v4();
        let session = MemorySession {
            identity,
            access_token: new_access_token(),
            refresh_token: new_refresh_token(),
            access_valid: true,
        };
        let credential = SessionCredential::new(&session.access_token, &session.refresh_token);

        self.by_access.insert(session.access_token.clone(), sid);
        self.by_refresh.insert(session.refresh_token.clone(), sid);
        self.sessions.insert(sid, session);
        credential
    }

    fn rotate(&mut self, sid: Uuid) -> Option<ResolvedSession> {
        let session = self.sessions.get_mut(&sid)?;
        self.by_access.remove(&session.access_token);
        self.by_refresh.remove(&session.refresh_token);

        session.access_token = new_access_token();
        session.refresh_token = new_refresh_token();
        session.access_valid = true;

        self.by_access.insert(session.access_token.clone(), sid);
        self.by_refresh.insert(session.refresh_token.clone(), sid);

        Some(ResolvedSession::refreshed(
            session.identity.clone(),
            SessionCredential::new(&session.access_token, &session.refresh_token),
        ))
    }
}

fn new_access_token() -> String {
    format!("mem-{}", Uuid::new_v4().simple())
}

/// In-process sessions, accounts and grants.
///
/// Backs the CLI `simulate` command and the test suites. Outages can be
/// simulated with [`MemoryStore::set_unavailable`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
    permission_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }

    pub fn set_active(&self, user_id: Uuid, active: bool) {
        self.state().accounts.insert(user_id, active);
    }

    pub fn grant(&self, user_id: Uuid, category: ResourceCategory, level: PermissionLevel) {
        self.state().grants.insert((user_id, category), level);
    }

    pub fn revoke_grant(&self, user_id: Uuid, category: ResourceCategory) {
        self.state().grants.remove(&(user_id, category));
    }

    /// Opens a session without going through the async trait
    pub fn open_session(&self, identity: &Identity) -> SessionCredential {
        self.state().insert_session(identity.clone())
    }

    /// Makes the access token unusable so the next resolve goes through refresh
    pub fn expire_access_token(&self, access_token: &str) {
        let mut state = self.state();
        if let Some(sid) = state.by_access.get(access_token).copied() {
            if let Some(session) = state.sessions.get_mut(&sid) {
                session.access_valid = false;
            }
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn permission_lookups(&self) -> usize {
        self.permission_lookups.load(Ordering::SeqCst)
    }

    pub fn live_sessions(&self, user_id: Uuid) -> usize {
        self.state()
            .sessions
            .values()
            .filter(|session| session.identity.id == user_id)
            .count()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn resolve(&self, credential: &SessionCredential) -> Result<Option<ResolvedSession>, StoreError> {
        self.check_available()?;
        let mut state = self.state();

        if let Some(token) = &credential.access_token {
            let current = state
                .by_access
                .get(token)
                .and_then(|sid| state.sessions.get(sid))
                .filter(|session| session.access_valid);
            if let Some(session) = current {
                return Ok(Some(ResolvedSession::current(session.identity.clone())));
            }
        }

        let sid = credential
            .refresh_token
            .as_ref()
            .and_then(|token| state.by_refresh.get(token).copied());

        Ok(sid.and_then(|sid| state.rotate(sid)))
    }

    async fn invalidate(&self, identity: &Identity) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.state();

        let sids: Vec<Uuid> = state
            .sessions
            .iter()
            .filter(|(_, session)| session.identity.id == identity.id)
            .map(|(sid, _)| *sid)
            .collect();

        for sid in sids {
            if let Some(session) = state.sessions.remove(&sid) {
                state.by_access.remove(&session.access_token);
                state.by_refresh.remove(&session.refresh_token);
            }
        }
        Ok(())
    }

    async fn open(&self, identity: &Identity) -> Result<SessionCredential, StoreError> {
        self.check_available()?;
        Ok(self.open_session(identity))
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn is_active(&self, user_id: Uuid) -> Result<Option<bool>, StoreError> {
        self.check_available()?;
        Ok(self.state().accounts.get(&user_id).copied())
    }

    async fn permission_level(
        &self,
        user_id: Uuid,
        category: ResourceCategory,
    ) -> Result<Option<PermissionLevel>, StoreError> {
        self.permission_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.state().grants.get(&(user_id, category)).copied())
    }
}
