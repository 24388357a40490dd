// 🔐 Session - Explicit context object owning one close snapshot
//
// Lifecycle:
//   login  → Session issued (token, expiry, fresh seed snapshot)
//   apply  → snapshot replaced by the reducer output
//   logout / expiry → session gone, every write with it
//
// This is a gate for the demo views, NOT authentication: any non-empty
// username/password pair is accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{CloseError, Result};
use crate::filter::DashboardView;
use crate::model::{CloseSnapshot, Entity};
use crate::reducer::{reduce, Action, Outcome};
use crate::seed;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Entity selected in the dashboard filter
    pub entity: Entity,

    snapshot: CloseSnapshot,
}

impl Session {
    /// Issue a session for any non-blank credentials
    pub fn issue(
        username: &str,
        password: &str,
        ttl: chrono::Duration,
        task_list_id: &str,
    ) -> Result<Self> {
        if username.trim().is_empty() || password.trim().is_empty() {
            return Err(CloseError::InvalidCredentials);
        }

        let now = Utc::now();
        Ok(Session {
            token: uuid::Uuid::new_v4().to_string(),
            username: username.trim().to_string(),
            issued_at: now,
            expires_at: now + ttl,
            entity: Entity::Both,
            snapshot: seed::snapshot_for(task_list_id)?,
        })
    }

    pub fn is_expired(&self) -> bool {
        Expiring::is_expired_at(self, Utc::now())
    }

    pub fn snapshot(&self) -> &CloseSnapshot {
        &self.snapshot
    }

    pub fn task_list_id(&self) -> &str {
        &self.snapshot.task_list_id
    }

    /// Switch task list: the current snapshot is discarded for a fresh seed
    pub fn select_task_list(&mut self, task_list_id: &str) -> Result<()> {
        self.snapshot = seed::snapshot_for(task_list_id)?;
        info!(user = %self.username, task_list = task_list_id, "task list selected");
        Ok(())
    }

    pub fn select_entity(&mut self, entity: Entity) {
        self.entity = entity;
    }

    /// Run an action through the reducer and keep the result
    pub fn apply(&mut self, action: &Action) -> Outcome {
        let reduction = reduce(&self.snapshot, action);
        debug!(user = %self.username, ?action, outcome = ?reduction.outcome, "action applied");
        self.snapshot = reduction.snapshot;
        reduction.outcome
    }

    /// Like [`Session::apply`], but an unknown id is an error
    pub fn apply_strict(&mut self, action: &Action) -> Result<Outcome> {
        let outcome = self.apply(action);
        if outcome != Outcome::NotFound {
            return Ok(outcome);
        }

        match action {
            Action::ResolveException { id, .. } | Action::StartException { id } => {
                Err(CloseError::ExceptionNotFound(id.clone()))
            }
            Action::ToggleTask { id } => Err(CloseError::TaskNotFound(id.clone())),
            // Batch automations target no id and never report NotFound
            Action::Automation { .. } => Ok(outcome),
        }
    }

    pub fn view(&self) -> DashboardView {
        DashboardView::build(&self.snapshot, self.entity)
    }
}

// ============================================================================
// SESSION STORE
// ============================================================================

/// Anything kept in a [`SessionStore`] carries a fixed expiry
pub trait Expiring {
    fn expires_at(&self) -> DateTime<Utc>;

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

impl Expiring for Session {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl<T: Expiring> Expiring for std::sync::Arc<T> {
    fn expires_at(&self) -> DateTime<Utc> {
        T::expires_at(self)
    }
}

/// Token-keyed owner of all live sessions.
///
/// Holds plain [`Session`]s by default; the API server stores shared slots
/// that each wrap one behind its own lock.
pub struct SessionStore<T = Session> {
    sessions: HashMap<String, T>,
    ttl: chrono::Duration,
    default_task_list: String,
}

impl<T: Expiring> SessionStore<T> {
    pub fn new(ttl: chrono::Duration, default_task_list: &str) -> Self {
        SessionStore {
            sessions: HashMap::new(),
            ttl,
            default_task_list: default_task_list.to_string(),
        }
    }

    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self::new(config.session_ttl, &config.default_task_list)
    }

    /// Issue a session with this store's TTL and starting task list
    pub fn issue(&self, username: &str, password: &str) -> Result<Session> {
        let session = Session::issue(username, password, self.ttl, &self.default_task_list)?;
        info!(user = %session.username, expires_at = %session.expires_at, "session issued");
        Ok(session)
    }

    pub fn insert(&mut self, token: String, entry: T) {
        self.sessions.insert(token, entry);
    }

    pub fn logout(&mut self, token: &str) -> Result<()> {
        self.sessions
            .remove(token)
            .map(|_| info!("session closed"))
            .ok_or(CloseError::SessionNotFound)
    }

    fn check(&mut self, token: &str) -> Result<()> {
        let expired = match self.sessions.get(token) {
            None => return Err(CloseError::SessionNotFound),
            Some(entry) => entry.is_expired_at(Utc::now()),
        };

        if expired {
            self.sessions.remove(token);
            debug!("expired session dropped");
            return Err(CloseError::SessionExpired);
        }
        Ok(())
    }

    pub fn get(&mut self, token: &str) -> Result<&T> {
        self.check(token)?;
        self.sessions.get(token).ok_or(CloseError::SessionNotFound)
    }

    pub fn get_mut(&mut self, token: &str) -> Result<&mut T> {
        self.check(token)?;
        self.sessions.get_mut(token).ok_or(CloseError::SessionNotFound)
    }

    /// Drop expired sessions; returns how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| !entry.is_expired_at(now));
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore<Session> {
    /// Returns the new session's token
    pub fn login(&mut self, username: &str, password: &str) -> Result<String> {
        let session = self.issue(username, password)?;
        let token = session.token.clone();
        self.insert(token.clone(), session);
        Ok(token)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExceptionStatus, Resolver};
    use crate::reducer::AutomationKind;

    fn store() -> SessionStore {
        SessionStore::new(chrono::Duration::minutes(30), "AFC-1")
    }

    #[test]
    fn test_login_requires_credentials() {
        let mut store = store();
        assert_eq!(store.login("", "secret"), Err(CloseError::InvalidCredentials));
        assert_eq!(store.login("sarah", "   "), Err(CloseError::InvalidCredentials));
        assert!(store.login("sarah", "x").is_ok());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_session_lifecycle() {
        let mut store = store();
        let token = store.login("sarah", "secret").unwrap();

        let session = store.get(&token).unwrap();
        assert_eq!(session.username, "sarah");
        assert_eq!(session.task_list_id(), "AFC-1");
        assert!(session.expires_at > session.issued_at);

        store.logout(&token).unwrap();
        assert_eq!(store.get(&token).err(), Some(CloseError::SessionNotFound));
        assert_eq!(store.logout(&token), Err(CloseError::SessionNotFound));
    }

    #[test]
    fn test_expired_session_rejected_and_removed() {
        let mut store: SessionStore = SessionStore::new(chrono::Duration::zero(), "AFC-1");
        let token = store.login("sarah", "secret").unwrap();

        assert_eq!(store.get(&token).err(), Some(CloseError::SessionExpired));
        assert!(store.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let mut store: SessionStore = SessionStore::new(chrono::Duration::zero(), "AFC-1");
        store.login("a", "1").unwrap();
        store.login("b", "2").unwrap();

        assert_eq!(store.purge_expired(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_default_task_list_blocks_login() {
        let mut store: SessionStore = SessionStore::new(chrono::Duration::minutes(5), "AFC-9");
        assert_eq!(
            store.login("sarah", "secret"),
            Err(CloseError::UnknownTaskList("AFC-9".to_string()))
        );
    }

    #[test]
    fn test_sessions_do_not_share_snapshots() {
        let mut store = store();
        let a = store.login("a", "1").unwrap();
        let b = store.login("b", "2").unwrap();

        store
            .get_mut(&a)
            .unwrap()
            .apply(&Action::Automation { kind: AutomationKind::IntercompanyMatch });

        assert_eq!(store.get(&a).unwrap().snapshot().intercompany_match_rate, 87);
        assert_eq!(store.get(&b).unwrap().snapshot().intercompany_match_rate, 62);
    }

    #[test]
    fn test_select_task_list_resets_snapshot() {
        let mut store = store();
        let token = store.login("sarah", "secret").unwrap();
        let session = store.get_mut(&token).unwrap();

        session.apply(&Action::ResolveException {
            id: "EXC-004".to_string(),
            resolver: Resolver::Manual,
        });
        assert!(session.snapshot().exception("EXC-004").unwrap().is_resolved());

        session.select_task_list("AFC-2").unwrap();
        assert_eq!(session.task_list_id(), "AFC-2");
        assert_eq!(
            session.snapshot().exception("EXC-004").unwrap().status,
            ExceptionStatus::Open
        );

        assert_eq!(
            session.select_task_list("nope"),
            Err(CloseError::UnknownTaskList("nope".to_string()))
        );
        assert_eq!(session.task_list_id(), "AFC-2");
    }

    #[test]
    fn test_apply_strict_reports_missing_ids() {
        let mut store = store();
        let token = store.login("sarah", "secret").unwrap();
        let session = store.get_mut(&token).unwrap();

        assert_eq!(
            session.apply_strict(&Action::StartException { id: "EXC-404".to_string() }),
            Err(CloseError::ExceptionNotFound("EXC-404".to_string()))
        );
        assert_eq!(
            session.apply_strict(&Action::ToggleTask { id: "TASK-404".to_string() }),
            Err(CloseError::TaskNotFound("TASK-404".to_string()))
        );
        assert_eq!(
            session.apply_strict(&Action::ToggleTask { id: "TASK-001".to_string() }),
            Ok(Outcome::Applied)
        );
    }

    #[test]
    fn test_apply_strict_accepts_exhausted_automation() {
        let mut store = store();
        let token = store.login("sarah", "secret").unwrap();
        let session = store.get_mut(&token).unwrap();
        let action = Action::Automation { kind: AutomationKind::AccrualGeneration };

        assert_eq!(session.apply_strict(&action), Ok(Outcome::Applied));
        assert_eq!(session.apply_strict(&action), Ok(Outcome::Unchanged));
    }

    #[test]
    fn test_store_holds_shared_entries() {
        use std::sync::Arc;

        let mut store: SessionStore<Arc<Session>> =
            SessionStore::new(chrono::Duration::minutes(5), "AFC-2");
        let session = store.issue("sarah", "secret").unwrap();
        let token = session.token.clone();
        store.insert(token.clone(), Arc::new(session));

        assert_eq!(store.get(&token).unwrap().task_list_id(), "AFC-2");
        assert_eq!(store.purge_expired(), 0);
        store.logout(&token).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_view_follows_entity() {
        let mut store = store();
        let token = store.login("sarah", "secret").unwrap();
        let session = store.get_mut(&token).unwrap();

        session.select_entity(Entity::Tmh);
        let view = session.view();
        assert_eq!(view.entity, Entity::Tmh);
        assert!(view.exceptions.iter().all(|e| e.entity != Entity::Raymond));
    }
}
