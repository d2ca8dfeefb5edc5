//! Pending-session registry, keyed by correlation id.

use std::sync::Arc;

use dashmap::DashMap;

use super::session::{Session, SessionId};
use crate::observability::metrics;

/// Concurrent map of the sessions whose webhook task is still running.
///
/// Webhook tasks insert and remove, reply tasks look up; all of them run in
/// parallel, so the map is a `DashMap` rather than a plain `HashMap`.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<DashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for as long as the returned guard lives.
    pub fn register(&self, session: Arc<Session>) -> Registration {
        let id = session.id();
        if self.inner.insert(id, session).is_some() {
            tracing::error!(session_id = %id, "Session id collision, previous session replaced");
        }
        metrics::record_pending_sessions(self.inner.len());
        Registration {
            registry: self.clone(),
            id,
        }
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.inner.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        let removed = self.inner.remove(id).map(|(_, session)| session);
        metrics::record_pending_sessions(self.inner.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Removes its session from the registry when dropped.
///
/// Held by the webhook task, so the entry disappears on every exit path,
/// including cancellation when the webhook caller hangs up.
#[must_use = "dropping the registration unregisters the session"]
pub struct Registration {
    registry: SessionRegistry,
    id: SessionId,
}

impl Registration {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
        tracing::trace!(session_id = %self.id, "Session unregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn session() -> Arc<Session> {
        let request = Request::post("/webhook/").body(Body::empty()).unwrap();
        let (session, _waiter) = Session::new("127.0.0.1:1".parse().unwrap(), request);
        session
    }

    #[test]
    fn registration_guard_controls_presence() {
        let registry = SessionRegistry::new();
        let s = session();
        let id = s.id();

        let registration = registry.register(s);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&id).is_some());

        drop(registration);
        assert!(registry.is_empty());
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn unknown_id_does_not_disturb_others() {
        let registry = SessionRegistry::new();
        let _a = registry.register(session());
        let _b = registry.register(session());

        assert!(registry.get(&SessionId::new()).is_none());
        assert!(registry.remove(&SessionId::new()).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_register_and_lookup() {
        let registry = SessionRegistry::new();
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let s = session();
                let id = s.id();
                let _registration = registry.register(s);
                tokio::task::yield_now().await;
                registry.get(&id).is_some()
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert!(registry.is_empty());
    }
}
