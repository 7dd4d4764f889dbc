//! Session context: who the local participant is.
//!
//! DESIGN
//! ======
//! The local peer id is fixed for the lifetime of a session. The nickname can
//! change at any time (a settings form, a CLI flag); it lives in a
//! `tokio::sync::watch` channel so every interested task sees the latest
//! value and is woken on change. `SessionContext` is cheap to clone and is
//! passed explicitly to whatever needs it.

use std::sync::Arc;

use tokio::sync::watch;

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

/// Identity of the local participant, shared by clone.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    local_peer: String,
    nickname: watch::Sender<String>,
}

impl SessionContext {
    #[must_use]
    pub fn new(local_peer: impl Into<String>, nickname: impl Into<String>) -> Self {
        let (nickname, _) = watch::channel(nickname.into());
        Self { inner: Arc::new(ContextInner { local_peer: local_peer.into(), nickname }) }
    }

    /// Transport-level id of the local participant.
    #[must_use]
    pub fn local_peer(&self) -> &str {
        &self.inner.local_peer
    }

    /// Current nickname.
    #[must_use]
    pub fn nickname(&self) -> String {
        self.inner.nickname.borrow().clone()
    }

    /// Change the nickname. Subscribers are only woken if the value differs.
    pub fn set_nickname(&self, nickname: impl Into<String>) -> bool {
        let nickname = nickname.into();
        self.inner.nickname.send_if_modified(|current| {
            if *current == nickname {
                false
            } else {
                *current = nickname;
                true
            }
        })
    }

    /// Receiver that is notified on every nickname change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.inner.nickname.subscribe()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("local_peer", &self.inner.local_peer)
            .field("nickname", &*self.inner.nickname.borrow())
            .finish()
    }
}
