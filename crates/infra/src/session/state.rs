//! Shared session record
//!
//! The only mutable state shared between the authenticator, the two
//! schedulers and request collaborators. Every write is one critical
//! section; readers take cheap snapshots.

use std::sync::atomic::{AtomicBool, Ordering};

use odp_session_core::TokenSupplier;
use odp_session_domain::SessionData;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct SessionState {
    data: RwLock<SessionData>,
    authenticated: AtomicBool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> SessionData {
        self.data.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.data.read().token().map(str::to_string)
    }

    /// Merge `patch` and mark the session authenticated.
    pub fn install(&self, patch: SessionData) -> SessionData {
        let mut data = self.data.write();
        data.merge(patch);
        self.authenticated.store(true, Ordering::SeqCst);
        data.clone()
    }

    /// Merge on behalf of a scheduler generation.
    ///
    /// The patch is applied only if `cancel` is still live when the write
    /// lock is held; returns the merged record, or `None` when discarded.
    pub fn merge_unless_cancelled(
        &self,
        cancel: &CancellationToken,
        patch: SessionData,
    ) -> Option<SessionData> {
        let mut data = self.data.write();
        if cancel.is_cancelled() {
            return None;
        }
        data.merge(patch);
        Some(data.clone())
    }

    /// Wait out any merge that is already inside the write lock.
    ///
    /// Called right after cancelling a scheduler: once this returns, no
    /// merge from that scheduler can land.
    pub fn fence(&self) {
        drop(self.data.write());
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }
}

impl TokenSupplier for SessionState {
    fn current_token(&self) -> Option<String> {
        self.token()
    }
}
