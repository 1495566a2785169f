use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use {felis_common::Mode, felis_qna::QueryResult};

/// Per-user runtime state.
#[derive(Debug, Clone, Default)]
pub struct UserState {
    pub mode: Mode,
    pub in_flight: bool,
    /// Last successful retrieval result, kept so `/contexts` can show its
    /// sources without asking the backend again.
    pub last_result: Option<QueryResult>,
}

/// In-memory map of user state shared by every update handler.
///
/// The lock is a plain `std::sync::RwLock` and is never held across an
/// `.await`. Lookups take the read side, so unrelated users never
/// serialize on each other. Lost on restart.
#[derive(Debug)]
pub struct UserStateStore {
    default_mode: Mode,
    users: RwLock<HashMap<String, UserState>>,
}

impl UserStateStore {
    pub fn new(default_mode: Mode) -> Self {
        Self {
            default_mode,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Make sure `user_id` has an entry. Cheap when it already exists.
    pub fn observe(&self, user_id: &str) {
        if self.read().contains_key(user_id) {
            return;
        }
        self.write()
            .entry(user_id.to_string())
            .or_insert_with(|| self.fresh_state());
    }

    pub fn mode(&self, user_id: &str) -> Mode {
        self.read()
            .get(user_id)
            .map_or(self.default_mode, |state| state.mode)
    }

    pub fn set_mode(&self, user_id: &str, mode: Mode) {
        self.write()
            .entry(user_id.to_string())
            .or_insert_with(|| self.fresh_state())
            .mode = mode;
    }

    pub fn is_in_flight(&self, user_id: &str) -> bool {
        self.read().get(user_id).is_some_and(|state| state.in_flight)
    }

    /// Atomically claim the single retrieval slot of `user_id`.
    ///
    /// Returns `None` when a retrieval is already in flight. The returned
    /// guard releases the slot when dropped, including while unwinding.
    pub fn try_begin_query(self: &Arc<Self>, user_id: &str) -> Option<InFlightGuard> {
        let mut users = self.write();
        let state = users
            .entry(user_id.to_string())
            .or_insert_with(|| self.fresh_state());
        if state.in_flight {
            return None;
        }
        state.in_flight = true;
        Some(InFlightGuard {
            store: Arc::clone(self),
            user_id: user_id.to_string(),
        })
    }

    pub fn remember_result(&self, user_id: &str, result: QueryResult) {
        self.write()
            .entry(user_id.to_string())
            .or_insert_with(|| self.fresh_state())
            .last_result = Some(result);
    }

    pub fn forget_result(&self, user_id: &str) {
        if let Some(state) = self.write().get_mut(user_id) {
            state.last_result = None;
        }
    }

    pub fn last_result(&self, user_id: &str) -> Option<QueryResult> {
        self.read()
            .get(user_id)
            .and_then(|state| state.last_result.clone())
    }

    pub fn user_count(&self) -> usize {
        self.read().len()
    }

    fn release(&self, user_id: &str) {
        if let Some(state) = self.write().get_mut(user_id) {
            state.in_flight = false;
        }
    }

    fn fresh_state(&self) -> UserState {
        UserState {
            mode: self.default_mode,
            ..Default::default()
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, UserState>> {
        self.users.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, UserState>> {
        self.users.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holds a user's in-flight retrieval slot; dropping it frees the slot.
#[derive(Debug)]
pub struct InFlightGuard {
    store: Arc<UserStateStore>,
    user_id: String,
}

impl InFlightGuard {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.store.release(&self.user_id);
    }
}
