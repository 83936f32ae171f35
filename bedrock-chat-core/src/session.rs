//! Maps client session keys to their conversations
//!
//! The key is whatever the routing layer uses to tell clients apart. It is distinct from the
//! conversation's own session id, which changes every time the conversation is cleared.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::Mutex as AsyncMutex;

use crate::conversation::{ContextBudget, Conversation};

/// A conversation shared between requests of the same session
///
/// Holding the lock serializes invocations for that session.
pub type SharedConversation = Arc<AsyncMutex<Conversation>>;

pub const DEFAULT_SESSION_KEY: &str = "default";
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug)]
struct Entry {
    conversation: SharedConversation,
    last_used: u64,
}

#[derive(Debug, Default)]
struct Sessions {
    entries: HashMap<String, Entry>,
    clock: u64,
}

impl Sessions {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_least_recently_used(&mut self) {
        let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone())
        else {
            return;
        };

        tracing::debug!(session_key = %key, "Evicting least recently used conversation");
        self.entries.remove(&key);
    }
}

/// Holds at most `max_sessions` conversations
///
/// Creating a conversation beyond the cap evicts the least recently used one. A request that
/// still holds an evicted conversation keeps working on it; later requests for that key start
/// over.
#[derive(Clone, Debug)]
pub struct SessionStore {
    sessions: Arc<Mutex<Sessions>>,
    budget: ContextBudget,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_budget(ContextBudget::default())
    }
}

impl SessionStore {
    /// New conversations are created with the given budget
    pub fn with_budget(budget: ContextBudget) -> Self {
        Self {
            sessions: Arc::default(),
            budget,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Caps the number of conversations kept; at least one is always kept
    #[must_use]
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    pub fn budget(&self) -> ContextBudget {
        self.budget
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Returns the conversation for `key`, creating it on first use
    ///
    /// # Panics
    ///
    /// Panics if the inner mutex is poisoned
    pub fn conversation(&self, key: &str) -> SharedConversation {
        let mut sessions = self.sessions.lock().unwrap();
        let now = sessions.tick();

        if let Some(entry) = sessions.entries.get_mut(key) {
            entry.last_used = now;
            return entry.conversation.clone();
        }

        while sessions.entries.len() >= self.max_sessions {
            sessions.evict_least_recently_used();
        }

        tracing::debug!(session_key = key, "Creating conversation");
        let conversation = Arc::new(AsyncMutex::new(Conversation::new(self.budget)));
        sessions.entries.insert(
            key.to_string(),
            Entry {
                conversation: conversation.clone(),
                last_used: now,
            },
        );

        conversation
    }

    /// Returns the conversation for `key` without creating one
    ///
    /// # Panics
    ///
    /// Panics if the inner mutex is poisoned
    pub fn get(&self, key: &str) -> Option<SharedConversation> {
        let mut sessions = self.sessions.lock().unwrap();
        let now = sessions.tick();

        sessions.entries.get_mut(key).map(|entry| {
            entry.last_used = now;
            entry.conversation.clone()
        })
    }

    /// # Panics
    ///
    /// Panics if the inner mutex is poisoned
    pub fn remove(&self, key: &str) -> Option<SharedConversation> {
        self.sessions
            .lock()
            .unwrap()
            .entries
            .remove(key)
            .map(|entry| entry.conversation)
    }

    /// # Panics
    ///
    /// Panics if the inner mutex is poisoned
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// # Panics
    ///
    /// Panics if the inner mutex is poisoned
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self
            .sessions
            .lock()
            .unwrap()
            .entries
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        keys.sort();
        keys
    }
}
