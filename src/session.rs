//! Session-scoped shared state.
//!
//! One [`SessionState`] lives for the whole server process and is the only
//! entity with cross-call mutable lifetime. It replaces the "module-level
//! global handle" pattern: handlers that hold an external resource across
//! calls (a live browser page, a loaded model) park it here under a string
//! key instead of a process-wide singleton.
//!
//! # Ownership
//!
//! The store is exclusively owned by the dispatcher. Handlers receive a
//! borrow for the duration of one invocation and must not retain references
//! past their own call — the message loop is strictly serialised, so there
//! is never a second accessor and no internal locking is needed.
//!
//! # Release discipline
//!
//! At most one logical "active handle" of each resource type lives here at
//! a time: storing a new value under an occupied key runs the old value's
//! release hook (if one was registered) exactly once, before the new value
//! is stored. `clear` releases everything and runs on graceful shutdown.

use std::any::Any;
use std::collections::HashMap;

type ReleaseHook = Box<dyn FnMut(&mut dyn Any) + Send>;

struct Entry {
    value: Box<dyn Any + Send>,
    release: Option<ReleaseHook>,
}

impl Entry {
    /// Runs the release hook, at most once.
    fn release(&mut self) {
        if let Some(mut hook) = self.release.take() {
            hook(&mut *self.value);
        }
    }
}

/// The mutable context shared by all handlers within one server lifetime.
#[derive(Default)]
pub struct SessionState {
    entries: HashMap<String, Entry>,
}

impl SessionState {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the value under `key`, if present and of type `T`.
    #[must_use]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.entries
            .get(key)
            .and_then(|entry| entry.value.downcast_ref::<T>())
    }

    /// Returns a mutable reference to the value under `key`, if present and
    /// of type `T`.
    #[must_use]
    pub fn get_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.entries
            .get_mut(key)
            .and_then(|entry| entry.value.downcast_mut::<T>())
    }

    /// Returns `true` if a value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores `value` under `key` with no release hook.
    ///
    /// Any previous value under `key` is released first.
    pub fn put<T: Send + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.store(
            key.into(),
            Entry {
                value: Box::new(value),
                release: None,
            },
        );
    }

    /// Stores `value` under `key` with a release hook.
    ///
    /// The hook runs exactly once, when the value is replaced, removed,
    /// cleared, or the session is dropped. Any previous value under `key`
    /// is released first.
    pub fn put_with_release<T, F>(&mut self, key: impl Into<String>, value: T, mut release: F)
    where
        T: Send + 'static,
        F: FnMut(&mut T) + Send + 'static,
    {
        let hook: ReleaseHook = Box::new(move |any| {
            if let Some(value) = any.downcast_mut::<T>() {
                release(value);
            }
        });
        self.store(
            key.into(),
            Entry {
                value: Box::new(value),
                release: Some(hook),
            },
        );
    }

    /// Removes the value under `key`, running its release hook.
    ///
    /// Returns `true` if a value was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some_and(|mut entry| {
            entry.release();
            true
        })
    }

    /// Releases and drops every stored value.
    pub fn clear(&mut self) {
        for (_, mut entry) in self.entries.drain() {
            entry.release();
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Old value (if any) is released before the new entry lands.
    fn store(&mut self, key: String, entry: Entry) {
        if let Some(mut old) = self.entries.remove(&key) {
            old.release();
        }
        self.entries.insert(key, entry);
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("SessionState").field("keys", &keys).finish()
    }
}
