//! Session state shared between the listener task and the input loop.
//!
//! Only a handful of fields cross the two flows: who we are, whether a
//! game is running, and whose turn it is. The input loop must not spin
//! on the turn flag, so [`SessionHandle::wait_my_turn`] parks on a
//! notify handle that the listener pings after every state change.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// The fields shared between the network listener and the input loop.
#[derive(Debug)]
pub struct Session {
    /// Username sent with the last LOGIN attempt.
    pub username: Option<String>,
    /// The other seated player, once a game has begun.
    pub opponent: Option<String>,
    /// True while we are seated in a running game.
    pub in_game: bool,
    /// True when we may place the next marker.
    pub my_turn: bool,
    /// Cleared when the server connection drops.
    pub connected: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            username: None,
            opponent: None,
            in_game: false,
            my_turn: false,
            connected: true,
        }
    }
}

/// Cloneable handle to the shared session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<Session>,
    changed: Notify,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(Session::new()),
                changed: Notify::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        // A poisoned lock only means a panicked task; the state itself
        // is still usable
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads from the session under the lock.
    pub fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&self.lock())
    }

    /// Mutates the session under the lock and wakes every waiter.
    pub fn update(&self, f: impl FnOnce(&mut Session)) {
        {
            let mut state = self.lock();
            f(&mut state);
        }
        self.inner.changed.notify_waiters();
    }

    /// Blocks until it is this player's turn. Returns false instead if
    /// the game ended or the connection dropped while waiting. Never
    /// busy-polls: between checks the task parks on the notify handle.
    pub async fn wait_my_turn(&self) -> bool {
        loop {
            // Register interest before checking, so an update landing
            // between the check and the await is not lost
            let notified = self.inner.changed.notified();
            {
                let state = self.lock();
                if !state.connected || !state.in_game {
                    return false;
                }
                if state.my_turn {
                    return true;
                }
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_resolves_when_turn_arrives() {
        let session = SessionHandle::new();
        session.update(|s| s.in_game = true);

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_my_turn().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        session.update(|s| s.my_turn = true);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_aborts_when_game_ends() {
        let session = SessionHandle::new();
        session.update(|s| s.in_game = true);

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_my_turn().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        session.update(|s| s.in_game = false);
        assert!(!waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_aborts_on_disconnect() {
        let session = SessionHandle::new();
        session.update(|s| s.in_game = true);

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_my_turn().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        session.update(|s| s.connected = false);
        assert!(!waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_if_already_our_turn() {
        let session = SessionHandle::new();
        session.update(|s| {
            s.in_game = true;
            s.my_turn = true;
        });
        assert!(session.wait_my_turn().await);
    }
}
