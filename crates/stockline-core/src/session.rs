// ── Session store ──
//
// Mailbox for the opaque session credential. The embedding application
// produces the token (the authentication handshake is not this crate's
// business); the sync core only ever reads it, and clears it on a hard
// authorization failure. A `None` observed by subscribers means
// "re-authenticate" -- there is no separate redirect signal.

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;

/// Shared, watchable holder for the session token.
#[derive(Clone)]
pub struct SessionStore {
    token: watch::Sender<Option<SecretString>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (token, _) = watch::channel(None);
        Self { token }
    }

    /// Create a store that already holds a token.
    pub fn with_token(token: SecretString) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    /// Install a fresh token (login or renewal).
    pub fn set(&self, token: SecretString) {
        self.token.send_replace(Some(token));
    }

    /// Drop the token. Called on hard auth failure and on logout.
    pub fn clear(&self) {
        self.token.send_replace(None);
    }

    /// Current token, if any.
    pub fn get(&self) -> Option<SecretString> {
        self.token.borrow().clone()
    }

    /// Expose the current token value for wire use (bearer header,
    /// channel query parameter).
    pub(crate) fn exposed(&self) -> Option<String> {
        self.token
            .borrow()
            .as_ref()
            .map(|t| t.expose_secret().to_owned())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.borrow().is_some()
    }

    /// Subscribe to token changes. Observing a transition to `None` is
    /// the cue to send the user back through authentication.
    pub fn subscribe(&self) -> watch::Receiver<Option<SecretString>> {
        self.token.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_notifies_subscribers() {
        let store = SessionStore::with_token(SecretString::from("tok".to_owned()));
        let mut rx = store.subscribe();
        assert!(rx.borrow_and_update().is_some());

        store.clear();
        assert!(rx.has_changed().unwrap_or(false));
        assert!(rx.borrow_and_update().is_none());
        assert!(!store.is_authenticated());
    }
}
