//! Access to the session token used to authenticate the socket.

use std::sync::{PoisonError, RwLock};

/// Supplies the current session token.
///
/// Asked once per connection attempt. Returning `None` means the user is not
/// logged in; the attempt is skipped without error.
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// In-memory token holder updated at login and logout.
#[derive(Debug, Default)]
pub struct TokenSlot {
    token: RwLock<Option<String>>,
}

impl TokenSlot {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }

    /// Stores a token. An empty string clears the slot.
    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        *self.token.write().unwrap_or_else(PoisonError::into_inner) =
            (!token.is_empty()).then_some(token);
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialProvider for TokenSlot {
    fn token(&self) -> Option<String> {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_set_and_clear() {
        let slot = TokenSlot::default();
        assert_eq!(slot.token(), None);
        slot.set("abc");
        assert_eq!(slot.token().as_deref(), Some("abc"));
        slot.clear();
        assert_eq!(slot.token(), None);
    }

    #[test]
    fn empty_token_means_logged_out() {
        let slot = TokenSlot::new(Some(String::new()));
        assert_eq!(slot.token(), None);
        slot.set("abc");
        slot.set("");
        assert_eq!(slot.token(), None);
    }

    #[test]
    fn closures_are_providers() {
        let provider = || Some("t".to_string());
        assert_eq!(CredentialProvider::token(&provider).as_deref(), Some("t"));
    }
}
