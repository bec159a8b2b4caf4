//! Session and user identity supplied by the host application.
//!
//! Providers are called on every request and never cached, so the SDK always sends the identity
//! that is current at the time a request is built.
use std::sync::{Arc, RwLock};

use crate::{Error, Result};

/// Supplies the current session id.
pub trait SessionIdProvider {
    /// Return the current session id. A blank value fails the request with
    /// [`Error::Validation`].
    fn session_id(&self) -> String;
}

impl<T: Fn() -> String> SessionIdProvider for T {
    fn session_id(&self) -> String {
        self()
    }
}

/// Supplies the current user id. `None` means the user is anonymous.
pub trait UserIdProvider {
    /// Return the current user id, if the user is known.
    fn user_id(&self) -> Option<String>;
}

impl<T: Fn() -> Option<String>> UserIdProvider for T {
    fn user_id(&self) -> Option<String> {
        self()
    }
}

pub(crate) struct AnonymousUser;
impl UserIdProvider for AnonymousUser {
    fn user_id(&self) -> Option<String> {
        None
    }
}

/// Resolves session and user ids for outgoing requests.
///
/// Holds an optional user id override that can be updated concurrently with in-flight requests
/// (e.g., when a user logs in). Readers observe either the old or the new value.
pub(crate) struct Identity {
    session: Arc<dyn SessionIdProvider + Send + Sync>,
    user: Arc<dyn UserIdProvider + Send + Sync>,
    user_override: RwLock<Option<String>>,
}

impl Identity {
    pub(crate) fn new(
        session: Arc<dyn SessionIdProvider + Send + Sync>,
        user: Arc<dyn UserIdProvider + Send + Sync>,
    ) -> Identity {
        Identity {
            session,
            user,
            user_override: RwLock::new(None),
        }
    }

    /// Current session id, validated to be non-blank.
    pub(crate) fn session_id(&self) -> Result<String> {
        let session_id = self.session.session_id();
        if session_id.trim().is_empty() {
            return Err(Error::validation("session id cannot be blank"));
        }
        Ok(session_id)
    }

    /// Current user id: the override if one is set, otherwise whatever the provider returns.
    /// Blank provider values are treated as anonymous.
    pub(crate) fn user_id(&self) -> Option<String> {
        let user_override = self
            .user_override
            .read()
            .expect("thread holding user id lock should not panic")
            .clone();

        user_override
            .or_else(|| self.user.user_id())
            .filter(|user_id| !user_id.trim().is_empty())
    }

    /// Override the user id. `None` clears the override so the provider applies again.
    pub(crate) fn update_user_id(&self, user_id: Option<String>) -> Result<()> {
        if let Some(user_id) = &user_id {
            if user_id.trim().is_empty() {
                return Err(Error::validation("user id cannot be blank"));
            }
        }

        let mut slot = self
            .user_override
            .write()
            .expect("thread holding user id lock should not panic");
        *slot = user_id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::{AnonymousUser, Identity};
    use crate::Error;

    #[test]
    fn calls_session_provider_on_every_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let identity = {
            let calls = calls.clone();
            Identity::new(
                Arc::new(move || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    format!("session-{n}")
                }),
                Arc::new(AnonymousUser),
            )
        };

        assert_eq!(identity.session_id().unwrap(), "session-0");
        assert_eq!(identity.session_id().unwrap(), "session-1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn rejects_blank_session_id() {
        let identity = Identity::new(Arc::new(|| "  ".to_owned()), Arc::new(AnonymousUser));

        assert!(matches!(
            identity.session_id(),
            Err(Error::Validation { status: None, .. })
        ));
    }

    #[test]
    fn override_takes_precedence_until_cleared() {
        let identity = Identity::new(
            Arc::new(|| "session".to_owned()),
            Arc::new(|| Some("from-provider".to_owned())),
        );
        assert_eq!(identity.user_id().as_deref(), Some("from-provider"));

        identity.update_user_id(Some("logged-in".to_owned())).unwrap();
        assert_eq!(identity.user_id().as_deref(), Some("logged-in"));

        identity.update_user_id(None).unwrap();
        assert_eq!(identity.user_id().as_deref(), Some("from-provider"));
    }

    #[test]
    fn rejects_blank_user_override() {
        let identity = Identity::new(Arc::new(|| "session".to_owned()), Arc::new(AnonymousUser));

        assert!(identity.update_user_id(Some(String::new())).is_err());
        assert_eq!(identity.user_id(), None);
    }

    #[test]
    fn can_update_user_id_from_another_thread() {
        let identity = Arc::new(Identity::new(
            Arc::new(|| "session".to_owned()),
            Arc::new(AnonymousUser),
        ));

        {
            let identity = identity.clone();
            let _ = std::thread::spawn(move || identity.update_user_id(Some("user".to_owned())))
                .join();
        }

        assert_eq!(identity.user_id().as_deref(), Some("user"));
    }
}
