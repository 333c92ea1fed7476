use crate::backend::AuthBackend;
use crate::error::Result;
use crate::types::User;

/// Login state of the current browser session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthStore {
    user_logged: bool,
    user: User,
}

impl AuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_logged(&self) -> bool {
        self.user_logged
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    fn clear(&mut self) {
        self.user_logged = false;
        self.user = User::default();
    }

    /// Ask the backend who is logged in
    pub fn check_login<B: AuthBackend + ?Sized>(&mut self, backend: &B) -> Result<bool> {
        let res = backend.current_user()?;
        self.user_logged = res.is_authenticated;
        self.user = User {
            id: res.user_id,
            name: res.user_display_name,
        };
        tracing::debug!(logged = self.user_logged, "login checked");
        Ok(self.user_logged)
    }

    /// Extend the session; a failed renewal logs the user out locally
    pub fn renew_session<B: AuthBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        if let Err(err) = backend.renew_session() {
            tracing::warn!(error = %err, "session renewal failed, clearing login");
            self.clear();
            return Err(err.into());
        }
        Ok(())
    }

    /// End the session; on failure the user stays logged in
    pub fn logout<B: AuthBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        backend.logout()?;
        self.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, TransportError};
    use crate::types::UserResponse;

    struct MockAuth {
        session_status: Option<u16>,
    }

    fn status(status: u16) -> TransportError {
        TransportError::Status {
            url: "/api/session".to_string(),
            status,
        }
    }

    impl AuthBackend for MockAuth {
        fn current_user(&self) -> std::result::Result<UserResponse, TransportError> {
            Ok(serde_json::from_str(
                r#"{"is_authenticated": true, "user_id": 10, "user_display_name": "Testi Käyttäjä"}"#,
            )?)
        }

        fn renew_session(&self) -> std::result::Result<(), TransportError> {
            self.session_status.map_or(Ok(()), |s| Err(status(s)))
        }

        fn logout(&self) -> std::result::Result<(), TransportError> {
            self.session_status.map_or(Ok(()), |s| Err(status(s)))
        }
    }

    fn logged_in(backend: &MockAuth) -> AuthStore {
        let mut auth = AuthStore::new();
        auth.check_login(backend).unwrap();
        auth
    }

    #[test]
    fn test_check_login() {
        let auth = logged_in(&MockAuth { session_status: None });
        assert!(auth.user_logged());
        assert_eq!(auth.user().name.as_deref(), Some("Testi Käyttäjä"));
        assert_eq!(auth.user().id, Some(10));
    }

    #[test]
    fn test_logout() {
        let backend = MockAuth { session_status: None };
        let mut auth = logged_in(&backend);
        auth.logout(&backend).unwrap();
        assert!(!auth.user_logged());
        assert_eq!(auth.user(), &User::default());
    }

    #[test]
    fn test_failed_logout_keeps_login() {
        let backend = MockAuth { session_status: Some(401) };
        let mut auth = logged_in(&backend);
        let err = auth.logout(&backend).unwrap_err();
        assert!(matches!(err, EngineError::Transport(TransportError::Status { status: 401, .. })));
        assert!(auth.user_logged());
    }

    #[test]
    fn test_failed_renewal_clears_login() {
        let backend = MockAuth { session_status: Some(401) };
        let mut auth = logged_in(&backend);
        assert!(auth.renew_session(&backend).is_err());
        assert!(!auth.user_logged());
        assert_eq!(auth.user(), &User { id: None, name: None });
    }

    #[test]
    fn test_renewal_keeps_login() {
        let backend = MockAuth { session_status: None };
        let mut auth = logged_in(&backend);
        auth.renew_session(&backend).unwrap();
        assert!(auth.user_logged());
    }
}
