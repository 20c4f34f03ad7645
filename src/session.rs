use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ExamOffice,
    Faculty,
    Guardian,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
struct AuthState {
    token: String,
    user: UserIdentity,
}

/// Holds the bearer token and current identity. Every component treats a
/// missing token as "no operation may touch the network".
#[derive(Debug, Default)]
pub struct SessionGuard {
    inner: RwLock<Option<AuthState>>,
}

impl SessionGuard {
    pub fn new() -> Self {
        SessionGuard::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<AuthState>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<AuthState>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sign_in(&self, token: impl Into<String>, user: UserIdentity) {
        info!(user = %user.user_id, role = ?user.role, "session established");
        *self.write() = Some(AuthState {
            token: token.into(),
            user,
        });
    }

    pub fn sign_out(&self) {
        let mut state = self.write();
        if state.is_some() {
            info!("session ended");
        }
        *state = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|auth| auth.token.clone())
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.read().as_ref().map(|auth| auth.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> UserIdentity {
        UserIdentity {
            user_id: "u-1".to_string(),
            name: "Priya Nair".to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn starts_unauthenticated() {
        let session = SessionGuard::new();
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
        assert!(session.current_user().is_none());
    }

    #[test]
    fn sign_in_then_out() {
        let session = SessionGuard::new();
        session.sign_in("tok-abc", admin());
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("tok-abc"));
        assert_eq!(session.current_user().map(|u| u.role), Some(Role::Admin));

        session.sign_out();
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
    }

    #[test]
    fn sign_in_replaces_previous_identity() {
        let session = SessionGuard::new();
        session.sign_in("tok-1", admin());
        session.sign_in(
            "tok-2",
            UserIdentity {
                user_id: "u-2".to_string(),
                name: "Omar Diallo".to_string(),
                role: Role::Faculty,
            },
        );
        assert_eq!(session.token().as_deref(), Some("tok-2"));
        assert_eq!(session.current_user().map(|u| u.role), Some(Role::Faculty));
    }
}
