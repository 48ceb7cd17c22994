//! Resolution of the signed-in user.

use crate::error::{PaymentsError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;

/// Supplies the identifier of the signed-in user.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the current user, waiting for any pending sign-in state.
    async fn current_user(&self) -> Result<String>;

    /// Resolve the current user from what is known right now.
    fn current_user_sync(&self) -> Result<String>;
}

/// Identity backed by an in-process session.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    uid: RwLock<Option<String>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with a user already signed in.
    pub fn signed_in(uid: impl Into<String>) -> Self {
        Self {
            uid: RwLock::new(Some(uid.into())),
        }
    }

    pub fn sign_in(&self, uid: impl Into<String>) {
        *self.uid.write() = Some(uid.into());
    }

    pub fn sign_out(&self) {
        *self.uid.write() = None;
    }
}

#[async_trait]
impl IdentityResolver for SessionIdentity {
    async fn current_user(&self) -> Result<String> {
        self.current_user_sync()
    }

    fn current_user_sync(&self) -> Result<String> {
        self.uid
            .read()
            .clone()
            .ok_or_else(|| PaymentsError::Unauthenticated("user must be signed in".to_string()))
    }
}
