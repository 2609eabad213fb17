//! Current-user lookup.
//!
//! Sign-up, sign-in and password reset belong to the auth provider. The
//! engine only needs to know who is signed in, so the seam is a single
//! lookup.

use async_trait::async_trait;
use parking_lot::RwLock;

use bazaar_core::UserId;

use crate::backend::RemoteError;
use crate::models::session::CurrentUser;

/// Access to the auth provider's signed-in user.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// The signed-in user, `None` when signed out.
    async fn current_user(&self) -> Result<Option<CurrentUser>, RemoteError>;

    /// The signed-in user's ID, `None` when signed out.
    async fn current_user_id(&self) -> Result<Option<UserId>, RemoteError> {
        Ok(self.current_user().await?.map(|user| user.id))
    }
}

/// Auth state supplied by the embedding application.
///
/// Apps that already ran the provider's sign-in flow hand the result over
/// with [`StaticAuth::sign_in`].
#[derive(Debug, Default)]
pub struct StaticAuth {
    user: RwLock<Option<CurrentUser>>,
}

impl StaticAuth {
    /// Create an auth source with no signed-in user.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Create an auth source with `user` signed in.
    #[must_use]
    pub fn signed_in(user: CurrentUser) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: CurrentUser) {
        tracing::info!(user_id = %user.id, "User signed in");
        *self.user.write() = Some(user);
    }

    pub fn sign_out(&self) {
        if let Some(user) = self.user.write().take() {
            tracing::info!(user_id = %user.id, "User signed out");
        }
    }
}

#[async_trait]
impl AuthService for StaticAuth {
    async fn current_user(&self) -> Result<Option<CurrentUser>, RemoteError> {
        Ok(self.user.read().clone())
    }
}
