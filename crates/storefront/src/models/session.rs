//! Session-related types.

use serde::{Deserialize, Serialize};

use bazaar_core::{Email, UserId};

/// Signed-in user identity.
///
/// Minimal data the engine needs to key per-user stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// Auth provider's user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name set at sign-up, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}
