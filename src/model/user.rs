use serde::{Deserialize, Serialize};

pub const USERS_COLLECTION: &str = "users";
pub const REFRESH_TOKENS_COLLECTION: &str = "refresh_tokens";

/// Login account, keyed by the synthetic email derived from the number
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub email: String,
    pub password_hash: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub last_login_at: Option<String>,
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRecord {
    pub email: String,
    /// Unix seconds
    pub expires_at: i64,
    #[serde(default)]
    pub revoked: bool,
}
