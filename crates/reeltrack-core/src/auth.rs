use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time;

/// Claims carried by a session token minted by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (username)
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn new(username: impl Into<String>, ttl_secs: u64) -> Self {
        let iat = time::now_secs();
        Self {
            sub: username.into(),
            jti: Uuid::new_v4().to_string(),
            iat: iat as usize,
            exp: (iat + ttl_secs) as usize,
        }
    }
}
