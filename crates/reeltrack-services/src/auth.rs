//! Reference auth service: in-memory accounts, Argon2 password hashes, and
//! HS256 session tokens.

use std::collections::HashMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use parking_lot::RwLock;
use reeltrack_core::protocol::{AuthReply, AuthRequest};
use reeltrack_core::Claims;
use serde_json::Value;
use tracing::{info, warn};

use crate::server::{error_reply, Responder};

const SESSION_TTL_SECS: u64 = 60 * 60 * 12;

pub struct AuthService {
    users: RwLock<HashMap<String, String>>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            jwt_secret: jwt_secret.into(),
        }
    }

    pub fn register(&self, username: &str, password: &str) -> AuthReply {
        if username.trim().is_empty() || password.is_empty() {
            return AuthReply::error("Username and password are required");
        }
        if self.users.read().contains_key(username) {
            return AuthReply::error("Username already exists");
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = match Argon2::default().hash_password(password.as_bytes(), &salt) {
            Ok(hash) => hash.to_string(),
            Err(err) => {
                warn!(error = %err, "password hashing failed");
                return AuthReply::error("Registration failed");
            }
        };

        let mut users = self.users.write();
        if users.contains_key(username) {
            return AuthReply::error("Username already exists");
        }
        users.insert(username.to_string(), hash);
        info!(username, "account registered");
        AuthReply::ok(None, "Registration successful")
    }

    pub fn login(&self, username: &str, password: &str) -> AuthReply {
        let stored = self.users.read().get(username).cloned();
        let verified = stored
            .as_deref()
            .and_then(|hash| PasswordHash::new(hash).ok())
            .is_some_and(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            });
        if !verified {
            warn!(username, "login refused");
            return AuthReply::error("Invalid username or password");
        }

        let claims = Claims::new(username, SESSION_TTL_SECS);
        match encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        ) {
            Ok(token) => {
                info!(username, "session issued");
                AuthReply::ok(Some(token), "Login successful")
            }
            Err(err) => {
                warn!(error = %err, "token signing failed");
                AuthReply::error("Login failed")
            }
        }
    }
}

impl Responder for AuthService {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn respond(&self, request: Value) -> Value {
        let reply = match serde_json::from_value::<AuthRequest>(request) {
            Ok(AuthRequest::Login { username, password }) => self.login(&username, &password),
            Ok(AuthRequest::Register { username, password }) => self.register(&username, &password),
            Err(err) => return error_reply(format!("invalid auth request: {err}")),
        };
        serde_json::to_value(reply).unwrap_or_else(|_| error_reply("internal error"))
    }
}
