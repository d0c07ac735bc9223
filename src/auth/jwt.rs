// src/auth/jwt.rs

use anyhow::{Result, anyhow};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub exp: usize, // expiration timestamp
    pub iat: usize, // issued at timestamp
}

fn get_jwt_secret() -> String {
    env::var("JWT_SECRET")
        .unwrap_or_else(|_| "tasknest-jwt-secret-change-in-production-please".to_string())
}

fn token_lifetime_hours() -> i64 {
    env::var("JWT_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(24)
}

pub fn create_token(user_id: &str, email: &str) -> Result<String> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(token_lifetime_hours()))
        .ok_or_else(|| anyhow!("Failed to calculate expiration"))?
        .timestamp() as usize;

    let issued_at = chrono::Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: expiration,
        iat: issued_at,
    };

    let header = Header::default();
    let key = EncodingKey::from_secret(get_jwt_secret().as_bytes());

    encode(&header, &claims, &key).map_err(|e| anyhow!("Failed to create token: {}", e))
}

pub fn verify_token(token: &str) -> Result<Claims> {
    let key = DecodingKey::from_secret(get_jwt_secret().as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| anyhow!("Invalid token: {}", e))
}
