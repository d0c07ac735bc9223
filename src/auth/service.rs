// src/auth/service.rs

use anyhow::{Result, anyhow};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::jwt::create_token;
use super::models::{AuthResponse, LoginRequest, RegisterRequest, User, UserWithPassword};
use super::password::{hash_password, verify_password};

pub struct AuthService {
    db: SqlitePool,
}

impl AuthService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse> {
        let email = normalize_email(&req.email);
        let user = self.get_user_by_email(&email).await?;

        if !user.is_active {
            return Err(anyhow!("User account is disabled"));
        }

        if !verify_password(&req.password, &user.password_hash)? {
            return Err(anyhow!("Invalid credentials"));
        }

        let token = create_token(&user.id, &user.email)?;

        Ok(AuthResponse {
            user: user.into(),
            token,
        })
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse> {
        let email = normalize_email(&req.email);

        if email.is_empty() || !email.contains('@') {
            return Err(anyhow!("Invalid email address"));
        }

        if req.password.len() < 8 {
            return Err(anyhow!("Password must be at least 8 characters"));
        }

        if self.email_exists(&email).await? {
            return Err(anyhow!("Email already registered"));
        }

        let user_id = Uuid::new_v4().to_string();
        let password_hash = hash_password(&req.password)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, TRUE, ?, ?)
            "#,
        )
        .bind(&user_id)
        .bind(&email)
        .bind(&password_hash)
        .bind(&req.full_name)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        let user = self.get_user_by_id(&user_id).await?;
        let token = create_token(&user.id, &user.email)?;

        Ok(AuthResponse {
            user: user.into(),
            token,
        })
    }

    /// Resolve a verified token subject to an active user account
    pub async fn verify_user_id(&self, user_id: &str) -> Result<User> {
        let user = self.get_user_by_id(user_id).await?;

        if !user.is_active {
            return Err(anyhow!("User account is disabled"));
        }

        Ok(user.into())
    }

    /// Look up a user id by email, active accounts only
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        let user = sqlx::query_as::<_, UserWithPassword>(
            "SELECT * FROM users WHERE email = ? AND is_active = TRUE",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user.map(Into::into))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<UserWithPassword> {
        sqlx::query_as::<_, UserWithPassword>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(|_| anyhow!("Invalid credentials"))
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<UserWithPassword> {
        sqlx::query_as::<_, UserWithPassword>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.db)
            .await
            .map_err(|_| anyhow!("User not found"))
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.db)
            .await?;

        Ok(count.0 > 0)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
