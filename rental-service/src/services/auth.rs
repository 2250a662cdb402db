use chrono::Utc;
use secrecy::Secret;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AdminBootstrap;
use crate::dtos::{AuthResponse, LoginRequest, RegisterRequest};
use crate::models::{Role, User};
use crate::services::{JwtService, RentalError};
use crate::store::RentalStore;
use crate::utils::password::{hash_password, verify_password};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn RentalStore>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(store: Arc<dyn RentalStore>, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    async fn create_user(
        &self,
        email: &str,
        password: Secret<String>,
        name: String,
        phone: Option<String>,
        role: Role,
    ) -> Result<User, RentalError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.trim().to_lowercase(),
            name,
            phone,
            password_hash: hash_password(&password)?,
            role,
            created_utc: Utc::now(),
        };
        self.store.insert_user(&user).await?;
        Ok(user)
    }

    fn issue(&self, user: User) -> Result<AuthResponse, RentalError> {
        let token = self
            .jwt
            .generate_access_token(&user.id, &user.email, user.role)?;
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, RentalError> {
        let user = self
            .create_user(
                &req.email,
                Secret::new(req.password),
                req.name,
                req.phone,
                Role::Customer,
            )
            .await?;
        tracing::info!(user_id = %user.id, "Customer registered");
        self.issue(user)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, RentalError> {
        let email = req.email.trim().to_lowercase();
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(RentalError::InvalidCredentials)?;

        if !verify_password(&Secret::new(req.password), &user.password_hash) {
            tracing::warn!(user_id = %user.id, "Failed login attempt");
            return Err(RentalError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.issue(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<User, RentalError> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| RentalError::not_found("user", id))
    }

    /// Create the configured admin account unless that email already exists.
    pub async fn bootstrap_admin(&self, admin: &AdminBootstrap) -> Result<(), RentalError> {
        if self.store.find_user_by_email(&admin.email.to_lowercase()).await?.is_some() {
            tracing::debug!(email = %admin.email, "Admin account already present");
            return Ok(());
        }

        let user = self
            .create_user(
                &admin.email,
                admin.password.clone(),
                "Administrator".to_string(),
                None,
                Role::Admin,
            )
            .await?;
        tracing::info!(user_id = %user.id, "Admin account bootstrapped");
        Ok(())
    }

    /// Direct admin creation for tooling and tests.
    pub async fn create_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthResponse, RentalError> {
        let user = self
            .create_user(
                email,
                Secret::new(password.to_string()),
                name.to_string(),
                None,
                Role::Admin,
            )
            .await?;
        self.issue(user)
    }
}
