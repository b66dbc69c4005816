//! Authentication and user account service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        AccessToken, CreateUser, Credentials, NewUser, TokenPair, TokenType, UpdateProfile, User,
        UserClaims,
    },
    policy::{self, Actor, Operation},
    repository::{ProfileChanges, Repository},
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new regular account
    pub async fn register(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;

        if self.repository.users.email_exists(&user.email, None).await? {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let created = self
            .repository
            .users
            .create(&NewUser {
                email: user.email,
                password_hash: self.hash_password(&user.password)?,
                is_staff: false,
                is_superuser: false,
            })
            .await?;

        tracing::info!(user_id = created.id, "User registered");
        Ok(created)
    }

    /// Check credentials and issue an access/refresh pair
    pub async fn obtain_token(&self, credentials: &Credentials) -> AppResult<TokenPair> {
        let invalid =
            || AppError::Authentication("No active account found with the given credentials".to_string());

        let user = self
            .repository
            .users
            .get_by_email(&credentials.email)
            .await?
            .ok_or_else(invalid)?;

        if !self.verify_password(&user, &credentials.password)? {
            tracing::warn!(user_id = user.id, "Failed login attempt");
            return Err(invalid());
        }

        Ok(TokenPair {
            access: self.issue(&user, TokenType::Access)?,
            refresh: self.issue(&user, TokenType::Refresh)?,
        })
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh_token(&self, refresh: &str) -> AppResult<AccessToken> {
        let claims = self.decode(refresh)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AppError::Authentication(
                "Token has wrong type".to_string(),
            ));
        }

        // Reload so role changes apply to new access tokens
        let user = self.repository.users.get_by_id(claims.user_id).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::Authentication("User not found".to_string()),
            other => other,
        })?;

        Ok(AccessToken {
            access: self.issue(&user, TokenType::Access)?,
        })
    }

    /// Check that a token is well-formed, signed by us and not expired
    pub fn verify_token(&self, token: &str) -> AppResult<()> {
        self.decode(token).map(|_| ())
    }

    /// Resolve a bearer token into an actor; only access tokens are accepted
    pub fn authenticate(&self, token: &str) -> AppResult<Actor> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AppError::Authentication(
                "Token has wrong type".to_string(),
            ));
        }
        Ok(Actor::User((&claims).into()))
    }

    /// Get the calling user's own account
    pub async fn me(&self, actor: &Actor) -> AppResult<User> {
        let principal = policy::authorize_principal(actor, Operation::ManageProfile)?;
        self.repository.users.get_by_id(principal.user_id).await
    }

    /// Replace email and password of the calling user
    pub async fn replace_profile(&self, actor: &Actor, user: CreateUser) -> AppResult<User> {
        policy::authorize(actor, Operation::ManageProfile)?;
        user.validate()?;
        self.update_profile(actor, UpdateProfile::from(user)).await
    }

    /// Update the fields present in the request for the calling user
    pub async fn update_profile(&self, actor: &Actor, update: UpdateProfile) -> AppResult<User> {
        let principal = policy::authorize_principal(actor, Operation::ManageProfile)?;
        update.validate()?;

        if let Some(ref email) = update.email {
            if self
                .repository
                .users
                .email_exists(email, Some(principal.user_id))
                .await?
            {
                return Err(AppError::Conflict(
                    "A user with this email already exists".to_string(),
                ));
            }
        }

        let changes = ProfileChanges {
            email: update.email,
            password_hash: update
                .password
                .as_deref()
                .map(|p| self.hash_password(p))
                .transpose()?,
        };

        let user = self.repository.users.update(principal.user_id, &changes).await?;
        tracing::info!(user_id = user.id, "Profile updated");
        Ok(user)
    }

    /// Make sure the configured administrator account exists
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<Option<User>> {
        let (Some(email), Some(password)) = (
            self.config.bootstrap_admin_email.as_deref(),
            self.config.bootstrap_admin_password.as_deref(),
        ) else {
            return Ok(None);
        };

        if let Some(existing) = self.repository.users.get_by_email(email).await? {
            tracing::debug!(user_id = existing.id, "Bootstrap admin already exists");
            return Ok(Some(existing));
        }

        let admin = self
            .repository
            .users
            .create(&NewUser {
                email: email.to_string(),
                password_hash: self.hash_password(password)?,
                is_staff: true,
                is_superuser: true,
            })
            .await?;

        tracing::info!(user_id = admin.id, email = %admin.email, "Bootstrap admin created");
        Ok(Some(admin))
    }

    fn issue(&self, user: &User, token_type: TokenType) -> AppResult<String> {
        let now = Utc::now();
        let lifetime = match token_type {
            TokenType::Access => Duration::minutes(self.config.access_token_minutes),
            TokenType::Refresh => Duration::days(self.config.refresh_token_days),
        };

        let claims = UserClaims {
            sub: user.id.to_string(),
            user_id: user.id,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            token_type,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn decode(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Token is invalid or expired".to_string()))
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
