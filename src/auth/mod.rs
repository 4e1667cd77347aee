/*!
 * # Authentication and Authorization Module
 *
 * Account registration and login backed by the `users` table, HS256 bearer
 * tokens, and the middleware that guards the admin console endpoints.
 */

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;

pub mod password;
pub mod user;

pub use password::{hash_password, verify_password};

/// Role granted to admin console accounts
pub const ADMIN_ROLE: &str = "admin";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // Subject (user ID)
    pub name: String,       // User's name
    pub email: String,      // User's email
    pub roles: Vec<String>, // Granted roles
    pub jti: String,        // JWT ID
    pub iat: i64,           // Issued at time
    pub exp: i64,           // Expiration time
    pub iss: String,        // Issuer
    pub aud: String,        // Audience
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            roles: claims.roles,
            token_id: claims.jti,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
    /// Whether `isAdmin` on registration is honoured
    pub allow_admin_registration: bool,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
        allow_admin_registration: bool,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
            allow_admin_registration,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.auth_audience.clone(),
            config.auth_issuer.clone(),
            Duration::from_secs(config.jwt_expiration as u64),
            config.allow_admin_registration,
        )
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    pub is_admin: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<&user::Model> for UserView {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            email: model.email.clone(),
            is_admin: model.is_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserView,
}

/// Authentication service that handles accounts and token issuance
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Creates an account and signs it in
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let request = RegisterRequest {
            name: request.name.trim().to_string(),
            email: normalize_email(&request.email),
            ..request
        };
        request.validate()?;

        let wants_admin = request.is_admin.unwrap_or(false);
        if wants_admin && !self.config.allow_admin_registration {
            warn!("Ignoring admin flag on self-registration");
        }
        let is_admin = wants_admin && self.config.allow_admin_registration;

        let user = self
            .create_user(&request.name, &request.email, &request.password, is_admin)
            .await?;
        self.respond_with_token(&user)
    }

    /// Inserts an account without the registration gate on the admin flag
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<user::Model, AuthError> {
        let email = normalize_email(email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict("Email is already registered".to_string()));
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            email: Set(email),
            password_hash: Set(hash_password(password)?),
            is_admin: Set(is_admin),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let user = model.insert(&*self.db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AuthError::Conflict("Email is already registered".to_string())
            } else {
                AuthError::DatabaseError(e.to_string())
            }
        })?;

        info!(user_id = %user.id, is_admin = user.is_admin, "User registered");
        Ok(user)
    }

    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);
        let user = self
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash) {
            debug!(user_id = %user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, "User logged in");
        self.respond_with_token(&user)
    }

    /// Looks up the account behind a token subject
    #[instrument(skip(self))]
    pub async fn me(&self, user_id: &str) -> Result<UserView, AuthError> {
        let id = Uuid::parse_str(user_id).map_err(|_| AuthError::InvalidToken)?;
        let user = user::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;
        Ok(UserView::from(&user))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, AuthError> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))
    }

    fn respond_with_token(&self, user: &user::Model) -> Result<AuthResponse, AuthError> {
        Ok(AuthResponse {
            token: self.issue_token(user)?,
            user: UserView::from(user),
        })
    }

    /// Generate a JWT token for a user
    pub fn issue_token(&self, user: &user::Model) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            roles: user.roles(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };
        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.jwt_audience]);
        validation.set_issuer(&[&self.config.jwt_issuer]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .next()
            .unwrap_or_else(|| errors.to_string());
        AuthError::Validation(message)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                "AUTH_USER_NOT_FOUND",
                "User not found".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, "AUTH_VALIDATION", msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "AUTH_CONFLICT", msg.clone()),
            Self::TokenCreation(_) | Self::DatabaseError(_) | Self::InternalError(_) => {
                tracing::error!(error = %self, "authentication failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AUTH_INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_role(&required_role) {
        debug!(user_id = %user.user_id, role = %required_role, "Role check failed");
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    match extract_auth_from_headers(request.headers(), &auth_service) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingAuth)?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingAuth)?;

    auth_service.validate_token(token).map(AuthUser::from)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}
