//! Account model, signup/login forms and session claims

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::AppError;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9@.+_-]+$").expect("username pattern is valid")
});

const PASSWORD_MIN_LEN: usize = 8;

/// Identity account. Created inactive at signup, activated by email link.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

/// Values for a new account row
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_username");
        err.message = Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
        Err(err)
    }
}

/// Password rules: minimum length, not only digits, at least one special symbol.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let (code, message) = if password.chars().count() < PASSWORD_MIN_LEN {
        (
            "password_too_short",
            "This password is too short. It must contain at least 8 characters.",
        )
    } else if password.chars().all(|c| c.is_ascii_digit()) {
        ("password_entirely_numeric", "This password is entirely numeric.")
    } else if password.chars().all(char::is_alphanumeric) {
        (
            "no_special_symbols",
            "Password must contain at least one special symbol.",
        )
    } else {
        return Ok(());
    };
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    Err(err)
}

/// Signup form
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SignupForm {
    #[validate(
        length(min = 1, max = 150),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."), length(max = 254))]
    pub email: String,
    #[validate(range(min = 0, max = 99999))]
    pub phone_number: i32,
    /// Existing city name
    #[validate(length(max = 200))]
    pub pick_city: Option<String>,
    /// New city name (capitalized before storing)
    #[validate(length(max = 200))]
    pub add_city: Option<String>,
    #[validate(length(max = 200))]
    pub pick_street: Option<String>,
    #[validate(length(max = 200))]
    pub add_street: Option<String>,
    #[validate(range(min = 0, max = 32767))]
    pub building_number: i32,
    #[validate(range(min = 0, max = 32767))]
    pub apartment_number: i32,
    #[validate(custom(function = "validate_password_strength"))]
    pub password1: String,
    #[validate(must_match(other = "password1", message = "The two password fields didn't match."))]
    pub password2: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignupResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResendActivation {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
}

/// Grant or revoke the staff flag of an account
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStaff {
    pub is_staff: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// JWT claims for authenticated sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub is_staff: bool,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn for_account(account: &Account, lifetime_hours: u64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: account.username.clone(),
            user_id: account.id,
            is_staff: account.is_staff,
            exp: now + lifetime_hours as i64 * 3600,
            iat: now,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff {
            Ok(())
        } else {
            Err(AppError::Authorization("Staff privileges required".to_string()))
        }
    }
}
