//! Account activation links: encoded account id plus a signed, expiring token

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::{AppError, AppResult},
    models::user::Account,
};

#[derive(Debug, Serialize, Deserialize)]
struct ActivationClaims {
    uid: i32,
    /// Fingerprint of the account state the token was issued for
    state: String,
    exp: i64,
}

/// Encode an account id for use in a URL
pub fn encode_uid(id: i32) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Inverse of [`encode_uid`]; `None` for anything malformed
pub fn decode_uid(uidb64: &str) -> Option<i32> {
    let bytes = URL_SAFE_NO_PAD.decode(uidb64).ok()?;
    String::from_utf8(bytes).ok()?.parse().ok()
}

/// Changes whenever the password or activation state changes, which
/// invalidates previously issued tokens.
fn state_fingerprint(account: &Account) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account.id.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(account.password_hash.as_bytes());
    hasher.update(b":");
    hasher.update(if account.is_active { b"1" } else { b"0" });
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct ActivationTokens {
    secret: String,
    lifetime_hours: u64,
}

impl ActivationTokens {
    pub fn new(secret: impl Into<String>, lifetime_hours: u64) -> Self {
        Self {
            secret: format!("{}/activation", secret.into()),
            lifetime_hours,
        }
    }

    pub fn make_token(&self, account: &Account) -> AppResult<String> {
        let claims = ActivationClaims {
            uid: account.id,
            state: state_fingerprint(account),
            exp: Utc::now().timestamp() + self.lifetime_hours as i64 * 3600,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to create activation token: {}", e)))
    }

    /// True when the token was issued for this account in its current state
    /// and has not expired.
    pub fn check_token(&self, account: &Account, token: &str) -> bool {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match decode::<ActivationClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => data.claims.uid == account.id && data.claims.state == state_fingerprint(account),
            Err(e) => {
                tracing::debug!("Rejected activation token for user {}: {}", account.id, e);
                false
            }
        }
    }
}
