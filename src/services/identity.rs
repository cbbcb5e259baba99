use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::UserIdentity,
};

const TOKEN_TTL_SECS: i64 = 3600;

/// Turns bearer tokens into identities and back
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> AppResult<UserIdentity>;

    fn issue(&self, identity: &UserIdentity) -> AppResult<String>;
}

/// Versioned claim set. Tokens without a known `ver` tag are rejected.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "ver")]
enum TokenClaims {
    #[serde(rename = "v1")]
    V1 {
        user: UserIdentity,
        iat: i64,
        exp: i64,
    },
}

/// HS256 tokens signed with a shared secret
pub struct JwtIdentityService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl IdentityVerifier for JwtIdentityService {
    fn verify(&self, token: &str) -> AppResult<UserIdentity> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Auth("Invalid or expired token".to_string())
        })?;

        match data.claims {
            TokenClaims::V1 { user, .. } => Ok(user),
        }
    }

    fn issue(&self, identity: &UserIdentity) -> AppResult<String> {
        let now = Utc::now();
        let claims = TokenClaims::V1 {
            user: identity.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}
