use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

/// Claims carried by an organizer login token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerClaims {
    /// Organizer id, as a string per RFC 7519
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl OrganizerClaims {
    pub fn organizer_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

const APPROVAL_PURPOSE: &str = "organizer-approval";

/// Claims of the signed link in the admin approval email. Bound to one
/// organizer and unusable as a login token (no `email` claim).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ApprovalClaims {
    sub: String,
    purpose: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 token issuer. Secret and lifetime are fixed at construction.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject_id: i64, subject_email: &str) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = OrganizerClaims {
            sub: subject_id.to_string(),
            email: subject_email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<OrganizerClaims, AppError> {
        decode::<OrganizerClaims>(token, &self.decoding, &strict_validation())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AppError::AuthError("Invalid or expired token".to_string())
            })
    }

    /// Sign the token carried by the approval link for `organizer_id`.
    pub fn issue_approval(&self, organizer_id: i64, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = ApprovalClaims {
            sub: organizer_id.to_string(),
            purpose: APPROVAL_PURPOSE.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            AppError::InternalServerError(format!("Failed to sign approval token: {}", e))
        })
    }

    /// Accept an approval token only for the organizer it was issued for.
    pub fn verify_approval(&self, token: &str, organizer_id: i64) -> Result<(), AppError> {
        let rejected = || AppError::AuthError("Invalid or expired approval link".to_string());

        let claims = decode::<ApprovalClaims>(token, &self.decoding, &strict_validation())
            .map_err(|e| {
                tracing::debug!(error = %e, organizer_id, "Rejected approval token");
                rejected()
            })?
            .claims;

        if claims.purpose != APPROVAL_PURPOSE || claims.sub != organizer_id.to_string() {
            tracing::warn!(organizer_id, subject = %claims.sub, "Approval token used for another organizer");
            return Err(rejected());
        }
        Ok(())
    }
}

fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation
}
