//! Verification of identity tokens issued by Firebase Authentication.
//!
//! Every call to [`TokenVerifier::verify`] performs a full signature and
//! claim check; only the provider's public signing keys are cached, for as
//! long as the provider's `Cache-Control` header allows.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, HeaderMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

pub const GOOGLE_SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const MAX_UID_LENGTH: usize = 128;
const CLOCK_SKEW_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token is malformed or invalid: {0}")]
    Invalid(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token has been revoked")]
    Revoked,

    #[error("Failed to fetch provider certificates: {0}")]
    CertificateFetch(String),

    #[error("Token verification failed: {0}")]
    Other(String),
}

/// The trusted claims of a verified token. Request-scoped, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub auth_time: Option<i64>,
    pub roles: Option<Vec<String>>,
}

impl VerifiedIdentity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.as_ref().is_some_and(|roles| roles.iter().any(|r| r == role))
    }
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, TokenError>;
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    iat: i64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    auth_time: Option<i64>,
    #[serde(default)]
    roles: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub jwks_url: String,
    /// Tokens authenticated before this instant are treated as revoked.
    pub tokens_valid_after: Option<DateTime<Utc>>,
}

struct CachedKeys {
    keys: JwkSet,
    expires_at: Instant,
}

pub struct FirebaseTokenVerifier {
    config: FirebaseConfig,
    http: Client,
    algorithm: Algorithm,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseTokenVerifier {
    pub fn new(config: FirebaseConfig) -> Self {
        Self { config, http: Client::new(), algorithm: Algorithm::RS256, cache: RwLock::new(None) }
    }

    fn issuer(&self) -> String {
        format!("{FIREBASE_ISSUER_PREFIX}{}", self.config.project_id)
    }

    async fn signing_keys(&self) -> Result<JwkSet, TokenError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.keys.clone());
            }
        }

        let response = self
            .http
            .get(&self.config.jwks_url)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| TokenError::CertificateFetch(e.to_string()))?;

        let max_age = cache_max_age(response.headers());
        let keys: JwkSet = response.json().await.map_err(|e| TokenError::CertificateFetch(e.to_string()))?;

        if let Some(max_age) = max_age {
            *self.cache.write().await = Some(CachedKeys { keys: keys.clone(), expires_at: Instant::now() + max_age });
        }

        tracing::debug!(count = keys.keys.len(), "Fetched identity provider signing keys");

        Ok(keys)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.config.project_id]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);
        validation.leeway = CLOCK_SKEW_SECS;
        validation
    }

    /// `iat` and `auth_time` may not lie in the future beyond the allowed skew.
    fn check_issued_in_past(claims: &FirebaseClaims) -> Result<(), TokenError> {
        let latest = Utc::now().timestamp() + CLOCK_SKEW_SECS as i64;

        if claims.iat > latest {
            return Err(TokenError::Invalid("\"iat\" claim is in the future".into()));
        }
        if claims.auth_time.is_some_and(|auth_time| auth_time > latest) {
            return Err(TokenError::Invalid("\"auth_time\" claim is in the future".into()));
        }

        Ok(())
    }

    fn check_revoked(&self, claims: &FirebaseClaims) -> Result<(), TokenError> {
        let Some(valid_after) = self.config.tokens_valid_after else {
            return Ok(());
        };

        match claims.auth_time {
            Some(auth_time) if auth_time >= valid_after.timestamp() => Ok(()),
            _ => Err(TokenError::Revoked),
        }
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, TokenError> {
        let header = decode_header(token).map_err(|e| TokenError::Invalid(e.to_string()))?;

        if header.alg != self.algorithm {
            return Err(TokenError::Invalid(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header.kid.ok_or_else(|| TokenError::Invalid("missing \"kid\" header".to_string()))?;

        let keys = self.signing_keys().await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| TokenError::Invalid(format!("\"kid\" {kid} does not match a known public key")))?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| TokenError::Other(e.to_string()))?;

        let claims = decode::<FirebaseClaims>(token, &key, &self.validation())
            .map(|data| data.claims)
            .map_err(classify)?;

        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LENGTH {
            return Err(TokenError::Invalid("\"sub\" must be a non-empty string of at most 128 characters".into()));
        }
        Self::check_issued_in_past(&claims)?;
        self.check_revoked(&claims)?;

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
            auth_time: claims.auth_time,
            roles: claims.roles,
        })
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::InvalidSignature
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => TokenError::Invalid(err.to_string()),
        _ => TokenError::Other(err.to_string()),
    }
}

fn cache_max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.parse::<u64>().ok())
        .map(Duration::from_secs)
}
