//! Token codec: HS512-signed JWTs carrying identity claims.
//!
//! The same codec instance (built from the shared [`SigningKey`]) is used by
//! the issuer to mint tokens and by every verifier to decode them. Expiry is
//! compared in whole seconds with no leeway for clock skew.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::signing_key::SigningKey;
use super::{AuthError, TokenError};
use crate::models::{Identity, RoleSet, TokenClaims};

/// The only algorithm this deployment signs with or accepts.
pub const ALGORITHM: Algorithm = Algorithm::HS512;

/// Default access token lifetime: 1 hour.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 60;

/// Symmetric encode/decode of [`TokenClaims`].
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Build a codec minting tokens that live for `ttl`.
    pub fn new(key: &SigningKey, ttl: Duration) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked by `decode_at` so an expired token is only reported
        // after its signature has been verified.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(key.as_bytes()),
            decoding: DecodingKey::from_secret(key.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Configured access token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for `identity` with the configured TTL.
    pub fn issue(&self, identity: &Identity, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        self.encode(identity, issued_at, self.ttl)
    }

    /// Sign `{sub, userId, roles, iat, exp = iat + ttl}` for `identity`.
    pub fn encode(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        if ttl.num_seconds() <= 0 {
            return Err(AuthError::InvalidInput(format!(
                "token ttl must be at least one second, got {ttl}"
            )));
        }
        let iat = issued_at.timestamp();
        let claims = TokenClaims {
            sub: identity.handle.clone(),
            user_id: identity.id,
            roles: RoleSet::single(identity.role),
            iat,
            exp: iat + ttl.num_seconds(),
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify a token against the current time.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Verify a token as of `now`: structure, algorithm and signature first,
    /// then expiry.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let claims = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(TokenError::from)?
            .claims;

        if claims.exp <= claims.iat || claims.roles.is_empty() {
            return Err(TokenError::Malformed);
        }
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}
