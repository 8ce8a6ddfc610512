//! Bearer-token authentication (HS256 JWT)

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use souq_types::{ConfigError, Error, Result};

use super::middleware::{Middleware, Next};
use super::request::ApiRequest;
use super::response::{ApiResponse, STATUS_UNAUTHORIZED};
use crate::config::{
    Config, DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS, ENV_JWT_REFRESH_SECRET,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Issues and verifies access and refresh tokens
#[derive(Clone)]
pub struct TokenIssuer {
    access_secret: String,
    refresh_secret: Option<String>,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(access_secret: &str, refresh_secret: Option<&str>) -> Self {
        Self {
            access_secret: access_secret.to_string(),
            refresh_secret: refresh_secret.map(str::to_string),
            access_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
        }
    }

    /// `JWT_SECRET` is required; the refresh secret is only needed for pairs
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut issuer = Self::new(
            config.jwt_secret()?,
            config.jwt_refresh_secret().ok(),
        );
        issuer.access_ttl_secs = config.access_token_ttl_secs;
        issuer.refresh_ttl_secs = config.refresh_token_ttl_secs;
        Ok(issuer)
    }

    pub fn with_ttls(mut self, access_secs: i64, refresh_secs: i64) -> Self {
        self.access_ttl_secs = access_secs;
        self.refresh_ttl_secs = refresh_secs;
        self
    }

    pub fn issue_access(&self, user: &str) -> Result<String> {
        sign(
            &self.access_secret,
            &claims(user, TokenKind::Access, self.access_ttl_secs),
        )
    }

    pub fn issue_pair(&self, user: &str) -> Result<TokenPair> {
        let refresh_secret = self.refresh_secret()?;
        Ok(TokenPair {
            access_token: self.issue_access(user)?,
            refresh_token: sign(
                refresh_secret,
                &claims(user, TokenKind::Refresh, self.refresh_ttl_secs),
            )?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl_secs,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims> {
        verify(&self.access_secret, token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims> {
        verify(self.refresh_secret()?, token, TokenKind::Refresh)
    }

    /// Exchange a refresh token for a new access token
    pub fn refresh(&self, refresh_token: &str) -> Result<String> {
        let claims = self.verify_refresh(refresh_token)?;
        self.issue_access(&claims.sub)
    }

    fn refresh_secret(&self) -> Result<&str> {
        self.refresh_secret
            .as_deref()
            .ok_or_else(|| ConfigError::Missing(ENV_JWT_REFRESH_SECRET).into())
    }
}

fn claims(user: &str, kind: TokenKind, ttl_secs: i64) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        sub: user.to_string(),
        iat: now,
        exp: now + ttl_secs,
        kind,
    }
}

/// Sign `claims` with HS256. Exposed for tools that need custom claims.
pub fn sign(secret: &str, claims: &Claims) -> Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Auth(format!("failed to sign token: {}", e)))
}

fn verify(secret: &str, token: &str, expected: TokenKind) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| Error::Auth(format!("invalid token: {}", e)))?;
    if data.claims.kind != expected {
        return Err(Error::Auth("wrong token kind".to_string()));
    }
    if data.claims.sub.trim().is_empty() {
        return Err(Error::Auth("token has no subject".to_string()));
    }
    Ok(data.claims)
}

/// Admits requests to protected routes only with a valid access token
pub struct AuthMiddleware {
    issuer: TokenIssuer,
}

impl AuthMiddleware {
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer }
    }
}

impl Middleware for AuthMiddleware {
    fn handle(&self, mut req: ApiRequest, next: Next<'_>) -> ApiResponse {
        if !req.requires_auth {
            return next.run(req);
        }
        let Some(token) = req.bearer_token() else {
            return ApiResponse::error(STATUS_UNAUTHORIZED, "missing bearer token");
        };
        match self.issuer.verify_access(token) {
            Ok(claims) => {
                req.caller = Some(claims.sub);
                next.run(req)
            }
            Err(e) => {
                tracing::debug!(path = %req.path, error = %e, "token rejected");
                ApiResponse::error(STATUS_UNAUTHORIZED, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("access-secret", Some("refresh-secret"))
    }

    #[test]
    fn test_new_uses_default_ttls() {
        let issuer = issuer();
        assert_eq!(issuer.access_ttl_secs, DEFAULT_ACCESS_TOKEN_TTL_SECS);
        assert_eq!(issuer.refresh_ttl_secs, DEFAULT_REFRESH_TOKEN_TTL_SECS);
        let defaults = Config::default();
        assert_eq!(defaults.access_token_ttl_secs, DEFAULT_ACCESS_TOKEN_TTL_SECS);
        assert_eq!(defaults.refresh_token_ttl_secs, DEFAULT_REFRESH_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_access_token_round_trip() {
        let token = issuer().issue_access("user-1").unwrap();
        let claims = issuer().verify_access(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issuer().issue_access("user-1").unwrap();
        let other = TokenIssuer::new("other-secret", None);
        assert!(matches!(other.verify_access(&token), Err(Error::Auth(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now().timestamp();
        let expired = Claims {
            sub: "user-1".to_string(),
            iat: now - 7200,
            exp: now - 3600,
            kind: TokenKind::Access,
        };
        let token = sign("access-secret", &expired).unwrap();
        assert!(issuer().verify_access(&token).is_err());
    }

    #[test]
    fn test_refresh_token_cannot_access() {
        let pair = issuer().issue_pair("user-1").unwrap();
        // Refresh tokens are signed with a different secret
        assert!(issuer().verify_access(&pair.refresh_token).is_err());
        // and an access-kind token under the refresh secret is refused
        let wrong_kind = TokenIssuer::new("refresh-secret", Some("refresh-secret"));
        let token = wrong_kind.issue_access("user-1").unwrap();
        assert!(wrong_kind.verify_refresh(&token).is_err());
    }

    #[test]
    fn test_refresh_exchange() {
        let pair = issuer().issue_pair("user-7").unwrap();
        let access = issuer().refresh(&pair.refresh_token).unwrap();
        assert_eq!(issuer().verify_access(&access).unwrap().sub, "user-7");
    }

    #[test]
    fn test_pair_needs_refresh_secret() {
        let issuer = TokenIssuer::new("access-secret", None);
        assert!(issuer.issue_pair("u").is_err());
        assert!(issuer.issue_access("u").is_ok());
    }

    #[test]
    fn test_garbage_token() {
        assert!(issuer().verify_access("not-a-jwt").is_err());
    }
}
