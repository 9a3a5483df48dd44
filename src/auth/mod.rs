use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::rpc::transformer::{child_path, Rich, TypeMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: sub.into(),
            name: None,
            email: None,
            image: None,
            exp,
            iat: now.timestamp(),
        }
    }
}

/// The authenticated caller of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<Claims> for Session {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::InvalidToken(format!("exp out of range: {}", claims.exp)))?;

        Ok(Self {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            image: claims.image,
            expires_at,
        })
    }
}

impl Rich for Session {
    fn annotate(&self, path: &str, meta: &mut TypeMeta) {
        self.expires_at.annotate(&child_path(path, "expiresAt"), meta);
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
}

pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

/// Resolves the caller's session from request headers.
///
/// Returning `Ok(None)` means "no session presented". Errors mean a session was
/// presented but could not be trusted; callers treat both as anonymous.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Session>, AuthError>;
}

/// Verifies HS256 session tokens from a bearer header or the session cookie
pub struct JwtSessionResolver {
    secret: String,
    cookie_name: String,
}

impl JwtSessionResolver {
    pub fn new(secret: impl Into<String>, cookie_name: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(&security.jwt_secret, &security.session_cookie)
    }

    fn extract_token(&self, headers: &HeaderMap) -> Result<Option<String>, AuthError> {
        if let Some(value) = headers.get(header::AUTHORIZATION) {
            let auth_str = value
                .to_str()
                .map_err(|_| AuthError::InvalidToken("Invalid Authorization header format".to_string()))?;
            let token = auth_str
                .strip_prefix("Bearer ")
                .ok_or_else(|| AuthError::InvalidToken("Authorization header must use Bearer token format".to_string()))?
                .trim();
            if token.is_empty() {
                return Err(AuthError::InvalidToken("Empty bearer token".to_string()));
            }
            return Ok(Some(token.to_string()));
        }

        Ok(cookie_value(headers, &self.cookie_name))
    }
}

#[async_trait]
impl SessionResolver for JwtSessionResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Session>, AuthError> {
        let Some(token) = self.extract_token(headers)? else {
            return Ok(None);
        };

        let claims = verify_token(&token, &self.secret)?;
        Session::try_from(claims).map(Some)
    }
}

/// Find a cookie by name across every `Cookie` header
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    fn token_for(sub: &str) -> String {
        let mut claims = Claims::new(sub, 1);
        claims.name = Some("Ada".to_string());
        issue_token(&claims, SECRET).unwrap()
    }

    #[tokio::test]
    async fn resolves_bearer_token() {
        let resolver = JwtSessionResolver::new(SECRET, "studio_session");
        let mut headers = HeaderMap::new();
        let value = format!("Bearer {}", token_for("user-1"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());

        let session = resolver.resolve(&headers).await.unwrap().unwrap();
        assert_eq!(session.user_id, "user-1");
        assert_eq!(session.name.as_deref(), Some("Ada"));
        assert!(session.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn resolves_session_cookie() {
        let resolver = JwtSessionResolver::new(SECRET, "studio_session");
        let mut headers = HeaderMap::new();
        let value = format!("theme=dark; studio_session={}", token_for("user-2"));
        headers.insert(header::COOKIE, HeaderValue::from_str(&value).unwrap());

        let session = resolver.resolve(&headers).await.unwrap().unwrap();
        assert_eq!(session.user_id, "user-2");
    }

    #[tokio::test]
    async fn no_token_is_no_session() {
        let resolver = JwtSessionResolver::new(SECRET, "studio_session");
        assert!(resolver.resolve(&HeaderMap::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_foreign_signature() {
        let resolver = JwtSessionResolver::new("other-secret", "studio_session");
        let mut headers = HeaderMap::new();
        let value = format!("Bearer {}", token_for("user-3"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());

        assert!(matches!(resolver.resolve(&headers).await, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn refuses_to_sign_without_secret() {
        let claims = Claims::new("user", 1);
        assert!(matches!(issue_token(&claims, ""), Err(AuthError::InvalidSecret)));
    }
}
