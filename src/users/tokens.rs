use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::users::model::User;

/// Access-token payload: record identity plus the profile fields the API
/// layer needs without a database round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub fullname: String,
    pub iat: usize,
    pub exp: usize,
}

/// Refresh-token payload: record identity only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Signing and verification material for both token kinds. Access and
/// refresh use separate secrets, so neither kind verifies as the other.
#[derive(Clone)]
pub struct TokenKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    refresh_ttl: Duration,
}

impl TokenKeys {
    pub fn from_config(cfg: &TokenConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(cfg.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(cfg.access_secret.as_bytes()),
            access_ttl: Duration::seconds(cfg.access_ttl_secs),
            refresh_encoding: EncodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            refresh_ttl: Duration::seconds(cfg.refresh_ttl_secs),
        }
    }

    fn stamps(ttl: Duration) -> (usize, usize) {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        (now.unix_timestamp() as usize, exp.unix_timestamp() as usize)
    }

    fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> anyhow::Result<String> {
        Ok(encode(&Header::default(), claims, key)?)
    }

    fn verify<T: DeserializeOwned>(token: &str, key: &DecodingKey) -> anyhow::Result<T> {
        let data = decode::<T>(token, key, &Validation::default())?;
        Ok(data.claims)
    }

    pub fn issue_access(&self, user: &User) -> anyhow::Result<String> {
        let (iat, exp) = Self::stamps(self.access_ttl);
        let token = Self::sign(
            &AccessClaims {
                sub: user.id,
                email: user.email.clone(),
                username: user.username.clone(),
                fullname: user.fullname.clone(),
                iat,
                exp,
            },
            &self.access_encoding,
        )?;
        debug!(user_id = %user.id, "access token signed");
        Ok(token)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        let (iat, exp) = Self::stamps(self.refresh_ttl);
        let token = Self::sign(&RefreshClaims { sub: user_id, iat, exp }, &self.refresh_encoding)?;
        debug!(user_id = %user_id, "refresh token signed");
        Ok(token)
    }

    pub fn decode_access(&self, token: &str) -> anyhow::Result<AccessClaims> {
        Self::verify(token, &self.access_decoding)
    }

    pub fn decode_refresh(&self, token: &str) -> anyhow::Result<RefreshClaims> {
        Self::verify(token, &self.refresh_decoding)
    }
}
