use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub access_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_secret: String,
    pub refresh_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub tokens: TokenConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(4000);
        let database_url = std::env::var("DATABASE_URL")?;
        let tokens = TokenConfig {
            access_secret: std::env::var("ACCESS_TOKEN_SECRET")?,
            access_ttl_secs: std::env::var("ACCESS_TOKEN_EXPIRY")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 60 * 24),
            refresh_secret: std::env::var("REFRESH_TOKEN_SECRET")?,
            refresh_ttl_secs: std::env::var("REFRESH_TOKEN_EXPIRY")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 60 * 24 * 10),
        };
        Ok(Self {
            host,
            port,
            database_url,
            tokens,
        })
    }
}
