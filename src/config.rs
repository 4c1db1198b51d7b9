use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub token: TokenConfig,
    /// Argon2 memory cost in KiB.
    pub hash_cost_kib: u32,
    /// Upper bound on any single database round-trip.
    pub store_timeout_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let token = TokenConfig {
            secret: std::env::var("TOKEN_SECRET")?,
            ttl_hours: std::env::var("TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(24),
        };
        let hash_cost_kib = std::env::var("HASH_COST_KIB")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(19_456);
        let store_timeout_ms = std::env::var("STORE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5_000);
        Ok(Self {
            database_url,
            token,
            hash_cost_kib,
            store_timeout_ms,
        })
    }
}
