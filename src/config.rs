// hackathon-service/src/config.rs
use log::warn;
use std::env;
use std::str::FromStr;

const DEFAULT_JWT_SECRET: &str = "hackathon_dev_secret_key";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub storage_path: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub invitation_ttl_days: i64,
    pub poll_sweep_interval_secs: u64,
    pub bcrypt_cost: u32,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9090".to_string(),
            storage_path: "./storage".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_hours: 24 * 7,
            invitation_ttl_days: 7,
            poll_sweep_interval_secs: 30,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin_email: None,
            admin_password: None,
        }
    }
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value for {}: {:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl AppConfig {
    // Reads configuration from the environment (call dotenv first)
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();

        let jwt_secret = non_empty("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, falling back to the development secret");
            defaults.jwt_secret.clone()
        });

        Self {
            bind_address: non_empty("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            storage_path: non_empty("STORAGE_PATH").unwrap_or(defaults.storage_path),
            jwt_secret,
            token_ttl_hours: parsed_or("TOKEN_TTL_HOURS", defaults.token_ttl_hours),
            invitation_ttl_days: parsed_or("INVITATION_TTL_DAYS", defaults.invitation_ttl_days),
            poll_sweep_interval_secs: parsed_or(
                "POLL_SWEEP_INTERVAL_SECS",
                defaults.poll_sweep_interval_secs,
            ),
            bcrypt_cost: parsed_or("BCRYPT_COST", defaults.bcrypt_cost),
            admin_email: non_empty("ADMIN_EMAIL"),
            admin_password: non_empty("ADMIN_PASSWORD"),
        }
    }

    pub fn invitation_ttl(&self) -> Option<chrono::Duration> {
        if self.invitation_ttl_days <= 0 {
            return None;
        }
        Some(chrono::Duration::days(self.invitation_ttl_days))
    }
}
