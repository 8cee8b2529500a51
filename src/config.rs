use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::net::IpAddr;

pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,
    pub log_level: String,
    pub jwt_secret: String,
    pub seed_demo: bool,
    pub censor_words: Vec<String>,
}

impl core::fmt::Debug for Config {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("jwt_secret", &"<redacted>")
            .field("seed_demo", &self.seed_demo)
            .field("censor_words", &self.censor_words.len())
            .finish()
    }
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        Self {
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(3000),
            bind_addr: env::var("BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(IpAddr::from([127, 0, 0, 1])),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string()), // Use a secure secret in production
            seed_demo: env::var("SEED_DEMO")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            censor_words: env::var("CENSOR_WORDS")
                .map(|v| v.split(',').map(|w| w.trim().to_string()).filter(|w| !w.is_empty()).collect())
                .unwrap_or_default(),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
