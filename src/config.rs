use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Postgres connection string. Without it the server runs on the
    /// in-memory store (not allowed when COLLAB_ENV=production).
    pub database_url: Option<String>,
    /// Base URL used to build invite accept links.
    pub site_url: String,
    pub mail_relay_url: Option<String>,
    /// HMAC-SHA256 secret for signing mail relay requests.
    pub mail_relay_secret: Option<String>,
}

impl Config {
    pub fn is_production() -> bool {
        std::env::var("COLLAB_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .map(|v| v == "production")
            .unwrap_or(false)
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
    if database_url.is_none() {
        if Config::is_production() {
            anyhow::bail!("DATABASE_URL must be set when COLLAB_ENV=production.");
        }
        eprintln!("⚠️  DATABASE_URL is not set; invites will be kept in memory and lost on restart.");
    }

    Ok(Config {
        port: std::env::var("COLLAB_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url,
        site_url: std::env::var("COLLAB_SITE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into()),
        mail_relay_url: std::env::var("COLLAB_MAIL_RELAY_URL")
            .ok()
            .filter(|s| !s.is_empty()),
        mail_relay_secret: std::env::var("COLLAB_MAIL_RELAY_SECRET")
            .ok()
            .filter(|s| !s.is_empty()),
    })
}
