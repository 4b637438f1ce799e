use dotenv::dotenv;
use std::env;

/// Runtime configuration, read once at startup.
/// Every value has a development default so a bare checkout can run;
/// mail and FTP obviously need real credentials to deliver anything.
#[derive(Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// External base used when building verification links.
    pub base_url: String,
    /// Signs the session cookie and the verification tokens. Must be at
    /// least 32 bytes.
    pub secret_key: String,

    pub mail_server: String,
    pub mail_port: u16,
    pub mail_use_tls: bool,
    pub mail_username: String,
    pub mail_password: String,
    /// Display name on outgoing mail.
    pub mail_sender: String,
    /// Recipient of recommendation notifications.
    pub admin_email: String,

    pub ftp_host: String,
    pub ftp_port: u16,
    pub ftp_user: String,
    pub ftp_password: String,

    pub cache_ttl_secs: u64,
}

const DEV_SECRET_KEY: &str = "dev-secret-key-change-me-dev-secret-key-change-me";

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Config {
        dotenv().ok();

        let secret_key = match env::var("SECRET_KEY") {
            Ok(key) => key,
            Err(_) => {
                log::warn!("SECRET_KEY not set, using the development key");
                DEV_SECRET_KEY.to_string()
            }
        };
        assert!(secret_key.len() >= 32, "SECRET_KEY must be at least 32 bytes");

        Config {
            database_url: var_or("DATABASE_URL", "blog.db"),
            bind_addr: var_or("BIND_ADDR", "127.0.0.1:8080"),
            base_url: var_or("BASE_URL", "http://127.0.0.1:8080"),
            secret_key,
            mail_server: var_or("MAIL_SERVER", "localhost"),
            mail_port: var_or("MAIL_PORT", "587").parse().expect("MAIL_PORT must be a number"),
            mail_use_tls: ["true", "1", "t"]
                .contains(&var_or("MAIL_USE_TLS", "true").to_lowercase().as_str()),
            mail_username: var_or("MAIL_USERNAME", "blog@localhost"),
            mail_password: var_or("MAIL_PASSWORD", ""),
            mail_sender: var_or("MAIL_SENDER", "Personal Blog"),
            admin_email: var_or("ADMIN_EMAIL", "admin@localhost"),
            ftp_host: var_or("FTP_HOST", "localhost"),
            ftp_port: var_or("FTP_PORT", "21").parse().expect("FTP_PORT must be a number"),
            ftp_user: var_or("FTP_USER", "anonymous"),
            ftp_password: var_or("FTP_PASSWORD", ""),
            cache_ttl_secs: var_or("CACHE_TTL_SECS", "300")
                .parse()
                .expect("CACHE_TTL_SECS must be a number"),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Config {
        Config {
            database_url: String::new(),
            bind_addr: "127.0.0.1:0".to_string(),
            base_url: "http://localhost".to_string(),
            secret_key: DEV_SECRET_KEY.to_string(),
            mail_server: "localhost".to_string(),
            mail_port: 587,
            mail_use_tls: false,
            mail_username: "blog@localhost".to_string(),
            mail_password: String::new(),
            mail_sender: "Personal Blog".to_string(),
            admin_email: "admin@localhost".to_string(),
            ftp_host: "localhost".to_string(),
            ftp_port: 21,
            ftp_user: "anonymous".to_string(),
            ftp_password: String::new(),
            cache_ttl_secs: 300,
        }
    }
}
