use std::net::IpAddr;

use chrono::FixedOffset;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub cors_origin: String,
    pub cookie_secure: bool,
    pub max_body_size: usize,
    pub log_level: String,
    pub admin_seed: Option<AdminSeed>,
}

/// First administrator, created at startup when the users table is empty.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET_KEY")?;

        let host: IpAddr = env_or("RESERVASI_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid RESERVASI_HOST: {e}"))?;

        let port: u16 = env_or("RESERVASI_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid RESERVASI_PORT: {e}"))?;

        let cors_origin = env_or("RESERVASI_CORS_ORIGIN", "http://localhost:3000");
        let cookie_secure = env_flag("RESERVASI_COOKIE_SECURE")?;

        let max_body_size: usize = env_or("RESERVASI_MAX_BODY_SIZE", "65536")
            .parse()
            .map_err(|e| format!("Invalid RESERVASI_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("RESERVASI_LOG_LEVEL", "info");

        let admin_seed = match (
            std::env::var("RESERVASI_ADMIN_EMAIL").ok(),
            std::env::var("RESERVASI_ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email,
                password,
                name: env_or("RESERVASI_ADMIN_NAME", "Administrator"),
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            cors_origin,
            cookie_secure,
            max_body_size,
            log_level,
            admin_seed,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub backend_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub clinic_offset: FixedOffset,
    pub cookie_secure: bool,
    pub log_level: String,
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self, String> {
        let backend_url = env_required("BACKEND_URL")?
            .trim_end_matches('/')
            .to_string();

        let host: IpAddr = env_or("DASHBOARD_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid DASHBOARD_HOST: {e}"))?;

        let port: u16 = env_or("DASHBOARD_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid DASHBOARD_PORT: {e}"))?;

        let clinic_offset = parse_offset(&env_or("DASHBOARD_UTC_OFFSET", "+07:00"))
            .ok_or_else(|| "Invalid DASHBOARD_UTC_OFFSET, expected e.g. +07:00".to_string())?;

        let cookie_secure = env_flag("DASHBOARD_COOKIE_SECURE")?;
        let log_level = env_or("DASHBOARD_LOG_LEVEL", "info");

        Ok(DashboardConfig {
            backend_url,
            host,
            port,
            clinic_offset,
            cookie_secure,
            log_level,
        })
    }
}

/// Parses `+HH:MM` / `-HH:MM` into a fixed offset.
pub fn parse_offset(value: &str) -> Option<FixedOffset> {
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => (1, value),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str) -> Result<bool, String> {
    match env_or(key, "false").to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(format!("Invalid {key}: '{other}' is not a boolean")),
    }
}
