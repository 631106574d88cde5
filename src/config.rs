use std::env;
use std::str::FromStr;

use crate::mail::{DEFAULT_SMTP_PORT, SmtpConfig};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://sigap.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_MAIL_FROM: &str = "noreply@sigap.local";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtlpConfig {
    pub endpoint: String,
    /// Extra gRPC metadata sent with every export, e.g. an API key.
    pub header: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub mail_from: String,
    /// `None` means mail is logged instead of sent.
    pub smtp: Option<SmtpConfig>,
    pub otlp: Option<OtlpConfig>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: var_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            mail_from: var_or("MAIL_FROM", DEFAULT_MAIL_FROM),
            smtp: smtp_from_env(),
            otlp: otlp_from_env(),
        }
    }
}

fn smtp_from_env() -> Option<SmtpConfig> {
    let host = non_empty_var("SMTP_HOST")?;

    Some(SmtpConfig {
        host,
        port: parsed_or("SMTP_PORT", DEFAULT_SMTP_PORT),
        user: non_empty_var("SMTP_USER"),
        password: non_empty_var("SMTP_PASSWORD"),
    })
}

pub fn otlp_from_env() -> Option<OtlpConfig> {
    let endpoint = non_empty_var("OTLP_ENDPOINT")?;
    let header = match (
        non_empty_var("OTLP_HEADER_NAME"),
        non_empty_var("OTLP_HEADER_VALUE"),
    ) {
        (Some(name), Some(value)) => Some((name, value)),
        _ => None,
    };

    Some(OtlpConfig { endpoint, header })
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    non_empty_var(name).unwrap_or_else(|| default.to_string())
}

fn parsed_or<T: FromStr>(name: &str, default: T) -> T {
    non_empty_var(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
