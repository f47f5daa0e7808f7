use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_FALLBACK_CITY: &str = "Flensburg";

/// Application configuration loaded from environment variables.
/// Every variable has a default; only malformed values fail start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Directory holding the four TrueType faces of the letter font.
    pub font_dir: Option<PathBuf>,
    /// Place printed on the date line when the sender address has none.
    pub fallback_city: String,
    pub load_system_fonts: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            font_dir: optional_env("LETTER_FONT_DIR").map(PathBuf::from),
            fallback_city: optional_env("LETTER_FALLBACK_CITY")
                .unwrap_or_else(|| DEFAULT_FALLBACK_CITY.to_string()),
            load_system_fonts: match optional_env("LETTER_LOAD_SYSTEM_FONTS") {
                Some(value) => parse_flag(&value)
                    .context("LETTER_LOAD_SYSTEM_FONTS must be true or false")?,
                None => true,
            },
        })
    }
}

/// Unset and blank variables are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognised flag value '{other}'"),
    }
}
