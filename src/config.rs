use std::time::Duration;

use crate::mailer::DEFAULT_RESEND_API_BASE;

/// Upper bound for `OTP_TTL_SECS` (one day).
pub const MAX_OTP_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {0:?}")]
    Missing(Vec<&'static str>),
    #[error("{name} must be a valid number (got {value:?})")]
    Invalid { name: &'static str, value: String },
    #[error("{name} must be between {min} and {max} (got {value})")]
    OutOfRange { name: &'static str, value: u64, min: u64, max: u64 },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub resend_api_key: String,
    pub resend_api_base: String,
    pub from_email: String,
    pub from_name: String,
    pub bind_addr: String,
    pub port: u16,
    pub otp_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let resend_api_key = var("RESEND_API_KEY");
        if resend_api_key.is_none() { missing.push("RESEND_API_KEY"); }
        let from_email = var("FROM_EMAIL");
        if from_email.is_none() { missing.push("FROM_EMAIL"); }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        fn number<T: std::str::FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
            match raw {
                None => Ok(default),
                Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { name, value: v }),
            }
        }

        let ttl_secs = number("OTP_TTL_SECS", var("OTP_TTL_SECS"), 300)?;
        if !(1..=MAX_OTP_TTL_SECS).contains(&ttl_secs) {
            return Err(ConfigError::OutOfRange { name: "OTP_TTL_SECS", value: ttl_secs, min: 1, max: MAX_OTP_TTL_SECS });
        }

        Ok(Self {
            resend_api_key: resend_api_key.unwrap_or_default(),
            resend_api_base: var("RESEND_API_BASE").unwrap_or_else(|| DEFAULT_RESEND_API_BASE.to_string()),
            from_email: from_email.unwrap_or_default(),
            from_name: var("FROM_NAME").unwrap_or_else(|| "Your App".to_string()),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: number("PORT", var("PORT"), 3000)?,
            otp_ttl: Duration::from_secs(ttl_secs),
        })
    }

    /// `From:` header value, e.g. `Your App <no-reply@example.com>`.
    pub fn sender(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}
