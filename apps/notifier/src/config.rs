use std::{env::var, fmt, str::FromStr};

use anyhow::{Context, Result, anyhow};

/// What to watch and who to tell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertSettings {
    pub symbol: String,
    pub company_name: String,
    pub percent_threshold: u32,
    pub top_n: usize,
    pub sender: String,
    pub recipient: String,
}

#[derive(Clone)]
pub struct Config {
    pub alert: AlertSettings,
    pub alpha_vantage_base: String,
    pub alpha_vantage_key: String,
    pub news_api_base: String,
    pub news_api_key: String,
    pub twilio_base: String,
    pub twilio_sid: String,
    pub twilio_token: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} not set"));
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let alert = AlertSettings {
            symbol: or_default("STOCK_SYMBOL", "TSLA"),
            company_name: or_default("COMPANY_NAME", "Tesla Inc"),
            percent_threshold: parse_or(&lookup, "PERCENT_THRESHOLD", 1)?,
            top_n: parse_or(&lookup, "NEWS_TOP_N", 3)?,
            sender: or_default("TWILIO_FROM", "whatsapp:+14155238886"),
            recipient: required("TWILIO_TO")?,
        };

        Ok(Self {
            alert,
            alpha_vantage_base: or_default("ALPHA_VANTAGE_BASE_URL", "https://www.alphavantage.co"),
            alpha_vantage_key: required("ALPHA_VANTAGE_API_KEY")?,
            news_api_base: or_default("NEWS_API_BASE_URL", "https://newsapi.org"),
            news_api_key: required("NEWS_API_KEY")?,
            twilio_base: or_default("TWILIO_BASE_URL", "https://api.twilio.com"),
            twilio_sid: required("TWILIO_ACCOUNT_SID")?,
            twilio_token: required("TWILIO_AUTH_TOKEN")?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        None => Ok(default),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("alert", &self.alert)
            .field("alpha_vantage_base", &self.alpha_vantage_base)
            .field("alpha_vantage_key", &"<redacted>")
            .field("news_api_base", &self.news_api_base)
            .field("news_api_key", &"<redacted>")
            .field("twilio_base", &self.twilio_base)
            .field("twilio_sid", &self.twilio_sid)
            .field("twilio_token", &"<redacted>")
            .finish()
    }
}
