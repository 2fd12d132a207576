use stock::{NewsClient, PriceClient};

use crate::{config::Config, messenger::TwilioClient};

pub mod alert;
pub mod config;
pub mod messenger;
pub mod pipeline;

/// Provider clients built once from the configuration.
pub struct Clients {
    pub price_client: PriceClient,
    pub news_client: NewsClient,
    pub messenger: TwilioClient,
}

impl Clients {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            price_client: PriceClient::new(&config.alpha_vantage_base, &config.alpha_vantage_key)?,
            news_client: NewsClient::new(&config.news_api_base, &config.news_api_key)?,
            messenger: TwilioClient::new(
                &config.twilio_base,
                &config.twilio_sid,
                &config.twilio_token,
            )?,
        })
    }
}

pub type Error = anyhow::Error;
