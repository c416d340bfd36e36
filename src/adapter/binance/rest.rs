//! Binance REST client for instrument lookups.

use std::time::Duration;

use reqwest::Client as HttpClient;
use tracing::{debug, info};
use url::Url;

use super::messages::ExchangeInfo;
use super::symbol::raw_symbol;
use crate::domain::{AccountType, Instrument, InstrumentId};
use crate::error::{AdapterError, Result};

const API_KEY_HEADER: &str = "X-MBX-APIKEY";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the `exchangeInfo` endpoint.
#[derive(Clone)]
pub struct BinanceHttpClient {
    http: HttpClient,
    exchange_info_url: Url,
    api_key: String,
    account_type: AccountType,
}

impl BinanceHttpClient {
    /// Create a client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: String, account_type: AccountType) -> Result<Self> {
        let exchange_info_url = Url::parse(base_url)?.join(exchange_info_path(account_type))?;
        let http = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            exchange_info_url,
            api_key,
            account_type,
        })
    }

    #[must_use]
    pub fn exchange_info_url(&self) -> &Url {
        &self.exchange_info_url
    }

    /// Look up one instrument in the venue's exchange info.
    pub async fn fetch_instrument(&self, instrument_id: &InstrumentId) -> Result<Instrument> {
        let symbol = raw_symbol(instrument_id, self.account_type);
        debug!(url = %self.exchange_info_url, symbol = %symbol, "Fetching exchange info");

        let info: ExchangeInfo = self
            .http
            .get(self.exchange_info_url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let instrument = info
            .symbols
            .iter()
            .find(|s| s.symbol == symbol)
            .map(|s| s.to_instrument(instrument_id.clone()))
            .ok_or_else(|| AdapterError::InstrumentNotFound {
                instrument_id: instrument_id.to_string(),
                venue: self.exchange_info_url.host_str().unwrap_or_default().to_string(),
            })?;

        info!(instrument_id = %instrument.id, status = %instrument.status, "Instrument loaded");
        Ok(instrument)
    }
}

fn exchange_info_path(account_type: AccountType) -> &'static str {
    match account_type {
        AccountType::Spot => "/api/v3/exchangeInfo",
        AccountType::UsdtFutures => "/fapi/v1/exchangeInfo",
        AccountType::CoinFutures => "/dapi/v1/exchangeInfo",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_exchange_info_url_per_account_type() {
        let client = BinanceHttpClient::new(
            "https://testnet.binancefuture.com",
            "key".into(),
            AccountType::UsdtFutures,
        )
        .unwrap();
        assert_eq!(
            client.exchange_info_url().as_str(),
            "https://testnet.binancefuture.com/fapi/v1/exchangeInfo"
        );

        let client = BinanceHttpClient::new(
            "https://testnet.binance.vision",
            "key".into(),
            AccountType::Spot,
        )
        .unwrap();
        assert_eq!(
            client.exchange_info_url().as_str(),
            "https://testnet.binance.vision/api/v3/exchangeInfo"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(BinanceHttpClient::new("not a url", "key".into(), AccountType::Spot).is_err());
    }
}
