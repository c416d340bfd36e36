#![cfg(feature = "integration-tests")]

use std::env;
use std::time::Duration;

use barprobe::adapter::binance::{BinanceHttpClient, Endpoints};
use barprobe::config::Config;
use barprobe::domain::AccountType;
use barprobe::probe::{self, RunOutcome};
use tokio::time::timeout;

fn smoke_enabled() -> bool {
    matches!(env::var("BARPROBE_SMOKE").ok().as_deref(), Some("1"))
}

#[tokio::test]
#[ignore = "requires BARPROBE_SMOKE=1 and network access"]
async fn smoke_futures_testnet_exchange_info() {
    if !smoke_enabled() {
        eprintln!("Skipping smoke test (set BARPROBE_SMOKE=1 to enable)");
        return;
    }

    let endpoints = Endpoints::for_account(AccountType::UsdtFutures, true);
    let client = BinanceHttpClient::new(endpoints.http, String::new(), AccountType::UsdtFutures)
        .expect("valid testnet URL");

    let instrument = timeout(
        Duration::from_secs(20),
        client.fetch_instrument(&"BTCUSDT-PERP.BINANCE".parse().unwrap()),
    )
    .await
    .expect("Timed out querying exchangeInfo")
    .expect("Failed to fetch BTCUSDT instrument");

    assert_eq!(instrument.raw_symbol, "BTCUSDT");
}

#[tokio::test]
#[ignore = "requires BARPROBE_SMOKE=1, testnet API keys and network access"]
async fn smoke_one_second_bar_arrives() {
    if !smoke_enabled() {
        eprintln!("Skipping smoke test (set BARPROBE_SMOKE=1 to enable)");
        return;
    }
    let _ = dotenvy::dotenv();

    let mut config = Config::default();
    config.client.account_type = AccountType::Spot;
    config.probe.instrument_id = "BTCUSDT.BINANCE".into();
    config.probe.bar_type = "BTCUSDT.BINANCE-1-SECOND-LAST-EXTERNAL".into();
    config.validate().expect("valid smoke config");
    let credentials = config.credentials().expect("testnet credentials in environment");

    let report = probe::execute(&config, credentials)
        .await
        .expect("probe run failed");

    assert_eq!(report.outcome, RunOutcome::Completed);
}
