use chartbridge_api::server::{AppState, build_router};
use chartbridge_core::common::time::FakeClockProvider;
use chartbridge_core::config::InstrumentConfig;
use chartbridge_core::market::entity::Candle;
use chartbridge_core::store::error::StoreError;
use chartbridge_core::store::port::BarStore;
use chartbridge_core::test_utils::MemBarStore;
use chrono::DateTime;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

// 2023-11-14 10:00..10:09 UTC，每分钟一根
const BASE: i64 = 1_699_956_000;

fn minute_bars() -> Vec<Candle> {
    (0..10i32)
        .map(|i| {
            let px = 1950.0 + f64::from(i);
            Candle {
                time: DateTime::from_timestamp(BASE + i64::from(i) * 60, 0).unwrap(),
                open: px,
                high: px + 0.5,
                low: px - 0.5,
                close: px + 0.25,
                volume: 10.0,
            }
        })
        .collect()
}

struct FailingStore;

#[async_trait::async_trait]
impl BarStore for FailingStore {
    async fn load(&self, _symbol: &str) -> Result<Vec<Candle>, StoreError> {
        Err(StoreError::Io("disk gone".into()))
    }
}

async fn spawn_server(store: Arc<dyn BarStore>) -> String {
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        // 其他测试已安装
    }
    let state = AppState {
        store,
        instrument: InstrumentConfig::default(),
        clock: Arc::new(FakeClockProvider::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )),
    };
    let app = build_router(state, "/api/tv");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/tv", addr)
}

async fn get(base: &str, endpoint: &str, query: &[(&str, &str)]) -> Value {
    reqwest::Client::new()
        .get(format!("{}/{}", base, endpoint))
        .query(query)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_config_symbols_and_time() {
    let base = spawn_server(Arc::new(MemBarStore::new(minute_bars()))).await;

    let config = get(&base, "config", &[]).await;
    assert_eq!(config["supports_search"], json!(false));
    assert_eq!(config["supports_group_request"], json!(true));
    assert_eq!(config["supports_time"], json!(true));
    assert_eq!(config["exchanges"][0]["value"], json!("FOREX"));
    assert_eq!(config["exchanges"][0]["name"], json!("Forex"));
    assert_eq!(
        config["supported_resolutions"],
        json!(["1", "5", "15", "30", "60", "240", "1D", "1W", "1M"])
    );

    let symbol = get(&base, "symbols", &[("symbol", "XAUUSD"), ("currency_code", "USD")]).await;
    assert_eq!(symbol["name"], json!("XAUUSD"));
    assert_eq!(symbol["type"], json!("forex"));
    assert_eq!(symbol["pricescale"], json!(100));
    assert_eq!(symbol["exchange_listed_name"], json!("FOREX:XAUUSD"));
    assert_eq!(symbol["currency_code"], json!("USD"));
    assert_eq!(symbol["intraday_multipliers"], json!(["1", "5", "15", "30", "60", "240"]));

    assert_eq!(get(&base, "time", &[]).await, json!(1_700_000_000));
}

#[tokio::test]
async fn test_history_range_and_resample() {
    let base = spawn_server(Arc::new(MemBarStore::new(minute_bars()))).await;
    let from = BASE.to_string();
    let to = (BASE + 120).to_string();

    let body = get(
        &base,
        "history",
        &[("symbol", "XAUUSD"), ("resolution", "1"), ("from", &from), ("to", &to)],
    )
    .await;
    assert_eq!(body["s"], json!("ok"));
    assert_eq!(body["t"], json!([BASE, BASE + 60, BASE + 120]));
    assert_eq!(body["o"], json!([1950.0, 1951.0, 1952.0]));
    assert_eq!(body["v"], json!([10.0, 10.0, 10.0]));

    let to = (BASE + 600).to_string();
    let body = get(
        &base,
        "history",
        &[("symbol", "XAUUSD"), ("resolution", "5"), ("from", &from), ("to", &to)],
    )
    .await;
    assert_eq!(body["t"], json!([BASE, BASE + 300]));
    assert_eq!(body["o"], json!([1950.0, 1955.0]));
    assert_eq!(body["h"], json!([1954.5, 1959.5]));
    assert_eq!(body["l"], json!([1949.5, 1954.5]));
    assert_eq!(body["c"], json!([1954.25, 1959.25]));
    assert_eq!(body["v"], json!([50.0, 50.0]));
}

#[tokio::test]
async fn test_history_countback_and_no_data() {
    let base = spawn_server(Arc::new(MemBarStore::new(minute_bars()))).await;
    let to = (BASE + 540).to_string();

    let body = get(
        &base,
        "history",
        &[
            ("symbol", "XAUUSD"),
            ("resolution", "1"),
            ("from", "1"),
            ("to", &to),
            ("countback", "2"),
        ],
    )
    .await;
    assert_eq!(body["t"], json!([BASE + 480, BASE + 540]));

    let later = (BASE + 3_600).to_string();
    let latest = (BASE + 7_200).to_string();
    let body = get(
        &base,
        "history",
        &[("symbol", "XAUUSD"), ("resolution", "1"), ("from", &later), ("to", &latest)],
    )
    .await;
    assert_eq!(body, json!({"s": "no_data", "nextTime": BASE + 540}));

    let empty = spawn_server(Arc::new(MemBarStore::new(Vec::new()))).await;
    let body = get(
        &empty,
        "history",
        &[("symbol", "XAUUSD"), ("resolution", "1"), ("from", "1"), ("to", "2")],
    )
    .await;
    assert_eq!(body, json!({"s": "no_data"}));
}

#[tokio::test]
async fn test_history_error_bodies() {
    let base = spawn_server(Arc::new(MemBarStore::new(minute_bars()))).await;

    let body = get(&base, "history", &[("symbol", "XAUUSD"), ("resolution", "1")]).await;
    assert_eq!(
        body,
        json!({"s": "error", "errmsg": "Missing required parameters: from and to"})
    );

    let body = get(
        &base,
        "history",
        &[("symbol", "XAUUSD"), ("resolution", "1"), ("from", "x"), ("to", "2")],
    )
    .await;
    assert_eq!(body, json!({"s": "error", "errmsg": "Invalid timestamp format"}));

    let body = get(
        &base,
        "history",
        &[("symbol", "XAUUSD"), ("resolution", "3"), ("from", "1"), ("to", "2")],
    )
    .await;
    assert_eq!(body, json!({"s": "error", "errmsg": "Unsupported resolution: 3"}));

    let failing = spawn_server(Arc::new(FailingStore)).await;
    let body = get(
        &failing,
        "history",
        &[("symbol", "XAUUSD"), ("resolution", "1"), ("from", "1"), ("to", "2")],
    )
    .await;
    assert_eq!(body["s"], json!("error"));
    assert_eq!(body["errmsg"], json!("IO error: disk gone"));
}
