use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use chartbridge_api::server::{AppState, build_router};
use chartbridge_core::common::time::RealTimeProvider;
use chartbridge_core::config::{BridgeConfig, InstrumentConfig};
use chartbridge_core::datafeed::entity::{PeriodParams, QueryParams, SymbolHints};
use chartbridge_core::datafeed::error::{DatafeedError, TransportError};
use chartbridge_core::datafeed::port::{Datafeed, Transport};
use chartbridge_core::market::entity::Candle;
use chartbridge_core::test_utils::MemBarStore;
use chartbridge_feed::http::HttpTransport;
use chartbridge_feed::udf::UdfDatafeed;
use chrono::DateTime;
use std::sync::Arc;
use tokio::net::TcpListener;

const BASE: i64 = 1_699_956_000;

fn bars() -> Vec<Candle> {
    (0..5)
        .map(|i| Candle {
            time: DateTime::from_timestamp(BASE + i * 60, 0).unwrap_or_default(),
            open: 1950.0,
            high: 1951.0,
            low: 1949.0,
            close: 1950.5,
            volume: 3.0,
        })
        .collect()
}

async fn serve(app: Router) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("test server stopped: {e}");
        }
    });
    Ok(format!("http://{}", addr))
}

async fn spawn_backend() -> anyhow::Result<String> {
    let state = AppState {
        store: Arc::new(MemBarStore::new(bars())),
        instrument: InstrumentConfig::default(),
        clock: Arc::new(RealTimeProvider),
    };
    let root = serve(build_router(state, "/api/tv")).await?;
    Ok(format!("{}/api/tv", root))
}

#[tokio::test]
async fn test_datafeed_against_udf_backend() -> anyhow::Result<()> {
    let base = spawn_backend().await?;
    let feed = UdfDatafeed::from_config(&BridgeConfig {
        datafeed_url: format!("{}/", base),
        ..BridgeConfig::default()
    })?;

    let config = feed.configuration().await;
    assert!(config.supports_group_request);
    assert!(config.supports_time);
    assert_eq!(config.supported_resolutions.len(), 9);
    assert_eq!(config.exchanges[0].value, "FOREX");

    let symbol = feed
        .resolve_symbol(
            "XAUUSD",
            &SymbolHints {
                currency_code: Some("USD".into()),
                unit_id: None,
            },
        )
        .await?;
    assert_eq!(symbol.name, "XAUUSD");
    assert_eq!(symbol.pricescale, 100);
    assert_eq!(symbol.extra["currency_code"], "USD");

    let page = feed
        .get_bars(
            &symbol,
            "1",
            PeriodParams {
                from: BASE + 60,
                to: BASE + 180,
                ..PeriodParams::default()
            },
        )
        .await?;
    assert!(!page.meta.no_data);
    let times: Vec<i64> = page.bars.iter().map(|b| b.time).collect();
    assert_eq!(
        times,
        vec![(BASE + 60) * 1000, (BASE + 120) * 1000, (BASE + 180) * 1000]
    );
    assert_eq!(page.bars[0].volume, Some(3.0));

    let older = feed
        .get_bars(
            &symbol,
            "1",
            PeriodParams {
                from: BASE - 7_200,
                to: BASE - 3_600,
                ..PeriodParams::default()
            },
        )
        .await?;
    assert!(older.meta.no_data);
    assert!(older.bars.is_empty());
    assert_eq!(older.meta.next_time, None);

    let error = feed
        .get_bars(&symbol, "2", PeriodParams { from: 1, to: 2, ..PeriodParams::default() })
        .await;
    assert!(matches!(error, Err(DatafeedError::Protocol(ref m)) if m == "Unsupported resolution: 2"));

    let now = feed.server_time().await?;
    assert!(now > 1_700_000_000);
    Ok(())
}

#[tokio::test]
async fn test_transport_error_kinds() -> anyhow::Result<()> {
    let app = Router::new()
        .route("/plain", get(|| async { "not json" }))
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "{}") }),
        );
    let base = serve(app).await?;
    let transport = HttpTransport::new(&base)?;

    let parse = transport.send("plain", &QueryParams::new()).await;
    assert!(matches!(parse, Err(TransportError::Parse(_))));

    let status = transport.send("broken", &QueryParams::new()).await;
    assert!(matches!(status, Err(TransportError::Network(ref m)) if m.contains("500")));

    let closed = TcpListener::bind("127.0.0.1:0").await?;
    let dead = format!("http://{}", closed.local_addr()?);
    drop(closed);
    let unreachable = HttpTransport::new(&dead)?
        .send("config", &QueryParams::new())
        .await;
    assert!(matches!(unreachable, Err(TransportError::Network(_))));
    Ok(())
}
