use chartbridge_core::datafeed::entity::{FeedConfiguration, ParamValue, PeriodParams, SymbolHints};
use chartbridge_core::datafeed::error::{DatafeedError, TransportError};
use chartbridge_core::datafeed::port::Datafeed;
use chartbridge_core::test_utils::ScriptedTransport;
use chartbridge_feed::callback::DatafeedCallbackExt;
use chartbridge_feed::negotiator::NegotiationPhase;
use chartbridge_feed::udf::UdfDatafeed;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;

fn backend_config() -> serde_json::Value {
    json!({
        "supports_search": false,
        "supports_group_request": true,
        "supports_marks": false,
        "supports_timescale_marks": false,
        "supports_time": true,
        "supported_resolutions": ["1", "60", "1D"]
    })
}

fn descriptor() -> chartbridge_core::datafeed::entity::SymbolDescriptor {
    serde_json::from_value(json!({"name": "XAUUSD", "pricescale": 100})).unwrap()
}

/// # Summary
/// 协商前后注册的监听器各恰好触发一次，
/// 先注册的按注册顺序触发。
#[tokio::test]
async fn test_listeners_fire_once_in_registration_order() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("config", Ok(backend_config()));
    transport.hold("config");

    let feed = UdfDatafeed::new(transport.clone());
    let order = Arc::new(Mutex::new(Vec::new()));
    for id in 0..3 {
        let order = order.clone();
        feed.on_ready(Box::new(move |config| {
            assert!(config.supports_time);
            order.lock().unwrap().push(id);
        }));
    }
    assert!(order.lock().unwrap().is_empty());
    assert_eq!(feed.negotiator().phase(), NegotiationPhase::Fetching);

    transport.release("config");
    let config = timeout(Duration::from_secs(5), feed.configuration()).await.unwrap();
    assert_eq!(config.supported_resolutions, vec!["1", "60", "1D"]);
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(feed.negotiator().phase(), NegotiationPhase::Ready);

    // 迟到的监听器立即执行
    let late = Arc::new(AtomicUsize::new(0));
    let late_clone = late.clone();
    feed.on_ready(Box::new(move |_| {
        late_clone.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(late.load(Ordering::SeqCst), 1);
    assert_eq!(order.lock().unwrap().len(), 3);
    assert_eq!(transport.call_count("config"), 1);
}

#[tokio::test]
#[allow(clippy::panic)]
async fn test_panicking_listener_does_not_block_async_waiters() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("config", Ok(backend_config()));
    transport.hold("config");

    let feed = UdfDatafeed::new(transport.clone());
    feed.on_ready(Box::new(|_| panic!("listener failed")));

    transport.release("config");
    let config = timeout(Duration::from_secs(5), feed.configuration()).await.unwrap();
    assert_eq!(config.supported_resolutions, vec!["1", "60", "1D"]);
    assert_eq!(feed.negotiator().phase(), NegotiationPhase::Ready);
}

#[tokio::test]
async fn test_configuration_failure_falls_back_to_defaults() {
    for failure in [
        Err(TransportError::Network("connection refused".into())),
        Err(TransportError::Parse("expected value".into())),
        Ok(json!(null)),
        Ok(json!("not a config")),
    ] {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("config", failure);
        let feed = UdfDatafeed::new(transport);

        let config = timeout(Duration::from_secs(5), feed.configuration()).await.unwrap();
        assert_eq!(config, FeedConfiguration::default());
        assert!(!config.supports_search);
        assert!(!config.supports_marks);
        assert_eq!(config.supported_resolutions.len(), 9);
    }
}

#[tokio::test]
async fn test_resolve_symbol_sends_hints_only_when_present() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("config", Ok(backend_config()));
    transport.respond("symbols", Ok(json!({"name": "XAUUSD", "session": "24x7", "timezone": "Etc/UTC"})));
    let feed = UdfDatafeed::new(transport.clone());

    let resolved = feed.resolve_symbol("XAUUSD", &SymbolHints::default()).await.unwrap();
    assert_eq!(resolved.session, "24x7");

    let hints = SymbolHints {
        currency_code: Some("USD".into()),
        unit_id: None,
    };
    feed.resolve_symbol("XAUUSD", &hints).await.unwrap();

    let calls: Vec<_> = transport
        .calls()
        .into_iter()
        .filter(|(endpoint, _)| endpoint == "symbols")
        .collect();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1.len(), 1);
    assert_eq!(calls[1].1.get("currency_code"), Some(&ParamValue::Text("USD".into())));
    assert!(calls[1].1.get("unit_id").is_none());
}

#[tokio::test]
async fn test_resolve_symbol_reports_backend_errors() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("config", Ok(backend_config()));
    transport.respond("symbols", Ok(json!({"s": "error", "errmsg": "unknown_symbol"})));
    transport.respond("symbols", Ok(json!({"s": "error"})));
    transport.respond("symbols", Err(TransportError::Network("down".into())));
    let feed = UdfDatafeed::new(transport);

    let hints = SymbolHints::default();
    assert_eq!(
        feed.resolve_symbol("FOO", &hints).await,
        Err(DatafeedError::Protocol("unknown_symbol".into()))
    );
    assert_eq!(
        feed.resolve_symbol("FOO", &hints).await,
        Err(DatafeedError::Protocol("Unknown error".into()))
    );
    assert_eq!(
        feed.resolve_symbol("FOO", &hints).await,
        Err(DatafeedError::Transport(TransportError::Network("down".into())))
    );
}

#[tokio::test]
async fn test_get_bars_params_and_pagination_cursor() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("config", Ok(backend_config()));
    transport.respond(
        "history",
        Ok(json!({
            "s": "ok",
            "t": [1700000000, 1700003600, 1700007200],
            "o": [1, 2, 3], "h": [1, 2, 3], "l": [1, 2, 3], "c": [1, 2, 3],
            "v": [10, 20, 30],
            "nextTime": 1699990000
        })),
    );
    let feed = UdfDatafeed::new(transport.clone());

    let period = PeriodParams {
        from: 1_700_000_000,
        to: 1_700_010_000,
        count_back: Some(300),
        first_data_request: true,
    };
    let page = feed.get_bars(&descriptor(), "60", period).await.unwrap();

    let times: Vec<i64> = page.bars.iter().map(|b| b.time).collect();
    assert_eq!(times, vec![1_700_000_000_000, 1_700_003_600_000, 1_700_007_200_000]);
    assert!(times.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(page.meta.next_time, Some(1_699_990_000));

    let (_, params) = transport
        .calls()
        .into_iter()
        .find(|(endpoint, _)| endpoint == "history")
        .unwrap();
    assert_eq!(params.get("symbol"), Some(&ParamValue::Text("XAUUSD".into())));
    assert_eq!(params.get("resolution"), Some(&ParamValue::Text("60".into())));
    assert_eq!(params.get("from"), Some(&ParamValue::Int(1_700_000_000)));
    assert_eq!(params.get("countback"), Some(&ParamValue::Int(300)));
}

#[tokio::test]
async fn test_get_bars_outcomes() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("config", Ok(backend_config()));
    transport.respond("history", Ok(json!({"s": "no_data"})));
    transport.respond("history", Ok(json!({"s": "ok", "t": []})));
    transport.respond("history", Ok(json!({"s": "error", "errmsg": "X"})));
    transport.respond("history", Ok(json!("garbage")));
    transport.respond("history", Err(TransportError::Parse("bad json".into())));
    let feed = UdfDatafeed::new(transport.clone());
    let period = PeriodParams {
        from: 0,
        to: 10,
        ..Default::default()
    };

    let page = feed.get_bars(&descriptor(), "1D", period).await.unwrap();
    assert!(page.meta.no_data && page.bars.is_empty());
    let page = feed.get_bars(&descriptor(), "1D", period).await.unwrap();
    assert!(page.meta.no_data && page.bars.is_empty());
    assert_eq!(
        feed.get_bars(&descriptor(), "1D", period).await,
        Err(DatafeedError::Protocol("X".into()))
    );
    assert!(matches!(
        feed.get_bars(&descriptor(), "1D", period).await,
        Err(DatafeedError::Malformed(_))
    ));
    assert_eq!(
        feed.get_bars(&descriptor(), "1D", period).await,
        Err(DatafeedError::Transport(TransportError::Parse("bad json".into())))
    );
    // 无缓存: 每个请求都到达后端
    assert_eq!(transport.call_count("history"), 5);
}

#[tokio::test]
async fn test_history_not_gated_on_configuration() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("config", Ok(backend_config()));
    transport.hold("config");
    transport.respond("history", Ok(json!({"s": "no_data"})));
    let feed = UdfDatafeed::new(transport.clone());

    let page = timeout(
        Duration::from_secs(5),
        feed.get_bars(&descriptor(), "1", PeriodParams::default()),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(page.meta.no_data);
    assert_eq!(feed.negotiator().phase(), NegotiationPhase::Fetching);
    transport.release("config");
}

#[tokio::test]
async fn test_realtime_stub_is_inert() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("config", Ok(backend_config()));
    let feed = UdfDatafeed::new(transport.clone());
    let ticks = Arc::new(AtomicUsize::new(0));
    let ticks_clone = ticks.clone();

    feed.subscribe_bars(
        &descriptor(),
        "1",
        Box::new(move |_| {
            ticks_clone.fetch_add(1, Ordering::SeqCst);
        }),
        "uid-1",
    );
    feed.unsubscribe_bars("uid-1");
    feed.unsubscribe_bars("never-subscribed");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(ticks.load(Ordering::SeqCst), 0);
    assert!(transport.calls().iter().all(|(endpoint, _)| endpoint == "config"));
}

#[tokio::test]
async fn test_callback_adapters_deliver_one_continuation() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("config", Ok(backend_config()));
    transport.respond("history", Ok(json!({"s": "error", "errmsg": "boom"})));
    transport.respond("time", Ok(json!(1_700_000_000)));
    let feed = Arc::new(UdfDatafeed::new(transport));

    let (tx, rx) = oneshot::channel();
    let error_tx = Arc::new(Mutex::new(Some(tx)));
    let success_tx = error_tx.clone();
    feed.clone()
        .get_bars_with(
            descriptor(),
            "1".into(),
            PeriodParams::default(),
            move |_, _| {
                if let Some(tx) = success_tx.lock().unwrap().take() {
                    tx.send(Err(())).unwrap();
                }
            },
            move |msg| {
                if let Some(tx) = error_tx.lock().unwrap().take() {
                    tx.send(Ok(msg)).unwrap();
                }
            },
        )
        .await
        .unwrap();
    assert_eq!(rx.await.unwrap(), Ok("boom".to_string()));

    let (tx, rx) = oneshot::channel();
    feed.server_time_with(move |time| tx.send(time).unwrap())
        .await
        .unwrap();
    assert_eq!(rx.await.unwrap(), 1_700_000_000);
}
