use chartbridge_core::overlay::entity::{
    BacktestEvent, Direction, EventKind, Glyph, MarkerColor, OverlayMarker, SkipReason,
};
use chartbridge_core::overlay::error::NormalizeError;

/// # Summary
/// 将一条回测事件转换为图表标记。
///
/// # Logic
/// 1. 将时间戳规范为 epoch 秒。
/// 2. 将价格规范为有限数值。
/// 3. 按事件类型 (入场还看方向) 映射图形、颜色与文字。
///
/// # Returns
/// 标记，或事件无法绘制的首个原因。
pub fn build_marker(event: &BacktestEvent) -> Result<OverlayMarker, SkipReason> {
    let time = event
        .timestamp
        .as_ref()
        .ok_or_else(|| NormalizeError::Timestamp("missing".to_string()))
        .and_then(|ts| ts.normalize())
        .map_err(SkipReason::Normalize)?;
    let price = event
        .price
        .as_ref()
        .ok_or_else(|| NormalizeError::Price("missing".to_string()))
        .and_then(|p| p.normalize())
        .map_err(SkipReason::Normalize)?;

    let (glyph, color) = match event.kind() {
        EventKind::Entry => match event.direction() {
            Some(Direction::Buy) => (Glyph::ArrowUp, MarkerColor::Green),
            Some(Direction::Sell) => (Glyph::ArrowDown, MarkerColor::Red),
            None => (Glyph::Circle, MarkerColor::Gray),
        },
        EventKind::Exit => (Glyph::XCross, MarkerColor::Blue),
        EventKind::Break => (Glyph::Flag, MarkerColor::Amber),
        EventKind::Other(kind) => return Err(SkipReason::UnsupportedType(kind)),
    };

    Ok(OverlayMarker {
        time,
        price,
        glyph,
        color,
        text: label(event),
    })
}

/// 标记文字: `Entry #12 BUY`、`Exit x3`、`Break x5`，或仅类型名。
pub fn label(event: &BacktestEvent) -> String {
    match event.kind() {
        EventKind::Entry => {
            let mut text = String::from("Entry");
            if let Some(n) = event.entry_number {
                text.push_str(&format!(" #{}", n));
            }
            if let Some(direction) = event.direction() {
                text.push_str(&format!(" {}", direction));
            }
            text
        }
        EventKind::Exit => counted("Exit", event.entry_count),
        EventKind::Break => counted("Break", event.entry_count),
        EventKind::Other(kind) => kind,
    }
}

fn counted(base: &str, count: Option<i64>) -> String {
    match count {
        Some(n) => format!("{} x{}", base, n),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartbridge_core::overlay::entity::{EventPrice, EventTimestamp};
    use serde_json::json;

    fn event(value: serde_json::Value) -> BacktestEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_buy_entry_marker() {
        let marker = build_marker(&event(json!({
            "type": "entry",
            "timestamp": 1700000000,
            "price": 1950.5,
            "direction": "BUY",
            "entry_number": 12
        })))
        .unwrap();
        assert_eq!(marker.time, 1_700_000_000);
        assert_eq!(marker.price, 1950.5);
        assert_eq!(marker.glyph, Glyph::ArrowUp);
        assert_eq!(marker.color, MarkerColor::Green);
        assert_eq!(marker.text, "Entry #12 BUY");
    }

    #[test]
    fn test_sell_entry_and_directionless_entry() {
        let sell = build_marker(&event(json!({
            "type": "ENTRY", "timestamp": 1700000000, "price": "1950", "direction": "sell"
        })))
        .unwrap();
        assert_eq!((sell.glyph, sell.color), (Glyph::ArrowDown, MarkerColor::Red));
        assert_eq!(sell.text, "Entry SELL");

        let plain = build_marker(&event(json!({
            "type": "entry", "timestamp": 1700000000, "price": 1950
        })))
        .unwrap();
        assert_eq!((plain.glyph, plain.color), (Glyph::Circle, MarkerColor::Gray));
        assert_eq!(plain.text, "Entry");
    }

    #[test]
    fn test_exit_and_break_labels() {
        let exit = build_marker(&event(json!({
            "type": "exit", "timestamp": 1700000000000i64, "price": 1960.0, "entry_count": 12
        })))
        .unwrap();
        assert_eq!(exit.time, 1_700_000_000);
        assert_eq!((exit.glyph, exit.color), (Glyph::XCross, MarkerColor::Blue));
        assert_eq!(exit.text, "Exit x12");

        let brk = build_marker(&event(json!({
            "type": "break", "timestamp": "2023-11-14T12:00:00Z", "price": 1940.0
        })))
        .unwrap();
        assert_eq!(brk.time, 1_699_963_200);
        assert_eq!((brk.glyph, brk.color), (Glyph::Flag, MarkerColor::Amber));
        assert_eq!(brk.text, "Break");
    }

    #[test]
    fn test_skip_reasons() {
        let bad_time = BacktestEvent {
            timestamp: Some(EventTimestamp::Iso("yesterday".into())),
            price: Some(EventPrice::Number(1.0)),
            ..event(json!({"type": "entry"}))
        };
        assert_eq!(
            build_marker(&bad_time),
            Err(SkipReason::Normalize(NormalizeError::Timestamp(
                "yesterday".into()
            )))
        );

        let bad_price = event(json!({"type": "exit", "timestamp": 1700000000, "price": "n/a"}));
        assert_eq!(
            build_marker(&bad_price),
            Err(SkipReason::Normalize(NormalizeError::Price("n/a".into())))
        );

        let missing_price = event(json!({"type": "exit", "timestamp": 1700000000}));
        assert!(matches!(
            build_marker(&missing_price),
            Err(SkipReason::Normalize(NormalizeError::Price(_)))
        ));

        let unknown = event(json!({"type": "signal", "timestamp": 1700000000, "price": 1.0}));
        assert_eq!(
            build_marker(&unknown),
            Err(SkipReason::UnsupportedType("signal".into()))
        );
    }
}
