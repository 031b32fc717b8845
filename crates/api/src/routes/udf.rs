use axum::Json;
use axum::extract::{Query, State};
use chartbridge_core::common::Resolution;
use chartbridge_store::resample::resample;

use crate::error::ApiError;
use crate::history::{HistoryRequest, Window, select_window};
use crate::server::AppState;
use crate::types::{
    ExchangeDto, HistoryQuery, HistoryResponse, SymbolInfoResponse, SymbolQuery, SymbolTypeDto,
    UdfConfigResponse,
};

/// 数据源能力集
#[utoipa::path(
    get,
    path = "/config",
    tag = "UDF",
    responses(
        (status = 200, description = "Capabilities", body = UdfConfigResponse)
    )
)]
pub async fn get_config(State(state): State<AppState>) -> Json<UdfConfigResponse> {
    let instrument = &state.instrument;
    Json(UdfConfigResponse {
        supports_search: false,
        supports_group_request: true,
        supports_marks: false,
        supports_timescale_marks: false,
        supports_time: true,
        exchanges: vec![ExchangeDto {
            value: instrument.exchange.clone(),
            name: title_case(&instrument.exchange),
            desc: title_case(&instrument.exchange),
        }],
        symbols_types: vec![SymbolTypeDto {
            name: instrument.symbol_type.clone(),
            value: instrument.symbol_type.clone(),
        }],
        supported_resolutions: Resolution::tokens(),
    })
}

/// 解析代码
///
/// 后端只提供一个配置的品种，
/// 任何代码都以请求的名称解析到该品种。
#[utoipa::path(
    get,
    path = "/symbols",
    tag = "UDF",
    params(SymbolQuery),
    responses(
        (status = 200, description = "Instrument descriptor", body = SymbolInfoResponse)
    )
)]
pub async fn get_symbol(
    State(state): State<AppState>,
    Query(query): Query<SymbolQuery>,
) -> Json<SymbolInfoResponse> {
    tracing::debug!(symbol = %query.symbol, "symbol resolve");
    let intraday = Resolution::ALL
        .iter()
        .filter(|r| r.is_intraday())
        .map(ToString::to_string)
        .collect();
    Json(SymbolInfoResponse::from_instrument(
        query,
        &state.instrument,
        Resolution::tokens(),
        intraday,
    ))
}

/// 时间窗口内的 K 线
///
/// # Logic
/// 1. 校验查询 (失败时返回 UDF 错误响应体)。
/// 2. 加载已存储序列; 存储为空时返回 `no_data`。
/// 3. 重采样到请求周期，再选取窗口。
#[utoipa::path(
    get,
    path = "/history",
    tag = "UDF",
    params(HistoryQuery),
    responses(
        (status = 200, description = "`ok`, `no_data` or `error` body", body = HistoryResponse)
    )
)]
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let request = HistoryRequest::try_from(query)?;
    let stored = state.store.load(&request.symbol).await?;
    if stored.is_empty() {
        tracing::debug!(symbol = %request.symbol, "store has no bars");
        return Ok(Json(HistoryResponse::no_data(None)));
    }

    let bars = resample(&stored, request.resolution);
    let response = match select_window(&bars, &request) {
        Window::Bars(selected) => HistoryResponse::ok(selected),
        Window::Empty { next_time } => HistoryResponse::no_data(next_time),
    };
    tracing::debug!(
        symbol = %request.symbol,
        resolution = %request.resolution,
        from = request.from,
        to = request.to,
        countback = ?request.countback,
        status = %response.s,
        bars = response.t.as_ref().map_or(0, Vec::len),
        "history served"
    );
    Ok(Json(response))
}

/// 服务器时间，epoch 秒
#[utoipa::path(
    get,
    path = "/time",
    tag = "UDF",
    responses(
        (status = 200, description = "Epoch seconds", body = i64)
    )
)]
pub async fn get_time(State(state): State<AppState>) -> Json<i64> {
    Json(state.clock.now().timestamp())
}

fn title_case(value: &str) -> String {
    let lower = value.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
