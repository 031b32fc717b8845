//! # API 错误处理
//!
//! UDF 客户端从响应体而非状态行读取失败信息，
//! 因此所有 `ApiError` 都渲染为 `200 OK` 加 `{"s": "error", "errmsg": ...}`。

use axum::Json;
use axum::response::{IntoResponse, Response};
use chartbridge_core::store::error::StoreError;
use thiserror::Error;

use crate::types::HistoryResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing required parameters: from and to")]
    MissingRange,

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid timestamp format")]
    InvalidTimestamp,

    #[error("Unsupported resolution: {0}")]
    UnsupportedResolution(String),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(e) => tracing::error!(error = %e, "bar store failure"),
            other => tracing::debug!(error = %other, "rejected history request"),
        }
        Json(HistoryResponse::error(self.to_string())).into_response()
    }
}
