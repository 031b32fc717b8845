//! # `chartbridge-api` - UDF 后端
//!
//! 按图表数据源使用的 UDF 契约提供已存储的 K 线
//! (`/config`、`/symbols`、`/history`、`/time`)，以 `utoipa` 生成文档，
//! 并可通过 Swagger UI 浏览。

pub mod error;
pub mod history;
pub mod routes;
pub mod server;
pub mod types;
