//! # `chartbridge-feed`
//!
//! UDF 数据源适配器: HTTP 传输、配置协商、品种解析、
//! 分页历史数据以及空操作的实时订阅。

pub mod callback;
pub mod http;
pub mod negotiator;
pub mod protocol;
pub mod udf;
