use thiserror::Error;

/// # Summary
/// 单次后端往返调用的失败。
///
/// # Invariants
/// - `Network` 表示调用未能完成; `Parse` 表示调用完成
///   但响应体不是 JSON。两者从不合并。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
    /// 在发起调用前基础地址或请求头即被拒绝。
    #[error("Transport configuration error: {0}")]
    Config(String),
}

/// # Summary
/// 数据源适配器向图表组件暴露的错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatafeedError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// 后端返回 `{s: "error"}`，携带其 `errmsg`。
    #[error("{0}")]
    Protocol(String),
    /// 响应体是 JSON，但结构不符合协议要求。
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl DatafeedError {
    /// 后端报错但未提供 `errmsg` 时使用的消息。
    pub const GENERIC_MESSAGE: &'static str = "Unknown error";

    /// 由可选的后端消息构造协议错误; 空字符串视为缺失。
    pub fn protocol(errmsg: Option<String>) -> Self {
        DatafeedError::Protocol(
            errmsg
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| Self::GENERIC_MESSAGE.to_string()),
        )
    }
}
