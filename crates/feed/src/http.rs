use async_trait::async_trait;
use chartbridge_core::datafeed::entity::QueryParams;
use chartbridge_core::datafeed::error::TransportError;
use chartbridge_core::datafeed::port::Transport;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// # Summary
/// 基于 `reqwest` 的 HTTP GET `Transport`。
///
/// # Invariants
/// - 客户端不配置超时与重试。
/// - `base_url` 永不以 `/` 结尾。
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    /// # Summary
    /// 为位于 `base_url` 的 UDF 后端创建传输层。
    ///
    /// # Arguments
    /// * `base_url`: 例如 `http://127.0.0.1:8000/api/tv`。
    ///
    /// # Returns
    /// 传输层; 地址或客户端无效时返回 `TransportError::Config`。
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_headers(base_url, &HashMap::new())
    }

    /// # Summary
    /// 创建在每个请求上附带 `headers` 的传输层。
    ///
    /// # Logic
    /// 1. 若 rustls 尚未安装加密提供者，则安装 `ring`。
    /// 2. 校验基础地址。
    /// 3. 将 `headers` 转为 `HeaderMap` 并构建客户端。
    ///
    /// # Arguments
    /// * `base_url`: UDF 基础地址。
    /// * `headers`: 额外请求头。
    ///
    /// # Returns
    /// 传输层，或 `TransportError::Config`。
    pub fn with_headers(
        base_url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Self, TransportError> {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }

        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| TransportError::Config(format!("invalid base url {}: {}", base_url, e)))?;

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Config(format!("invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Config(format!("invalid header value: {}", e)))?;
            header_map.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(header_map)
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// # Summary
    /// 构造 `{base}/{endpoint}?k=v&...`，所有键值均经 URL 编码。
    ///
    /// # Returns
    /// 请求地址; 结果无法解析时返回 `TransportError::Config`。
    pub fn request_url(&self, endpoint: &str, params: &QueryParams) -> Result<Url, TransportError> {
        let raw = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let mut url =
            Url::parse(&raw).map_err(|e| TransportError::Config(format!("{}: {}", raw, e)))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params.iter() {
                pairs.append_pair(key, &value.to_string());
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    /// # Summary
    /// 发起 GET 并解析 JSON 响应体。
    ///
    /// # Logic
    /// 1. 构造地址并发送请求。
    /// 2. 以文本读取响应体; 此处失败仍属网络错误。
    /// 3. 非成功 HTTP 状态码按网络错误处理。
    /// 4. 将文本解析为 JSON; 失败即解析错误。
    async fn send(&self, endpoint: &str, params: &QueryParams) -> Result<Value, TransportError> {
        let url = self.request_url(endpoint, params)?;
        debug!(endpoint, url = %url, "UDF request");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(endpoint, error = %e, "UDF request failed");
            TransportError::Network(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(endpoint, %status, "UDF backend answered with an error status");
            return Err(TransportError::Network(format!("HTTP {}", status)));
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(endpoint, error = %e, "UDF response is not JSON");
            TransportError::Parse(e.to_string())
        })
    }
}
