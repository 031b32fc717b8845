//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口。
//! `main()` 位于 `crates/app`，由其持有共享状态。

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use chartbridge_core::common::time::TimeProvider;
use chartbridge_core::config::InstrumentConfig;
use chartbridge_core::store::port::BarStore;

use crate::routes::udf;

// ============================================================
//  共享应用状态
// ============================================================

/// 通过 axum 的 `State` 提取器注入到每个 Handler 的状态。
///
/// # Invariants
/// - 由应用在启动服务前构建一次，生命周期与进程等同。
#[derive(Clone)]
pub struct AppState {
    /// K 线数据来源
    pub store: Arc<dyn BarStore>,
    /// `/symbols` 返回的品种元数据
    pub instrument: InstrumentConfig,
    /// `/time` 使用的时钟
    pub clock: Arc<dyn TimeProvider>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

#[derive(OpenApi)]
#[openapi(
    info(
        title = "chartbridge UDF API",
        version = "0.1.0",
        description = "UDF-style market data backend consumed by the chart datafeed.",
        license(name = "MIT")
    ),
    tags(
        (name = "UDF", description = "Configuration, symbol, history and time endpoints")
    )
)]
pub struct ApiDoc;

// ============================================================
//  路由与服务启动
// ============================================================

/// # Summary
/// 构建完整的应用路由。
///
/// # Arguments
/// * `state` - 共享的 Handler 状态
/// * `prefix` - UDF 路由挂载点，例如 `/api/tv`
///
/// # Returns
/// 挂载于 `prefix` 的 UDF 路由、位于 `/swagger-ui` 的 Swagger UI，以及允许任意来源的 CORS。
pub fn build_router(state: AppState, prefix: &str) -> Router {
    let udf_router = OpenApiRouter::new()
        .routes(routes!(udf::get_config))
        .routes(routes!(udf::get_symbol))
        .routes(routes!(udf::get_history))
        .routes(routes!(udf::get_time));

    let prefix = normalize_prefix(prefix);
    let root = OpenApiRouter::with_openapi(ApiDoc::openapi());
    let root = if prefix.is_empty() {
        root.merge(udf_router)
    } else {
        root.nest(&prefix, udf_router)
    };
    let (router, api) = root.with_state(state).split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
}

/// # Summary
/// 绑定 `bind_addr` 并持续服务，直到 `shutdown` 完成。
pub async fn start_server<F>(
    state: AppState,
    prefix: &str,
    bind_addr: &str,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state, prefix);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let local = listener.local_addr()?;
    tracing::info!("chartbridge UDF server listening on {}{}", local, normalize_prefix(prefix));
    tracing::info!("Swagger UI: http://{}/swagger-ui/", local);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("UDF server stopped");
    Ok(())
}

// "/api/tv/" 与 "api/tv" 都挂载到 "/api/tv"; "/" 与 "" 挂载到根路径
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
