//! # `chartbridge-core`
//!
//! 工作区内所有 crate 共享的领域实体、错误枚举与端口 (trait)。
//! 具体适配器位于其他 crate:
//! - `chartbridge-feed` 面向 UDF 后端实现 [`datafeed::port::Transport`] 与
//!   [`datafeed::port::Datafeed`]。
//! - `chartbridge-overlay` 驱动 [`overlay::port::ChartWidget`]。
//! - `chartbridge-store` 实现 [`store::port::BarStore`]。

pub mod common;
pub mod config;
pub mod datafeed;
pub mod market;
pub mod overlay;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod test_utils;
