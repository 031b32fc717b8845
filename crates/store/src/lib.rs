//! # `chartbridge-store`
//!
//! UDF 后端的 K 线存储: 磁盘上的 CSV 导出文件，
//! 以及将其转换为请求周期的重采样器。

pub mod csv_store;
pub mod resample;
pub mod time;
