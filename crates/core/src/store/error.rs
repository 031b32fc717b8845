use thiserror::Error;

/// # Summary
/// K 线存储错误。
///
/// # Invariants
/// - 数据目录不存在不算错误，返回空 K 线。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 读取数据目录或文件失败
    #[error("IO error: {0}")]
    Io(String),
    /// CSV 文件无法按 K 线表读取
    #[error("CSV error: {0}")]
    Csv(String),
}
