use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("命令通道读写失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("响应序列化失败: {0}")]
    Encode(#[from] serde_json::Error),
}
