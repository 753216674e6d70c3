//! 错误类型定义
//!
//! 这个模块定义了库中使用的所有错误类型，使用 thiserror 提供丰富的错误信息。
//! 可跳过的问题（格式异常行、无法解析的时间戳）不走这里，只记录为跳过行；
//! 这里的错误都会终止当前运行。

/// 汇总流程的结果类型
pub type Result<T> = std::result::Result<T, SummaryError>;

/// 汇总流程错误类型
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    /// IO错误（输入读取、桶文件写入、汇总文件写入）
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 配置文件反序列化错误
    #[error("配置文件解析错误: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// 配置文件序列化错误
    #[error("配置文件序列化错误: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl SummaryError {
    /// 创建一个配置错误
    pub fn config<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        tracing::error!("配置错误: {}", message);
        Self::Config(message)
    }

    /// 检查是否为 IO 错误
    pub fn is_io_error(&self) -> bool {
        matches!(self, SummaryError::Io(_))
    }

    /// 检查是否为配置错误
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SummaryError::Config(_)
                | SummaryError::TomlDe(_)
                | SummaryError::TomlSer(_)
        )
    }
}
