//! Agent 错误类型
//!
//! 工具层面的失败（参数校验、运行时错误）不会出现在这里——它们会被
//! 转成结构化 Observation 回流推理循环。此处只保留致命错误：注册期错误、
//! 未知工具/过滤器等注册表误用，以及上游能力（LLM、嵌入、存储）本身的失败。

use thiserror::Error;

/// Agent 运行过程中的致命错误（可恢复的工具失败不在此列）
#[derive(Error, Debug)]
pub enum AgentError {
    /// 注册期错误：同名工具重复注册
    #[error("Duplicate tool registration: {0}")]
    DuplicateTool(String),

    /// 注册表误用：请求了未注册的工具名
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// 注册表误用：非法的 memory_type 过滤器
    #[error("Invalid memory type: {0}")]
    InvalidMemoryType(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    /// 长期记忆存储不可用或底层 SQL 失败
    #[error("Memory store error: {0}")]
    Store(String),

    /// 在未挂起的线程上调用了 resume
    #[error("Thread is not awaiting confirmation")]
    NotSuspended,

    /// 线程检查点读写失败
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for AgentError {
    fn from(e: rusqlite::Error) -> Self {
        AgentError::Store(e.to_string())
    }
}
