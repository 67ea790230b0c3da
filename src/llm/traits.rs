//! LLM 客户端抽象
//!
//! 推理能力的统一契约：输入完整消息历史与工具目录，输出可选文本与
//! 可选的有序工具调用列表。所有后端（OpenAI 兼容 / Mock）实现 ChatClient。

use async_trait::async_trait;

use crate::core::AgentError;
use crate::memory::{Message, ToolCall};
use crate::tools::CatalogueEntry;

/// 一次推理调用的结果：content 与 tool_calls 至少其一有值
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }
}

/// LLM 客户端 trait：带工具目录的对话完成
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// 调用推理能力；失败是致命的（由调用方决定是否终止整个 run）
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[CatalogueEntry],
    ) -> Result<ChatResponse, AgentError>;
}
