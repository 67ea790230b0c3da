//! Mock LLM 客户端（无需 API）
//!
//! MockChatClient 回显最后一条 user 消息，便于无 Key 跑通整个循环；
//! ScriptedChatClient 按脚本依次吐出响应，用于确定性地重放状态机。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::llm::{ChatClient, ChatResponse};
use crate::memory::Message;
use crate::tools::CatalogueEntry;

/// 回显客户端：取最后一条 User 消息作为回复
#[derive(Debug, Default)]
pub struct MockChatClient;

#[async_trait]
impl ChatClient for MockChatClient {
    async fn chat(
        &self,
        messages: &[Message],
        _tools: &[CatalogueEntry],
    ) -> Result<ChatResponse, AgentError> {
        let last_user = messages
            .iter()
            .rev()
            .find_map(|m| match m {
                Message::User { content } => Some(content.as_str()),
                _ => None,
            })
            .unwrap_or("(no input)");
        Ok(ChatResponse::text(format!("Echo from Mock: {}", last_user)))
    }
}

/// 脚本客户端：每次 chat 弹出脚本中的下一条响应。
/// 脚本耗尽后返回固定文本，避免测试里意外进入死循环。
pub struct ScriptedChatClient {
    script: Mutex<VecDeque<ChatResponse>>,
}

impl ScriptedChatClient {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat(
        &self,
        _messages: &[Message],
        _tools: &[CatalogueEntry],
    ) -> Result<ChatResponse, AgentError> {
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| ChatResponse::text("(script exhausted)")))
    }
}
