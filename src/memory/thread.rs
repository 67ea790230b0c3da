//! 会话线程：消息历史与挂起状态
//!
//! Thread 是单个对话的全部短期状态：只追加的消息序列、本轮待执行的
//! 工具调用队列、以及等待人工确认的挂起标记。整个结构可序列化——
//! 挂起后写入检查点，任意延迟之后仅凭确认 token 即可恢复现场。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// LLM 请求的单次工具调用；id 在一轮内唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// 消息（按 role 打标签的和类型，与 LLM API 的 wire 格式一致）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    User {
        content: String,
    },
    Assistant {
        content: String,
        /// 非空时表示本条消息携带待执行的工具调用
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// 工具结果，tool_call_id 回指产生它的那次调用
    Tool {
        tool_call_id: String,
        content: String,
    },
    System {
        content: String,
    },
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }
}

/// 挂起标记：等待人工确认的高危工具调用。
/// 剩余队列仍留在 Thread::pending_calls 中，确认/取消后继续处理。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub call: ToolCall,
}

/// 单个对话的持久状态；仅由 Orchestrator 修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    /// 只追加：没有任何 API 可以删除或改写已有消息
    messages: Vec<Message>,
    #[serde(default)]
    pub pending_calls: VecDeque<ToolCall>,
    #[serde(default)]
    pub suspended: Option<PendingConfirmation>,
    /// 本次 run 已消耗的 Reasoning 轮数（跨挂起恢复保持累计）
    #[serde(default)]
    pub cycles_used: usize,
}

impl Thread {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            pending_calls: VecDeque::new(),
            suspended: None,
            cycles_used: 0,
        }
    }

    pub fn push_message(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 本次 run 的提问：最近一条 user 消息。
    /// 恢复路径（进程重启后 resume）也靠它从检查点还原反思所需的 question。
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::User { content } => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_wire_shape() {
        let msg = Message::tool("call_1", r#"{"result":3}"#);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");

        let assistant = Message::assistant("done");
        let json = serde_json::to_value(&assistant).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json.get("tool_calls").is_none(), "空 tool_calls 不上线");
    }

    #[test]
    fn suspended_thread_roundtrip() {
        let mut thread = Thread::new("t1");
        thread.push_message(Message::user("search something"));
        let call = ToolCall {
            id: "call_a".into(),
            name: "web_search".into(),
            arguments: serde_json::json!({"query": "rust"}),
        };
        thread.pending_calls.push_back(ToolCall {
            id: "call_b".into(),
            name: "get_time".into(),
            arguments: serde_json::json!({"offset": "UTC"}),
        });
        thread.suspended = Some(PendingConfirmation { call });
        thread.cycles_used = 2;

        let json = serde_json::to_string(&thread).unwrap();
        let restored: Thread = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id, "t1");
        assert_eq!(restored.cycles_used, 2);
        assert_eq!(restored.pending_calls.len(), 1);
        let pending = restored.suspended.as_ref().expect("挂起标记应当还原");
        assert_eq!(pending.call.id, "call_a");
        assert_eq!(restored.last_user_content(), Some("search something"));
    }
}
