//! 线程检查点
//!
//! 每个 Thread 一个 JSON 文件（<dir>/<thread_id>.json）。挂起状态随
//! Thread 一起序列化，进程重启后 load 回来即可凭确认 token 继续。

use std::path::{Path, PathBuf};

use crate::core::AgentError;
use crate::memory::Thread;

/// 基于目录的线程检查点存储
#[derive(Debug, Clone)]
pub struct ThreadStore {
    dir: PathBuf,
}

impl ThreadStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, thread_id: &str) -> PathBuf {
        let sanitized: String = thread_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", sanitized))
    }

    /// 读取检查点；不存在时返回 None
    pub fn load(&self, thread_id: &str) -> Result<Option<Thread>, AgentError> {
        let path = self.path_for(thread_id);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)
            .map_err(|e| AgentError::Checkpoint(e.to_string()))?;
        let thread =
            serde_json::from_str(&data).map_err(|e| AgentError::Checkpoint(e.to_string()))?;
        Ok(Some(thread))
    }

    /// 首条用户消息到来时创建线程；已有检查点则恢复
    pub fn load_or_create(&self, thread_id: &str) -> Result<Thread, AgentError> {
        Ok(self
            .load(thread_id)?
            .unwrap_or_else(|| Thread::new(thread_id)))
    }

    /// 写检查点；父目录不存在时自动创建
    pub fn save(&self, thread: &Thread) -> Result<(), AgentError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| AgentError::Checkpoint(e.to_string()))?;
        let data = serde_json::to_string_pretty(thread)
            .map_err(|e| AgentError::Checkpoint(e.to_string()))?;
        std::fs::write(self.path_for(&thread.id), data)
            .map_err(|e| AgentError::Checkpoint(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Message, PendingConfirmation, ToolCall};

    #[test]
    fn checkpoint_roundtrip_preserves_suspension() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThreadStore::new(dir.path());

        let mut thread = store.load_or_create("session-1").unwrap();
        thread.push_message(Message::user("검색해줘"));
        thread.suspended = Some(PendingConfirmation {
            call: ToolCall {
                id: "call_1".into(),
                name: "web_search".into(),
                arguments: serde_json::json!({"query": "날씨"}),
            },
        });
        store.save(&thread).unwrap();

        let restored = store.load("session-1").unwrap().expect("checkpoint exists");
        assert_eq!(restored.messages().len(), 1);
        assert_eq!(
            restored.suspended.as_ref().map(|p| p.call.name.as_str()),
            Some("web_search")
        );
    }

    #[test]
    fn missing_thread_is_created_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThreadStore::new(dir.path());
        let thread = store.load_or_create("nope").unwrap();
        assert!(thread.messages().is_empty());
        assert!(!thread.is_suspended());
    }
}
