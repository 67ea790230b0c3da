//! 反思引擎：对话结束后的自动记忆判断
//!
//! 一轮对话到达终态后，用一次 LLM 判断（固定决策 schema）决定
//! (question, final_answer) 是否值得写入长期记忆。判断响应解析失败时
//! 静默跳过（绝不打扰用户），但通过 parse_failures 计数器保持可观测。

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;

use crate::core::AgentError;
use crate::llm::ChatClient;
use crate::memory::{Message, MemoryStore, MemoryType, WriteReceipt};

/// 判断提示词：要求仅输出固定 schema 的 JSON
const JUDGMENT_PROMPT: &str = "\
You review one completed exchange and decide whether any of it is worth \
persisting to long-term memory.

Worth saving:
- user preferences (name, address style, favourite tools)
- long-term goals, ongoing projects
- facts that will be useful in later sessions

Not worth saving:
- one-off details (today's lunch)
- overly detailed logs

Respond with JSON only:
{
    \"should_write\": true/false,
    \"memory_type\": \"profile\" | \"episodic\" | \"knowledge\",
    \"importance\": 1-5,
    \"content\": \"what to store\",
    \"tags\": [\"tag1\", \"tag2\"]
}

If nothing is worth saving:
{\"should_write\": false}";

/// LLM 判断的决策 schema
#[derive(Debug, Deserialize)]
struct Decision {
    should_write: bool,
    memory_type: Option<MemoryType>,
    importance: Option<u8>,
    content: Option<String>,
    #[serde(default)]
    tags: BTreeSet<String>,
}

/// 单次反思的结果
#[derive(Debug)]
pub enum ReflectionOutcome {
    /// 判定值得保存并已写入
    Saved(WriteReceipt),
    /// 判定无需保存
    Declined,
    /// 判断响应不符合决策 schema，已跳过
    Skipped,
}

/// 反思引擎：持有判断能力与记忆存储（依赖注入，无全局状态）
pub struct ReflectionEngine {
    judge: Arc<dyn ChatClient>,
    memory: Arc<dyn MemoryStore>,
    parse_failures: AtomicU64,
}

impl ReflectionEngine {
    pub fn new(judge: Arc<dyn ChatClient>, memory: Arc<dyn MemoryStore>) -> Self {
        Self {
            judge,
            memory,
            parse_failures: AtomicU64::new(0),
        }
    }

    /// 解析失败累计次数（可观测性指标）
    pub fn parse_failures(&self) -> u64 {
        self.parse_failures.load(Ordering::Relaxed)
    }

    /// 判断并按需写入；判断能力本身的失败向上传播
    pub async fn reflect(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<ReflectionOutcome, AgentError> {
        let snippet = format!("User: {}\nAssistant: {}", question, answer);
        let messages = [Message::system(JUDGMENT_PROMPT), Message::user(snippet)];
        let response = self.judge.chat(&messages, &[]).await?;

        let Some(decision) = response.content.as_deref().and_then(parse_decision) else {
            self.parse_failures.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("reflection decision unparseable, skipped");
            return Ok(ReflectionOutcome::Skipped);
        };

        if !decision.should_write {
            return Ok(ReflectionOutcome::Declined);
        }

        // should_write 为 true 时这三个字段是必填的；缺失按解析失败处理
        let (Some(memory_type), Some(importance), Some(content)) =
            (decision.memory_type, decision.importance, decision.content)
        else {
            self.parse_failures.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("reflection decision incomplete, skipped");
            return Ok(ReflectionOutcome::Skipped);
        };

        let receipt = self
            .memory
            .write(&content, memory_type, importance, &decision.tags)
            .await?;
        tracing::info!(memory_id = %receipt.memory_id, "reflection saved memory");
        Ok(ReflectionOutcome::Saved(receipt))
    }
}

/// 从判断响应中提取决策 JSON（容忍 ```json 围栏与前后缀文本）
fn parse_decision(text: &str) -> Option<Decision> {
    let trimmed = text.trim();
    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim())
    } else {
        let start = trimmed.find('{')?;
        let end = trimmed.rfind('}')?;
        trimmed.get(start..=end)?
    };
    serde_json::from_str(json_str).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatResponse, HashEmbedder, ScriptedChatClient};
    use crate::memory::SqliteMemoryStore;

    fn engine(responses: Vec<ChatResponse>) -> (ReflectionEngine, Arc<SqliteMemoryStore>) {
        let store =
            Arc::new(SqliteMemoryStore::open_in_memory(Arc::new(HashEmbedder::default())).unwrap());
        let judge = Arc::new(ScriptedChatClient::new(responses));
        (ReflectionEngine::new(judge, store.clone()), store)
    }

    #[tokio::test]
    async fn garbage_judgment_is_skipped_and_counted() {
        let (engine, store) = engine(vec![ChatResponse::text("definitely not json")]);
        let outcome = engine.reflect("q", "a").await.unwrap();
        assert!(matches!(outcome, ReflectionOutcome::Skipped));
        assert_eq!(engine.parse_failures(), 1);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn declined_decision_writes_nothing() {
        let (engine, store) = engine(vec![ChatResponse::text(r#"{"should_write": false}"#)]);
        let outcome = engine.reflect("q", "a").await.unwrap();
        assert!(matches!(outcome, ReflectionOutcome::Declined));
        assert_eq!(engine.parse_failures(), 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn positive_decision_is_persisted() {
        let decision = r#"```json
{"should_write": true, "memory_type": "profile", "importance": 5,
 "content": "선호 언어: Python", "tags": ["lang_pref"]}
```"#;
        let (engine, store) = engine(vec![ChatResponse::text(decision)]);
        let outcome = engine.reflect("내 선호 언어 기억해", "기억했습니다").await.unwrap();
        match outcome {
            ReflectionOutcome::Saved(receipt) => {
                assert_eq!(receipt.status, "saved");
                assert_eq!(receipt.memory_type, MemoryType::Profile);
            }
            other => panic!("expected Saved, got {:?}", other),
        }
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn incomplete_positive_decision_is_skipped() {
        let (engine, store) = engine(vec![ChatResponse::text(r#"{"should_write": true}"#)]);
        let outcome = engine.reflect("q", "a").await.unwrap();
        assert!(matches!(outcome, ReflectionOutcome::Skipped));
        assert_eq!(engine.parse_failures(), 1);
        assert_eq!(store.count().unwrap(), 0);
    }
}
