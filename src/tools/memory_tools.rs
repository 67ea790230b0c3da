//! 长期记忆工具：read_memory / write_memory
//!
//! 记忆读写与其他能力走同一条 Tool Dispatch 路径。write_memory 是
//! 高危工具（落盘有持久副作用），执行前需要人工确认。

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::memory::{MemoryFilter, MemoryStore, MemoryType};
use crate::tools::{parse_args, Tool, ToolFailure};

fn default_filter() -> String {
    "all".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_importance() -> u8 {
    3
}

fn default_memory_type() -> MemoryType {
    MemoryType::Episodic
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ReadMemoryInput {
    /// What to recall
    query: String,
    /// "all", "profile", "episodic" or "knowledge"
    #[serde(default = "default_filter")]
    memory_type: String,
    /// Number of results to return (1-10)
    #[serde(default = "default_top_k")]
    top_k: usize,
}

/// 语义检索长期记忆
pub struct ReadMemoryTool {
    memory: Arc<dyn MemoryStore>,
}

impl ReadMemoryTool {
    pub fn new(memory: Arc<dyn MemoryStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for ReadMemoryTool {
    fn name(&self) -> &str {
        "read_memory"
    }

    fn description(&self) -> &str {
        "Recall stored information about the user or earlier sessions. \
         Use when the user refers to something from before."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(ReadMemoryInput)).unwrap_or_default()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolFailure> {
        let input: ReadMemoryInput = parse_args(&args)?;
        // LLM 给出的非法过滤值在这里降级为可恢复的校验失败
        let filter: MemoryFilter = input
            .memory_type
            .parse()
            .map_err(|_| ToolFailure::invalid(format!("invalid memory_type: {}", input.memory_type)))?;
        if !(1..=10).contains(&input.top_k) {
            return Err(ToolFailure::invalid("top_k must be between 1 and 10"));
        }

        let hits = self
            .memory
            .read(&input.query, filter, input.top_k)
            .await
            .map_err(|e| ToolFailure::runtime(e.to_string()))?;

        let results: Vec<Value> = hits
            .iter()
            .map(|hit| {
                json!({
                    "content": hit.record.content,
                    "memory_type": hit.record.memory_type,
                    "importance": hit.record.importance,
                    "tags": hit.record.tags,
                    "created_at": hit.record.created_at,
                    "score": hit.score,
                })
            })
            .collect();

        Ok(json!({"results": results, "count": results.len()}))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct WriteMemoryInput {
    /// What to store
    content: String,
    /// "profile", "episodic" or "knowledge"
    #[serde(default = "default_memory_type")]
    memory_type: MemoryType,
    /// Importance 1 (low) - 5 (high)
    #[serde(default = "default_importance")]
    importance: u8,
    #[serde(default)]
    tags: BTreeSet<String>,
}

/// 写入长期记忆（高危）
pub struct WriteMemoryTool {
    memory: Arc<dyn MemoryStore>,
}

impl WriteMemoryTool {
    pub fn new(memory: Arc<dyn MemoryStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for WriteMemoryTool {
    fn name(&self) -> &str {
        "write_memory"
    }

    fn description(&self) -> &str {
        "Store important information in long-term memory: user preferences, \
         long-term goals, project facts."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(WriteMemoryInput)).unwrap_or_default()
    }

    fn risky(&self) -> bool {
        true
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolFailure> {
        let input: WriteMemoryInput = parse_args(&args)?;
        if input.content.trim().is_empty() {
            return Err(ToolFailure::invalid("content must not be empty"));
        }
        if !(1..=5).contains(&input.importance) {
            return Err(ToolFailure::invalid("importance must be between 1 and 5"));
        }

        let receipt = self
            .memory
            .write(&input.content, input.memory_type, input.importance, &input.tags)
            .await
            .map_err(|e| ToolFailure::runtime(e.to_string()))?;

        serde_json::to_value(&receipt).map_err(|e| ToolFailure::runtime(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HashEmbedder;
    use crate::memory::SqliteMemoryStore;

    fn memory() -> Arc<SqliteMemoryStore> {
        Arc::new(SqliteMemoryStore::open_in_memory(Arc::new(HashEmbedder::default())).unwrap())
    }

    #[tokio::test]
    async fn write_then_filtered_read() {
        let store = memory();
        let write = WriteMemoryTool::new(store.clone());
        let read = ReadMemoryTool::new(store);

        let receipt = write
            .invoke(json!({
                "content": "선호 언어: Python",
                "memory_type": "profile",
                "importance": 5,
                "tags": ["lang_pref"]
            }))
            .await
            .unwrap();
        assert_eq!(receipt["status"], "saved");

        let result = read
            .invoke(json!({"query": "선호 언어", "memory_type": "profile"}))
            .await
            .unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["results"][0]["memory_type"], "profile");
    }

    #[tokio::test]
    async fn invalid_filter_is_validation_failure() {
        let read = ReadMemoryTool::new(memory());
        let err = read
            .invoke(json!({"query": "x", "memory_type": "bogus"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolFailure::Validation(_)));
    }

    #[tokio::test]
    async fn importance_out_of_range_is_validation_failure() {
        let write = WriteMemoryTool::new(memory());
        let err = write
            .invoke(json!({"content": "x", "importance": 7}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolFailure::Validation(_)));
    }

    #[test]
    fn write_is_risky_read_is_not() {
        let store = memory();
        assert!(WriteMemoryTool::new(store.clone()).risky());
        assert!(!ReadMemoryTool::new(store).risky());
    }
}
