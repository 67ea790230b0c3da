//! 知识库检索工具
//!
//! 与长期记忆同一套存储实现，但指向独立的知识库文件；
//! ingest_document 按空行分段写入，供离线导入文档。

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::AgentError;
use crate::memory::{MemoryFilter, MemoryStore, MemoryType};
use crate::tools::{parse_args, Tool, ToolFailure};

fn default_n_results() -> usize {
    5
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RagSearchInput {
    /// The search query string
    query: String,
    /// Number of results to return (1-20)
    #[serde(default = "default_n_results")]
    n_results: usize,
}

/// 语义检索知识库
pub struct RagSearchTool {
    knowledge: Arc<dyn MemoryStore>,
}

impl RagSearchTool {
    pub fn new(knowledge: Arc<dyn MemoryStore>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Tool for RagSearchTool {
    fn name(&self) -> &str {
        "rag_search"
    }

    fn description(&self) -> &str {
        "Search the ingested knowledge base. Use for questions about stored documents."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(RagSearchInput)).unwrap_or_default()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolFailure> {
        let input: RagSearchInput = parse_args(&args)?;
        if !(1..=20).contains(&input.n_results) {
            return Err(ToolFailure::invalid("n_results must be between 1 and 20"));
        }

        let hits = self
            .knowledge
            .read(&input.query, MemoryFilter::All, input.n_results)
            .await
            .map_err(|e| ToolFailure::runtime(e.to_string()))?;

        let results: Vec<Value> = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                json!({
                    "rank": i + 1,
                    "content": hit.record.content,
                    "tags": hit.record.tags,
                    "score": hit.score,
                })
            })
            .collect();

        Ok(json!({"results": results, "total": results.len(), "source": "knowledge_base"}))
    }
}

/// 按空行分段导入一篇文档；返回写入条数
pub async fn ingest_document(
    knowledge: &dyn MemoryStore,
    doc_id: &str,
    text: &str,
) -> Result<usize, AgentError> {
    let tags: BTreeSet<String> = [doc_id.to_string()].into();
    let mut written = 0;
    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        knowledge
            .write(paragraph, MemoryType::Knowledge, 3, &tags)
            .await?;
        written += 1;
    }
    tracing::info!(doc_id, written, "document ingested");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HashEmbedder;
    use crate::memory::SqliteMemoryStore;

    fn knowledge() -> Arc<SqliteMemoryStore> {
        Arc::new(SqliteMemoryStore::open_in_memory(Arc::new(HashEmbedder::default())).unwrap())
    }

    #[tokio::test]
    async fn ingest_then_search() {
        let store = knowledge();
        let n = ingest_document(
            store.as_ref(),
            "attention-paper",
            "Attention is all you need.\n\nTransformers replace recurrence with attention.",
        )
        .await
        .unwrap();
        assert_eq!(n, 2);

        let tool = RagSearchTool::new(store);
        let result = tool
            .invoke(json!({"query": "attention transformers"}))
            .await
            .unwrap();
        assert_eq!(result["source"], "knowledge_base");
        assert!(result["total"].as_u64().unwrap() > 0);
        assert_eq!(result["results"][0]["rank"], 1);
    }

    #[tokio::test]
    async fn empty_knowledge_base_is_normal() {
        let tool = RagSearchTool::new(knowledge());
        let result = tool.invoke(json!({"query": "anything"})).await.unwrap();
        assert_eq!(result["total"], 0);
    }
}
