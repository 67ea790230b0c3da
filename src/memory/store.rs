//! 长期记忆存储：embedding 索引 + 有界淘汰
//!
//! write：生成 v7 id、调外部嵌入能力、持久化；read：嵌入查询文本后按
//! 余弦相似度取 top_k，可按 memory_type 过滤；cleanup：超出 max_count 时
//! 按 (importance, created_at, id) 升序删除恰好超出的条数。
//!
//! 后端是单文件 SQLite（rusqlite bundled），Connection 挂在 Mutex 后面；
//! 单条记录的增删原子性由 SQLite 保证。知识库复用同一实现（独立文件）。

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use uuid::timestamp::context::ContextV7;
use uuid::timestamp::Timestamp;
use uuid::Uuid;

use crate::core::AgentError;
use crate::llm::EmbeddingProvider;
use crate::memory::record::{MemoryFilter, MemoryRecord, MemoryType, RecallHit, WriteReceipt};

/// 长期记忆能力：写入、语义检索、有界淘汰
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn write(
        &self,
        content: &str,
        memory_type: MemoryType,
        importance: u8,
        tags: &BTreeSet<String>,
    ) -> Result<WriteReceipt, AgentError>;

    /// 空命中集是正常结果，不是错误
    async fn read(
        &self,
        query: &str,
        filter: MemoryFilter,
        top_k: usize,
    ) -> Result<Vec<RecallHit>, AgentError>;

    /// 返回实际删除条数；size <= max_count 时为 0（幂等）
    fn cleanup(&self, max_count: usize) -> Result<usize, AgentError>;

    fn count(&self) -> Result<usize, AgentError>;
}

/// SQLite 实现
pub struct SqliteMemoryStore {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
    /// v7 id 的单调性上下文：同毫秒内仍按生成顺序递增
    id_ctx: Mutex<ContextV7>,
}

impl SqliteMemoryStore {
    pub fn open(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, AgentError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AgentError::Store(format!("create dir: {}", e)))?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, embedder)
    }

    /// 内存库：测试用
    pub fn open_in_memory(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, AgentError> {
        Self::with_connection(Connection::open_in_memory()?, embedder)
    }

    fn with_connection(
        conn: Connection,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, AgentError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS memories (
                 id          TEXT PRIMARY KEY,
                 content     TEXT NOT NULL,
                 memory_type TEXT NOT NULL,
                 importance  INTEGER NOT NULL,
                 tags        TEXT NOT NULL,
                 created_at  TEXT NOT NULL,
                 embedding   BLOB NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(memory_type);
             CREATE INDEX IF NOT EXISTS idx_memories_eviction
                 ON memories(importance, created_at, id);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
            id_ctx: Mutex::new(ContextV7::new()),
        })
    }

    fn insert(
        &self,
        record: &MemoryRecord,
        embedding: &[f32],
    ) -> Result<(), AgentError> {
        let tags = serde_json::to_string(&record.tags)
            .map_err(|e| AgentError::Store(e.to_string()))?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO memories (id, content, memory_type, importance, tags, created_at, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.content,
                record.memory_type.as_str(),
                record.importance,
                tags,
                // 固定微秒宽度，保证 TEXT 排序即时间排序
                record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                embedding_to_blob(embedding),
            ],
        )?;
        Ok(())
    }

    fn next_id(&self) -> Uuid {
        Uuid::new_v7(Timestamp::now(&self.id_ctx))
    }

    /// 测试辅助：指定 created_at 写入，绕过嵌入能力
    #[cfg(test)]
    async fn write_at(
        &self,
        content: &str,
        memory_type: MemoryType,
        importance: u8,
        created_at: DateTime<Utc>,
    ) -> Result<Uuid, AgentError> {
        let embedding = self.embedder.embed(content).await?;
        let record = MemoryRecord {
            id: self.next_id(),
            content: content.to_string(),
            memory_type,
            importance: importance.clamp(1, 5),
            tags: BTreeSet::new(),
            created_at,
        };
        self.insert(&record, &embedding)?;
        Ok(record.id)
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn write(
        &self,
        content: &str,
        memory_type: MemoryType,
        importance: u8,
        tags: &BTreeSet<String>,
    ) -> Result<WriteReceipt, AgentError> {
        let embedding = self.embedder.embed(content).await?;
        let record = MemoryRecord {
            id: self.next_id(),
            content: content.to_string(),
            memory_type,
            importance: importance.clamp(1, 5),
            tags: tags.clone(),
            created_at: Utc::now(),
        };
        self.insert(&record, &embedding)?;
        tracing::debug!(memory_id = %record.id, memory_type = %memory_type, "memory saved");
        Ok(WriteReceipt {
            status: "saved",
            memory_id: record.id,
            content: record.content,
            memory_type,
        })
    }

    async fn read(
        &self,
        query: &str,
        filter: MemoryFilter,
        top_k: usize,
    ) -> Result<Vec<RecallHit>, AgentError> {
        let query_embedding = self.embedder.embed(query).await?;
        if query_embedding.is_empty() {
            return Ok(Vec::new());
        }

        let rows = {
            let conn = self.conn.lock().unwrap();
            let (sql, type_param): (&str, Option<&str>) = match &filter {
                MemoryFilter::All => (
                    "SELECT id, content, memory_type, importance, tags, created_at, embedding
                     FROM memories",
                    None,
                ),
                MemoryFilter::Only(t) => (
                    "SELECT id, content, memory_type, importance, tags, created_at, embedding
                     FROM memories WHERE memory_type = ?1",
                    Some(t.as_str()),
                ),
            };
            let mut stmt = conn.prepare(sql)?;
            let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(MemoryRecord, Vec<f32>)> {
                let id: String = row.get(0)?;
                let content: String = row.get(1)?;
                let memory_type: String = row.get(2)?;
                let importance: u8 = row.get(3)?;
                let tags: String = row.get(4)?;
                let created_at: String = row.get(5)?;
                let embedding: Vec<u8> = row.get(6)?;
                Ok((
                    MemoryRecord {
                        id: Uuid::parse_str(&id).unwrap_or_default(),
                        content,
                        memory_type: memory_type
                            .parse()
                            .unwrap_or(MemoryType::Episodic),
                        importance,
                        tags: serde_json::from_str(&tags).unwrap_or_default(),
                        created_at: DateTime::parse_from_rfc3339(&created_at)
                            .map(|dt| dt.with_timezone(&Utc))
                            .unwrap_or(DateTime::<Utc>::MIN_UTC),
                    },
                    blob_to_embedding(&embedding),
                ))
            };
            let mapped = match type_param {
                Some(t) => stmt.query_map(params![t], map_row)?,
                None => stmt.query_map([], map_row)?,
            };
            mapped.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut scored: Vec<RecallHit> = rows
            .into_iter()
            .map(|(record, embedding)| RecallHit {
                score: cosine_similarity(&query_embedding, &embedding),
                record,
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    fn cleanup(&self, max_count: usize) -> Result<usize, AgentError> {
        let conn = self.conn.lock().unwrap();
        let size: usize =
            conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        if size <= max_count {
            return Ok(0);
        }
        let deficit = size - max_count;
        let deleted = conn.execute(
            "DELETE FROM memories WHERE id IN (
                 SELECT id FROM memories
                 ORDER BY importance ASC, created_at ASC, id ASC
                 LIMIT ?1
             )",
            params![deficit],
        )?;
        tracing::info!(deleted, max_count, "memory cleanup");
        Ok(deleted)
    }

    fn count(&self) -> Result<usize, AgentError> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?)
    }
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for x in embedding {
        blob.extend_from_slice(&x.to_le_bytes());
    }
    blob
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// 余弦相似度；维度不一致或零向量时为 0
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
