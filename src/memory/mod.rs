//! 记忆层：会话线程（短期）、长期记忆存储、检查点持久化

pub mod persistence;
pub mod record;
pub mod store;
pub mod thread;

pub use persistence::ThreadStore;
pub use record::{MemoryFilter, MemoryRecord, MemoryType, RecallHit, WriteReceipt};
pub use store::{MemoryStore, SqliteMemoryStore};
pub use thread::{Message, PendingConfirmation, Thread, ToolCall};
