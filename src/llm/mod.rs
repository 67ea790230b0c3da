//! LLM 层：推理与嵌入能力的抽象与实现（OpenAI 兼容 / Mock）

pub mod embedding;
pub mod mock;
pub mod openai;
pub mod traits;

pub use embedding::{create_embedder_from_config, EmbeddingProvider, HashEmbedder, OpenAiEmbedder};
pub use mock::{MockChatClient, ScriptedChatClient};
pub use openai::OpenAiClient;
pub use traits::{ChatClient, ChatResponse};
